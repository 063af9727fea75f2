#![forbid(unsafe_code)]

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use frankenrules::{
    DataFrame, add_virtual_column, derive_virtual_column, read_csv_path, read_csv_str,
    write_csv_string,
};

const STDIN_MARKER: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliArgs {
    input: Option<PathBuf>,
    rule: String,
    target: String,
    strict_exit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Run(CliArgs),
    Help,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(error) => {
            eprintln!("fp-rule-cli error: {error}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode, String> {
    let args = match parse_args(std::env::args().skip(1))? {
        Command::Run(args) => args,
        Command::Help => {
            print_help();
            return Ok(ExitCode::SUCCESS);
        }
    };
    let frame = load_frame(args.input.as_deref())?;

    let out = if args.strict_exit {
        match derive_virtual_column(&frame, &args.rule, &args.target) {
            Ok(out) => out,
            Err(error) => {
                eprintln!(
                    "fp-rule-cli rejected: reason={} error={error}",
                    error.reason().as_str()
                );
                return Ok(ExitCode::from(2));
            }
        }
    } else {
        add_virtual_column(&frame, &args.rule, &args.target)
    };

    let rendered = write_csv_string(&out).map_err(|error| error.to_string())?;
    io::stdout()
        .lock()
        .write_all(rendered.as_bytes())
        .map_err(|error| error.to_string())?;

    Ok(ExitCode::SUCCESS)
}

fn load_frame(input: Option<&std::path::Path>) -> Result<DataFrame, String> {
    match input {
        Some(path) if path.as_os_str() != STDIN_MARKER => {
            read_csv_path(path).map_err(|error| format!("{}: {error}", path.display()))
        }
        _ => {
            let text = io::read_to_string(io::stdin()).map_err(|error| error.to_string())?;
            read_csv_str(&text).map_err(|error| format!("<stdin>: {error}"))
        }
    }
}

fn parse_args<I>(args: I) -> Result<Command, String>
where
    I: IntoIterator<Item = String>,
{
    let mut input = None;
    let mut rule = None;
    let mut target = None;
    let mut strict_exit = false;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--input" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--input requires a path or '-'".to_owned())?;
                input = Some(PathBuf::from(value));
            }
            "--rule" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--rule requires an expression".to_owned())?;
                rule = Some(value);
            }
            "--target" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--target requires a column name".to_owned())?;
                target = Some(value);
            }
            "--strict-exit" => {
                strict_exit = true;
            }
            "--help" | "-h" => return Ok(Command::Help),
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    Ok(Command::Run(CliArgs {
        input,
        rule: rule.ok_or_else(|| "--rule is required".to_owned())?,
        target: target.ok_or_else(|| "--target is required".to_owned())?,
        strict_exit,
    }))
}

fn print_help() {
    println!(
        "fp-rule-cli\n\
         Usage:\n\
         \tfp-rule-cli --rule '<label> <op> <label>' --target <name> [--input <path>|-] [--strict-exit]\n\
         Options:\n\
         \t--rule <expr>       rule such as 'revenue - cost'; operators: + - *\n\
         \t--target <name>     column to create or overwrite (letters and underscores)\n\
         \t--input <path>      CSV file to read (default: stdin, also '{STDIN_MARKER}')\n\
         \t--strict-exit       exit 2 with the rejection reason instead of printing an empty table\n\
         \t-h, --help          show this help"
    );
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{CliArgs, Command, parse_args};

    fn parse(args: &[&str]) -> Result<Command, String> {
        parse_args(args.iter().map(|arg| (*arg).to_owned()))
    }

    #[test]
    fn full_argument_list_is_parsed() {
        let command = parse(&[
            "--input",
            "-",
            "--rule",
            "price * qty",
            "--target",
            "total",
            "--strict-exit",
        ])
        .expect("parse");
        assert_eq!(
            command,
            Command::Run(CliArgs {
                input: Some(PathBuf::from("-")),
                rule: "price * qty".to_owned(),
                target: "total".to_owned(),
                strict_exit: true,
            })
        );
    }

    #[test]
    fn input_defaults_to_stdin_and_strict_exit_to_off() {
        let Command::Run(args) = parse(&["--rule", "a+b", "--target", "c"]).expect("parse") else {
            panic!("expected a run command");
        };
        assert_eq!(args.input, None);
        assert!(!args.strict_exit);
    }

    #[test]
    fn missing_rule_is_reported() {
        let err = parse(&["--target", "total"]).expect_err("rule missing");
        assert_eq!(err, "--rule is required");
    }

    #[test]
    fn missing_target_is_reported() {
        let err = parse(&["--rule", "a + b"]).expect_err("target missing");
        assert_eq!(err, "--target is required");
    }

    #[test]
    fn flag_without_value_is_reported() {
        let err = parse(&["--target", "total", "--rule"]).expect_err("value missing");
        assert_eq!(err, "--rule requires an expression");
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let err = parse(&["--rule", "a+b", "--target", "c", "--verbose"]).expect_err("unknown");
        assert_eq!(err, "unknown argument: --verbose");
    }

    #[test]
    fn help_short_circuits_validation() {
        assert_eq!(parse(&["-h"]).expect("help"), Command::Help);
        assert_eq!(parse(&["--rule", "a+b", "--help"]).expect("help"), Command::Help);
    }
}
