#![no_main]

use fp_rule::{BinaryRule, is_valid_label, parse_rule};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(rule) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(tokens) = parse_rule(rule) {
        assert!(matches!(tokens.operator, "+" | "-" | "*"));
        if let Ok(parsed) = BinaryRule::from_tokens(tokens) {
            assert!(is_valid_label(parsed.left()));
            assert!(is_valid_label(parsed.right()));
            let reparsed: BinaryRule = parsed.to_string().parse().expect("canonical form parses");
            assert_eq!(reparsed, parsed);
        }
    }
});
