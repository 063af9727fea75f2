#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use fp_columnar::{ArithmeticOp, Column, ColumnError};
use fp_frame::{DataFrame, FrameError};
use fp_types::{DType, Scalar};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static LABEL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_]+$").expect("label pattern is valid"));

static OPERATOR_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*([+\-*])\s*").expect("operator pattern is valid"));

// ── Operators ───────────────────────────────────────────────────────────

/// The closed set of operators a rule may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOp {
    Add,
    Subtract,
    Multiply,
}

impl RuleOp {
    pub const ALL: [Self; 3] = [Self::Add, Self::Subtract, Self::Multiply];

    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(Self::Add),
            "-" => Some(Self::Subtract),
            "*" => Some(Self::Multiply),
            _ => None,
        }
    }

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
        }
    }

    #[must_use]
    pub fn arithmetic(self) -> ArithmeticOp {
        match self {
            Self::Add => ArithmeticOp::Add,
            Self::Subtract => ArithmeticOp::Sub,
            Self::Multiply => ArithmeticOp::Mul,
        }
    }

    /// Elementwise `left <op> right` through the columnar engine.
    pub fn apply(self, left: &Column, right: &Column) -> Result<Column, ColumnError> {
        left.binary_numeric(right, self.arithmetic())
    }
}

impl fmt::Display for RuleOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// ── Errors ──────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("{argument} must be text, found dtype {dtype:?}")]
    NonTextualInput {
        argument: &'static str,
        dtype: DType,
    },
    #[error("rule {rule:?} must contain exactly one operator, found {operators}")]
    Malformed { rule: String, operators: usize },
    #[error("unsupported operator {operator:?}")]
    UnsupportedOperator { operator: String },
    #[error("label {label:?} must be one or more ASCII letters or underscores")]
    InvalidLabel { label: String },
    #[error("unknown column: {column}")]
    UnknownColumn { column: String },
    #[error(transparent)]
    Compute(#[from] ColumnError),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Stable, serializable code for why a rule was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    NonTextualInput,
    MalformedRule,
    UnsupportedOperator,
    InvalidLabel,
    UnknownColumn,
    ComputeFailed,
}

impl RejectReason {
    pub const ALL: [Self; 6] = [
        Self::NonTextualInput,
        Self::MalformedRule,
        Self::UnsupportedOperator,
        Self::InvalidLabel,
        Self::UnknownColumn,
        Self::ComputeFailed,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NonTextualInput => "non_textual_input",
            Self::MalformedRule => "malformed_rule",
            Self::UnsupportedOperator => "unsupported_operator",
            Self::InvalidLabel => "invalid_label",
            Self::UnknownColumn => "unknown_column",
            Self::ComputeFailed => "compute_failed",
        }
    }
}

impl RuleError {
    #[must_use]
    pub fn reason(&self) -> RejectReason {
        match self {
            Self::NonTextualInput { .. } => RejectReason::NonTextualInput,
            Self::Malformed { .. } => RejectReason::MalformedRule,
            Self::UnsupportedOperator { .. } => RejectReason::UnsupportedOperator,
            Self::InvalidLabel { .. } => RejectReason::InvalidLabel,
            Self::UnknownColumn { .. } => RejectReason::UnknownColumn,
            Self::Compute(_) | Self::Frame(_) => RejectReason::ComputeFailed,
        }
    }
}

// ── Parsing and validation ──────────────────────────────────────────────

/// Raw `(left, operator, right)` split of a rule, before any validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleTokens<'a> {
    pub left: &'a str,
    pub operator: &'a str,
    pub right: &'a str,
}

/// Split `rule` around its single operator.
///
/// Outer whitespace is trimmed and whitespace next to the operator belongs
/// to the split, so `"a+b"`, `"a + b"` and `" a  +  b "` all yield
/// `("a", "+", "b")`. Anything other than exactly one operator occurrence is
/// `Malformed`. Operand text is not checked here: `"+b"` splits into an
/// empty left label that the label check rejects.
pub fn parse_rule(rule: &str) -> Result<RuleTokens<'_>, RuleError> {
    let trimmed = rule.trim();
    let mut splits = OPERATOR_SPLIT.captures_iter(trimmed);

    let (Some(found), None) = (splits.next(), splits.next()) else {
        return Err(RuleError::Malformed {
            rule: rule.to_owned(),
            operators: OPERATOR_SPLIT.find_iter(trimmed).count(),
        });
    };

    let (Some(whole), Some(operator)) = (found.get(0), found.get(1)) else {
        return Err(RuleError::Malformed {
            rule: rule.to_owned(),
            operators: 1,
        });
    };

    Ok(RuleTokens {
        left: &trimmed[..whole.start()],
        operator: operator.as_str(),
        right: &trimmed[whole.end()..],
    })
}

/// Label policy: one or more ASCII letters or underscores, nothing else.
#[must_use]
pub fn is_valid_label(label: &str) -> bool {
    LABEL_PATTERN.is_match(label)
}

/// True only when `operator` is supported and all three labels pass
/// [`is_valid_label`].
#[must_use]
pub fn validate_labels(left: &str, operator: &str, right: &str, target: &str) -> bool {
    let tokens = RuleTokens {
        left,
        operator,
        right,
    };
    checked_rule(tokens, target).is_ok()
}

/// Operator, operand labels, then target label; the first failure wins.
fn checked_rule(tokens: RuleTokens<'_>, target: &str) -> Result<BinaryRule, RuleError> {
    let rule = BinaryRule::from_tokens(tokens)?;
    require_label(target)?;
    Ok(rule)
}

fn require_label(label: &str) -> Result<(), RuleError> {
    if is_valid_label(label) {
        Ok(())
    } else {
        Err(RuleError::InvalidLabel {
            label: label.to_owned(),
        })
    }
}

// ── Rules ───────────────────────────────────────────────────────────────

/// A syntactically valid `<label> <op> <label>` expression.
///
/// Serializes as its canonical text; deserializing re-runs validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BinaryRule {
    left: String,
    op: RuleOp,
    right: String,
}

impl BinaryRule {
    pub fn new(
        left: impl Into<String>,
        op: RuleOp,
        right: impl Into<String>,
    ) -> Result<Self, RuleError> {
        let left = left.into();
        let right = right.into();
        require_label(&left)?;
        require_label(&right)?;
        Ok(Self { left, op, right })
    }

    /// Check operator and operand labels of a parsed rule.
    pub fn from_tokens(tokens: RuleTokens<'_>) -> Result<Self, RuleError> {
        let op = RuleOp::from_symbol(tokens.operator).ok_or_else(|| {
            RuleError::UnsupportedOperator {
                operator: tokens.operator.to_owned(),
            }
        })?;
        Self::new(tokens.left, op, tokens.right)
    }

    #[must_use]
    pub fn left(&self) -> &str {
        &self.left
    }

    #[must_use]
    pub fn op(&self) -> RuleOp {
        self.op
    }

    #[must_use]
    pub fn right(&self) -> &str {
        &self.right
    }

    /// Look up both operands in `frame`; each must be present.
    pub fn resolve_operands<'f>(
        &self,
        frame: &'f DataFrame,
    ) -> Result<(&'f Column, &'f Column), RuleError> {
        resolve_operands(frame, &self.left, &self.right)
    }

    /// Compute the rule's column against `frame` without attaching it.
    pub fn evaluate(&self, frame: &DataFrame) -> Result<Column, RuleError> {
        let (left, right) = self.resolve_operands(frame)?;
        Ok(self.op.apply(left, right)?)
    }

    /// Return a copy of `frame` with the rule's result stored under `target`.
    ///
    /// The target must pass the label policy. An existing column of that
    /// name is overwritten in place; otherwise the column is appended.
    pub fn apply(&self, frame: &DataFrame, target: &str) -> Result<DataFrame, RuleError> {
        require_label(target)?;
        let column = self.evaluate(frame)?;
        Ok(frame.with_column(target, column)?)
    }
}

impl fmt::Display for BinaryRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op, self.right)
    }
}

impl FromStr for BinaryRule {
    type Err = RuleError;

    fn from_str(rule: &str) -> Result<Self, Self::Err> {
        Self::from_tokens(parse_rule(rule)?)
    }
}

impl TryFrom<String> for BinaryRule {
    type Error = RuleError;

    fn try_from(rule: String) -> Result<Self, Self::Error> {
        rule.parse()
    }
}

impl From<BinaryRule> for String {
    fn from(rule: BinaryRule) -> Self {
        rule.to_string()
    }
}

/// Both labels must name columns of `frame`; the first missing one is
/// reported.
pub fn resolve_operands<'f>(
    frame: &'f DataFrame,
    left: &str,
    right: &str,
) -> Result<(&'f Column, &'f Column), RuleError> {
    let lookup = |name: &str| {
        frame.column(name).ok_or_else(|| RuleError::UnknownColumn {
            column: name.to_owned(),
        })
    };
    Ok((lookup(left)?, lookup(right)?))
}

// ── Entry points ────────────────────────────────────────────────────────

/// Derive a column named `target` from `rule` over `frame`.
///
/// Validation happens in full before anything is computed: parse, label
/// policy (operands and target), schema lookup, then arithmetic. `frame` is
/// never modified; success returns an extended copy.
pub fn derive_virtual_column(
    frame: &DataFrame,
    rule: &str,
    target: &str,
) -> Result<DataFrame, RuleError> {
    let rule = checked_rule(parse_rule(rule)?, target)?;
    let out = rule.apply(frame, target)?;

    #[cfg(feature = "tracing")]
    tracing::trace!(
        rule = %rule,
        column = target,
        rows = out.len(),
        "virtual column derived"
    );

    Ok(out)
}

/// [`derive_virtual_column`] for dynamically typed arguments: a non-`Utf8`
/// rule or target is rejected before parsing.
pub fn derive_virtual_column_scalar(
    frame: &DataFrame,
    rule: &Scalar,
    target: &Scalar,
) -> Result<DataFrame, RuleError> {
    derive_virtual_column(
        frame,
        require_text("rule", rule)?,
        require_text("target", target)?,
    )
}

fn require_text<'s>(argument: &'static str, value: &'s Scalar) -> Result<&'s str, RuleError> {
    value.as_str().ok_or(RuleError::NonTextualInput {
        argument,
        dtype: value.dtype(),
    })
}

/// Add a virtual column, collapsing every failure into [`DataFrame::empty`].
///
/// Analogous to `df.assign(target=df[left] <op> df[right])` with the rule
/// given as text. Callers tell success from failure by the column count:
/// a successful result always carries at least the operands plus the
/// target. Use [`derive_virtual_column`] when the reason matters.
#[must_use]
pub fn add_virtual_column(frame: &DataFrame, rule: &str, target: &str) -> DataFrame {
    derive_virtual_column(frame, rule, target).unwrap_or_else(|err| reject(&err))
}

/// [`add_virtual_column`] over dynamically typed arguments.
#[must_use]
pub fn add_virtual_column_scalar(frame: &DataFrame, rule: &Scalar, target: &Scalar) -> DataFrame {
    derive_virtual_column_scalar(frame, rule, target).unwrap_or_else(|err| reject(&err))
}

#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
fn reject(err: &RuleError) -> DataFrame {
    #[cfg(feature = "tracing")]
    tracing::debug!(
        reason = err.reason().as_str(),
        error = %err,
        "virtual column rejected"
    );
    DataFrame::empty()
}
