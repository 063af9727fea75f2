#![forbid(unsafe_code)]

use std::fmt;

use fp_types::{DType, NullKind, Scalar, TypeError, cast_scalar_owned, common_dtype, infer_dtype};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityMask {
    bits: Vec<bool>,
}

impl ValidityMask {
    #[must_use]
    pub fn from_values(values: &[Scalar]) -> Self {
        let bits = values.iter().map(|value| !value.is_missing()).collect();
        Self { bits }
    }

    #[must_use]
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    dtype: DType,
    values: Vec<Scalar>,
    validity: ValidityMask,
}

/// Elementwise arithmetic supported by the columnar engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
}

impl ArithmeticOp {
    #[must_use]
    pub fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
        }
    }

    #[must_use]
    pub fn apply_f64(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Self::Add => lhs + rhs,
            Self::Sub => lhs - rhs,
            Self::Mul => lhs * rhs,
        }
    }

    /// Int64 arithmetic wraps on overflow, matching numpy int64 semantics.
    #[must_use]
    pub fn apply_i64(self, lhs: i64, rhs: i64) -> i64 {
        match self {
            Self::Add => lhs.wrapping_add(rhs),
            Self::Sub => lhs.wrapping_sub(rhs),
            Self::Mul => lhs.wrapping_mul(rhs),
        }
    }
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ColumnError {
    #[error("column length mismatch: left={left}, right={right}")]
    LengthMismatch { left: usize, right: usize },
    #[error("arithmetic {op} is undefined for dtypes {left:?} and {right:?}")]
    NonNumericDtype {
        op: ArithmeticOp,
        left: DType,
        right: DType,
    },
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl Column {
    /// Construct a column, coercing values to the target dtype.
    /// Takes ownership of the values vec so values already at `dtype` are
    /// moved rather than cloned.
    pub fn new(dtype: DType, values: Vec<Scalar>) -> Result<Self, ColumnError> {
        let needs_coercion = values.iter().any(|v| {
            let d = v.dtype();
            d != dtype && d != DType::Null
        });

        let coerced = if needs_coercion {
            values
                .into_iter()
                .map(|value| cast_scalar_owned(value, dtype))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            // Only remap Null variants to the dtype-specific missing marker.
            values
                .into_iter()
                .map(|value| match value {
                    Scalar::Null(_) => Scalar::missing_for_dtype(dtype),
                    other => other,
                })
                .collect()
        };

        let validity = ValidityMask::from_values(&coerced);

        Ok(Self {
            dtype,
            values: coerced,
            validity,
        })
    }

    pub fn from_values(values: Vec<Scalar>) -> Result<Self, ColumnError> {
        let dtype = infer_dtype(&values)?;
        Self::new(dtype, values)
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    #[must_use]
    pub fn value(&self, idx: usize) -> Option<&Scalar> {
        self.values.get(idx)
    }

    #[must_use]
    pub fn validity(&self) -> &ValidityMask {
        &self.validity
    }

    /// Elementwise `self <op> right`, row by row.
    ///
    /// Output dtype follows [`common_dtype`] with `Bool` promoted to `Int64`.
    /// A missing operand yields a missing result (NaN if either side was NaN).
    pub fn binary_numeric(&self, right: &Self, op: ArithmeticOp) -> Result<Self, ColumnError> {
        if self.len() != right.len() {
            return Err(ColumnError::LengthMismatch {
                left: self.len(),
                right: right.len(),
            });
        }

        if !self.dtype.is_numeric() || !right.dtype.is_numeric() {
            return Err(ColumnError::NonNumericDtype {
                op,
                left: self.dtype,
                right: right.dtype,
            });
        }

        let mut out_dtype = common_dtype(self.dtype, right.dtype)?;
        if matches!(out_dtype, DType::Bool) {
            out_dtype = DType::Int64;
        }

        let values = self
            .values
            .iter()
            .zip(&right.values)
            .map(|(left, right)| {
                if left.is_missing() || right.is_missing() {
                    return Ok::<_, ColumnError>(if left.is_nan() || right.is_nan() {
                        Scalar::Null(NullKind::NaN)
                    } else {
                        Scalar::missing_for_dtype(out_dtype)
                    });
                }

                if matches!(out_dtype, DType::Int64) {
                    let lhs = left.to_i64()?;
                    let rhs = right.to_i64()?;
                    return Ok(Scalar::Int64(op.apply_i64(lhs, rhs)));
                }

                let lhs = left.to_f64()?;
                let rhs = right.to_f64()?;
                Ok(Scalar::Float64(op.apply_f64(lhs, rhs)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(out_dtype, values)
    }
}

#[cfg(test)]
mod tests {
    use fp_types::{DType, NullKind, Scalar};

    use super::{ArithmeticOp, Column, ColumnError};

    fn ints(values: &[i64]) -> Column {
        Column::from_values(values.iter().copied().map(Scalar::Int64).collect()).expect("ints")
    }

    #[test]
    fn numeric_addition_propagates_missing() {
        let left = Column::from_values(vec![
            Scalar::Int64(1),
            Scalar::Null(NullKind::Null),
            Scalar::Float64(f64::NAN),
        ])
        .expect("left");
        let right = ints(&[2, 5, 3]);

        let out = left
            .binary_numeric(&right, ArithmeticOp::Add)
            .expect("add should pass");

        assert_eq!(out.dtype(), DType::Float64);
        assert_eq!(out.values()[0], Scalar::Float64(3.0));
        assert_eq!(out.values()[1], Scalar::Null(NullKind::NaN));
        assert_eq!(out.values()[2], Scalar::Null(NullKind::NaN));
        assert_eq!(out.validity().bits(), &[true, false, false]);
    }

    #[test]
    fn integer_operands_stay_integer_for_every_op() {
        let left = ints(&[8, 6]);
        let right = ints(&[2, 3]);

        let sub = left.binary_numeric(&right, ArithmeticOp::Sub).expect("sub");
        assert_eq!(sub.dtype(), DType::Int64);
        assert_eq!(sub.values(), &[Scalar::Int64(6), Scalar::Int64(3)]);

        let mul = left.binary_numeric(&right, ArithmeticOp::Mul).expect("mul");
        assert_eq!(mul.values(), &[Scalar::Int64(16), Scalar::Int64(18)]);
    }

    #[test]
    fn mixed_int_float_promotes_to_float() {
        let left = ints(&[1, 2]);
        let right = Column::from_values(vec![Scalar::Float64(0.5), Scalar::Float64(1.5)])
            .expect("right");

        let out = left
            .binary_numeric(&right, ArithmeticOp::Mul)
            .expect("mul should pass");
        assert_eq!(out.dtype(), DType::Float64);
        assert_eq!(out.values(), &[Scalar::Float64(0.5), Scalar::Float64(3.0)]);
    }

    #[test]
    fn bool_operands_promote_to_int64() {
        let left = Column::from_values(vec![Scalar::Bool(true), Scalar::Bool(false)])
            .expect("left");
        let right = Column::from_values(vec![Scalar::Bool(true), Scalar::Bool(true)])
            .expect("right");

        let out = left
            .binary_numeric(&right, ArithmeticOp::Add)
            .expect("add should pass");
        assert_eq!(out.dtype(), DType::Int64);
        assert_eq!(out.values(), &[Scalar::Int64(2), Scalar::Int64(1)]);
    }

    #[test]
    fn int64_overflow_wraps() {
        let left = ints(&[i64::MAX]);
        let right = ints(&[1]);
        let out = left
            .binary_numeric(&right, ArithmeticOp::Add)
            .expect("add should pass");
        assert_eq!(out.values(), &[Scalar::Int64(i64::MIN)]);
    }

    #[test]
    fn utf8_operands_are_rejected() {
        let left = Column::from_values(vec![Scalar::from("a")]).expect("left");
        let right = ints(&[1]);
        let err = left
            .binary_numeric(&right, ArithmeticOp::Sub)
            .expect_err("utf8 must fail");
        assert_eq!(
            err,
            ColumnError::NonNumericDtype {
                op: ArithmeticOp::Sub,
                left: DType::Utf8,
                right: DType::Int64,
            }
        );
        assert_eq!(
            err.to_string(),
            "arithmetic - is undefined for dtypes Utf8 and Int64"
        );
    }

    #[test]
    fn length_mismatch_is_reported() {
        let err = ints(&[1, 2])
            .binary_numeric(&ints(&[1]), ArithmeticOp::Add)
            .expect_err("must fail");
        assert_eq!(err, ColumnError::LengthMismatch { left: 2, right: 1 });
    }
}
