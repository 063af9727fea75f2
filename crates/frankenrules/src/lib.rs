#![forbid(unsafe_code)]

//! Derive a new DataFrame column from a textual `<label> <op> <label>` rule.
//!
//! ```
//! use frankenrules::{Column, DataFrame, Scalar, add_virtual_column};
//!
//! let frame = DataFrame::from_columns(vec![
//!     ("price".to_owned(), Column::from_values(vec![Scalar::Int64(10), Scalar::Int64(20)]).unwrap()),
//!     ("qty".to_owned(), Column::from_values(vec![Scalar::Int64(2), Scalar::Int64(3)]).unwrap()),
//! ])
//! .unwrap();
//!
//! let out = add_virtual_column(&frame, "price * qty", "total");
//! assert_eq!(
//!     out.column("total").unwrap().values(),
//!     &[Scalar::Int64(20), Scalar::Int64(60)]
//! );
//!
//! let rejected = add_virtual_column(&frame, "price / qty", "total");
//! assert_eq!(rejected.num_columns(), 0);
//! ```

pub use fp_columnar::{ArithmeticOp, Column, ColumnError, ValidityMask};
pub use fp_frame::{DataFrame, FrameError};
pub use fp_index::{Index, IndexLabel};
pub use fp_io::{IoError, read_csv_path, read_csv_str, write_csv_string};
pub use fp_rule::{
    BinaryRule, RejectReason, RuleError, RuleOp, RuleTokens, add_virtual_column,
    add_virtual_column_scalar, derive_virtual_column, derive_virtual_column_scalar,
    is_valid_label, parse_rule, resolve_operands, validate_labels,
};
pub use fp_types::{DType, NullKind, Scalar, TypeError};
