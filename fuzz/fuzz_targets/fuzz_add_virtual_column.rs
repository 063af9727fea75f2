#![no_main]

use fp_columnar::Column;
use fp_frame::DataFrame;
use fp_rule::add_virtual_column;
use fp_types::Scalar;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let text: &str = &text;
    let (rule, target) = text.split_once('\n').unwrap_or((text, "out"));

    let a = Column::from_values(vec![Scalar::Int64(1), Scalar::Int64(-7)]).expect("a");
    let b = Column::from_values(vec![Scalar::Float64(0.5), Scalar::Int64(3)]).expect("b");
    let frame = DataFrame::from_columns(vec![("a".to_owned(), a), ("b".to_owned(), b)])
        .expect("frame");

    let out = add_virtual_column(&frame, rule, target);
    if out.num_columns() == 0 {
        assert_eq!(out.len(), 0);
    } else {
        assert_eq!(out.len(), frame.len());
        assert!(out.contains_column(target));
        assert!(out.contains_column("a"));
    }
});
