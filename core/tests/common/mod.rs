#![allow(dead_code)]

use textknn::{DocumentRecord, TotalIndex};

pub fn record(name: &str, classes: &[&str], terms: &[(&str, i32)]) -> DocumentRecord {
    let mut r = DocumentRecord::new(name);
    r.classes = classes.iter().map(|c| c.to_string()).collect();
    r.term_counts = terms.iter().map(|&(t, c)| (t.to_string(), c)).collect();
    r.length = r.term_counts.values().sum();
    r
}

/// Four documents over two classes: cat=0, dog=1, fish=2; A=0, B=1.
pub fn pets() -> TotalIndex {
    let mut index = TotalIndex::new();
    for r in [
        record("d0", &["A"], &[("cat", 2), ("dog", 1)]),
        record("d1", &["A"], &[("cat", 1), ("fish", 2)]),
        record("d2", &["B"], &[("dog", 3)]),
        record("d3", &["B"], &[("fish", 1), ("dog", 1)]),
    ] {
        index.add(&r).unwrap();
    }
    index
}
