mod common;

use common::{pets, record};
use std::sync::Arc;
use textknn::features::{chi_squared_for_class, select_features, ClassInfo};
use textknn::{DocumentView, KnnInfo, TotalIndex};

fn knn(features_per_class: usize) -> KnnInfo {
    KnnInfo::preprocess(Arc::new(pets()), features_per_class, 2).unwrap()
}

#[test]
fn chi_squared_picks_cat_for_a_and_dog_for_b() {
    let index = pets();
    let info = ClassInfo::new(&index);
    let a = chi_squared_for_class(&index, &info, 0);
    let b = chi_squared_for_class(&index, &info, 1);
    assert!((a[0] - 7.0).abs() < 1e-9);
    assert!((b[1] - 5.0625).abs() < 1e-9);
    assert!(a.iter().chain(b.iter()).all(|&s| s >= 0.0));
    assert_eq!(select_features(&index, 1, 2), vec![0, 1]);
}

#[test]
fn preprocess_weights_features_by_idf() {
    let knn = knn(1);
    assert_eq!(knn.features, vec![0, 1]);
    assert!((knn.feature_idfs[0] - 2f64.ln()).abs() < 1e-12);
    assert!((knn.feature_idfs[1] - (4f64 / 3.0).ln()).abs() < 1e-12);
}

#[test]
fn classifies_held_out_dog_document_as_b() {
    let knn = knn(1);
    let mut queries = TotalIndex::new_offset(&knn.index);
    let doc = queries.add(&record("q", &[], &[("dog", 2)])).unwrap().unwrap();
    let query = DocumentView::of(&queries, doc);

    let classes = knn.classify_forward(&query, 2, 4);
    assert_eq!(knn.index.stringify_classes(&classes), vec!["B".to_string()]);
    assert_eq!(knn.classify_inverse(&query, 2), classes);
}

#[test]
fn whole_corpus_vote_ignores_the_query() {
    let mut index = pets();
    index.add(&record("d4", &["B"], &[("cat", 5)])).unwrap();
    let knn = KnnInfo::preprocess(Arc::new(index), 2, 3).unwrap();

    let mut queries = TotalIndex::new_offset(&knn.index);
    for (i, terms) in [[("cat", 1)], [("dog", 7)], [("fish", 2)]].iter().enumerate() {
        let doc = queries.add(&record(&format!("q{i}"), &[], terms)).unwrap().unwrap();
        let query = DocumentView::of(&queries, doc);
        assert_eq!(knn.classify_forward(&query, knn.index.num_documents(), 2), vec![1]);
        assert_eq!(knn.classify_forward(&query, 100, 2), vec![1]);
    }
}

#[test]
fn forward_and_inverse_distances_agree_on_visited_documents() {
    let mut index = pets();
    index.add(&record("d4", &["C"], &[("eel", 4)])).unwrap();
    index.add(&record("d5", &["C"], &[("eel", 1), ("cat", 1)])).unwrap();
    let knn = KnnInfo::preprocess(Arc::new(index), 2, 2).unwrap();

    let mut queries = TotalIndex::new_offset(&knn.index);
    queries.add(&record("q0", &[], &[("cat", 1), ("fish", 3)])).unwrap();
    queries.add(&record("q1", &[], &[("eel", 2), ("newt", 9)])).unwrap();

    for doc in 0..queries.num_documents() as i32 {
        let query = DocumentView::of(&queries, doc);
        let forward = knn.forward_distances(&query, 3);
        let inverse = knn.inverse_distances(&query);
        assert!(!inverse.is_empty());
        assert!(inverse.windows(2).all(|w| w[0].document < w[1].document));
        for d in &inverse {
            let f = forward[d.document as usize];
            assert_eq!(f.document, d.document);
            assert!((f.distance - d.distance).abs() < 1e-12, "doc {}: {} vs {}", d.document, f.distance, d.distance);
        }

        // Documents without any feature sit at the query's own squared norm.
        let norm: f64 = knn.document_vector(&query).iter().map(|v| v * v).sum();
        for f in forward.iter().filter(|f| inverse.iter().all(|d| d.document != f.document)) {
            assert!((f.distance - norm).abs() < 1e-12);
        }
    }
}

#[test]
fn distance_is_zero_against_itself() {
    let knn = knn(1);
    for doc in 0..4 {
        let view = DocumentView::of(&knn.index, doc);
        assert_eq!(knn.distance(&view, &view), 0.0);
    }
}
