//! k-nearest-neighbour classification over TF-IDF weighted feature vectors.

use crate::error::KnnError;
use crate::features::select_features;
use crate::index::{checked_slot, ClassId, DocId, Posting, PostingList, TermId, TotalIndex, END};
use crate::pool::run_indexed;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A document's forward chain. The arena may belong to any index sharing the corpus dictionary.
#[derive(Debug, Clone, Copy)]
pub struct DocumentView<'a> {
    pub postings: &'a [Posting],
    pub list: PostingList,
    pub length: i32,
}

impl<'a> DocumentView<'a> {
    pub fn of(index: &'a TotalIndex, doc: DocId) -> Self {
        let slot = checked_slot(doc, index.num_documents(), "document");
        Self {
            postings: &index.forward.postings,
            list: index.forward.posting_lists[slot],
            length: index.documents[slot].length,
        }
    }

    /// Advance `cursor` past postings whose term id is below `term`.
    fn skip_below(&self, mut cursor: i32, term: TermId) -> i32 {
        while cursor != END && self.postings[cursor as usize].owner < term {
            cursor = self.postings[cursor as usize].next;
        }
        cursor
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DocumentDistance {
    pub document: DocId,
    pub distance: f64,
}

/// Everything needed to classify: the selected features, their idf weights and the training index.
#[derive(Debug, Serialize, Deserialize)]
pub struct KnnInfo {
    /// Ascending term ids.
    pub features: Vec<TermId>,
    pub feature_idfs: Vec<f64>,
    pub index: Arc<TotalIndex>,
}

impl KnnInfo {
    pub fn preprocess(index: Arc<TotalIndex>, features_per_class: usize, workers: usize) -> Result<Self, KnnError> {
        tracing::info!(documents = index.num_documents(), features_per_class, "begin preprocessing");
        let features = select_features(&index, features_per_class, workers);
        let feature_idfs = compute_idfs(&index, &features)?;
        tracing::info!(features = features.len(), "end preprocessing");
        Ok(Self { features, feature_idfs, index })
    }

    /// TF-IDF weight of `count` occurrences of feature number `feature` in a document of `length` tokens.
    pub fn value(&self, feature: usize, count: i32, length: i32) -> f64 {
        if length <= 0 {
            return 0.0;
        }
        f64::from(count) / f64::from(length) * self.feature_idfs[feature]
    }

    fn value_at(&self, feature: usize, document: &DocumentView, cursor: i32) -> f64 {
        if cursor == END {
            return 0.0;
        }
        let posting = &document.postings[cursor as usize];
        if posting.owner == self.features[feature] {
            self.value(feature, posting.count, document.length)
        } else {
            0.0
        }
    }

    /// Squared euclidean distance between two documents, restricted to the selected features.
    /// Merge-joins both forward chains against the feature list.
    pub fn distance(&self, a: &DocumentView, b: &DocumentView) -> f64 {
        let mut cursor_a = a.list.first;
        let mut cursor_b = b.list.first;
        let mut distance = 0.0;

        for (feature, &term) in self.features.iter().enumerate() {
            cursor_a = a.skip_below(cursor_a, term);
            cursor_b = b.skip_below(cursor_b, term);
            if cursor_a == END && cursor_b == END {
                break;
            }
            distance += square(self.value_at(feature, a, cursor_a) - self.value_at(feature, b, cursor_b));
        }
        distance
    }

    /// Dense weights of `document` over the selected features.
    pub fn document_vector(&self, document: &DocumentView) -> Vec<f64> {
        let mut cursor = document.list.first;
        self.features
            .iter()
            .enumerate()
            .map(|(feature, &term)| {
                cursor = document.skip_below(cursor, term);
                self.value_at(feature, document, cursor)
            })
            .collect()
    }

    /// Distance from `query` to every indexed document, computed in parallel.
    pub fn forward_distances(&self, query: &DocumentView, workers: usize) -> Vec<DocumentDistance> {
        let index = &*self.index;
        run_indexed(index.num_documents(), workers, |doc| {
            let candidate = DocumentView::of(index, doc as DocId);
            DocumentDistance { document: doc as DocId, distance: self.distance(query, &candidate) }
        })
    }

    /// Distance from `query` to every document containing at least one selected feature,
    /// ascending by document id. Walks the inverse chains of the features as a k-way merge;
    /// documents with none of the features are never visited.
    pub fn inverse_distances(&self, query: &DocumentView) -> Vec<DocumentDistance> {
        let index = &*self.index;
        let postings = &index.inverse.postings;
        let query_vector = self.document_vector(query);
        let mut cursors: Vec<i32> =
            self.features.iter().map(|&term| index.inverse.posting_lists[term as usize].first).collect();

        let mut distances = Vec::new();
        loop {
            let next = cursors.iter().filter(|&&c| c != END).map(|&c| postings[c as usize].owner).min();
            let Some(doc) = next else { break };
            let length = index.documents[doc as usize].length;

            let mut distance = 0.0;
            for (feature, cursor) in cursors.iter_mut().enumerate() {
                let mut candidate = 0.0;
                if *cursor != END && postings[*cursor as usize].owner == doc {
                    let posting = &postings[*cursor as usize];
                    candidate = self.value(feature, posting.count, length);
                    *cursor = posting.next;
                }
                distance += square(query_vector[feature] - candidate);
            }
            distances.push(DocumentDistance { document: doc, distance });
        }
        distances
    }

    /// Classes of the `k` nearest documents under the forward strategy.
    pub fn classify_forward(&self, query: &DocumentView, k: usize, workers: usize) -> Vec<ClassId> {
        self.best_classes(self.forward_distances(query, workers), k)
    }

    /// Classes of the `k` nearest documents among those the inverse strategy visits.
    pub fn classify_inverse(&self, query: &DocumentView, k: usize) -> Vec<ClassId> {
        self.best_classes(self.inverse_distances(query), k)
    }

    /// Vote among the `k` closest documents; every class tied for the most votes is returned, ascending.
    pub fn best_classes(&self, mut distances: Vec<DocumentDistance>, k: usize) -> Vec<ClassId> {
        distances.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.document.cmp(&b.document)));

        let mut histogram: BTreeMap<ClassId, usize> = BTreeMap::new();
        for nearest in distances.iter().take(k) {
            for &class in &self.index.documents[nearest.document as usize].classes {
                *histogram.entry(class).or_insert(0) += 1;
            }
        }

        let most = histogram.values().copied().max().unwrap_or(0);
        histogram.into_iter().filter(|&(_, votes)| votes == most).map(|(class, _)| class).collect()
    }
}

fn compute_idfs(index: &TotalIndex, features: &[TermId]) -> Result<Vec<f64>, KnnError> {
    let num_documents = index.num_documents() as f64;
    features
        .iter()
        .map(|&term| match index.document_frequency(term) {
            0 => Err(KnnError::DegenerateIdf { term }),
            df => Ok((num_documents / df as f64).ln()),
        })
        .collect()
}

fn square(x: f64) -> f64 { x * x }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DocumentRecord;

    fn index_of(docs: &[(&str, &str, i32)]) -> TotalIndex {
        let mut index = TotalIndex::new();
        for (i, &(class, term, count)) in docs.iter().enumerate() {
            let mut r = DocumentRecord::new(format!("d{i}"));
            r.classes.push(class.to_string());
            r.term_counts.insert(term.to_string(), count);
            r.length = count;
            index.add(&r).unwrap();
        }
        index
    }

    #[test]
    fn idf_of_missing_feature_is_rejected() {
        let mut index = index_of(&[("a", "x", 1), ("b", "y", 1)]);
        index.extend_inverse(3);
        assert_eq!(compute_idfs(&index, &[0, 2]), Err(KnnError::DegenerateIdf { term: 2 }));
        let idfs = compute_idfs(&index, &[0, 1]).unwrap();
        assert!((idfs[0] - 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn ties_return_every_leading_class() {
        let index = Arc::new(index_of(&[("a", "x", 1), ("b", "y", 1), ("c", "z", 1)]));
        let knn = KnnInfo { features: vec![0, 1, 2], feature_idfs: vec![1.0; 3], index };
        let distances = vec![
            DocumentDistance { document: 2, distance: 0.5 },
            DocumentDistance { document: 0, distance: 0.5 },
            DocumentDistance { document: 1, distance: 0.1 },
        ];
        assert_eq!(knn.best_classes(distances.clone(), 1), vec![1]);
        assert_eq!(knn.best_classes(distances.clone(), 3), vec![0, 1, 2]);
        assert_eq!(knn.best_classes(distances.clone(), 10), vec![0, 1, 2]);
        assert!(knn.best_classes(distances, 0).is_empty());
    }

    #[test]
    fn zero_length_documents_weigh_nothing() {
        let index = Arc::new(index_of(&[("a", "x", 1)]));
        let knn = KnnInfo { features: vec![0], feature_idfs: vec![2.0], index };
        assert_eq!(knn.value(0, 3, 0), 0.0);
        assert_eq!(knn.value(0, 1, 4), 0.5);
    }
}
