//! Chi-squared feature selection over a [`TotalIndex`].

use crate::index::{ClassId, DocId, TermId, TotalIndex};
use crate::pool::run_indexed;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TermScore {
    pub term: TermId,
    pub score: f64,
}

/// Corpus-wide counts reused by every term/class evaluation.
#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub num_classes: usize,
    pub documents_containing_term: Vec<i32>,
    /// `class_membership[class][doc]` is set when `doc` carries `class`.
    pub class_membership: Vec<Vec<bool>>,
}

impl ClassInfo {
    pub fn new(index: &TotalIndex) -> Self {
        let documents_containing_term =
            (0..index.num_terms() as TermId).map(|term| index.document_frequency(term) as i32).collect();
        let num_classes = index.class_names.read().len();
        let mut class_membership = vec![vec![false; index.num_documents()]; num_classes];
        for (doc, info) in index.documents.iter().enumerate() {
            for &class in &info.classes {
                if let Some(members) = usize::try_from(class).ok().and_then(|c| class_membership.get_mut(c)) {
                    members[doc] = true;
                }
            }
        }
        Self { num_classes, documents_containing_term, class_membership }
    }

    pub fn has_class(&self, doc: DocId, class: ClassId) -> bool {
        self.class_membership.get(class as usize).and_then(|members| members.get(doc as usize)).copied().unwrap_or(false)
    }
}

/// Score every term against `class`, indexed by term id.
pub fn chi_squared_for_class(index: &TotalIndex, info: &ClassInfo, class: ClassId) -> Vec<f64> {
    (0..index.num_terms() as TermId).map(|term| chi_squared_for_term_and_class(index, info, term, class)).collect()
}

pub fn chi_squared_for_term_and_class(index: &TotalIndex, info: &ClassInfo, term: TermId, class: ClassId) -> f64 {
    let num_documents = index.num_documents() as i64;
    if num_documents == 0 {
        return 0.0;
    }

    let mut n11 = 0i64; // contain the term, have the class
    let mut n01 = 0i64; // contain the term, lack the class
    for posting in index.term_postings(term) {
        if info.has_class(posting.owner, class) {
            n11 += 1;
        } else {
            n01 += 1;
        }
    }
    let n10 = i64::from(info.documents_containing_term[term as usize]) - n11;
    let n00 = num_documents - n01 - n10 + n11;

    let n = num_documents as f64;
    let (n00, n01, n10, n11) = (n00 as f64, n01 as f64, n10 as f64, n11 as f64);

    let e11 = (n11 + n10) * (n11 + n01) / n;
    let e01 = (n01 + n00) * (n11 + n01) / n;
    let e10 = (n11 + n10) * (n10 + n00) / n;
    let e00 = (n01 + n00) * (n10 + n00) / n;

    (square(n00 - e00) + square(n01 - e01) + square(n10 - e10) + square(n11 - e11)) / n
}

/// Per class, the scores of every term with at least one posting, ascending by score.
/// Classes are scored in parallel, one class per work item.
pub fn sorted_chi_squared_table(index: &TotalIndex, info: &ClassInfo, workers: usize) -> Vec<Vec<TermScore>> {
    run_indexed(info.num_classes, workers, |class| {
        let mut scores: Vec<TermScore> = (0..index.num_terms() as TermId)
            .filter(|&term| info.documents_containing_term[term as usize] > 0)
            .map(|term| TermScore { term, score: chi_squared_for_term_and_class(index, info, term, class as ClassId) })
            .collect();
        scores.sort_by(|a, b| a.score.total_cmp(&b.score));
        scores
    })
}

/// The union of each class's `per_class` best-scoring terms, ascending by term id.
pub fn select_features(index: &TotalIndex, per_class: usize, workers: usize) -> Vec<TermId> {
    let info = ClassInfo::new(index);
    let table = sorted_chi_squared_table(index, &info, workers);

    let features: BTreeSet<TermId> = table
        .iter()
        .flat_map(|scores| scores[scores.len().saturating_sub(per_class)..].iter().map(|s| s.term))
        .collect();

    tracing::info!(classes = info.num_classes, per_class, features = features.len(), "selected features");
    features.into_iter().collect()
}

fn square(x: f64) -> f64 { x * x }
