use anyhow::Result;
use std::collections::HashSet;
use std::fmt;
use std::time::{Duration, Instant};
use textknn::{ClassId, DocId, DocumentView, TotalIndex};

/// Micro-averaged precision/recall counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestResult {
    pub precision_sum: usize,
    pub recall_sum: usize,
    pub precision_divisor: usize,
    pub recall_divisor: usize,
}

impl TestResult {
    pub fn precision(&self) -> f64 { ratio(self.precision_sum, self.precision_divisor) }

    pub fn recall(&self) -> f64 { ratio(self.recall_sum, self.recall_divisor) }

    pub fn fscore(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
    }

    pub fn add(&mut self, other: &TestResult) {
        self.precision_sum += other.precision_sum;
        self.recall_sum += other.recall_sum;
        self.precision_divisor += other.precision_divisor;
        self.recall_divisor += other.recall_divisor;
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "precision: {:.2}, recall: {:.2}, fscore: {:.2}", self.precision(), self.recall(), self.fscore())
    }
}

fn ratio(sum: usize, divisor: usize) -> f64 {
    if divisor == 0 { 0.0 } else { sum as f64 / divisor as f64 }
}

pub fn compare(actual: &[ClassId], predicted: &[ClassId]) -> TestResult {
    let actual_set: HashSet<ClassId> = actual.iter().copied().collect();
    let predicted_set: HashSet<ClassId> = predicted.iter().copied().collect();
    TestResult {
        recall_sum: actual.iter().filter(|c| predicted_set.contains(c)).count(),
        recall_divisor: actual.len(),
        precision_sum: predicted.iter().filter(|c| actual_set.contains(c)).count(),
        precision_divisor: predicted.len(),
    }
}

/// Classify every document of `test_set` and compare against its assigned classes.
pub fn run_test(
    test_set: &TotalIndex,
    mut classifier: impl FnMut(&DocumentView) -> Result<Vec<ClassId>>,
) -> Result<TestResult> {
    let mut total = TestResult::default();
    let mut elapsed = Duration::ZERO;

    for doc in 0..test_set.num_documents() as DocId {
        let info = &test_set.documents[doc as usize];
        let start = Instant::now();
        let predicted = classifier(&DocumentView::of(test_set, doc))?;
        elapsed += start.elapsed();

        let result = compare(&info.classes, &predicted);
        tracing::debug!(
            document = %info.name,
            actual = %test_set.stringify_classes(&info.classes).join(", "),
            result = %test_set.stringify_classes(&predicted).join(", "),
            "{result}"
        );
        total.add(&result);
    }

    let documents = test_set.num_documents().max(1) as u32;
    tracing::info!("totals: {total}");
    tracing::info!("classification took {:?} on average per document", elapsed / documents);
    Ok(total)
}
