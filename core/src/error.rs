use crate::{DocId, TermId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("term {term} would leave a gap in the inverse index (posting lists: {inverse_len})")]
    InverseGap { term: TermId, inverse_len: usize },
}

/// A broken index invariant, naming the offending document/term pair where there is one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("index has {documents} documents but {posting_lists} forward posting lists")]
    DocumentCountMismatch { documents: usize, posting_lists: usize },
    #[error("document {doc} links to posting {offset}, outside the forward arena")]
    DanglingForwardLink { doc: DocId, offset: i32 },
    #[error("term {term} links to posting {offset}, outside the inverse arena")]
    DanglingInverseLink { term: TermId, offset: i32 },
    #[error("document {doc} has no terms")]
    EmptyDocument { doc: DocId },
    #[error("consecutive postings of document {doc} have out of order term indices: {previous}, {next}")]
    DocumentTermsOutOfOrder { doc: DocId, previous: TermId, next: TermId },
    #[error("consecutive postings of term {term} have out of order document indices: {previous}, {next}")]
    TermDocumentsOutOfOrder { term: TermId, previous: DocId, next: DocId },
    #[error("term {term} has a posting for document {doc} which does not exist")]
    DocumentOutOfRange { term: TermId, doc: DocId },
    #[error("document {doc} is listed under term {term} in inverse but not in forward")]
    MissingFromForward { doc: DocId, term: TermId },
    #[error("document {doc} lists term {term} in forward but not in inverse")]
    MissingFromInverse { doc: DocId, term: TermId },
    #[error("document {doc}, term {term}: forward count {forward} differs from inverse count {inverse}")]
    CountMismatch { doc: DocId, term: TermId, forward: i32, inverse: i32 },
    #[error("forward has {forward} postings, inverse has {inverse}")]
    PostingCountMismatch { forward: usize, inverse: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KnnError {
    #[error("selected feature term {term} has no postings, its idf is undefined")]
    DegenerateIdf { term: TermId },
}
