pub mod dictionary;
pub mod error;
pub mod features;
pub mod index;
pub mod ingest;
pub mod knn;
pub mod persist;
pub mod pool;
pub mod tokenizer;

pub use dictionary::{Dictionary, DictionaryMode, SharedDictionary, NOT_FOUND};
pub use error::{IndexError, KnnError, VerifyError};
pub use index::{ClassId, DocId, DocumentInfo, DocumentRecord, Index, Posting, PostingList, TermId, TotalIndex, END};
pub use knn::{DocumentDistance, DocumentView, KnnInfo};
