use crate::dictionary::{Dictionary, SharedDictionary, NOT_FOUND};
use crate::error::{IndexError, VerifyError};
use crate::knn::DocumentView;
use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type TermId = i32;
pub type DocId = i32;
pub type ClassId = i32;

/// End of a posting chain, and the bounds of a chain with no postings.
pub const END: i32 = -1;

/// One link of a posting chain stored in an [`Index`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    /// Document id in the inverse index, term id in the forward index.
    pub owner: i32,
    pub count: i32,
    /// Arena offset of the next posting of the same chain, or [`END`].
    pub next: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingList {
    pub first: i32,
    pub last: i32,
}

impl PostingList {
    pub const EMPTY: Self = Self { first: END, last: END };

    pub fn is_empty(&self) -> bool { self.first == END }
}

impl Default for PostingList {
    fn default() -> Self { Self::EMPTY }
}

/// Singly linked posting chains, one per owner slot, sharing a single arena.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub posting_lists: Vec<PostingList>,
    pub postings: Vec<Posting>,
}

impl Index {
    pub fn new() -> Self { Self::default() }

    /// Link a new posting at the tail of the chain in `slot`.
    fn push(&mut self, slot: usize, owner: i32, count: i32) {
        let at = self.postings.len() as i32;
        self.postings.push(Posting { owner, count, next: END });
        let list = &mut self.posting_lists[slot];
        if list.first == END {
            list.first = at;
        } else {
            self.postings[list.last as usize].next = at;
        }
        list.last = at;
    }

    pub fn chain(&self, owner: i32) -> Chain<'_> {
        Chain::new(&self.postings, self.posting_lists[checked_slot(owner, self.posting_lists.len(), "owner")])
    }
}

/// Iterator over one posting chain.
#[derive(Debug, Clone)]
pub struct Chain<'a> {
    postings: &'a [Posting],
    cursor: i32,
}

impl<'a> Chain<'a> {
    pub fn new(postings: &'a [Posting], list: PostingList) -> Self { Self { postings, cursor: list.first } }
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a Posting;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == END {
            return None;
        }
        let posting = &self.postings[self.cursor as usize];
        self.cursor = posting.next;
        Some(posting)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub name: String,
    pub classes: Vec<ClassId>,
    /// Total number of tokens, used to normalise term counts.
    pub length: i32,
}

/// A counted document as produced by the ingestion pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentRecord {
    pub name: String,
    pub classes: Vec<String>,
    pub length: i32,
    pub term_counts: BTreeMap<String, i32>,
}

impl DocumentRecord {
    pub fn new(name: impl Into<String>) -> Self { Self { name: name.into(), ..Self::default() } }
}

/// Forward (document -> terms) and inverse (term -> documents) indices over one corpus.
#[derive(Debug, Serialize, Deserialize)]
pub struct TotalIndex {
    pub forward: Index,
    pub inverse: Index,
    pub documents: Vec<DocumentInfo>,
    pub dictionary: SharedDictionary,
    pub class_names: SharedDictionary,
}

impl Default for TotalIndex {
    fn default() -> Self { Self::new() }
}

impl TotalIndex {
    pub fn new() -> Self {
        Self {
            forward: Index::new(),
            inverse: Index::new(),
            documents: Vec::new(),
            dictionary: Dictionary::shared(),
            class_names: Dictionary::shared(),
        }
    }

    /// An empty index sharing `other`'s dictionaries, so term and class ids line up.
    pub fn new_offset(other: &TotalIndex) -> Self {
        let mut index = Self {
            dictionary: other.dictionary.clone(),
            class_names: other.class_names.clone(),
            ..Self::new()
        };
        index.extend_inverse(other.inverse.posting_lists.len());
        index
    }

    /// Pad the inverse index with empty chains up to `len` terms.
    pub fn extend_inverse(&mut self, len: usize) {
        if self.inverse.posting_lists.len() < len {
            self.inverse.posting_lists.resize(len, PostingList::EMPTY);
        }
    }

    pub fn num_documents(&self) -> usize { self.forward.posting_lists.len() }

    pub fn num_terms(&self) -> usize { self.inverse.posting_lists.len() }

    /// Index one document. Returns `Ok(None)` when it has no known terms and was skipped.
    pub fn add(&mut self, record: &DocumentRecord) -> Result<Option<DocId>, IndexError> {
        let mut terms: Vec<(TermId, i32)> = {
            let mut dictionary = self.dictionary.write();
            record
                .term_counts
                .iter()
                .map(|(term, &count)| (dictionary.get(term.as_bytes()), count))
                .filter(|&(id, _)| id != NOT_FOUND)
                .collect()
        };
        if terms.is_empty() {
            tracing::warn!(document = %record.name, "document is empty, skipping");
            return Ok(None);
        }
        terms.sort_unstable_by_key(|&(id, _)| id);

        // New terms may only extend the inverse index one slot at a time.
        let mut inverse_len = self.inverse.posting_lists.len();
        for &(term, _) in &terms {
            let slot = term as usize;
            if slot == inverse_len {
                inverse_len += 1;
            } else if slot > inverse_len {
                return Err(IndexError::InverseGap { term, inverse_len: self.inverse.posting_lists.len() });
            }
        }

        let classes = {
            let mut names = self.class_names.write();
            record.classes.iter().map(|c| names.get(c.as_bytes())).filter(|&id| id != NOT_FOUND).collect()
        };

        let doc = self.documents.len();
        self.documents.push(DocumentInfo { name: record.name.clone(), classes, length: record.length });
        self.forward.posting_lists.push(PostingList::EMPTY);

        for (term, count) in terms {
            self.forward.push(doc, term, count);
            let slot = term as usize;
            if slot == self.inverse.posting_lists.len() {
                self.inverse.posting_lists.push(PostingList::EMPTY);
            }
            self.inverse.push(slot, doc as DocId, count);
        }
        Ok(Some(doc as DocId))
    }

    /// Index every record until the channel is closed.
    pub fn add_many(&mut self, records: &Receiver<DocumentRecord>) -> Result<usize, IndexError> {
        self.add_up_to(records, None)
    }

    /// Index records until `limit` of them have been taken off the channel, or it closes.
    /// Anything left on the channel is untouched. Returns the number of documents indexed.
    pub fn add_up_to(&mut self, records: &Receiver<DocumentRecord>, limit: Option<usize>) -> Result<usize, IndexError> {
        let mut received = 0usize;
        let mut indexed = 0usize;
        while limit.map_or(true, |limit| received < limit) {
            let Ok(record) = records.recv() else { break };
            received += 1;
            if self.add(&record)?.is_some() {
                indexed += 1;
            }
        }
        tracing::info!(
            documents = self.num_documents(),
            terms = self.num_terms(),
            postings = self.forward.postings.len(),
            skipped = received - indexed,
            "index construction finished"
        );
        Ok(indexed)
    }

    pub fn term_postings(&self, term: TermId) -> Chain<'_> {
        checked_slot(term, self.inverse.posting_lists.len(), "term");
        self.inverse.chain(term)
    }

    pub fn document_postings(&self, doc: DocId) -> Chain<'_> {
        checked_slot(doc, self.forward.posting_lists.len(), "document");
        self.forward.chain(doc)
    }

    pub fn document_view(&self, doc: DocId) -> DocumentView<'_> { DocumentView::of(self, doc) }

    pub fn loop_over_term_postings(&self, term: TermId, operation: impl FnMut(&Posting)) {
        self.term_postings(term).for_each(operation)
    }

    pub fn loop_over_document_postings(&self, doc: DocId, operation: impl FnMut(&Posting)) {
        self.document_postings(doc).for_each(operation)
    }

    /// Number of documents containing `term`.
    pub fn document_frequency(&self, term: TermId) -> usize { self.term_postings(term).count() }

    pub fn has_class(&self, doc: DocId, class: ClassId) -> bool { self.documents[doc as usize].classes.contains(&class) }

    pub fn stringify_classes(&self, classes: &[ClassId]) -> Vec<String> {
        let names = self.class_names.read();
        classes.iter().map(|&c| names.name_of(c)).collect()
    }

    /// Check every structural invariant. Runs in O(total postings).
    pub fn verify(&self) -> Result<(), VerifyError> {
        if self.documents.len() != self.forward.posting_lists.len() {
            return Err(VerifyError::DocumentCountMismatch {
                documents: self.documents.len(),
                posting_lists: self.forward.posting_lists.len(),
            });
        }

        for doc in 0..self.num_documents() as DocId {
            let mut previous: Option<TermId> = None;
            let mut cursor = self.forward.posting_lists[doc as usize].first;
            while cursor != END {
                let posting = posting_at(&self.forward.postings, cursor)
                    .ok_or(VerifyError::DanglingForwardLink { doc, offset: cursor })?;
                if let Some(previous) = previous {
                    if posting.owner <= previous {
                        return Err(VerifyError::DocumentTermsOutOfOrder { doc, previous, next: posting.owner });
                    }
                }
                previous = Some(posting.owner);
                cursor = posting.next;
            }
            if previous.is_none() {
                return Err(VerifyError::EmptyDocument { doc });
            }
        }

        // Every forward link is in bounds from here on.
        // One forward cursor per document, advanced as the inverse chains reach it.
        let mut cursors: Vec<i32> = self.forward.posting_lists.iter().map(|l| l.first).collect();
        for term in 0..self.num_terms() as TermId {
            let mut previous: Option<DocId> = None;
            let mut cursor = self.inverse.posting_lists[term as usize].first;
            while cursor != END {
                let posting = posting_at(&self.inverse.postings, cursor)
                    .ok_or(VerifyError::DanglingInverseLink { term, offset: cursor })?;
                let doc = posting.owner;
                if let Some(previous) = previous {
                    if doc <= previous {
                        return Err(VerifyError::TermDocumentsOutOfOrder { term, previous, next: doc });
                    }
                }
                previous = Some(doc);

                let slot = usize::try_from(doc)
                    .ok()
                    .filter(|&slot| slot < cursors.len())
                    .ok_or(VerifyError::DocumentOutOfRange { term, doc })?;
                if cursors[slot] == END {
                    return Err(VerifyError::MissingFromForward { doc, term });
                }
                let forward = &self.forward.postings[cursors[slot] as usize];
                if forward.owner < term {
                    return Err(VerifyError::MissingFromInverse { doc, term: forward.owner });
                }
                if forward.owner > term {
                    return Err(VerifyError::MissingFromForward { doc, term });
                }
                if forward.count != posting.count {
                    return Err(VerifyError::CountMismatch { doc, term, forward: forward.count, inverse: posting.count });
                }
                cursors[slot] = forward.next;
                cursor = posting.next;
            }
        }
        if let Some((doc, &cursor)) = cursors.iter().enumerate().find(|&(_, &c)| c != END) {
            return Err(VerifyError::MissingFromInverse {
                doc: doc as DocId,
                term: self.forward.postings[cursor as usize].owner,
            });
        }

        if self.forward.postings.len() != self.inverse.postings.len() {
            return Err(VerifyError::PostingCountMismatch {
                forward: self.forward.postings.len(),
                inverse: self.inverse.postings.len(),
            });
        }
        Ok(())
    }
}

fn posting_at(postings: &[Posting], offset: i32) -> Option<&Posting> {
    usize::try_from(offset).ok().and_then(|i| postings.get(i))
}

pub(crate) fn checked_slot(id: i32, len: usize, what: &str) -> usize {
    match usize::try_from(id) {
        Ok(slot) if slot < len => slot,
        _ => panic!("{what} id {id} out of range, size of posting lists: {len}"),
    }
}
