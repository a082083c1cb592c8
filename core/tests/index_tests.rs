mod common;

use common::{pets, record};
use textknn::{DocumentView, Posting, TotalIndex, VerifyError};

#[test]
fn built_index_verifies() {
    let index = pets();
    index.verify().unwrap();
    assert_eq!(index.num_documents(), 4);
    assert_eq!(index.num_terms(), 3);
    assert_eq!(index.forward.postings.len(), 7);
    let dog: Vec<(i32, i32)> = index.term_postings(1).map(|p| (p.owner, p.count)).collect();
    assert_eq!(dog, vec![(0, 1), (2, 3), (3, 1)]);
}

#[test]
fn loops_visit_whole_chains() {
    let index = pets();
    let mut terms = Vec::new();
    index.loop_over_document_postings(3, |p: &Posting| terms.push(p.owner));
    assert_eq!(terms, vec![1, 2]);
    let mut total = 0;
    index.loop_over_term_postings(0, |p: &Posting| total += p.count);
    assert_eq!(total, 3);
}

#[test]
fn detects_count_mismatch() {
    let mut index = pets();
    // d2's only forward posting is dog x3
    let first = index.forward.posting_lists[2].first as usize;
    index.forward.postings[first].count = 4;
    assert_eq!(index.verify(), Err(VerifyError::CountMismatch { doc: 2, term: 1, forward: 4, inverse: 3 }));
}

#[test]
fn detects_out_of_order_forward_chain() {
    let mut index = pets();
    let first = index.forward.posting_lists[0].first as usize;
    index.forward.postings.swap(first, first + 1);
    index.forward.postings[first].next = first as i32 + 1;
    index.forward.postings[first + 1].next = -1;
    assert_eq!(index.verify(), Err(VerifyError::DocumentTermsOutOfOrder { doc: 0, previous: 1, next: 0 }));
}

#[test]
fn detects_posting_missing_from_inverse() {
    let mut index = pets();
    // unlink d3 from fish's chain: fish = [d1, d3]
    let fish = index.inverse.posting_lists[2];
    index.inverse.postings[fish.first as usize].next = -1;
    index.inverse.posting_lists[2].last = fish.first;
    assert_eq!(index.verify(), Err(VerifyError::MissingFromInverse { doc: 3, term: 2 }));
}

#[test]
fn detects_posting_missing_from_forward() {
    let mut index = pets();
    // drop fish from d1's forward chain: d1 = [cat, fish]
    let d1 = index.forward.posting_lists[1];
    index.forward.postings[d1.first as usize].next = -1;
    index.forward.posting_lists[1].last = d1.first;
    assert_eq!(index.verify(), Err(VerifyError::MissingFromForward { doc: 1, term: 2 }));
}

#[test]
fn detects_empty_document_and_dangling_document() {
    let mut index = pets();
    index.forward.posting_lists[3] = textknn::PostingList::EMPTY;
    assert_eq!(index.verify(), Err(VerifyError::EmptyDocument { doc: 3 }));

    let mut index = pets();
    index.inverse.postings[0].owner = 9;
    assert!(matches!(index.verify(), Err(VerifyError::DocumentOutOfRange { term: 0, doc: 9 })));
}

#[test]
fn detects_posting_count_mismatch() {
    let mut index = pets();
    index.inverse.postings.push(Posting { owner: 0, count: 1, next: -1 });
    assert_eq!(index.verify(), Err(VerifyError::PostingCountMismatch { forward: 7, inverse: 8 }));
}

#[test]
fn split_indices_share_ids() {
    let (tx, rx) = crossbeam_channel::bounded(16);
    let docs = vec![
        record("train0", &["A"], &[("cat", 1)]),
        record("train1", &[], &[]),
        record("train2", &["B"], &[("dog", 1)]),
        record("test0", &["B"], &[("dog", 2), ("eel", 1)]),
        record("test1", &["C"], &[("cat", 1)]),
    ];
    for d in docs {
        tx.send(d).unwrap();
    }
    drop(tx);

    let mut train = TotalIndex::new();
    assert_eq!(train.add_up_to(&rx, Some(3)).unwrap(), 2);
    let mut test = TotalIndex::new_offset(&train);
    assert_eq!(test.add_many(&rx).unwrap(), 2);
    train.extend_inverse(test.num_terms());

    train.verify().unwrap();
    test.verify().unwrap();
    assert_eq!(train.num_terms(), 3);
    assert_eq!(test.documents[1].classes, vec![2]);
    assert_eq!(test.stringify_classes(&test.documents[0].classes), vec!["B".to_string()]);
}

#[test]
fn detects_dangling_forward_links() {
    let mut index = pets();
    index.forward.posting_lists[0].first = 99;
    assert_eq!(index.verify(), Err(VerifyError::DanglingForwardLink { doc: 0, offset: 99 }));

    let mut index = pets();
    let d2 = index.forward.posting_lists[2].first as usize;
    index.forward.postings[d2].next = -7;
    assert_eq!(index.verify(), Err(VerifyError::DanglingForwardLink { doc: 2, offset: -7 }));
}

#[test]
fn detects_dangling_inverse_link() {
    let mut index = pets();
    let cat = index.inverse.posting_lists[0].first as usize;
    index.inverse.postings[cat].next = 1000;
    assert_eq!(index.verify(), Err(VerifyError::DanglingInverseLink { term: 0, offset: 1000 }));
}

#[test]
fn detects_out_of_order_inverse_chain() {
    // dog = [d0, d2, d3]
    let mut index = pets();
    let dog = index.inverse.posting_lists[1];
    let second = index.inverse.postings[dog.first as usize].next as usize;
    index.inverse.postings[second].owner = 0;
    assert_eq!(index.verify(), Err(VerifyError::TermDocumentsOutOfOrder { term: 1, previous: 0, next: 0 }));

    // a cycle back to the head is caught rather than walked forever
    let mut index = pets();
    index.inverse.postings[dog.last as usize].next = dog.first;
    assert_eq!(index.verify(), Err(VerifyError::TermDocumentsOutOfOrder { term: 1, previous: 3, next: 0 }));
}

#[test]
#[should_panic(expected = "document id 9 out of range")]
fn document_view_rejects_unknown_document() {
    let index = pets();
    DocumentView::of(&index, 9);
}

#[test]
#[should_panic(expected = "owner id -1 out of range")]
fn chain_rejects_negative_owner() {
    let index = pets();
    index.inverse.chain(-1).count();
}

#[test]
fn document_view_matches_forward_chain() {
    let index = pets();
    let view = index.document_view(3);
    assert_eq!(view.list, index.forward.posting_lists[3]);
    assert_eq!(view.postings.len(), index.forward.postings.len());
    assert_eq!(view.length, 2);
}
