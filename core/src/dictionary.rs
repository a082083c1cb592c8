use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Returned by [`Dictionary::get`] for an unknown key once the dictionary is closed.
pub const NOT_FOUND: i32 = -1;

/// A dictionary shared between a training index and the indices built against it.
pub type SharedDictionary = Arc<RwLock<Dictionary>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DictionaryMode {
    /// Unknown keys are assigned the next sequential id.
    #[default]
    Open,
    /// Unknown keys resolve to [`NOT_FOUND`].
    Closed,
}

/// Bijection between byte-string keys and dense ids, assigned in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dictionary {
    ids: BTreeMap<Vec<u8>, i32>,
    keys: Vec<Vec<u8>>,
    mode: DictionaryMode,
}

impl Dictionary {
    pub fn new() -> Self { Self::default() }

    pub fn shared() -> SharedDictionary { Arc::new(RwLock::new(Self::new())) }

    /// Resolve `key`, assigning a fresh id if the dictionary is open.
    pub fn get(&mut self, key: &[u8]) -> i32 {
        if let Some(&id) = self.ids.get(key) {
            return id;
        }
        match self.mode {
            DictionaryMode::Closed => NOT_FOUND,
            DictionaryMode::Open => {
                let id = self.keys.len() as i32;
                self.ids.insert(key.to_vec(), id);
                self.keys.push(key.to_vec());
                id
            }
        }
    }

    /// Resolve `key` without ever assigning.
    pub fn lookup(&self, key: &[u8]) -> Option<i32> { self.ids.get(key).copied() }

    pub fn get_inverse(&self, id: i32) -> Option<&[u8]> {
        usize::try_from(id).ok().and_then(|i| self.keys.get(i)).map(Vec::as_slice)
    }

    /// Lossy UTF-8 rendering of the key behind `id`, for logs and reports.
    pub fn name_of(&self, id: i32) -> String {
        match self.get_inverse(id) {
            Some(key) => String::from_utf8_lossy(key).into_owned(),
            None => format!("#{id}"),
        }
    }

    /// Stop assigning ids. There is no way back to [`DictionaryMode::Open`].
    pub fn close(&mut self) { self.mode = DictionaryMode::Closed; }

    pub fn mode(&self) -> DictionaryMode { self.mode }

    pub fn len(&self) -> usize { self.keys.len() }

    pub fn is_empty(&self) -> bool { self.keys.is_empty() }

    /// Keys in byte order with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], i32)> + '_ {
        self.ids.iter().map(|(k, &id)| (k.as_slice(), id))
    }
}
