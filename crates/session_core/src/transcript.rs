use std::{slice, sync::Arc};

use shared::domain::Entry;

/// Append-only, persistent list of entries.
///
/// Cloning shares the backing storage. [`Transcript::appended`] builds a new
/// value, so any snapshot handed to a renderer stays valid and complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    entries: Arc<[Entry]>,
}

impl Transcript {
    pub fn seeded(seed: Entry) -> Self {
        Self {
            entries: Arc::from(vec![seed]),
        }
    }

    #[must_use]
    pub fn appended(&self, entry: Entry) -> Self {
        let mut entries = Vec::with_capacity(self.entries.len() + 1);
        entries.extend_from_slice(&self.entries);
        entries.push(entry);
        Self {
            entries: entries.into(),
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn iter(&self) -> slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&Entry> {
        self.entries.last()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Entry;
    type IntoIter = slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
