use crate::model::Note;
use beatforge_ports::types::Beat;
use serde::{Deserialize, Serialize};

/// Sorted, duplicate-free notes. Inserting a note already present is a no-op.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Note>", into = "Vec<Note>")]
pub struct NoteSet {
    notes: Vec<Note>,
}

impl NoteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, note: Note) -> bool {
        match self.search(&note) {
            Ok(_) => false,
            Err(idx) => {
                self.notes.insert(idx, note);
                true
            }
        }
    }

    pub fn remove(&mut self, note: &Note) -> bool {
        match self.search(note) {
            Ok(idx) => {
                self.notes.remove(idx);
                true
            }
            Err(_) => false,
        }
    }

    pub fn contains(&self, note: &Note) -> bool {
        self.search(note).is_ok()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Note> {
        self.notes.iter()
    }

    pub fn as_slice(&self) -> &[Note] {
        &self.notes
    }

    /// Notes with `from <= beat < to`.
    pub fn range(&self, from: Beat, to: Beat) -> &[Note] {
        let start = self.notes.partition_point(|note| note.beat < from);
        let end = self.notes.partition_point(|note| note.beat < to).max(start);
        &self.notes[start..end]
    }

    /// Owned copy handed to a scan session.
    pub fn snapshot(&self) -> Vec<Note> {
        self.notes.clone()
    }

    fn search(&self, note: &Note) -> Result<usize, usize> {
        self.notes.binary_search_by(|probe| probe.cmp_approx(note))
    }
}

impl Extend<Note> for NoteSet {
    fn extend<I: IntoIterator<Item = Note>>(&mut self, iter: I) {
        for note in iter {
            self.insert(note);
        }
    }
}

impl FromIterator<Note> for NoteSet {
    fn from_iter<I: IntoIterator<Item = Note>>(iter: I) -> Self {
        let mut set = NoteSet::new();
        set.extend(iter);
        set
    }
}

impl From<Vec<Note>> for NoteSet {
    fn from(notes: Vec<Note>) -> Self {
        notes.into_iter().collect()
    }
}

impl From<NoteSet> for Vec<Note> {
    fn from(set: NoteSet) -> Self {
        set.notes
    }
}

impl<'a> IntoIterator for &'a NoteSet {
    type Item = &'a Note;
    type IntoIter = std::slice::Iter<'a, Note>;

    fn into_iter(self) -> Self::IntoIter {
        self.notes.iter()
    }
}
