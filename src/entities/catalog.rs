//! Library catalog: in-memory list of added media.
//!
//! Insertion-ordered (IndexMap keyed by entry id). Entries are appended on add
//! and removed by id; nothing else mutates them. Counts and filtered views are
//! computed on demand so there is no counter to drift out of sync.

use std::time::SystemTime;

use indexmap::IndexMap;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::media::{KindFilter, MediaKind, PickedFile};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaEntry {
    pub id: Uuid,
    pub name: String,
    pub uri: String,
    pub kind: MediaKind,
    pub size_bytes: u64,
    pub added_at: SystemTime,
}

#[derive(Debug, Clone, Default)]
pub struct LibraryCatalog {
    entries: IndexMap<Uuid, MediaEntry>,
}

impl LibraryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append files in input order. Returns the generated ids in the same order.
    pub fn add<I>(&mut self, files: I) -> Vec<Uuid>
    where
        I: IntoIterator<Item = PickedFile>,
    {
        let added_at = SystemTime::now();
        let mut ids = Vec::new();
        for file in files {
            let id = self.fresh_id();
            let kind = file.kind();
            trace!("Catalog add {} ({:?}, {} bytes)", file.name, kind, file.size_bytes);
            self.entries.insert(
                id,
                MediaEntry {
                    id,
                    name: file.name,
                    uri: file.uri,
                    kind,
                    size_bytes: file.size_bytes,
                    added_at,
                },
            );
            ids.push(id);
        }
        debug!("Catalog: added {}, total {}", ids.len(), self.entries.len());
        ids
    }

    /// Random ids, re-rolled on the (theoretical) collision
    fn fresh_id(&self) -> Uuid {
        loop {
            let id = Uuid::new_v4();
            if !self.entries.contains_key(&id) {
                return id;
            }
        }
    }

    /// Remove by id. Unknown id is a no-op.
    pub fn remove(&mut self, id: Uuid) -> Option<MediaEntry> {
        let removed = self.entries.shift_remove(&id);
        if removed.is_none() {
            trace!("Catalog remove: {} not present", id);
        }
        removed
    }

    /// Entries matching `filter`, in insertion order
    pub fn filter(&self, filter: KindFilter) -> Vec<&MediaEntry> {
        self.entries
            .values()
            .filter(|e| filter.matches(e.kind))
            .collect()
    }

    pub fn count_by_kind(&self, kind: MediaKind) -> usize {
        self.entries.values().filter(|e| e.kind == kind).count()
    }

    pub fn get(&self, id: Uuid) -> Option<&MediaEntry> {
        self.entries.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MediaEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_size_bytes(&self) -> u64 {
        self.entries.values().map(|e| e.size_bytes).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(entries: &[&MediaEntry]) -> Vec<String> {
        entries.iter().map(|e| e.name.clone()).collect()
    }

    fn two_files() -> Vec<PickedFile> {
        vec![
            PickedFile::new("a.mp4", "file:///a.mp4", "video/mp4", 1000),
            PickedFile::new("b.mp3", "file:///b.mp3", "audio/mpeg", 200),
        ]
    }

    #[test]
    fn test_filter_count_remove_scenario() {
        let mut catalog = LibraryCatalog::new();
        let ids = catalog.add(two_files());

        assert_eq!(names(&catalog.filter(KindFilter::Only(MediaKind::Video))), vec!["a.mp4"]);
        assert_eq!(catalog.count_by_kind(MediaKind::Audio), 1);

        catalog.remove(ids[0]);
        assert_eq!(names(&catalog.filter(KindFilter::All)), vec!["b.mp3"]);
    }

    #[test]
    fn test_add_appends_in_order() {
        let mut catalog = LibraryCatalog::new();
        catalog.add(two_files());
        catalog.add(vec![PickedFile::new("c.mkv", "c.mkv", "video/x-matroska", 5)]);

        assert_eq!(
            names(&catalog.filter(KindFilter::All)),
            vec!["a.mp4", "b.mp3", "c.mkv"]
        );
        assert_eq!(
            names(&catalog.filter(MediaKind::Video.into())),
            vec!["a.mp4", "c.mkv"]
        );
        assert_eq!(catalog.total_size_bytes(), 1205);
    }

    #[test]
    fn test_ids_are_unique() {
        let mut catalog = LibraryCatalog::new();
        let files: Vec<_> = (0..200)
            .map(|i| PickedFile::new(&format!("{i}.mp3"), "x", "audio/mpeg", 0))
            .collect();
        let mut ids = catalog.add(files);
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 200);
        assert_eq!(catalog.len(), 200);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut catalog = LibraryCatalog::new();
        catalog.add(two_files());
        assert!(catalog.remove(Uuid::new_v4()).is_none());
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_remove_middle_keeps_order() {
        let mut catalog = LibraryCatalog::new();
        let ids = catalog.add(vec![
            PickedFile::new("1.mp3", "1", "audio/mpeg", 0),
            PickedFile::new("2.mp3", "2", "audio/mpeg", 0),
            PickedFile::new("3.mp3", "3", "audio/mpeg", 0),
        ]);
        let removed = catalog.remove(ids[1]).unwrap();
        assert_eq!(removed.name, "2.mp3");
        assert_eq!(names(&catalog.filter(KindFilter::All)), vec!["1.mp3", "3.mp3"]);
        assert_eq!(catalog.get(ids[2]).map(|e| e.uri.as_str()), Some("3"));
    }

    #[test]
    fn test_counts_recomputed() {
        let mut catalog = LibraryCatalog::new();
        assert!(catalog.is_empty());
        let ids = catalog.add(two_files());
        assert_eq!(catalog.count_by_kind(MediaKind::Video), 1);
        catalog.remove(ids[0]);
        assert_eq!(catalog.count_by_kind(MediaKind::Video), 0);
        assert_eq!(catalog.count_by_kind(MediaKind::Audio), 1);
    }
}
