//! Track lookup.
//!
//! Scanning and indexing live elsewhere; handlers only need to resolve a
//! protocol id to a [`Track`] snapshot. [`MemoryLibrary`] is the in-process
//! implementation used by the CLI and by tests.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::model::Track;

/// Resolves track ids.
#[async_trait]
pub trait Library: Send + Sync {
    /// Look up a track by id, `None` if unknown.
    async fn track(&self, id: &str) -> Option<Track>;
}

/// Tracks held in memory, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct MemoryLibrary {
    tracks: HashMap<String, Track>,
}

impl MemoryLibrary {
    pub fn new(tracks: impl IntoIterator<Item = Track>) -> Self {
        Self {
            tracks: tracks.into_iter().map(|t| (t.id.clone(), t)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[async_trait]
impl Library for MemoryLibrary {
    async fn track(&self, id: &str) -> Option<Track> {
        self.tracks.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_by_id() {
        let library = MemoryLibrary::new([Track {
            id: "tr-1".into(),
            title: "Song".into(),
            ..Default::default()
        }]);
        assert_eq!(library.len(), 1);
        assert_eq!(library.track("tr-1").await.unwrap().title, "Song");
        assert!(library.track("tr-2").await.is_none());
    }
}
