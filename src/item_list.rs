//! # Item List Module
//!
//! Questo modulo gestisce la lista ordinata dei clip da esportare.
//!
//! ## Responsabilità:
//! - Mantiene la sequenza ordinata di `MediaItem` (ordine di visualizzazione
//!   ed ordine di export)
//! - Enqueue con probe del file: durata e numero di stream video
//! - Rimozione per identità (path), clear
//! - Riordino drag-and-drop con `move_item(source, target)`
//! - Accumulatore della durata totale
//!
//! ## Semantica del riordino:
//! - Trascinando verso il basso l'elemento finisce subito dopo il target
//! - Trascinando verso l'alto l'elemento prende il posto del target, che
//!   scende di una posizione
//! - Gli elementi intermedi scorrono esattamente di una posizione
//! - Source uguale al target, o path non presenti: nessuna modifica
//!
//! ## Esempio:
//! ```rust,ignore
//! let mut list = ItemList::new();
//! list.enqueue(&probe, Path::new("a.mp4")).await?;
//! list.enqueue(&probe, Path::new("b.mp4")).await?;
//! list.move_item(Path::new("a.mp4"), Path::new("b.mp4"));
//! ```

use crate::error::JoinError;
use crate::probe::{MediaProbe, ProbeInfo};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// One enqueued video file with its probed metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub path: PathBuf,
    pub display_name: String,
    pub duration: Duration,
    pub video_stream_count: usize,
}

impl MediaItem {
    pub fn new(path: PathBuf, info: ProbeInfo) -> Self {
        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        Self {
            path,
            display_name,
            duration: info.duration,
            video_stream_count: info.video_stream_count,
        }
    }

    /// File name without extension, empty when the path has none
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Result of a successful probe, including the non-fatal warnings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Added,
    /// Added; only the first of `count` video streams will be used
    AddedMultipleStreams { count: usize },
    /// Not added: the file has no video stream
    SkippedNoVideoStream,
    /// Not added: the path is already in the list
    SkippedDuplicate,
}

impl EnqueueOutcome {
    pub fn is_added(&self) -> bool {
        matches!(self, Self::Added | Self::AddedMultipleStreams { .. })
    }
}

/// Ordered list of media items
#[derive(Debug, Clone, Default)]
pub struct ItemList {
    items: Vec<MediaItem>,
    total_duration: Duration,
}

impl ItemList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a list from previously enqueued items, dropping repeated paths
    pub fn from_items(items: impl IntoIterator<Item = MediaItem>) -> Self {
        let mut list = Self::new();
        for item in items {
            if list.contains(&item.path) {
                debug!("Dropping repeated entry: {}", item.path.display());
                continue;
            }
            list.push(item);
        }
        list
    }

    /// Probe `path` and append it to the end of the list
    pub async fn enqueue<P>(&mut self, probe: &P, path: &Path) -> Result<EnqueueOutcome>
    where
        P: MediaProbe + ?Sized,
    {
        if self.contains(path) {
            info!("Already in the list, skipping: {}", path.display());
            return Ok(EnqueueOutcome::SkippedDuplicate);
        }

        let info = probe.probe(path).await?;

        let outcome = match info.video_stream_count {
            0 => {
                warn!("Could not find a video stream in {}, skipping file", path.display());
                return Ok(EnqueueOutcome::SkippedNoVideoStream);
            }
            1 => EnqueueOutcome::Added,
            count => {
                warn!(
                    "Multiple streams found in {}. Only the first will be processed.",
                    path.display()
                );
                EnqueueOutcome::AddedMultipleStreams { count }
            }
        };

        self.push(MediaItem::new(path.to_path_buf(), info));
        Ok(outcome)
    }

    /// Append an already probed item
    pub fn push(&mut self, item: MediaItem) {
        self.total_duration += item.duration;
        self.items.push(item);
    }

    /// Remove every selected path that is in the list; returns how many were removed
    pub fn remove(&mut self, selection: &[PathBuf]) -> Result<usize, JoinError> {
        if selection.is_empty() {
            return Err(JoinError::NoSelection);
        }

        let mut removed = 0;
        for path in selection {
            if let Some(index) = self.index_of(path) {
                let item = self.items.remove(index);
                self.total_duration = self.total_duration.saturating_sub(item.duration);
                removed += 1;
            }
        }

        Ok(removed)
    }

    /// Drag-and-drop reorder: `source` was dropped onto `target`.
    /// Returns whether the list changed.
    pub fn move_item(&mut self, source: &Path, target: &Path) -> bool {
        match (self.index_of(source), self.index_of(target)) {
            (Some(source_index), Some(target_index)) => self.move_by_index(source_index, target_index),
            _ => {
                debug!("Move ignored, item not in list: {} -> {}", source.display(), target.display());
                false
            }
        }
    }

    /// Index form of `move_item`.
    ///
    /// Dragging down inserts the source right after the target and removes the
    /// original; dragging up inserts it at the target and removes the original,
    /// now one slot further down. Both reduce to rotating the span between the
    /// two positions by one.
    pub fn move_by_index(&mut self, source_index: usize, target_index: usize) -> bool {
        let len = self.items.len();
        if source_index == target_index || source_index >= len || target_index >= len {
            return false;
        }

        if source_index < target_index {
            self.items[source_index..=target_index].rotate_left(1);
        } else {
            self.items[target_index..=source_index].rotate_right(1);
        }

        debug!("Moved item {} -> {}", source_index, target_index);
        true
    }

    /// Empty the list unconditionally
    pub fn clear(&mut self) {
        self.items.clear();
        self.total_duration = Duration::ZERO;
    }

    pub fn index_of(&self, path: &Path) -> Option<usize> {
        self.items.iter().position(|item| item.path == path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.index_of(path).is_some()
    }

    pub fn get(&self, index: usize) -> Option<&MediaItem> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Running total of the durations of every item in the list
    pub fn total_duration(&self) -> Duration {
        self.total_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{item, FakeProbe};

    fn list_of(names: &[&str]) -> ItemList {
        ItemList::from_items(names.iter().map(|name| item(name, 1)))
    }

    fn names(list: &ItemList) -> Vec<String> {
        list.items().iter().map(|item| item.stem()).collect()
    }

    /// Literal insert-then-remove rule the rotation must agree with
    fn reference_move(names: &[&str], source: usize, target: usize) -> Vec<String> {
        let mut v: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        let moved = v[source].clone();
        if source < target {
            v.insert(target + 1, moved);
            v.remove(source);
        } else {
            let remove_index = source + 1;
            if v.len() + 1 <= remove_index {
                return v;
            }
            v.insert(target, moved);
            v.remove(remove_index);
        }
        v
    }

    #[test]
    fn test_move_matches_insert_then_remove_for_all_pairs() {
        let start = ["a", "b", "c", "d", "e"];

        for source in 0..start.len() {
            for target in 0..start.len() {
                let mut list = list_of(&start);
                let changed = list.move_by_index(source, target);

                assert_eq!(changed, source != target);
                assert_eq!(names(&list), reference_move(&start, source, target), "{} -> {}", source, target);
                assert_eq!(list.len(), start.len());

                let mut sorted = names(&list);
                sorted.sort();
                assert_eq!(sorted, vec!["a", "b", "c", "d", "e"]);
            }
        }
    }

    #[test]
    fn test_move_down_lands_after_target() {
        let mut list = list_of(&["a", "b", "c", "d"]);
        assert!(list.move_item(Path::new("/videos/a.mp4"), Path::new("/videos/c.mp4")));
        assert_eq!(names(&list), vec!["b", "c", "a", "d"]);
    }

    #[test]
    fn test_move_up_takes_target_slot() {
        let mut list = list_of(&["a", "b", "c", "d"]);
        assert!(list.move_item(Path::new("/videos/d.mp4"), Path::new("/videos/b.mp4")));
        assert_eq!(names(&list), vec!["a", "d", "b", "c"]);
    }

    #[test]
    fn test_move_onto_last_element() {
        let mut list = list_of(&["a", "b", "c"]);
        assert!(list.move_item(Path::new("/videos/a.mp4"), Path::new("/videos/c.mp4")));
        assert_eq!(names(&list), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_move_noops() {
        let mut list = list_of(&["a", "b", "c"]);

        assert!(!list.move_item(Path::new("/videos/b.mp4"), Path::new("/videos/b.mp4")));
        assert!(!list.move_item(Path::new("/videos/x.mp4"), Path::new("/videos/b.mp4")));
        assert!(!list.move_item(Path::new("/videos/a.mp4"), Path::new("/videos/x.mp4")));
        assert!(!list.move_by_index(3, 0));
        assert!(!list.move_by_index(0, 3));

        assert_eq!(names(&list), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_remove() {
        let mut list = list_of(&["a", "b", "c"]);
        assert_eq!(list.total_duration(), Duration::from_secs(3));

        let removed = list
            .remove(&[PathBuf::from("/videos/b.mp4"), PathBuf::from("/videos/zzz.mp4")])
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(names(&list), vec!["a", "c"]);
        assert_eq!(list.total_duration(), Duration::from_secs(2));

        assert!(matches!(list.remove(&[]), Err(JoinError::NoSelection)));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_clear() {
        let mut list = list_of(&["a", "b"]);
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.total_duration(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_enqueue_outcomes() {
        let probe = FakeProbe::new()
            .with("/videos/ok.mp4", 5, 1)
            .with("/videos/multi.mkv", 3, 2)
            .with("/videos/audio.m4a", 7, 0)
            .with_error("/videos/broken.mp4", "moov atom not found");

        let mut list = ItemList::new();

        let outcome = list.enqueue(&probe, Path::new("/videos/ok.mp4")).await.unwrap();
        assert_eq!(outcome, EnqueueOutcome::Added);

        let outcome = list.enqueue(&probe, Path::new("/videos/multi.mkv")).await.unwrap();
        assert_eq!(outcome, EnqueueOutcome::AddedMultipleStreams { count: 2 });
        assert!(outcome.is_added());

        let outcome = list.enqueue(&probe, Path::new("/videos/audio.m4a")).await.unwrap();
        assert_eq!(outcome, EnqueueOutcome::SkippedNoVideoStream);
        assert!(!outcome.is_added());

        let err = list.enqueue(&probe, Path::new("/videos/broken.mp4")).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<JoinError>(), Some(JoinError::Probe { .. })));

        let outcome = list.enqueue(&probe, Path::new("/videos/ok.mp4")).await.unwrap();
        assert_eq!(outcome, EnqueueOutcome::SkippedDuplicate);

        assert_eq!(names(&list), vec!["ok", "multi"]);
        assert_eq!(list.total_duration(), Duration::from_secs(8));
        assert_eq!(list.get(0).map(|i| i.display_name.as_str()), Some("ok.mp4"));
    }

    #[test]
    fn test_from_items_drops_repeated_paths() {
        let list = ItemList::from_items(vec![item("a", 2), item("b", 3), item("a", 2)]);
        assert_eq!(names(&list), vec!["a", "b"]);
        assert_eq!(list.total_duration(), Duration::from_secs(5));
    }
}
