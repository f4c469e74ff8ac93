//! Record store - 完了したタスクの永続化された履歴
//!
//! メモリ上のリストとバッキングファイルの両方を所有します。
//! 変更のたびに store lock と file lock を取り、ファイルを読み直してから丸ごと
//! 書き直します。複数プロセスが同じ履歴ファイルを共有しても追記は失われません。

mod file;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::{Record, TaskKind};
use crate::error::StoreError;
use crate::observability::HistoryCounts;

/// Read the records in `path`.
///
/// A missing file is an empty history; a file that is not a record list is
/// `StoreError::Corrupt`.
pub fn load(path: impl AsRef<Path>) -> Result<Vec<Record>, StoreError> {
    file::read_records(path.as_ref())
}

#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    records: Mutex<Vec<Record>>,
}

impl RecordStore {
    /// Load the history at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = file::read_records(&path)?;
        tracing::debug!(path = %path.display(), count = records.len(), "history loaded");
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// Load the history at `path`, falling back to an empty one.
    ///
    /// The error (if any) is returned alongside so the caller can warn the
    /// user. A corrupt file stays on disk until the next mutation.
    pub fn open_or_empty(path: impl Into<PathBuf>) -> (Self, Option<StoreError>) {
        let path = path.into();
        match file::read_records(&path) {
            Ok(records) => (
                Self {
                    path,
                    records: Mutex::new(records),
                },
                None,
            ),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "starting with empty history");
                (Self::empty(path), Some(err))
            }
        }
    }

    /// Empty store that has not touched the disk yet.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a completed record and persist the whole history before returning.
    ///
    /// Records written by other processes since the last mutation are picked
    /// up from the file first and kept. On success memory mirrors the file; if
    /// the write fails memory is left as it was.
    pub fn append(
        &self,
        kind: TaskKind,
        label: impl Into<String>,
        location: impl Into<PathBuf>,
    ) -> Result<Record, StoreError> {
        let record = Record::completed(kind, label, location);

        let mut records = self.lock();
        let merged = file::with_file_lock(&self.path, || {
            let mut current = match file::read_records(&self.path) {
                Ok(current) => current,
                Err(err) if err.is_corrupt() => {
                    tracing::warn!(path = %self.path.display(), error = %err, "replacing corrupt history");
                    records.to_vec()
                }
                Err(err) => return Err(err),
            };
            current.push(record.clone());
            file::write_records(&self.path, &current)?;
            Ok(current)
        })?;
        *records = merged;

        tracing::info!(
            kind = %record.kind,
            label = %record.label,
            path = %record.location.display(),
            "history record added"
        );
        Ok(record)
    }

    /// Records in insertion order, optionally only those of `kind`.
    pub fn list(&self, kind: Option<TaskKind>) -> Vec<Record> {
        self.lock()
            .iter()
            .filter(|r| kind.is_none_or(|k| r.kind == k))
            .cloned()
            .collect()
    }

    /// Up to `limit` records, newest first.
    pub fn recent(&self, kind: Option<TaskKind>, limit: usize) -> Vec<Record> {
        self.lock()
            .iter()
            .rev()
            .filter(|r| kind.is_none_or(|k| r.kind == k))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Drop every record and persist the empty history.
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut records = self.lock();
        file::with_file_lock(&self.path, || file::write_records(&self.path, &[]))?;
        let dropped = records.len();
        records.clear();
        tracing::info!(dropped, "history cleared");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn counts(&self) -> HistoryCounts {
        HistoryCounts::from_records(&self.lock())
    }

    // Poison is ignored: no code path panics between a push and its write.
    fn lock(&self) -> MutexGuard<'_, Vec<Record>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn store_in(dir: &tempfile::TempDir) -> RecordStore {
        RecordStore::open(dir.path().join("history.json")).unwrap()
    }

    #[test]
    fn append_then_list_by_kind() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.append(TaskKind::Download, "clip.mp4", "/tmp/clip.mp4").unwrap();

        assert_eq!(
            store.list(Some(TaskKind::Download)),
            vec![Record::completed(TaskKind::Download, "clip.mp4", "/tmp/clip.mp4")]
        );
        assert!(store.list(Some(TaskKind::Conversion)).is_empty());
    }

    #[test]
    fn appends_survive_reload_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let expected = vec![
            store.append(TaskKind::Download, "a.mp4", "/v/a.mp4").unwrap(),
            store.append(TaskKind::Conversion, "a.mp3", "/v/a.mp3").unwrap(),
            store.append(TaskKind::Download, "b.mp4", "/v/b.mp4").unwrap(),
        ];

        assert_eq!(load(store.path()).unwrap(), expected);
        assert_eq!(RecordStore::open(store.path()).unwrap().list(None), expected);
    }

    #[test]
    fn list_filter_keeps_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.append(TaskKind::Download, "1", "/1").unwrap();
        store.append(TaskKind::Conversion, "2", "/2").unwrap();
        store.append(TaskKind::Download, "3", "/3").unwrap();

        let labels: Vec<_> = store
            .list(Some(TaskKind::Download))
            .into_iter()
            .map(|r| r.label)
            .collect();
        assert_eq!(labels, vec!["1", "3"]);
        assert_eq!(store.list(None).len(), 3);
    }

    #[test]
    fn recent_is_newest_first_and_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        for i in 0..6 {
            store.append(TaskKind::Download, format!("{i}.mp4"), format!("/{i}.mp4")).unwrap();
        }
        store.append(TaskKind::Conversion, "x.mp3", "/x.mp3").unwrap();

        let labels: Vec<_> = store
            .recent(Some(TaskKind::Download), 4)
            .into_iter()
            .map(|r| r.label)
            .collect();
        assert_eq!(labels, vec!["5.mp4", "4.mp4", "3.mp4", "2.mp4"]);
        assert_eq!(store.recent(None, 1)[0].label, "x.mp3");
    }

    #[test]
    fn clear_then_load_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.append(TaskKind::Download, "clip.mp4", "/tmp/clip.mp4").unwrap();

        store.clear().unwrap();

        assert!(store.is_empty());
        assert!(load(store.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_file_opens_empty_without_creating_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let store = RecordStore::open(&path).unwrap();

        assert!(store.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn corrupt_file_fails_open_but_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "[{\"type\": ").unwrap();

        assert!(RecordStore::open(&path).unwrap_err().is_corrupt());

        let (store, warning) = RecordStore::open_or_empty(&path);
        assert!(store.is_empty());
        assert!(warning.is_some_and(|e| e.is_corrupt()));
        // Untouched until the next write.
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[{\"type\": ");

        store.append(TaskKind::Download, "new.mp4", "/new.mp4").unwrap();
        assert_eq!(load(&path).unwrap().len(), 1);
    }

    #[test]
    fn failed_write_does_not_keep_record() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the rename fail.
        let path = dir.path().join("history.json");
        std::fs::create_dir(&path).unwrap();
        let store = RecordStore::empty(&path);

        let err = store.append(TaskKind::Download, "a", "/a").unwrap_err();

        assert!(matches!(err, StoreError::Io { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn concurrent_appends_lose_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(&dir));
        store.append(TaskKind::Conversion, "prior.mp3", "/prior.mp3").unwrap();

        let n = 16;
        let threads: Vec<_> = (0..n)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .append(TaskKind::Download, format!("{i}.mp4"), format!("/{i}.mp4"))
                        .unwrap();
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(store.len(), n + 1);
        let on_disk = load(store.path()).unwrap();
        assert_eq!(on_disk.len(), n + 1);
        assert_eq!(on_disk[0].label, "prior.mp3");
        assert_eq!(
            on_disk.iter().filter(|r| r.kind == TaskKind::Download).count(),
            n
        );
    }

    #[test]
    fn two_stores_on_one_file_keep_each_others_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let first = RecordStore::open(&path).unwrap();
        let second = RecordStore::open(&path).unwrap();

        first.append(TaskKind::Download, "a.mp4", "/a.mp4").unwrap();
        second.append(TaskKind::Download, "b.mp4", "/b.mp4").unwrap();

        let labels: Vec<_> = load(&path).unwrap().into_iter().map(|r| r.label).collect();
        assert_eq!(labels, vec!["a.mp4", "b.mp4"]);
        assert_eq!(second.len(), 2);
        // Stale until its next mutation.
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn interleaved_appends_from_two_stores_lose_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let stores = [
            Arc::new(RecordStore::open(&path).unwrap()),
            Arc::new(RecordStore::open(&path).unwrap()),
        ];

        let per_store = 8;
        let threads: Vec<_> = stores
            .iter()
            .enumerate()
            .flat_map(|(s, store)| {
                (0..per_store).map(move |i| {
                    let store = Arc::clone(store);
                    std::thread::spawn(move || {
                        store
                            .append(TaskKind::Conversion, format!("{s}-{i}.mp3"), format!("/{s}-{i}.mp3"))
                            .unwrap();
                    })
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(load(&path).unwrap().len(), 2 * per_store);
    }

    #[test]
    fn clear_drops_records_of_other_stores_too() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let first = RecordStore::open(&path).unwrap();
        let second = RecordStore::open(&path).unwrap();
        first.append(TaskKind::Download, "a.mp4", "/a.mp4").unwrap();

        second.clear().unwrap();

        assert!(load(&path).unwrap().is_empty());
    }

    #[test]
    fn counts_by_kind() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.append(TaskKind::Download, "a", "/a").unwrap();
        store.append(TaskKind::Download, "b", "/b").unwrap();
        store.append(TaskKind::Conversion, "c", "/c").unwrap();

        let counts = store.counts();
        assert_eq!(counts.downloads, 2);
        assert_eq!(counts.conversions, 1);
        assert_eq!(counts.total(), 3);
    }
}
