//! Row-oriented output tables with periodic autosave.
//!
//! An [`EventTable`] collects records in memory and writes them as CSV with a
//! `# key: value` metadata header. [`SharedTable`] wraps a table in a mutex so
//! that worker threads can append batches concurrently; every
//! `autosave_every` appended records the whole table is rewritten to disk.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, info};
use serde::Serialize;

use crate::error::CoreError;

/// A record that can be written as one or more CSV rows.
pub trait TableRecord: Send {
    /// Ordering key; records are written in increasing sequence.
    fn sequence(&self) -> u64;

    /// Write this record's rows (without a header).
    fn write_rows(&self, w: &mut dyn Write) -> std::io::Result<()>;
}

/// How to treat an existing output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Fail if the file already exists.
    New,
    /// Overwrite an existing file.
    Recreate,
}

/// An in-memory table persisted as CSV.
#[derive(Debug)]
pub struct EventTable<R> {
    path: PathBuf,
    title: String,
    header: String,
    metadata: Vec<(String, String)>,
    records: Vec<R>,
}

impl<R: TableRecord> EventTable<R> {
    /// Create the table file.
    ///
    /// The file is created immediately so that an unwritable path or an
    /// existing file (in [`OpenMode::New`]) fails before any event is
    /// generated.
    pub fn create(
        path: impl AsRef<Path>,
        title: impl Into<String>,
        header: impl Into<String>,
        mode: OpenMode,
    ) -> Result<Self, CoreError> {
        let path = path.as_ref().to_path_buf();
        if mode == OpenMode::New && path.exists() {
            return Err(CoreError::AlreadyExists(path));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
        }

        let table = Self {
            path,
            title: title.into(),
            header: header.into(),
            metadata: Vec::new(),
            records: Vec::new(),
        };
        table.write_to(&table.path)?;
        Ok(table)
    }

    /// Set a metadata entry, replacing any previous value for `key`.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        match self.metadata.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.metadata.push((key, value)),
        }
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn append(&mut self, record: R) {
        self.records.push(record);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = R>) {
        self.records.extend(records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Put the records in sequence order.
    pub fn sort(&mut self) {
        self.records.sort_by_key(|r| r.sequence());
    }

    /// Sort the records and rewrite the whole file.
    pub fn save(&mut self) -> Result<(), CoreError> {
        self.sort();
        self.write_to(&self.path)
    }

    /// Final save; returns the number of records written.
    pub fn finish(mut self) -> Result<usize, CoreError> {
        self.save()?;
        info!("Wrote {} records to {}", self.records.len(), self.path.display());
        Ok(self.records.len())
    }

    /// Write all records as a JSON array.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CoreError>
    where
        R: Serialize,
    {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| CoreError::io(path, e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.records)?;
        debug!("JSON table written to {}", path.display());
        Ok(())
    }

    fn write_to(&self, path: &Path) -> Result<(), CoreError> {
        // Write beside the target and rename, so a crash mid-save keeps the
        // previous snapshot intact.
        let tmp = path.with_extension("tmp");
        let io = |e| CoreError::io(path, e);
        {
            let mut w = BufWriter::new(File::create(&tmp).map_err(io)?);
            writeln!(w, "# {}", self.title).map_err(io)?;
            writeln!(w, "# records: {}", self.records.len()).map_err(io)?;
            for (key, value) in &self.metadata {
                writeln!(w, "# {}: {}", key, value).map_err(io)?;
            }
            writeln!(w, "#").map_err(io)?;
            writeln!(w, "{}", self.header).map_err(io)?;
            for record in &self.records {
                record.write_rows(&mut w).map_err(io)?;
            }
            w.flush().map_err(io)?;
        }
        std::fs::rename(&tmp, path).map_err(io)
    }
}

struct SharedState<R> {
    table: EventTable<R>,
    since_save: usize,
}

/// A mutex-guarded [`EventTable`] with periodic autosave.
pub struct SharedTable<R> {
    state: Mutex<SharedState<R>>,
    autosave_every: Option<usize>,
}

impl<R: TableRecord> SharedTable<R> {
    /// Wrap `table`. `autosave_every = None` (or `Some(0)`) disables autosave.
    pub fn new(table: EventTable<R>, autosave_every: Option<usize>) -> Self {
        Self {
            state: Mutex::new(SharedState {
                table,
                since_save: 0,
            }),
            autosave_every: autosave_every.filter(|&n| n > 0),
        }
    }

    /// Append one record.
    pub fn append(&self, record: R) -> Result<(), CoreError> {
        self.append_batch(vec![record])
    }

    /// Append a batch of records under a single lock.
    pub fn append_batch(&self, batch: Vec<R>) -> Result<(), CoreError> {
        let mut state = self.state.lock().map_err(|_| CoreError::Poisoned)?;
        let n = batch.len();
        state.table.extend(batch);
        state.since_save += n;

        if let Some(every) = self.autosave_every {
            if state.since_save >= every {
                state.table.save()?;
                state.since_save = 0;
                debug!(
                    "Autosaved {} records to {}",
                    state.table.len(),
                    state.table.path().display()
                );
            }
        }
        Ok(())
    }

    pub fn set_metadata(&self, key: impl Into<String>, value: impl ToString) -> Result<(), CoreError> {
        let mut state = self.state.lock().map_err(|_| CoreError::Poisoned)?;
        state.table.set_metadata(key, value);
        Ok(())
    }

    pub fn len(&self) -> Result<usize, CoreError> {
        let state = self.state.lock().map_err(|_| CoreError::Poisoned)?;
        Ok(state.table.len())
    }

    pub fn is_empty(&self) -> Result<bool, CoreError> {
        Ok(self.len()? == 0)
    }

    /// Recover the underlying table once all writers are done.
    pub fn into_inner(self) -> Result<EventTable<R>, CoreError> {
        self.state
            .into_inner()
            .map(|s| s.table)
            .map_err(|_| CoreError::Poisoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize)]
    struct Row(u64);

    impl TableRecord for Row {
        fn sequence(&self) -> u64 {
            self.0
        }
        fn write_rows(&self, w: &mut dyn Write) -> std::io::Result<()> {
            writeln!(w, "{}", self.0)
        }
    }

    fn data_lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .filter(|l| !l.starts_with('#'))
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_new_mode_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let _t: EventTable<Row> = EventTable::create(&path, "t", "n", OpenMode::New).unwrap();
        let again = EventTable::<Row>::create(&path, "t", "n", OpenMode::New);
        assert!(matches!(again, Err(CoreError::AlreadyExists(_))));
        assert!(EventTable::<Row>::create(&path, "t", "n", OpenMode::Recreate).is_ok());
    }

    #[test]
    fn test_finish_sorts_and_writes_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("t.csv");
        let mut table = EventTable::create(&path, "test table", "n", OpenMode::New).unwrap();
        table.set_metadata("beam", "10Be");
        table.set_metadata("beam", "12C");
        table.extend([Row(3), Row(1), Row(2)]);
        assert_eq!(table.metadata("beam"), Some("12C"));
        assert_eq!(table.finish().unwrap(), 3);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# test table\n# records: 3\n# beam: 12C\n"));
        assert_eq!(data_lines(&path), vec!["n", "1", "2", "3"]);
    }

    #[test]
    fn test_autosave_flushes_periodically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let table = EventTable::create(&path, "t", "n", OpenMode::New).unwrap();
        let shared = SharedTable::new(table, Some(3));

        shared.append_batch(vec![Row(0), Row(1)]).unwrap();
        assert_eq!(data_lines(&path).len(), 1); // header only
        shared.append(Row(2)).unwrap();
        assert_eq!(data_lines(&path).len(), 4);

        shared.append(Row(3)).unwrap();
        assert_eq!(shared.len().unwrap(), 4);
        let table = shared.into_inner().unwrap();
        assert_eq!(table.finish().unwrap(), 4);
        assert_eq!(data_lines(&path).len(), 5);
    }

    #[test]
    fn test_concurrent_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let table = EventTable::create(&path, "t", "n", OpenMode::New).unwrap();
        let shared = SharedTable::new(table, Some(50));

        std::thread::scope(|s| {
            for t in 0..4u64 {
                let shared = &shared;
                s.spawn(move || {
                    for i in 0..100u64 {
                        shared.append(Row(t * 100 + i)).unwrap();
                    }
                });
            }
        });

        let table = shared.into_inner().unwrap();
        assert_eq!(table.finish().unwrap(), 400);
        let lines = data_lines(&path);
        assert_eq!(lines[1], "0");
        assert_eq!(lines[400], "399");
    }
}
