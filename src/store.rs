use crate::{
    data::{DateRange, Listed, NewExpense},
    read::read_expenses,
    write::{write_expense, write_header, write_rows},
};
use std::{
    fs::{File, OpenOptions},
    io,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No expense file found.")]
    Missing,
    #[error("Invalid expense index for deletion.")]
    InvalidIndex(usize),
    #[error("Expense file I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Expense file is not valid CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// The flat CSV file holding every expense, header first. Every operation opens
/// the file, does its work and closes it again; nothing is cached in between, so
/// each call sees the latest content at the cost of a full read.
///
/// All operations go through one lock, so within this process an append can't
/// slip into the read-modify-write window of a delete and a read never sees a
/// half-written row. A delete writes the new content to a temporary file next
/// to the store and renames it over the old one, so even other processes see
/// either the old file or the new one. They are not otherwise coordinated.
#[derive(Debug)]
pub(crate) struct Store {
    path: PathBuf,
    lock: Mutex<()>,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // The guarded data is `()`, so a poisoned lock has nothing to be inconsistent about.
    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Creates the file with its header if it is absent or empty. Calling it on a
    /// populated store is a no-op.
    pub fn initialize(&self) -> Result<(), StoreError> {
        let _guard = self.lock();
        self.ensure_header()
    }

    fn ensure_header(&self) -> Result<(), StoreError> {
        let empty = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == io::ErrorKind::NotFound => true,
            Err(e) => return Err(e.into()),
        };
        if empty {
            info!(path = %self.path.display(), "creating expense file");
            write_header(File::create(&self.path)?)?;
        }
        Ok(())
    }

    /// Appends one row at the end of the file.
    pub fn append(&self, expense: &NewExpense) -> Result<(), StoreError> {
        let _guard = self.lock();
        self.ensure_header()?;
        let file = OpenOptions::new().append(true).open(&self.path)?;
        write_expense(file, expense)?;
        debug!(date = %expense.date, category = %expense.category, "expense appended");
        Ok(())
    }

    /// Every data row in file order, optionally restricted to a date range. An
    /// absent file reads as empty.
    pub fn read_all(&self, range: Option<&DateRange>) -> Result<Vec<Listed>, StoreError> {
        let _guard = self.lock();
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no expense file yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        let mut listed = Vec::new();
        read_expenses(file, range, &mut listed)?;
        Ok(listed)
    }

    /// Removes the data row at `index` (1-based, the header being row 0) and
    /// rewrites the whole file without it. Returns the removed row. Rows are
    /// handled as raw bytes, so a row in some other encoding survives a delete.
    ///
    /// This costs a full read and a full write of the store, whatever the index.
    pub fn delete_at(&self, index: usize) -> Result<csv::ByteRecord, StoreError> {
        let _guard = self.lock();
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(StoreError::Missing),
            Err(e) => return Err(e.into()),
        };
        let mut rows = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file)
            .into_byte_records()
            .collect::<Result<Vec<_>, _>>()?;
        if index < 1 || index >= rows.len() {
            return Err(StoreError::InvalidIndex(index));
        }
        let removed = rows.remove(index);
        self.replace(&rows)?;
        info!(index, remaining = rows.len() - 1, "expense deleted");
        Ok(removed)
    }

    fn replace(&self, rows: &[csv::ByteRecord]) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        write_rows(&mut tmp, rows)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
