use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::storage::{SheetBackend, SheetError};

/// Spreadsheet held in memory. The sheet id is ignored: one instance is one sheet.
#[derive(Debug, Default)]
pub struct MemorySheet {
    rows: Mutex<Vec<Vec<String>>>,
    failing: AtomicBool,
    fail_after_append: AtomicBool,
    open_calls: AtomicUsize,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    /// Makes every subsequent call fail with an authorization error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// The next `append_row` stores its row and then reports a 503, like a
    /// write that landed before the response was lost.
    pub fn fail_after_next_append(&self) {
        self.fail_after_append.store(true, Ordering::SeqCst);
    }

    /// Snapshot of all rows
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.lock().clone()
    }

    /// Number of `open` calls seen, failed ones included
    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Vec<String>>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self) -> Result<(), SheetError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SheetError::Auth("memory sheet is set to fail".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SheetBackend for MemorySheet {
    async fn open(&self, _sheet_id: &str) -> Result<(), SheetError> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        self.check()
    }

    async fn column_values(&self, _sheet_id: &str, column: usize) -> Result<Vec<String>, SheetError> {
        self.check()?;
        let mut values: Vec<String> = self
            .lock()
            .iter()
            .map(|row| row.get(column - 1).cloned().unwrap_or_default())
            .collect();
        while values.last().is_some_and(|v| v.is_empty()) {
            values.pop();
        }
        Ok(values)
    }

    async fn all_values(&self, _sheet_id: &str) -> Result<Vec<Vec<String>>, SheetError> {
        self.check()?;
        Ok(self.lock().clone())
    }

    async fn append_row(&self, _sheet_id: &str, row: &[String]) -> Result<(), SheetError> {
        self.check()?;
        self.lock().push(row.to_vec());
        if self.fail_after_append.swap(false, Ordering::SeqCst) {
            return Err(SheetError::Api {
                status: 503,
                body: "backend error after write".to_string(),
            });
        }
        Ok(())
    }

    async fn insert_row(&self, _sheet_id: &str, index: usize, row: &[String]) -> Result<(), SheetError> {
        self.check()?;
        let mut rows = self.lock();
        let at = index.saturating_sub(1).min(rows.len());
        rows.insert(at, row.to_vec());
        Ok(())
    }

    async fn update_cell(&self, _sheet_id: &str, row: usize, column: usize, value: &str) -> Result<(), SheetError> {
        self.check()?;
        let mut rows = self.lock();
        let target = rows
            .get_mut(row - 1)
            .ok_or_else(|| SheetError::Other(format!("row {} out of range", row)))?;
        if target.len() < column {
            target.resize(column, String::new());
        }
        target[column - 1] = value.to_string();
        Ok(())
    }
}
