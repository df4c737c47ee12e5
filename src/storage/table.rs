//! Generic JSON-backed table
//!
//! Every entity is kept in memory in a `RwLock<HashMap>` keyed by its id and
//! persisted to its own JSON file. Writes go to a sibling temp file that is
//! synced and renamed over the original, so a crash never leaves a torn file.

use std::collections::HashMap;
use std::fs::{self, File};
use std::hash::Hash;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// A persisted entity with a stable id
pub trait Record: Clone + Serialize + DeserializeOwned {
    type Id: Copy + Eq + Hash + std::fmt::Display;

    fn id(&self) -> Self::Id;

    /// Used to give saved files a stable order
    fn created_at(&self) -> DateTime<Utc>;
}

/// On-disk layout of a table file
#[derive(Serialize, Deserialize)]
#[serde(bound(deserialize = "R: DeserializeOwned"))]
struct TableFile<R> {
    #[serde(default)]
    records: Vec<R>,
}

/// Rows of a table captured for rollback
pub type Rows<R> = HashMap<<R as Record>::Id, R>;

/// An in-memory table of records persisted to one JSON file
pub struct Table<R: Record> {
    path: PathBuf,
    rows: RwLock<Rows<R>>,
}

impl<R: Record> Table<R> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            rows: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn read(&self) -> LedgerResult<RwLockReadGuard<'_, Rows<R>>> {
        self.rows
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))
    }

    pub(crate) fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, Rows<R>>> {
        self.rows
            .write()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire write lock: {}", e)))
    }

    /// Replace the in-memory rows with the file contents
    pub fn load(&self) -> LedgerResult<()> {
        let records: Vec<R> = if self.path.exists() {
            let file = File::open(&self.path).map_err(|e| {
                LedgerError::Storage(format!("Failed to open {}: {}", self.path.display(), e))
            })?;
            let parsed: TableFile<R> = serde_json::from_reader(BufReader::new(file))
                .map_err(|e| {
                    LedgerError::Storage(format!("Failed to parse {}: {}", self.path.display(), e))
                })?;
            parsed.records
        } else {
            Vec::new()
        };

        let mut rows = self.write()?;
        rows.clear();
        rows.extend(records.into_iter().map(|r| (r.id(), r)));
        Ok(())
    }

    /// Persist all rows, oldest first
    pub fn save(&self) -> LedgerResult<()> {
        let mut records: Vec<R> = self.read()?.values().cloned().collect();
        records.sort_by_key(|r| r.created_at());
        write_atomic(&self.path, &TableFile { records })
    }

    pub fn get(&self, id: R::Id) -> LedgerResult<Option<R>> {
        Ok(self.read()?.get(&id).cloned())
    }

    /// Resolve the short display form of an id (e.g. `exp-1a2b3c4d`)
    ///
    /// An ambiguous short form is a validation error.
    pub fn resolve_short_id(&self, short: &str) -> LedgerResult<Option<R::Id>> {
        let short = short.trim();
        let matches: Vec<R::Id> = self
            .read()?
            .keys()
            .filter(|id| id.to_string() == short)
            .copied()
            .collect();

        match matches.as_slice() {
            [] => Ok(None),
            [id] => Ok(Some(*id)),
            _ => Err(LedgerError::Validation(format!(
                "'{}' matches {} records, use the full ID",
                short,
                matches.len()
            ))),
        }
    }

    /// All rows, oldest first
    pub fn get_all(&self) -> LedgerResult<Vec<R>> {
        self.filter(|_| true)
    }

    /// Rows matching a predicate, oldest first
    pub fn filter<P>(&self, predicate: P) -> LedgerResult<Vec<R>>
    where
        P: Fn(&R) -> bool,
    {
        let mut matched: Vec<R> = self
            .read()?
            .values()
            .filter(|r| predicate(r))
            .cloned()
            .collect();
        matched.sort_by_key(|r| r.created_at());
        Ok(matched)
    }

    pub fn upsert(&self, record: R) -> LedgerResult<()> {
        self.write()?.insert(record.id(), record);
        Ok(())
    }

    /// Conditional update under one write lock.
    ///
    /// Applies `apply` to every listed row that still satisfies `condition`
    /// and returns how many rows changed. Missing rows count as unmatched.
    pub fn update_where<C, A>(&self, ids: &[R::Id], condition: C, mut apply: A) -> LedgerResult<usize>
    where
        C: Fn(&R) -> bool,
        A: FnMut(&mut R),
    {
        let mut rows = self.write()?;
        let mut affected = 0;
        for id in ids {
            if let Some(row) = rows.get_mut(id) {
                if condition(row) {
                    apply(row);
                    affected += 1;
                }
            }
        }
        Ok(affected)
    }

    pub fn len(&self) -> LedgerResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.read()?.is_empty())
    }

    pub(crate) fn snapshot(&self) -> LedgerResult<Rows<R>> {
        Ok(self.read()?.clone())
    }

    pub(crate) fn restore(&self, rows: Rows<R>) -> LedgerResult<()> {
        *self.write()? = rows;
        Ok(())
    }
}

fn write_atomic<T: Serialize>(path: &Path, data: &T) -> LedgerResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            LedgerError::Storage(format!("Failed to create directory {}: {}", parent.display(), e))
        })?;
    }

    let temp_path = path.with_extension("json.tmp");
    let file = File::create(&temp_path)
        .map_err(|e| LedgerError::Storage(format!("Failed to create temp file: {}", e)))?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, data)
        .map_err(|e| LedgerError::Storage(format!("Failed to serialize data: {}", e)))?;
    writer
        .flush()
        .map_err(|e| LedgerError::Storage(format!("Failed to flush data: {}", e)))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| LedgerError::Storage(format!("Failed to sync data: {}", e)))?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        LedgerError::Storage(format!("Failed to rename temp file: {}", e))
    })
}
