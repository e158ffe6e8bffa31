//! Undo journal layered over a [`Database`], giving nested all-or-nothing
//! scopes: every write inside an open checkpoint records the previous value
//! so the scope can be rolled back.

use crate::{Database, KeyValue, Result, StorageError};
use tracing::trace;

/// Handle to an open journal scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    journal_len: usize,
    depth: usize,
}

impl Checkpoint {
    pub fn depth(&self) -> usize {
        self.depth
    }
}

#[derive(Debug, Clone, Default)]
pub struct JournaledDatabase<D> {
    inner: D,
    journal: Vec<(Vec<u8>, Option<Vec<u8>>)>,
    depth: usize,
}

impl<D: Database> JournaledDatabase<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            journal: Vec::new(),
            depth: 0,
        }
    }
    
    pub fn inner(&self) -> &D {
        &self.inner
    }
    
    /// Number of currently open checkpoints.
    pub fn depth(&self) -> usize {
        self.depth
    }
    
    pub fn checkpoint(&mut self) -> Checkpoint {
        self.depth += 1;
        Checkpoint {
            journal_len: self.journal.len(),
            depth: self.depth,
        }
    }
    
    /// Undo every write made since `checkpoint` was opened, closing it and
    /// any scope nested inside it.
    pub fn revert_to(&mut self, checkpoint: Checkpoint) -> Result<()> {
        self.ensure_open(checkpoint)?;
        
        let undone = self.journal.len() - checkpoint.journal_len;
        while self.journal.len() > checkpoint.journal_len {
            if let Some((key, previous)) = self.journal.pop() {
                match previous {
                    Some(value) => self.inner.put(&key, &value)?,
                    None => self.inner.delete(&key)?,
                }
            }
        }
        self.depth = checkpoint.depth - 1;
        trace!(depth = checkpoint.depth, undone, "journal reverted");
        Ok(())
    }
    
    /// Keep the writes made since `checkpoint`. They stay revertible by any
    /// enclosing scope; once the outermost scope commits the journal is dropped.
    pub fn commit(&mut self, checkpoint: Checkpoint) -> Result<()> {
        self.ensure_open(checkpoint)?;
        
        self.depth = checkpoint.depth - 1;
        if self.depth == 0 {
            self.journal.clear();
        }
        Ok(())
    }
    
    fn ensure_open(&self, checkpoint: Checkpoint) -> Result<()> {
        if checkpoint.depth == 0 || checkpoint.depth > self.depth {
            return Err(StorageError::StaleCheckpoint(checkpoint.depth));
        }
        Ok(())
    }
    
    fn record(&mut self, key: &[u8]) -> Result<()> {
        if self.depth > 0 {
            let previous = self.inner.get(key)?;
            self.journal.push((key.to_vec(), previous));
        }
        Ok(())
    }
}

impl<D: Database> Database for JournaledDatabase<D> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.inner.get(key)
    }
    
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.record(key)?;
        self.inner.put(key, value)
    }
    
    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.record(key)?;
        self.inner.delete(key)
    }
    
    fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<KeyValue>> {
        self.inner.iter_prefix(prefix)
    }
}
