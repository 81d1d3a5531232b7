use std::slice;
use std::sync::{Arc, Mutex};

use serde_derive::{Deserialize, Serialize};

use crate::errors::QueueError;

pub const DEFAULT_CAPACITY: usize = 16;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueConfig {
    pub initial_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> QueueConfig {
        QueueConfig {
            initial_capacity: DEFAULT_CAPACITY,
        }
    }
}

/// An append-only integer sequence shared between writers and readers.
///
/// The mutex guards the buffer handle, not element access. A writer that
/// finds the buffer shared with an outstanding `Snapshot` clones it before
/// appending, so snapshots stay stable without holding any lock.
pub struct SharedQueue {
    buf: Mutex<Arc<Vec<i64>>>,
}

impl SharedQueue {
    pub fn new() -> SharedQueue {
        SharedQueue::with_config(&QueueConfig::default())
    }

    pub fn with_config(cfg: &QueueConfig) -> SharedQueue {
        SharedQueue {
            buf: Mutex::new(Arc::new(Vec::with_capacity(cfg.initial_capacity))),
        }
    }

    /// Appends `value` and returns its position in the sequence.
    pub fn append(&self, value: i64) -> Result<usize, QueueError> {
        let mut handle = self.buf.lock()?;
        // Clones the buffer iff a snapshot still holds a reference to it.
        let buf = Arc::make_mut(&mut *handle);
        buf.push(value);
        Ok(buf.len() - 1)
    }

    /// Captures the sequence as of now. The handle copy is the whole
    /// critical section; iteration happens with no lock held.
    pub fn snapshot(&self) -> Result<Snapshot, QueueError> {
        let handle = self.buf.lock()?;
        Ok(Snapshot {
            buf: Arc::clone(&handle),
        })
    }

    pub fn len(&self) -> Result<usize, QueueError> {
        let handle = self.buf.lock()?;
        Ok(handle.len())
    }

    pub fn is_empty(&self) -> Result<bool, QueueError> {
        Ok(self.len()? == 0)
    }
}

impl Default for SharedQueue {
    fn default() -> SharedQueue {
        SharedQueue::new()
    }
}

/// A point-in-time view of the sequence. Later appends diverge onto a new
/// buffer instead of mutating this one.
#[derive(Clone, Debug)]
pub struct Snapshot {
    buf: Arc<Vec<i64>>,
}

impl Snapshot {
    #[inline]
    pub fn as_slice(&self) -> &[i64] {
        &self.buf
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, i64> {
        self.buf.iter()
    }

    /// `true` when both snapshots refer to the same buffer instance.
    pub fn ptr_eq(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.buf, &other.buf)
    }
}

impl std::ops::Deref for Snapshot {
    type Target = [i64];

    fn deref(&self) -> &[i64] {
        self.buf.as_slice()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a i64;
    type IntoIter = slice::Iter<'a, i64>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
