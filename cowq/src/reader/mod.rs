use std::io;
use std::io::Write;
use std::sync::Arc;

use super::core::*;
use crate::errors::QueueError;

pub struct QueueReader {
    queue: Arc<SharedQueue>,
}

impl QueueReader {
    pub fn open(queue: Arc<SharedQueue>) -> QueueReader {
        QueueReader { queue }
    }

    pub fn snapshot(&self) -> Result<Snapshot, QueueError> {
        self.queue.snapshot()
    }

    /// Runs `f` over a snapshot of the sequence. The queue lock is released
    /// before `f` is called.
    pub fn read<F, C, R>(&self, f: &F, context: &mut C) -> Result<R, QueueError>
    where
        F: Fn(&[i64], &mut C) -> R,
    {
        let snapshot = self.snapshot()?;
        Ok(f(snapshot.as_slice(), context))
    }

    /// Writes the sequence one value per line, without holding any lock
    /// while iterating.
    pub fn print_to<W: Write>(&self, out: &mut W) -> Result<(), QueueError> {
        let snapshot = self.snapshot()?;
        for value in snapshot.iter() {
            writeln!(out, "{}", value)?;
        }
        Ok(())
    }

    pub fn print(&self) -> Result<(), QueueError> {
        let stdout = io::stdout();
        self.print_to(&mut stdout.lock())
    }
}
