use std::sync::{Arc, Mutex};

use serde_derive::{Deserialize, Serialize};

use super::core::*;
use super::replica;
use crate::errors::QueueError;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WriterConfig {
    pub queue: QueueConfig,
    pub replica_target: String,
}

impl Default for WriterConfig {
    fn default() -> WriterConfig {
        WriterConfig {
            queue: QueueConfig::default(),
            replica_target: replica::DEFAULT_TARGET.to_string(),
        }
    }
}

pub trait AfterAppend {
    fn apply(&mut self, position: usize, value: i64) -> ();
}

pub struct QueueWriter {
    queue: Arc<SharedQueue>,
    pub callback_after_append: Vec<Mutex<Box<dyn AfterAppend + Send>>>,
}

impl QueueWriter {
    /// Creates a fresh queue and a writer for it.
    pub fn new(cfg: &WriterConfig) -> QueueWriter {
        let mut writer = QueueWriter {
            queue: Arc::new(SharedQueue::with_config(&cfg.queue)),
            callback_after_append: Vec::with_capacity(2),
        };
        replica::setup(&mut writer, cfg);

        writer.callback_after_append.shrink_to_fit();
        writer
    }

    /// Attaches another writer to an existing queue.
    pub fn open(queue: Arc<SharedQueue>) -> QueueWriter {
        QueueWriter {
            queue,
            callback_after_append: Vec::new(),
        }
    }

    pub fn queue(&self) -> Arc<SharedQueue> {
        Arc::clone(&self.queue)
    }

    pub fn append(&self, value: i64) -> Result<usize, QueueError> {
        let position = self.queue.append(value)?;

        // Runs with the queue lock already released.
        for cb in self.callback_after_append.iter() {
            cb.lock()?.apply(position, value);
        }
        Ok(position)
    }
}
