use std::{fmt, io};

#[derive(Debug)]
pub enum QueueError {
    Io(io::Error),
    PoisonedLock,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Io(e) => write!(f, "IO error: {}", e),
            QueueError::PoisonedLock => write!(f, "Mutex was poisoned"),
        }
    }
}

impl std::error::Error for QueueError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueueError::Io(e) => Some(e),
            QueueError::PoisonedLock => None,
        }
    }
}

impl From<io::Error> for QueueError {
    fn from(err: io::Error) -> Self {
        QueueError::Io(err)
    }
}

impl<T> From<std::sync::PoisonError<T>> for QueueError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        QueueError::PoisonedLock
    }
}
