use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::errors::QueueError;
use crate::reader::QueueReader;
use crate::writer::{QueueWriter, WriterConfig};
use crate::{QueueConfig, SharedQueue};

#[test]
fn append_is_visible_to_the_next_snapshot() -> Result<(), QueueError> {
    let queue = SharedQueue::new();
    queue.append(41)?;
    queue.append(42)?;

    let snapshot = queue.snapshot()?;
    assert_eq!(snapshot.last(), Some(&42));
    Ok(())
}

#[test]
fn sequential_appends_keep_order() -> Result<(), QueueError> {
    let queue = SharedQueue::new();
    for v in 1..=3 {
        queue.append(v)?;
    }

    let snapshot = queue.snapshot()?;
    assert_eq!(snapshot.to_vec(), vec![1, 2, 3]);
    assert_eq!(queue.len()?, 3);
    assert!(!queue.is_empty()?);
    Ok(())
}

// A reader snapshots an empty queue, a writer appends, the reader
// snapshots again. The first handle must stay empty.
#[test]
fn snapshots_are_isolated_from_later_appends() -> Result<(), QueueError> {
    let queue = Arc::new(SharedQueue::new());
    let reader = QueueReader::open(Arc::clone(&queue));

    let h1 = reader.snapshot()?;
    assert!(h1.is_empty());

    let appender = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.append(5))
    };
    appender.join().expect("appender thread panicked")?;

    let h2 = reader.snapshot()?;
    assert!(h1.is_empty());
    assert_eq!(h2.as_slice(), &[5][..]);
    Ok(())
}

#[test]
fn append_diverges_from_an_outstanding_snapshot() -> Result<(), QueueError> {
    let queue = SharedQueue::new();
    queue.append(1)?;

    let before = queue.snapshot()?;
    let unchanged = queue.snapshot()?;
    // No append in between: both handles share one buffer instance.
    assert!(before.ptr_eq(&unchanged));

    queue.append(2)?;
    let after = queue.snapshot()?;

    assert!(!before.ptr_eq(&after));
    assert_eq!(before.to_vec(), vec![1]);
    assert_eq!(after.to_vec(), vec![1, 2]);
    Ok(())
}

#[test]
fn concurrent_appends_are_not_lost() -> Result<(), QueueError> {
    const APPENDERS: i64 = 8;
    const PER_APPENDER: i64 = 200;

    let writer = Arc::new(QueueWriter::new(&WriterConfig::default()));
    let mut handles = Vec::new();
    for a in 0..APPENDERS {
        let writer = Arc::clone(&writer);
        handles.push(thread::spawn(move || -> Result<(), QueueError> {
            for k in 0..PER_APPENDER {
                writer.append(a * PER_APPENDER + k)?;
            }
            Ok(())
        }));
    }
    for handle in handles {
        handle.join().expect("appender thread panicked")?;
    }

    let snapshot = writer.queue().snapshot()?;
    let mut values = snapshot.to_vec();
    values.sort_unstable();
    let expected: Vec<i64> = (0..APPENDERS * PER_APPENDER).collect();
    assert_eq!(values, expected);
    Ok(())
}

// Single writer appending 0, 1, 2, ... means every snapshot must be a clean
// prefix of the naturals. A torn or partially applied append would break
// that immediately.
#[test]
fn snapshots_never_observe_partial_appends() {
    let writer = QueueWriter::new(&WriterConfig {
        queue: QueueConfig {
            initial_capacity: 1024,
        },
        ..WriterConfig::default()
    });
    let queue = writer.queue();
    let closing = Arc::new(AtomicBool::new(false));

    let appender = {
        let closing = Arc::clone(&closing);
        thread::spawn(move || {
            let mut next = 0i64;
            while !closing.load(AtomicOrdering::Relaxed) {
                writer.append(next).expect("append failed");
                next += 1;
            }
            next
        })
    };

    let mut readers = Vec::new();
    for _ in 0..2 {
        let reader = QueueReader::open(Arc::clone(&queue));
        let closing = Arc::clone(&closing);
        readers.push(thread::spawn(move || {
            let mut snapshots_checked = 0u64;
            let mut prev_len = 0usize;
            while !closing.load(AtomicOrdering::Relaxed) {
                let snapshot = reader.snapshot().expect("snapshot failed");
                assert!(
                    snapshot.len() >= prev_len,
                    "sequence shrank between snapshots"
                );
                for (i, v) in snapshot.iter().enumerate() {
                    assert_eq!(*v, i as i64, "snapshot is not a clean prefix");
                }
                prev_len = snapshot.len();
                snapshots_checked += 1;
            }
            snapshots_checked
        }));
    }

    thread::sleep(Duration::from_millis(200));
    closing.store(true, AtomicOrdering::Relaxed);

    let appended = appender.join().expect("appender thread panicked");
    let mut snapshots_checked = 0u64;
    for reader in readers {
        snapshots_checked += reader.join().expect("reader thread panicked");
    }

    assert!(appended > 0, "appender made no progress");
    assert!(snapshots_checked > 0, "readers made no progress");
}

#[test]
fn read_runs_the_callback_over_a_snapshot() -> Result<(), QueueError> {
    let queue = Arc::new(SharedQueue::new());
    for v in &[2, 3, 5] {
        queue.append(*v)?;
    }

    let reader = QueueReader::open(queue);
    let mut sum = 0i64;
    let len = reader.read(
        &|values: &[i64], sum: &mut i64| {
            *sum += values.iter().sum::<i64>();
            values.len()
        },
        &mut sum,
    )?;

    assert_eq!(len, 3);
    assert_eq!(sum, 10);
    Ok(())
}

#[test]
fn print_to_writes_one_value_per_line() -> Result<(), QueueError> {
    let queue = Arc::new(SharedQueue::new());
    for v in &[7, -1, 0] {
        queue.append(*v)?;
    }

    let reader = QueueReader::open(queue);
    let mut out = Vec::new();
    reader.print_to(&mut out)?;

    assert_eq!(String::from_utf8(out).unwrap(), "7\n-1\n0\n");
    Ok(())
}

#[test]
fn initial_capacity_does_not_change_observable_state() -> Result<(), QueueError> {
    let queue = SharedQueue::with_config(&QueueConfig { initial_capacity: 0 });
    assert!(queue.is_empty()?);
    queue.append(9)?;
    assert_eq!(queue.snapshot()?.to_vec(), vec![9]);
    Ok(())
}
