use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use clap::{self, Parser};
use serde_derive::{Deserialize, Serialize};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

use cowq::reader::QueueReader;
use cowq::writer::{QueueWriter, WriterConfig};
use cowq::{QueueConfig, QueueError};

#[derive(clap::Parser)]
#[clap()]
struct Opts {
    #[clap(short = 'c', long = "config", default_value = "cowq-reader.toml")]
    config: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct BenchConfig {
    queue: QueueConfig,
    readers: usize,
    snapshots_per_reader: u64,
}

impl Default for BenchConfig {
    fn default() -> BenchConfig {
        BenchConfig {
            queue: QueueConfig::default(),
            readers: 2,
            snapshots_per_reader: 1_000_000,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let opts: Opts = Opts::parse();
    let cfg: BenchConfig = confy::load_path(&opts.config)?;
    println!("{:?}", &cfg);

    let closing = Arc::new(AtomicBool::new(false));
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    {
        let closing = Arc::clone(&closing);
        thread::spawn(move || {
            for _ in signals.forever() {
                closing.store(true, Ordering::SeqCst);
            }
        });
    }

    run(&cfg, &closing)
}

fn run(cfg: &BenchConfig, closing: &Arc<AtomicBool>) -> Result<(), Box<dyn Error>> {
    let writer = QueueWriter::new(&WriterConfig {
        queue: cfg.queue.clone(),
        ..WriterConfig::default()
    });
    let queue = writer.queue();

    // Keeps appending 0, 1, 2, ... until the readers are done, so every
    // snapshot a reader takes must be a clean prefix of the naturals.
    let writing = Arc::new(AtomicBool::new(true));
    let appender = {
        let writing = Arc::clone(&writing);
        let closing = Arc::clone(closing);
        thread::spawn(move || -> Result<u64, QueueError> {
            let mut next = 0i64;
            while writing.load(Ordering::Relaxed) && !closing.load(Ordering::Relaxed) {
                writer.append(next)?;
                next += 1;
            }
            Ok(next as u64)
        })
    };

    let start = Instant::now();
    let mut readers = Vec::with_capacity(cfg.readers);
    for reader_id in 0..cfg.readers {
        let reader = QueueReader::open(Arc::clone(&queue));
        let closing = Arc::clone(closing);
        let snapshots = cfg.snapshots_per_reader;
        readers.push(thread::spawn(move || -> Result<(u64, u64), QueueError> {
            let mut taken = 0u64;
            let mut inconsistent = 0u64;
            let mut prev_len = 0usize;
            while taken < snapshots && !closing.load(Ordering::Relaxed) {
                let snapshot = reader.snapshot()?;
                let n = snapshot.len();
                // Cheap endpoint checks each time, a full scan now and then.
                let mut ok = n >= prev_len;
                if n > 0 {
                    ok = ok && snapshot[0] == 0 && snapshot[n - 1] == (n - 1) as i64;
                }
                if taken % 10_000 == 0 {
                    ok = ok && snapshot.iter().enumerate().all(|(i, v)| *v == i as i64);
                }
                if !ok {
                    inconsistent += 1;
                }
                prev_len = n;
                taken += 1;
            }
            println!(
                "reader {} finished. snapshots: {}, inconsistent: {}",
                reader_id, taken, inconsistent
            );
            Ok((taken, inconsistent))
        }));
    }

    let mut taken = 0u64;
    let mut inconsistent = 0u64;
    for reader in readers {
        let (t, i) = reader.join().expect("reader thread panicked")?;
        taken += t;
        inconsistent += i;
    }
    let duration = start.elapsed();

    writing.store(false, Ordering::Relaxed);
    let appended = appender.join().expect("appender thread panicked")?;

    let iops = ((taken as f64) / (duration.as_millis() as f64)) * 1_000f64;
    println!(
        "{:#?}K snapshots/s, time: {:#?}, appends observed: {}",
        (iops / 1000f64) as u64,
        duration,
        appended
    );
    if inconsistent > 0 {
        eprintln!("{} inconsistent snapshots detected", inconsistent);
        std::process::exit(1);
    }
    Ok(())
}
