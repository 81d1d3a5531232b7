use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use clap::{self, Parser};
use serde_derive::{Deserialize, Serialize};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

use cowq::writer::{QueueWriter, WriterConfig};
use cowq::QueueError;

#[derive(clap::Parser)]
#[clap()]
struct Opts {
    #[clap(short = 'c', long = "config", default_value = "cowq-writer.toml")]
    config: String,
    #[clap(long = "verify")]
    verify: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct BenchConfig {
    writer: WriterConfig,
    appenders: usize,
    appends_per_appender: u64,
}

impl Default for BenchConfig {
    fn default() -> BenchConfig {
        BenchConfig {
            writer: WriterConfig::default(),
            appenders: 4,
            appends_per_appender: 1_000_000,
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

    let writer = Arc::new(QueueWriter::new(&cfg.writer));
    run(writer, &cfg, &closing, opts.verify)
}

fn run(
    writer: Arc<QueueWriter>,
    cfg: &BenchConfig,
    closing: &Arc<AtomicBool>,
    verify: bool,
) -> Result<(), Box<dyn Error>> {
    let appends = cfg.appends_per_appender;
    let start = Instant::now();

    let mut handles = Vec::with_capacity(cfg.appenders);
    for appender in 0..cfg.appenders {
        let writer = Arc::clone(&writer);
        let closing = Arc::clone(closing);
        handles.push(thread::spawn(move || -> Result<u64, QueueError> {
            let base = appender as u64 * appends;
            let mut written = 0u64;
            for k in 0..appends {
                if closing.load(Ordering::Relaxed) {
                    break;
                }
                writer.append((base + k) as i64)?;
                written += 1;
                if written % 1_000_000 == 0 {
                    eprint!("\rappender {}: {} ops", appender, written);
                }
            }
            Ok(written)
        }));
    }

    let mut total = 0u64;
    for handle in handles {
        total += handle.join().expect("appender thread panicked")?;
    }

    let duration = start.elapsed();
    let iops = ((total as f64) / (duration.as_millis() as f64)) * 1_000f64;
    println!(
        "\n{:#?}K appends/s, time: {:#?}",
        (iops / 1000f64) as u64,
        duration
    );

    if verify {
        let expected = cfg.appenders as u64 * appends;
        if total != expected {
            println!(
                "interrupted after {} of {} appends, skipping verification",
                total, expected
            );
            return Ok(());
        }
        let snapshot = writer.queue().snapshot()?;
        let mut values = snapshot.to_vec();
        values.sort_unstable();
        values.dedup();
        if snapshot.len() as u64 == expected && values.len() == snapshot.len() {
            println!("verified: {} appends, none lost, none duplicated", expected);
        } else {
            eprintln!(
                "verification failed: expected {} values, snapshot has {} ({} distinct)",
                expected,
                snapshot.len(),
                values.len()
            );
        }
    }
    Ok(())
}
