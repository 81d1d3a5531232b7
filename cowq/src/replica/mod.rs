#[cfg(feature = "replica_local")]
use std::fs::File;
#[cfg(any(feature = "replica_local", feature = "replica_tcp"))]
use std::io::{BufWriter, Write};
#[cfg(feature = "replica_tcp")]
use std::net::TcpStream;
#[cfg(any(feature = "replica_local", feature = "replica_tcp"))]
use std::sync::Mutex;

#[cfg(any(feature = "replica_local", feature = "replica_tcp"))]
use super::writer::AfterAppend;
use super::writer::{QueueWriter, WriterConfig};

#[cfg(not(feature = "replica_tcp"))]
pub const DEFAULT_TARGET: &str = "data/replica.log";
#[cfg(feature = "replica_tcp")]
pub const DEFAULT_TARGET: &str = "127.0.0.1:7878";

#[cfg(any(feature = "replica_local", feature = "replica_tcp"))]
pub struct Replica {
    #[cfg(feature = "replica_local")]
    pub writer: BufWriter<File>,
    #[cfg(feature = "replica_tcp")]
    pub writer: BufWriter<TcpStream>,
}

#[cfg(any(feature = "replica_local", feature = "replica_tcp"))]
impl AfterAppend for Replica {
    fn apply(&mut self, _position: usize, value: i64) -> () {
        writeln!(self.writer, "{}", value).unwrap();
    }
}

#[cfg(any(feature = "replica_local", feature = "replica_tcp"))]
impl Replica {
    #[cfg(feature = "replica_local")]
    pub fn new(target: &str) -> Box<Replica> {
        let inner = File::create(target).unwrap();
        Box::new(Replica {
            writer: BufWriter::new(inner),
        })
    }

    #[cfg(feature = "replica_tcp")]
    pub fn new(target: &str) -> Box<Replica> {
        let inner = TcpStream::connect(target).unwrap();
        Box::new(Replica {
            writer: BufWriter::new(inner),
        })
    }
}

#[cfg(any(feature = "replica_local", feature = "replica_tcp"))]
pub fn setup(writer: &mut QueueWriter, cfg: &WriterConfig) {
    writer
        .callback_after_append
        .push(Mutex::new(Replica::new(&cfg.replica_target)));
}

#[cfg(not(any(feature = "replica_local", feature = "replica_tcp")))]
pub fn setup(_writer: &mut QueueWriter, _cfg: &WriterConfig) {}
