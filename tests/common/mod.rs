#![allow(dead_code)]

use std::{
    io,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use psxcore::memory::BIOS_SIZE;
use tracing_subscriber::fmt;

#[ctor::ctor]
fn init() {
    let fmt_subscriber = fmt::Subscriber::builder()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(fmt_subscriber)
        .expect("Unable to set global tracing subscriber");
}

#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .map(|line| line.trim().to_string())
            .collect()
    }
}

/// Runs `f` with a thread-local subscriber recording events at `level` and
/// above, returning its result and the plain message lines.
pub fn capture_logs<R>(level: tracing::Level, f: impl FnOnce() -> R) -> (R, Vec<String>) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = fmt::Subscriber::builder()
        .with_max_level(level)
        .with_ansi(false)
        .without_time()
        .with_level(false)
        .with_target(false)
        .with_writer(move || writer.clone())
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    (result, logs.lines())
}

/// A recognisable BIOS image: every word holds its own offset.
pub fn bios_image() -> Vec<u8> {
    let mut image = vec![0u8; BIOS_SIZE];
    for (i, chunk) in image.chunks_exact_mut(4).enumerate() {
        chunk.copy_from_slice(&((i * 4) as u32).to_le_bytes());
    }
    image
}

pub fn write_temp_file(name: &str, data: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("psxcore-{}-{}", std::process::id(), name));
    std::fs::write(&path, data).unwrap();
    path
}
