//! Helpers shared by the end-to-end tests
#![allow(dead_code, clippy::unwrap_used)]

use std::{
    fs,
    path::Path,
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use spoolsend::Dispatcher;
use spoolsend_delivery::{Receipt, Transport, TransportError};

pub const MESSAGE: &str = "From: Sender <sender@example.org>\r\nTo: rcpt@example.com\r\nSubject: e2e\r\n\r\nbody\r\n";

pub fn config_ron(spool: &Path, lock_file: &Path) -> String {
    format!(
        r#"Dispatcher (
            spool: ( path: "{}" ),
            delivery: ( concurrency: 4 ),
            ses: (
                version: "latest",
                region: "eu-west-1",
                credentials: ( key: "AKIDEXAMPLE", secret: "secret" ),
                endpoint: Some("http://127.0.0.1:9/"),
                timeout_secs: 2,
            ),
            guard: ( lock_file: "{}" ),
        )"#,
        spool.display(),
        lock_file.display()
    )
}

pub fn dispatcher(spool: &Path, lock_file: &Path) -> Dispatcher {
    ron::from_str(&config_ron(spool, lock_file)).unwrap()
}

pub fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

/// File names currently in `dir`, sorted
pub fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Answers every submission with a fixed status
pub struct FixedTransport {
    status: u16,
    calls: AtomicUsize,
}

impl FixedTransport {
    pub const fn new(status: u16) -> Self {
        Self {
            status,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FixedTransport {
    async fn submit(&self, _raw: &[u8]) -> Result<Receipt, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Receipt::new(self.status))
    }
}
