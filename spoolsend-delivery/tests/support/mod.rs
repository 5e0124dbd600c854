//! Shared helpers for delivery integration tests
#![allow(dead_code, clippy::unwrap_used)]

pub mod mock_server;

use std::{
    fs,
    path::Path,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use spoolsend_delivery::{Receipt, Transport, TransportError};

/// Write a pending entry whose `Subject` is its id
pub fn spool(dir: &Path, id: &str) {
    fs::write(
        dir.join(format!("{id}.message")),
        format!("From: {id}@example.org\r\nTo: rcpt@example.com\r\nSubject: {id}\r\n\r\nbody\r\n"),
    )
    .unwrap();
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

/// What the scripted transport does for one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Accept,
    Reject(u16),
    Fail,
    Panic,
}

type Rule = Box<dyn Fn(&str) -> Script + Send + Sync>;

/// In-process transport answering per message subject
pub struct ScriptedTransport {
    rule: Rule,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    high_water: AtomicUsize,
    subjects: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(rule: impl Fn(&str) -> Script + Send + Sync + 'static) -> Self {
        Self {
            rule: Box::new(rule),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
            subjects: Mutex::new(Vec::new()),
        }
    }

    pub fn accepting() -> Self {
        Self::new(|_| Script::Accept)
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn high_water(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }

    pub fn subjects(&self) -> Vec<String> {
        let mut subjects = self.subjects.lock().unwrap().clone();
        subjects.sort();
        subjects
    }
}

fn subject(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .lines()
        .find_map(|line| line.strip_prefix("Subject: "))
        .unwrap_or_default()
        .trim()
        .to_string()
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn submit(&self, raw: &[u8]) -> Result<Receipt, TransportError> {
        let subject = subject(raw);
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.subjects.lock().unwrap().push(subject.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match (self.rule)(&subject) {
            Script::Accept => Ok(Receipt::new(200)),
            Script::Reject(status) => Ok(Receipt::new(status)),
            Script::Fail => Err(TransportError::Signing("scripted failure".to_string())),
            Script::Panic => panic!("scripted panic for {subject}"),
        }
    }
}
