//! Helpers for building spool directories in tests
#![allow(dead_code, clippy::unwrap_used)]

use std::{
    fs,
    path::{Path, PathBuf},
};

/// A minimal message with a resolvable reverse path
pub fn message(from: &str) -> Vec<u8> {
    format!("From: {from}\r\nTo: rcpt@example.com\r\nSubject: test\r\n\r\nbody\r\n").into_bytes()
}

/// Write `count` pending entries named `m<n>.message`
pub fn populate(dir: &Path, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|n| {
            let path = dir.join(format!("m{n}.message"));
            fs::write(&path, message(&format!("sender{n}@example.org"))).unwrap();
            path
        })
        .collect()
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
