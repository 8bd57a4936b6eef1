use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn utc_compact_string(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Seconds elapsed since `start`, never negative.
pub fn seconds_since(start: DateTime<Utc>) -> f64 {
    let elapsed = Utc::now().signed_duration_since(start);
    (elapsed.num_milliseconds() as f64 / 1000.0).max(0.0)
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|err| Error::io("create directory", path, err))
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_directory(parent),
        _ => Ok(()),
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;

    let data = serde_json::to_vec_pretty(value)
        .map_err(|err| Error::json(format!("serialize json: {}", path.display()), err))?;

    let mut file = File::create(path).map_err(|err| Error::io("create json file", path, err))?;
    file.write_all(&data)
        .map_err(|err| Error::io("write json file", path, err))?;
    file.write_all(b"\n")
        .map_err(|err| Error::io("finalize json file", path, err))?;

    Ok(())
}

/// Appends `value` as one compact JSON line; never truncates.
pub fn append_json_line<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;

    let mut line = serde_json::to_vec(value)
        .map_err(|err| Error::json(format!("serialize json line: {}", path.display()), err))?;
    line.push(b'\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| Error::io("open for append", path, err))?;
    file.write_all(&line)
        .map_err(|err| Error::io("append to", path, err))?;

    Ok(())
}

pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|err| Error::io("read", path, err))
}
