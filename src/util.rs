use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Byte source that fingerprints everything read through it.
pub struct Fingerprint<R> {
    inner: R,
    hasher: Sha256,
    bytes: u64,
}

impl<R> Fingerprint<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            bytes: 0,
        }
    }

    /// Hex SHA-256 and length of the bytes consumed so far.
    pub fn finish(self) -> (String, u64) {
        (format!("{:x}", self.hasher.finalize()), self.bytes)
    }
}

impl<R: Read> Read for Fingerprint<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = self.inner.read(buf)?;
        self.hasher.update(&buf[..count]);
        self.bytes += count as u64;
        Ok(count)
    }
}

pub type WorkloadReader = BufReader<Fingerprint<File>>;

pub fn open_workload(path: &Path) -> Result<WorkloadReader> {
    let file = File::open(path)
        .with_context(|| format!("failed to open workload: {}", path.display()))?;
    Ok(BufReader::new(Fingerprint::new(file)))
}

/// Writes `value` as one compact JSON object followed by a newline.
pub fn write_json_line<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer(&mut *out, value).context("failed to serialize json line")?;
    out.write_all(b"\n").context("failed to write json line")?;
    Ok(())
}
