use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::util::{WorkloadReader, write_json_line};

pub mod metadata;
pub mod min_queries;
pub mod queries;

/// Prints the usage line when no workload was given. A missing workload is
/// not a failure: the process still exits with status 0.
fn workload_or_usage<'a>(workload: Option<&'a Path>, subcommand: &str) -> Option<&'a Path> {
    if workload.is_none() {
        println!("Usage: workgen {subcommand} <workload filename>");
    }
    workload
}

/// Consumes whatever the parser left unread and logs the workload fingerprint.
fn log_workload(path: &Path, mut reader: WorkloadReader) -> Result<()> {
    io::copy(&mut reader, &mut io::sink())
        .with_context(|| format!("failed to read workload: {}", path.display()))?;
    let (sha256, bytes) = reader.into_inner().finish();
    info!(path = %path.display(), sha256 = %sha256, bytes, "read workload");
    Ok(())
}

/// Writes every item as one JSON line to stdout, only after all of them exist.
fn emit_json_lines<T: Serialize>(items: &[T]) -> Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for item in items {
        write_json_line(&mut out, item)?;
    }
    out.flush().context("failed to flush stdout")?;
    Ok(())
}
