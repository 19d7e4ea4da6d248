use anyhow::Result;

use crate::cli::MetadataArgs;
use crate::commands::{emit_json_lines, log_workload, workload_or_usage};
use crate::ingest::{build_metadata, log_metadata_summary, read_records};
use crate::util::open_workload;

pub fn run(args: MetadataArgs) -> Result<()> {
    let Some(path) = workload_or_usage(args.workload.as_deref(), "metadata") else {
        return Ok(());
    };

    let mut reader = open_workload(path)?;
    let records = read_records(&mut reader)?;
    log_workload(path, reader)?;
    let metadata = build_metadata(&records);
    log_metadata_summary(records.len(), &metadata);

    emit_json_lines(&[
        serde_json::to_value(&metadata.labels)?,
        serde_json::to_value(&metadata.metrics)?,
    ])
}
