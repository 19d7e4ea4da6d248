use std::collections::{BTreeMap, BTreeSet};
use std::io::BufRead;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::model::{LabelDomain, Metadata, MetricProfile, Record, WorkloadEvent};

/// Records sharing a shape key, in input order.
pub type SeriesIndex = BTreeMap<String, Vec<Record>>;

pub fn read_records<R: BufRead>(reader: R) -> Result<Vec<Record>> {
    let mut records = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.with_context(|| format!("failed to read workload line {line_no}"))?;
        let WorkloadEvent::Write(record) = serde_json::from_str::<WorkloadEvent>(&line)
            .with_context(|| format!("failed to parse workload line {line_no}"))?;
        records.push(record);
    }

    Ok(records)
}

#[derive(Debug, Default)]
struct MetadataAccumulator {
    labels: BTreeMap<String, BTreeSet<String>>,
    metrics: BTreeMap<String, MeanAccumulator>,
}

#[derive(Debug, Default)]
struct MeanAccumulator {
    sum: f64,
    count: usize,
}

impl MetadataAccumulator {
    fn accumulate(mut self, record: &Record) -> Self {
        for (key, value) in &record.labels {
            self.labels
                .entry(key.clone())
                .or_default()
                .insert(value.clone());
        }
        for (key, value) in &record.metrics {
            let acc = self.metrics.entry(key.clone()).or_default();
            acc.sum += value;
            acc.count += 1;
        }
        self
    }

    fn finish(self) -> Metadata {
        let labels: LabelDomain = self
            .labels
            .into_iter()
            .map(|(key, values)| (key, values.into_iter().collect()))
            .collect();
        // Every entry was created by an observation, so count is never zero.
        let metrics: MetricProfile = self
            .metrics
            .into_iter()
            .map(|(key, acc)| (key, acc.sum / acc.count as f64))
            .collect();

        Metadata { labels, metrics }
    }
}

pub fn build_metadata<'a, I>(records: I) -> Metadata
where
    I: IntoIterator<Item = &'a Record>,
{
    records
        .into_iter()
        .fold(MetadataAccumulator::default(), MetadataAccumulator::accumulate)
        .finish()
}

/// Sorted label keys each immediately followed by its value, then sorted
/// metric names. No separators.
pub fn shape_key(record: &Record) -> String {
    let mut key = String::new();
    for (label, value) in &record.labels {
        key.push_str(label);
        key.push_str(value);
    }
    for metric in record.metrics.keys() {
        key.push_str(metric);
    }
    key
}

pub fn build_series_index<I>(records: I) -> SeriesIndex
where
    I: IntoIterator<Item = Record>,
{
    records
        .into_iter()
        .fold(SeriesIndex::new(), |mut index, record| {
            index.entry(shape_key(&record)).or_default().push(record);
            index
        })
}

/// Reads back the two-line output of the `metadata` subcommand.
pub fn load_metadata<R: BufRead>(reader: R) -> Result<Metadata> {
    let mut lines = reader.lines();

    let labels_line = lines
        .next()
        .context("metadata is missing the labels line")?
        .context("failed to read metadata labels line")?;
    let metrics_line = lines
        .next()
        .context("metadata is missing the metrics line")?
        .context("failed to read metadata metrics line")?;

    if let Some(extra) = lines.next() {
        let extra = extra.context("failed to read metadata")?;
        if !extra.trim().is_empty() {
            bail!("metadata has unexpected content after the metrics line");
        }
    }

    let labels: LabelDomain =
        serde_json::from_str(&labels_line).context("failed to parse metadata labels line")?;
    let metrics: MetricProfile =
        serde_json::from_str(&metrics_line).context("failed to parse metadata metrics line")?;

    Ok(Metadata { labels, metrics })
}

pub fn log_metadata_summary(records: usize, metadata: &Metadata) {
    info!(
        records,
        label_keys = metadata.labels.len(),
        label_values = metadata.labels.values().map(Vec::len).sum::<usize>(),
        metric_keys = metadata.metrics.len(),
        "workload metadata extracted"
    );
}
