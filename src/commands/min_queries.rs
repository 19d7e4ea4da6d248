use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::cli::MinQueriesArgs;
use crate::commands::{emit_json_lines, log_workload, workload_or_usage};
use crate::generate::ShapeKeyedMinGenerator;
use crate::ingest::{build_series_index, read_records};
use crate::model::Query;
use crate::util::open_workload;

pub fn run(args: MinQueriesArgs) -> Result<()> {
    let Some(path) = workload_or_usage(args.workload.as_deref(), "min-queries") else {
        return Ok(());
    };

    let mut reader = open_workload(path)?;
    let records = read_records(&mut reader)?;
    log_workload(path, reader)?;
    let record_count = records.len();
    let index = build_series_index(records);
    info!(
        records = record_count,
        series = index.len(),
        "workload series indexed"
    );

    let generator = ShapeKeyedMinGenerator::new(&index);
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);

    let mut queries = Vec::with_capacity(args.count);
    for idx in 0..args.count {
        let generated = generator
            .generate(&mut rng)
            .with_context(|| format!("failed to generate query {idx}"))?;
        debug!(
            shape_key = %generated.shape_key,
            witness_labels = generated.witness.labels.len(),
            witness_metrics = generated.witness.metrics.len(),
            "picked witness series"
        );
        queries.push(Query::select(generated.condition));
    }

    emit_json_lines(&queries)?;
    info!(count = queries.len(), seed = args.seed, "generated minimum queries");

    Ok(())
}
