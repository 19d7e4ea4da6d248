use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::cli::QueriesArgs;
use crate::commands::{emit_json_lines, log_workload, workload_or_usage};
use crate::generate::RandomTreeGenerator;
use crate::ingest::{build_metadata, load_metadata, log_metadata_summary, read_records};
use crate::model::{Metadata, Query};
use crate::util::open_workload;

pub fn run(args: QueriesArgs) -> Result<()> {
    let Some(path) = workload_or_usage(args.workload.as_deref(), "queries") else {
        return Ok(());
    };

    let config = args.generator_config();
    config.validate().context("invalid generator configuration")?;

    let mut reader = open_workload(path)?;
    let metadata: Metadata = if args.from_metadata {
        let metadata = load_metadata(&mut reader)?;
        info!(
            label_keys = metadata.labels.len(),
            metric_keys = metadata.metrics.len(),
            "loaded precomputed metadata"
        );
        metadata
    } else {
        let records = read_records(&mut reader)?;
        let metadata = build_metadata(&records);
        log_metadata_summary(records.len(), &metadata);
        metadata
    };
    log_workload(path, reader)?;

    let generator = RandomTreeGenerator::new(&config, &metadata);
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);

    let queries = (0..args.count)
        .map(|idx| -> Result<Query> {
            let condition = generator
                .generate(args.max_height, &mut rng)
                .with_context(|| format!("failed to generate query {idx}"))?;
            debug!(
                height = condition.height(),
                leaves = condition.leaf_count(),
                "generated condition"
            );
            Ok(Query::select(condition))
        })
        .collect::<Result<Vec<_>>>()?;

    emit_json_lines(&queries)?;
    info!(
        count = queries.len(),
        max_height = args.max_height,
        seed = args.seed,
        "generated random queries"
    );

    Ok(())
}
