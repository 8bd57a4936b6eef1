use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use fieldscore::engine::{DocumentOutcome, EvaluationAggregator, EvaluatorConfig};
use fieldscore::results_log::read_results;
use fieldscore::util::utc_compact_string;
use fieldscore::{render_summary, save_checkpoint, save_metrics};
use tracing::info;

use crate::cli::ReplayArgs;

pub fn run(args: ReplayArgs) -> Result<()> {
    let entries = read_results(&args.log)
        .with_context(|| format!("failed to load results log {}", args.log.display()))?;

    let config = EvaluatorConfig::default().with_document_non_matches(!args.no_non_matches);
    let mut aggregator = EvaluationAggregator::new(args.schema.clone(), config.clone());

    let mut accumulated = 0_usize;
    for entry in entries {
        if aggregator.ingest(&entry.doc_id, Ok(entry.comparison_result))
            == DocumentOutcome::Accumulated
        {
            accumulated += 1;
        }
    }
    info!(
        log = %args.log.display(),
        accumulated,
        target_schema = %args.schema,
        "replayed results log"
    );

    let checkpoint_path = args
        .checkpoint_out
        .unwrap_or_else(|| default_checkpoint_path(&args.log));
    save_checkpoint(&checkpoint_path, aggregator.state())
        .with_context(|| format!("failed to save checkpoint {}", checkpoint_path.display()))?;

    let summary = aggregator.compute();
    if let Some(report_path) = &args.report_out {
        save_metrics(report_path, &summary, &args.schema, &config)
            .with_context(|| format!("failed to save report {}", report_path.display()))?;
    }

    println!("{}", render_summary(&summary, &args.schema, &config));
    Ok(())
}

fn default_checkpoint_path(log: &Path) -> PathBuf {
    let name = format!("checkpoint-{}.json", utc_compact_string(Utc::now()));
    match log.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}
