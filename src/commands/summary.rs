use anyhow::{Context, Result};
use fieldscore::engine::{EvaluationAggregator, EvaluatorConfig};
use fieldscore::{load_checkpoint, render_summary};
use tracing::info;

use crate::cli::SummaryArgs;

pub fn run(args: SummaryArgs) -> Result<()> {
    info!(checkpoint = %args.checkpoint.display(), "summary requested");

    let state = load_checkpoint(&args.checkpoint)
        .with_context(|| format!("failed to load checkpoint {}", args.checkpoint.display()))?;
    let target_schema = state.target_schema.clone();

    let config = EvaluatorConfig::default().with_document_non_matches(false);
    let mut aggregator = EvaluationAggregator::new(target_schema.clone(), config.clone());
    aggregator
        .restore_state(state)
        .context("failed to restore checkpoint state")?;

    let summary = aggregator.current_summary();
    info!(
        target_schema = %target_schema,
        documents = summary.document_count,
        errors = summary.errors.len(),
        "loaded checkpoint"
    );

    println!("{}", render_summary(&summary, &target_schema, &config));
    Ok(())
}
