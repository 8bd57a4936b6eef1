use anyhow::{Context, Result};
use fieldscore::engine::{EngineState, EvaluationAggregator, EvaluatorConfig};
use fieldscore::{load_checkpoint, save_checkpoint, save_metrics};
use tracing::info;

use crate::cli::MergeArgs;

pub fn run(args: MergeArgs) -> Result<()> {
    let config = EvaluatorConfig::default().with_document_non_matches(false);
    let mut aggregator = EvaluationAggregator::new(args.schema.clone(), config.clone());

    // The first checkpoint seeds the state so its start time is kept.
    let mut seeded = false;
    for path in &args.checkpoints {
        let state: EngineState = load_checkpoint(path)
            .with_context(|| format!("failed to load checkpoint {}", path.display()))?;

        let combined = if seeded {
            aggregator.merge_state(&state)
        } else {
            seeded = true;
            aggregator.restore_state(state)
        };
        combined.with_context(|| format!("failed to combine checkpoint {}", path.display()))?;
    }

    save_checkpoint(&args.output, aggregator.state())
        .with_context(|| format!("failed to save checkpoint {}", args.output.display()))?;
    info!(
        inputs = args.checkpoints.len(),
        processed = aggregator.processed_count(),
        output = %args.output.display(),
        "merged checkpoints"
    );

    if let Some(report_path) = &args.report_out {
        let summary = aggregator.compute();
        save_metrics(report_path, &summary, &args.schema, &config)
            .with_context(|| format!("failed to save report {}", report_path.display()))?;
    }

    Ok(())
}
