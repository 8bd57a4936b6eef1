use anyhow::{Context, Result};
use fieldscore::matcher::{AssignmentMatcher, MatcherConfig};
use fieldscore::similarity::ExactMatch;
use serde_json::Value;
use tracing::info;

use crate::cli::MatchListsArgs;

pub fn run(args: MatchListsArgs) -> Result<()> {
    let left = serde_json::from_str::<Value>(&args.left).context("failed to parse --left JSON")?;
    let right =
        serde_json::from_str::<Value>(&args.right).context("failed to parse --right JSON")?;

    let config = MatcherConfig {
        match_threshold: args.threshold,
        normalize_values: !args.no_normalize,
        ..MatcherConfig::default()
    };
    let matcher = AssignmentMatcher::with_config(ExactMatch, config)
        .context("invalid matcher configuration")?;

    let metrics = matcher
        .calculate_metrics(&left, &right)
        .context("failed to match lists")?;
    info!(
        tp = metrics.tp,
        fp = metrics.fp,
        misses = metrics.r#fn,
        f1 = metrics.f1,
        "matched lists"
    );

    let rendered =
        serde_json::to_string_pretty(&metrics).context("failed to serialize list metrics")?;
    println!("{rendered}");
    Ok(())
}
