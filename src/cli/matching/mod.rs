//! Match command - runs demand patterns through the orchestrator

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use futures::future::join_all;
use serde_json::{json, Value};
use tracing::info;

use crate::config::AppConfig;
use crate::domain::demand::DemandPattern;
use crate::domain::matching::{MatchError, MatchOptions, MatchOutcome};
use crate::domain::retry::RetryPreset;
use crate::infrastructure::logging;
use crate::infrastructure::observability::{init_metrics, MetricsConfig};

#[derive(Args, Debug)]
pub struct MatchArgs {
    /// Demand pattern as inline JSON, or `@path` to read it from a file
    #[arg(long = "pattern", short = 'p', required = true)]
    pub patterns: Vec<String>,

    /// Serve candidates from a JSON fixture catalog instead of HTTP
    #[arg(long)]
    pub fixtures: Option<PathBuf>,

    /// Rate-limit identifier (defaults to the source name)
    #[arg(long)]
    pub identifier: Option<String>,

    /// Retry preset for these requests: standard, adaptive, aggressive, gentle
    #[arg(long)]
    pub retry_preset: Option<RetryPreset>,

    /// Print the Prometheus metrics snapshot to stderr when done
    #[arg(long)]
    pub print_metrics: bool,
}

/// Run the match command
pub async fn run(args: MatchArgs, config_file: Option<&str>) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load_from(config_file).context("Failed to load configuration")?;
    logging::init_logging(&config.logging);

    let metrics = init_metrics(&MetricsConfig {
        enabled: config.metrics.enabled || args.print_metrics,
    });

    let patterns = args
        .patterns
        .iter()
        .map(|arg| parse_pattern(arg))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let source = crate::build_candidate_source(&config, args.fixtures.as_deref())?;
    let orchestrator = crate::build_orchestrator(&config, source);

    let mut options = MatchOptions::new();
    if let Some(identifier) = &args.identifier {
        options = options.with_identifier(identifier.clone());
    }
    if let Some(preset) = args.retry_preset {
        options = options.with_retry(preset.config());
    }

    info!(patterns = patterns.len(), "Running match requests");

    let results = join_all(
        patterns
            .iter()
            .map(|pattern| orchestrator.match_with(pattern, &options)),
    )
    .await;

    let failures = results.iter().filter(|result| result.is_err()).count();
    let report: Vec<Value> = patterns
        .iter()
        .zip(&results)
        .map(|(pattern, result)| render_result(pattern, result))
        .collect();

    println!("{}", serde_json::to_string_pretty(&report)?);

    if args.print_metrics {
        if let Some(metrics) = &metrics {
            eprintln!("{}", metrics.render());
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} match requests failed", failures, results.len());
    }

    Ok(())
}

/// Parse a pattern argument: inline JSON or `@file`
pub fn parse_pattern(arg: &str) -> anyhow::Result<DemandPattern> {
    let json = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pattern file {}", path))?,
        None => arg.to_string(),
    };

    serde_json::from_str(&json).with_context(|| format!("Invalid demand pattern: {}", arg))
}

fn render_result(pattern: &DemandPattern, result: &Result<MatchOutcome, MatchError>) -> Value {
    match result {
        Ok(outcome) => {
            let mut value = json!({
                "pattern": pattern,
                "outcome": outcome.label(),
                "candidates": outcome.candidates(),
            });

            if let MatchOutcome::RateLimited { retry_after, .. } = outcome {
                value["retryAfterMs"] = json!(retry_after.as_millis() as u64);
            }

            value
        }
        Err(e) => json!({
            "pattern": pattern,
            "outcome": "error",
            "error": e.to_string(),
            "tryLater": e.is_try_later(),
            "stale": e.stale(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;
    use std::time::Duration;

    #[test]
    fn test_parse_inline_pattern() {
        let pattern =
            parse_pattern(r#"{"searchTerm": "laptop", "category": "electronics"}"#).unwrap();

        assert_eq!(pattern.search_term(), "laptop");
        assert_eq!(pattern.category(), "electronics");
    }

    #[test]
    fn test_parse_pattern_file() {
        let path = std::env::temp_dir().join(format!("pattern-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{"query": "desk", "category": "home"}"#).unwrap();

        let pattern = parse_pattern(&format!("@{}", path.display())).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(pattern.search_term(), "desk");
    }

    #[test]
    fn test_parse_invalid_pattern() {
        assert!(parse_pattern("not json").is_err());
        assert!(parse_pattern("@/nonexistent/pattern.json").is_err());
    }

    #[test]
    fn test_render_rate_limited() {
        let pattern = parse_pattern(r#"{"searchTerm": "laptop", "category": "e"}"#).unwrap();
        let outcome = Ok(MatchOutcome::RateLimited {
            stale: Vec::new(),
            retry_after: Duration::from_secs(30),
        });

        let value = render_result(&pattern, &outcome);

        assert_eq!(value["outcome"], "rate_limited");
        assert_eq!(value["retryAfterMs"], 30_000);
    }

    #[test]
    fn test_render_error() {
        let pattern = parse_pattern(r#"{"searchTerm": "laptop", "category": "e"}"#).unwrap();
        let result = Err(MatchError::RetriesExhausted {
            attempts: 3,
            source: DomainError::http(503, "down"),
            stale: Vec::new(),
        });

        let value = render_result(&pattern, &result);

        assert_eq!(value["outcome"], "error");
        assert_eq!(value["tryLater"], true);
        assert_eq!(value["stale"], json!([]));
    }
}
