//! Handler functions for the snapshot commands.
//!
//! Each handler loads what it needs and returns the text to print; the
//! caller decides where it goes.

use crate::cli::QueryArgs;
use crate::config::LoradexConfig;
use loradex_core::{Error, Result, Value, row_to_json};
use loradex_retrieval::{ConfigOverrides, FixedQueryEncoder, RetrievalEngine, VectorScorer};
use loradex_store::{RecordStore, copy_snapshot};
use serde_json::json;
use std::path::Path;

// ============================================================================
// Command handlers
// ============================================================================

/// `loradex stats`: columns, record counts, dimensions, metric ranges.
pub fn cmd_stats(snapshot: &Path) -> Result<String> {
    let store = RecordStore::load(snapshot)?;
    let stats = store.stats();
    if !stats.duplicate_keys.is_empty() {
        log::warn!(
            "{} key(s) are held by more than one row",
            stats.duplicate_keys.len()
        );
    }
    let out = json!({
        "snapshot": snapshot.display().to_string(),
        "columns": store.columns(),
        "invalid": stats.invalid(),
        "stats": stats,
    });
    Ok(serde_json::to_string_pretty(&out)?)
}

/// `loradex show`: one record by key, or the first match on `column`.
pub fn cmd_show(snapshot: &Path, key: &str, column: Option<&str>) -> Result<String> {
    let store = RecordStore::load(snapshot)?;
    let record = match column {
        None => store.get(parse_key(key)?)?,
        Some(column) => store.get_by(column, parse_cell(key))?,
    };
    let out = json!({
        "key": record.key,
        "complete": record.vector.is_some(),
        "row": row_to_json(&record.row),
    });
    Ok(serde_json::to_string_pretty(&out)?)
}

/// `loradex query`: rank the snapshot against a literal vector.
///
/// Flags override the configured parameters, metric and device.
pub fn cmd_query(config: &LoradexConfig, args: QueryArgs) -> Result<String> {
    let mut params = config.params.clone();
    if let Some(top_k) = args.top_k {
        params = params.with_top_k(top_k);
    }
    if let Some(max_strength) = args.max_strength {
        params = params.with_max_strength(max_strength);
    }
    if let Some(min_consistency) = args.min_consistency {
        params = params.with_min_consistency(min_consistency);
    }
    params.validate()?;
    if args.vector.is_empty() {
        return Err(Error::validation("--vector must hold at least one value"));
    }

    let retrieval = config.retrieval.with_overrides(ConfigOverrides {
        device: args.device,
        ..ConfigOverrides::new()
    });
    let metric = args.metric.unwrap_or(config.scoring.metric);
    let engine = RetrievalEngine::new(VectorScorer::new(
        FixedQueryEncoder::new(args.vector),
        metric,
    ))
    .with_config(retrieval);

    let store = RecordStore::load(&args.snapshot)?;
    let results = engine.retrieve(&store, &args.query, &params)?;
    log::info!(
        "{} result(s) from {} record(s)",
        results.len(),
        store.len()
    );

    let out = json!({
        "query": args.query,
        "metric": metric.to_string(),
        "device": engine.config().device(),
        "params": params,
        "results": results.iter().map(|r| r.to_json()).collect::<Vec<_>>(),
    });
    Ok(serde_json::to_string_pretty(&out)?)
}

/// `loradex copy`: copy a snapshot, keeping an existing destination unless forced.
pub fn cmd_copy(src: &Path, dest: &Path, force: bool) -> Result<String> {
    if dest.exists() && !force {
        log::info!(
            "{} already exists; pass --force to overwrite",
            dest.display()
        );
    }
    let dest = copy_snapshot(src, dest, force)?;
    Ok(dest.display().to_string())
}

// ============================================================================
// Argument helpers
// ============================================================================

fn parse_key(key: &str) -> Result<i64> {
    key.trim()
        .parse()
        .map_err(|_| Error::validation(format!("key must be an integer, got '{key}'")))
}

/// Interpret a lookup value: integer, then float, then text.
fn parse_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        Value::Int(v)
    } else if let Ok(v) = trimmed.parse::<f64>() {
        Value::Float(v)
    } else {
        Value::Str(raw.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
