use std::path::Path;

use anyhow::Context;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;

use crate::{
    aggregate::zones::ZoneScoreRecord,
    foundation::error::{StrokemapError, StrokemapResult},
    pipeline::trial::{ScoringContext, process_strokes, process_trial},
    strokes::model::strokes_from_value,
};

const PAINT_TRIAL_TYPE: &str = "paint";

/// Stroke payload as found in a trial record: usually a JSON-encoded string, sometimes inline.
#[derive(Clone, Debug, PartialEq)]
pub enum StrokePayload {
    Encoded(String),
    Inline(Value),
}

/// One paint trial ready for scoring.
#[derive(Clone, Debug, PartialEq)]
pub struct PaintTrial {
    pub trial_id: String,
    pub strokes: StrokePayload,
}

/// Which trial fields make up the artifact/result identifier.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TrialIdFields {
    /// `participant_id`, falling back to `participant`.
    #[default]
    Participant,
    /// Values of these fields joined with `_`.
    Fields(Vec<String>),
}

impl TrialIdFields {
    fn resolve(&self, trial: &Value, index: usize) -> StrokemapResult<String> {
        match self {
            Self::Participant => ["participant_id", "participant"]
                .iter()
                .find_map(|f| scalar_field(trial, f))
                .ok_or_else(|| {
                    StrokemapError::validation(format!(
                        "trial {index}: no 'participant_id' or 'participant' field"
                    ))
                }),
            Self::Fields(fields) => {
                let parts = fields
                    .iter()
                    .map(|f| {
                        scalar_field(trial, f).ok_or_else(|| {
                            StrokemapError::validation(format!("trial {index}: no '{f}' field"))
                        })
                    })
                    .collect::<StrokemapResult<Vec<_>>>()?;
                Ok(parts.join("_"))
            }
        }
    }
}

fn scalar_field(trial: &Value, field: &str) -> Option<String> {
    match trial.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read paint trials from an experiment data file.
pub fn read_trials(path: &Path, ids: &TrialIdFields) -> StrokemapResult<Vec<PaintTrial>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("open experiment data '{}'", path.display()))?;
    parse_trials(&text, ids)
}

/// Extract paint trials from experiment data.
///
/// Accepts a single JSON array of trial objects, or JSON lines where each line holds an array
/// of trials (or one trial object). Trials of other types are skipped, and so are paint trials
/// whose id fields are missing (with a warning), so the rest of the file is still scored.
pub fn parse_trials(text: &str, ids: &TrialIdFields) -> StrokemapResult<Vec<PaintTrial>> {
    let records: Vec<Value> = match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => items,
        Ok(other) => vec![other],
        Err(_) => {
            let mut items = Vec::new();
            for (n, line) in text.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Value>(line).map_err(|e| {
                    StrokemapError::serde(format!("experiment data line {}: {e}", n + 1))
                })? {
                    Value::Array(batch) => items.extend(batch),
                    other => items.push(other),
                }
            }
            items
        }
    };

    let mut trials = Vec::new();
    let mut skipped = 0usize;
    for (index, record) in records.iter().enumerate() {
        if record.get("trial_type").and_then(Value::as_str) != Some(PAINT_TRIAL_TYPE) {
            continue;
        }
        let trial_id = match ids.resolve(record, index) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(index, error = %e, "paint trial without id skipped");
                skipped += 1;
                continue;
            }
        };
        let strokes = match record.get("strokes") {
            Some(Value::String(s)) => StrokePayload::Encoded(s.clone()),
            Some(Value::Null) | None => StrokePayload::Inline(Value::Array(Vec::new())),
            Some(other) => StrokePayload::Inline(other.clone()),
        };
        trials.push(PaintTrial { trial_id, strokes });
    }
    tracing::debug!(
        records = records.len(),
        paint = trials.len(),
        skipped,
        "trials read"
    );
    Ok(trials)
}

/// Scoring result for one trial; failures are kept per trial instead of aborting the batch.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrialOutcome {
    pub trial_id: String,
    #[serde(flatten)]
    pub result: TrialResult,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialResult {
    Scores(ZoneScoreRecord),
    Error(String),
}

impl TrialOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self.result, TrialResult::Scores(_))
    }
}

#[derive(Clone, Debug, Default)]
/// Parallelism controls for batch scoring.
pub struct BatchOpts {
    /// Score distinct trials on a rayon pool when `true`.
    pub parallel: bool,
    /// Optional explicit worker thread count.
    pub threads: Option<usize>,
}

/// Score every trial, returning outcomes in input order.
#[tracing::instrument(skip(ctx, trials), fields(trials = trials.len()))]
pub fn score_trials(
    ctx: &ScoringContext,
    trials: &[PaintTrial],
    opts: &BatchOpts,
) -> StrokemapResult<Vec<TrialOutcome>> {
    let outcomes: Vec<TrialOutcome> = if opts.parallel {
        let pool = build_thread_pool(opts.threads)?;
        pool.install(|| trials.par_iter().map(|t| score_one(ctx, t)).collect())
    } else {
        trials.iter().map(|t| score_one(ctx, t)).collect()
    };

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    tracing::info!(
        scored = outcomes.len() - failed,
        failed,
        "batch finished"
    );
    Ok(outcomes)
}

fn score_one(ctx: &ScoringContext, trial: &PaintTrial) -> TrialOutcome {
    let result = match &trial.strokes {
        StrokePayload::Encoded(json) => process_trial(ctx, json, &trial.trial_id),
        StrokePayload::Inline(value) => strokes_from_value(value.clone())
            .and_then(|strokes| process_strokes(ctx, &strokes, &trial.trial_id)),
    };
    let result = match result {
        Ok(record) => TrialResult::Scores(record),
        Err(e) => {
            tracing::warn!(trial_id = %trial.trial_id, error = %e, "trial failed");
            TrialResult::Error(e.to_string())
        }
    };
    TrialOutcome {
        trial_id: trial.trial_id.clone(),
        result,
    }
}

fn build_thread_pool(threads: Option<usize>) -> StrokemapResult<rayon::ThreadPool> {
    if threads == Some(0) {
        return Err(StrokemapError::validation(
            "batch 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| StrokemapError::validation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/batch.rs"]
mod tests;
