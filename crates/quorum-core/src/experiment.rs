//! The collaborative experiment log embedded in every post.
//!
//! The log is owned by the post row and always replaced whole: a mutation
//! reads the full list, applies one [`ExperimentOp`] with [`apply_op`], and
//! writes the list back inside the same transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExperimentStatus {
  #[default]
  Draft,
  Running,
  Done,
  Blocked,
}

impl ExperimentStatus {
  /// Parse a caller-supplied status, rejecting anything outside the fixed set.
  pub fn parse(raw: &str) -> Result<Self> {
    raw
      .trim()
      .parse::<Self>()
      .map_err(|_| Error::invalid(format!("unrecognized status: {raw:?}")))
  }
}

// ─── Entry ───────────────────────────────────────────────────────────────────

/// One entry in a room's experiment log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiment {
  pub experiment_id: Uuid,
  pub question:      String,
  pub setup:         Option<String>,
  pub metrics:       Option<String>,
  pub observations:  Option<String>,
  pub next_step:     Option<String>,
  pub status:        ExperimentStatus,
  /// The member who last wrote this entry.
  pub author_id:     Uuid,
  pub updated_at:    DateTime<Utc>,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Fields for a new entry. Everything is optional at the type level so that a
/// missing question or an unknown status is reported by [`apply_op`] as
/// [`Error::InvalidInput`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewExperiment {
  pub question:     Option<String>,
  pub setup:        Option<String>,
  pub metrics:      Option<String>,
  pub observations: Option<String>,
  pub next_step:    Option<String>,
  /// Defaults to `draft` when absent.
  pub status:       Option<String>,
}

/// A partial update. Absent fields are left alone; a blank optional text
/// field clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExperimentPatch {
  pub experiment_id: Option<Uuid>,
  pub question:      Option<String>,
  pub setup:         Option<String>,
  pub metrics:       Option<String>,
  pub observations:  Option<String>,
  pub next_step:     Option<String>,
  pub status:        Option<String>,
}

/// A single document mutation.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ExperimentOp {
  Append(NewExperiment),
  Update(ExperimentPatch),
}

// ─── Application ─────────────────────────────────────────────────────────────

/// Apply `op` to `log` on behalf of `member_id` and return the written entry.
///
/// On error `log` is left untouched.
pub fn apply_op(
  log: &mut Vec<Experiment>,
  op: ExperimentOp,
  member_id: Uuid,
  post_id: Uuid,
  now: DateTime<Utc>,
) -> Result<Experiment> {
  match op {
    ExperimentOp::Append(input) => {
      let question = input
        .question
        .and_then(non_blank)
        .ok_or_else(|| Error::invalid("question is required"))?;
      let status = input
        .status
        .as_deref()
        .map(ExperimentStatus::parse)
        .transpose()?
        .unwrap_or_default();

      let entry = Experiment {
        experiment_id: Uuid::new_v4(),
        question,
        setup: input.setup.and_then(non_blank),
        metrics: input.metrics.and_then(non_blank),
        observations: input.observations.and_then(non_blank),
        next_step: input.next_step.and_then(non_blank),
        status,
        author_id: member_id,
        updated_at: now,
      };
      log.push(entry.clone());
      Ok(entry)
    }
    ExperimentOp::Update(patch) => {
      let experiment_id = patch
        .experiment_id
        .ok_or_else(|| Error::invalid("experiment_id is required for update"))?;

      // Validate everything before touching the entry.
      let question = patch
        .question
        .map(|q| non_blank(q).ok_or_else(|| Error::invalid("question cannot be blank")))
        .transpose()?;
      let status = patch
        .status
        .as_deref()
        .map(ExperimentStatus::parse)
        .transpose()?;

      // A missing entry is reported the same way as a hidden post.
      let entry = log
        .iter_mut()
        .find(|e| e.experiment_id == experiment_id)
        .ok_or(Error::NotFound(post_id))?;

      if let Some(q) = question {
        entry.question = q;
      }
      if let Some(v) = patch.setup {
        entry.setup = non_blank(v);
      }
      if let Some(v) = patch.metrics {
        entry.metrics = non_blank(v);
      }
      if let Some(v) = patch.observations {
        entry.observations = non_blank(v);
      }
      if let Some(v) = patch.next_step {
        entry.next_step = non_blank(v);
      }
      if let Some(s) = status {
        entry.status = s;
      }
      entry.author_id = member_id;
      entry.updated_at = now;
      Ok(entry.clone())
    }
  }
}

/// Trim `value`, mapping blank input to `None`.
pub(crate) fn non_blank(value: String) -> Option<String> {
  let trimmed = value.trim();
  (!trimmed.is_empty()).then(|| trimmed.to_owned())
}
