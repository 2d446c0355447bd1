//! Comments and votes. Both sit behind the visibility gate like every other
//! path that touches a post.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, experiment::non_blank};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
  pub comment_id: Uuid,
  pub post_id:    Uuid,
  pub author_id:  Uuid,
  pub body:       String,
  pub created_at: DateTime<Utc>,
}

/// Trim a comment body, rejecting blank input.
pub fn comment_body(raw: String) -> Result<String> {
  non_blank(raw).ok_or_else(|| Error::invalid("comment body is required"))
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum VoteDirection {
  Up,
  Down,
  /// Withdraw a previous vote.
  Clear,
}

impl VoteDirection {
  pub fn parse(raw: &str) -> Result<Self> {
    raw
      .trim()
      .parse::<Self>()
      .map_err(|_| Error::invalid(format!("unrecognized vote: {raw:?}")))
  }

  /// The stored value, or `None` when the vote is withdrawn.
  pub fn value(self) -> Option<i64> {
    match self {
      Self::Up => Some(1),
      Self::Down => Some(-1),
      Self::Clear => None,
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
  pub up:    u32,
  pub down:  u32,
  pub score: i64,
}
