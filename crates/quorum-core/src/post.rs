//! Post — the joinable record whose visibility flips from open to closed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, experiment::{Experiment, non_blank}};

/// The read model for a post, as returned through the visibility gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
  pub post_id:      Uuid,
  pub author_id:    Uuid,
  pub title:        String,
  pub body:         String,
  pub created_at:   DateTime<Utc>,
  /// Monotonic: once `true` it never reverts.
  pub closed:       bool,
  /// Membership count at which the post closes. `None` means not joinable.
  pub target_count: Option<u32>,
  /// Admitted members, creator included. Computed on read.
  pub member_count: u32,
  pub experiments:  Vec<Experiment>,
}

impl Post {
  pub fn is_joinable(&self) -> bool { self.target_count.is_some_and(|c| c > 0) }

  /// Seats left before the post closes.
  pub fn remaining(&self) -> u32 {
    self
      .target_count
      .map_or(0, |c| c.saturating_sub(self.member_count))
  }
}

/// Input to [`crate::store::PostStore::create_post`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
  pub author_id:    Uuid,
  pub title:        String,
  #[serde(default)]
  pub body:         String,
  /// Request joinability by supplying a positive target.
  pub target_count: Option<u32>,
}

impl NewPost {
  pub fn new(author_id: Uuid, title: impl Into<String>) -> Self {
    Self {
      author_id,
      title: title.into(),
      body: String::new(),
      target_count: None,
    }
  }

  pub fn joinable(mut self, target_count: u32) -> Self {
    self.target_count = Some(target_count);
    self
  }

  /// Check the input and normalise the title.
  pub fn validate(mut self) -> Result<Self> {
    self.title = non_blank(self.title).ok_or_else(|| Error::invalid("title is required"))?;
    if self.target_count == Some(0) {
      return Err(Error::invalid("target_count must be a positive integer"));
    }
    Ok(self)
  }

  /// Whether the creator alone already meets the target.
  pub fn closes_on_creation(&self) -> bool { self.target_count.is_some_and(|c| c <= 1) }
}
