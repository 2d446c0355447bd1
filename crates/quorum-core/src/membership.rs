//! Membership facts and the admission rules applied by `join`.
//!
//! The store gathers an [`AdmissionSnapshot`] while holding the post's write
//! lock and asks [`decide`] what to do; the rules themselves live here so
//! every backend enforces them identically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// A durable record that `member_id` was admitted to `post_id`.
/// At most one exists per (post, member) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
  pub post_id:   Uuid,
  pub member_id: Uuid,
  pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStatus {
  Joined,
  AlreadyJoined,
}

/// Result of a successful or idempotent `join`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinOutcome {
  pub outcome:   JoinStatus,
  pub closed:    bool,
  pub remaining: u32,
}

impl JoinOutcome {
  /// Outcome after the member count reached `count` against `target`.
  pub fn after(outcome: JoinStatus, target: u32, count: u32) -> Self {
    Self {
      outcome,
      closed: count >= target,
      remaining: target.saturating_sub(count),
    }
  }
}

/// What the store observed under the lock, in protocol order.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionSnapshot {
  pub closed:         bool,
  pub target_count:   Option<u32>,
  pub already_member: bool,
  pub member_count:   u32,
}

/// What the store must do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
  /// Insert a membership fact; the post closes if the count reaches `target`.
  Admit { target: u32 },
  /// The caller already holds a fact; nothing changes.
  AlreadyJoined { target: u32 },
}

/// Apply the admission rules for `post_id`.
pub fn decide(post_id: Uuid, snap: &AdmissionSnapshot) -> Result<Admission> {
  let target = match snap.target_count {
    Some(t) if t > 0 => t,
    _ => return Err(Error::NotJoinable(post_id)),
  };
  if snap.closed {
    return Err(Error::RoomFull(post_id));
  }
  if snap.already_member {
    return Ok(Admission::AlreadyJoined { target });
  }
  if snap.member_count >= target {
    return Err(Error::RoomFull(post_id));
  }
  Ok(Admission::Admit { target })
}
