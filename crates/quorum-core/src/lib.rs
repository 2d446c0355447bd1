//! Core types and trait definitions for Quorum.
//!
//! A post starts open and becomes a closed, member-only room once enough
//! people have joined it. This crate holds the domain model, validation rules,
//! and the [`store::PostStore`] abstraction; it has no HTTP or database
//! dependencies.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod experiment;
pub mod membership;
pub mod post;
pub mod social;
pub mod store;

pub use error::{Error, ErrorClass, Result};
