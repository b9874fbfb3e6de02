//! Scheduled cleanup of stale triage data.
//!
//! This module provides a background worker that periodically deletes
//! inbox rows whose `date_added` has fallen behind the configured maximum
//! age. Deletion is batched to avoid long-running transactions and
//! supports dry-run mode for testing cleanup policies.

pub mod entities;
mod purge;
mod worker;

pub use worker::start_cleanup_worker;
