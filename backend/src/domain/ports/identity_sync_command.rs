//! Driving port applying verified identity events to the user projection.

use async_trait::async_trait;

use crate::domain::{SyncError, SyncOutcome, VerifiedEnvelope};

/// Domain use-case port invoked by the webhook adapter.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentitySyncCommand: Send + Sync {
    /// Apply one verified event. Safe to repeat and to receive out of order.
    async fn apply(&self, envelope: &VerifiedEnvelope) -> Result<SyncOutcome, SyncError>;
}
