// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error taxonomy for the forumbridge sync engine.
//!
//! Every adapter and engine operation returns [`SyncError`]. The
//! [`SyncError::scope`] classification decides how far a failure reaches:
//! a single entity, the owning space, or the whole pass.

use std::time::Duration;

use thiserror::Error;

use crate::types::MappingKind;

/// How far a failure is allowed to propagate inside a sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureScope {
    /// Abort only the entity being processed; siblings continue.
    Entity,
    /// Abort the owning space; other spaces continue.
    Space,
    /// Abort the whole pass (credentials revoked, store unavailable).
    Pass,
}

/// The primary error type used across all forumbridge traits and engine operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration errors (invalid TOML, missing credentials, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Mapping store errors (connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An insert lost the race for an origin ID. `existing` is the winner's
    /// destination ID, which the caller should adopt.
    #[error("{kind} mapping for {origin_id} already exists (-> {existing})")]
    MappingConflict {
        kind: MappingKind,
        origin_id: String,
        existing: String,
    },

    /// Timeouts, connection resets, 5xx responses. Retryable.
    #[error("transient remote error: {message}")]
    TransientRemote {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The remote platform asked us to slow down. Retryable.
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// 4xx validation failures and other responses that will not succeed on retry.
    #[error("remote rejected request: {message}")]
    PermanentRemote { message: String },

    /// The remote resource does not exist.
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// The remote resource already exists (e.g. a taken username).
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Credentials rejected by the remote platform.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// The origin reported a space type we do not know how to route.
    #[error("cannot classify space {space_id}: unknown type {space_type:?}")]
    Classification {
        space_id: String,
        space_type: String,
    },

    /// Automated accounts never get destination users.
    #[error("participant {participant_id} is an automated account")]
    NonSyncableParticipant { participant_id: String },

    /// No handle can be derived from the participant's display name.
    #[error("cannot derive a handle for participant {participant_id} from {display_name:?}")]
    UnresolvableIdentity {
        participant_id: String,
        display_name: String,
    },

    /// Every candidate handle up to the attempt limit is taken.
    #[error("no free handle for {base} after {attempts} attempts")]
    IdentityExhausted { base: String, attempts: u32 },

    /// A space-level abort wrapping its cause.
    #[error("sync of space {space_id} failed: {source}")]
    SpaceSyncFailed {
        space_id: String,
        source: Box<SyncError>,
    },

    /// An inbound notification failed boundary validation.
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Returns true if retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SyncError::TransientRemote { .. }
                | SyncError::RateLimited { .. }
                | SyncError::Timeout { .. }
        )
    }

    /// Returns how far this failure propagates when it escapes an entity.
    ///
    /// Transient errors reaching this point have already exhausted their
    /// retries, so they abort the owning space.
    pub fn scope(&self) -> FailureScope {
        match self {
            SyncError::Unauthorized { .. } | SyncError::Storage { .. } | SyncError::Config(_) => {
                FailureScope::Pass
            }
            SyncError::TransientRemote { .. }
            | SyncError::RateLimited { .. }
            | SyncError::Timeout { .. }
            | SyncError::Classification { .. }
            | SyncError::NonSyncableParticipant { .. }
            | SyncError::UnresolvableIdentity { .. }
            | SyncError::IdentityExhausted { .. }
            | SyncError::SpaceSyncFailed { .. } => FailureScope::Space,
            SyncError::MappingConflict { .. }
            | SyncError::PermanentRemote { .. }
            | SyncError::NotFound { .. }
            | SyncError::Conflict { .. }
            | SyncError::InvalidEvent(_)
            | SyncError::Internal(_) => FailureScope::Entity,
        }
    }

    /// Wraps this error as a space-level abort, unless it already is one.
    pub fn into_space_failure(self, space_id: &str) -> SyncError {
        match self {
            SyncError::SpaceSyncFailed { .. } => self,
            other => SyncError::SpaceSyncFailed {
                space_id: space_id.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Map a non-success HTTP status from either platform into the taxonomy.
    pub fn from_http_status(status: u16, message: String, retry_after: Option<Duration>) -> Self {
        match status {
            401 | 403 => SyncError::Unauthorized { message },
            404 => SyncError::NotFound { resource: message },
            409 => SyncError::Conflict { message },
            429 => SyncError::RateLimited { retry_after },
            408 | 500..=599 => SyncError::TransientRemote {
                message,
                source: None,
            },
            _ => SyncError::PermanentRemote { message },
        }
    }

    /// Returns the innermost cause of a space-level abort.
    pub fn root_cause(&self) -> &SyncError {
        match self {
            SyncError::SpaceSyncFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
