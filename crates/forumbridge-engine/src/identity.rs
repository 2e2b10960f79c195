// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Participant identity resolution.
//!
//! Maps each origin participant to exactly one destination handle, creating
//! the destination account on first sight. Handles are derived from display
//! names and disambiguated with numeric suffixes.

use std::sync::Arc;

use forumbridge_config::model::IdentityConfig;
use forumbridge_core::{
    DestinationWriter, MappingKind, MappingStore, NewUser, Participant, SyncError, UserRecord,
};
use tracing::{debug, info};

use crate::locks::KeyedLocks;

/// Padding appended to handles shorter than the minimum length.
const SHORT_HANDLE_PADDING: &str = "_user";

/// Derives a destination handle from a display name.
///
/// Keeps ASCII letters and digits, collapses runs of whitespace, `-` and `_`
/// into one `_`, lower-cases, and trims separators at both ends. The result is
/// truncated to `max_len`, then padded with `_user` if shorter than `min_len`.
/// Returns `None` when nothing usable remains.
pub fn derive_handle(display_name: &str, min_len: usize, max_len: usize) -> Option<String> {
    let mut handle = String::with_capacity(display_name.len());
    let mut pending_separator = false;
    for c in display_name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !handle.is_empty() {
                handle.push('_');
            }
            pending_separator = false;
            handle.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_separator = true;
        }
    }

    truncate_handle(&mut handle, max_len);
    if handle.is_empty() {
        return None;
    }
    if handle.len() < min_len {
        handle.push_str(SHORT_HANDLE_PADDING);
        handle.truncate(max_len);
    }
    Some(handle)
}

/// The `attempt`-th candidate for `base`: `base`, `base_1`, `base_2`, ...
///
/// The base is shortened so the suffix always fits within `max_len`.
pub fn candidate_handle(base: &str, attempt: u32, max_len: usize) -> String {
    if attempt == 0 {
        let mut handle = base.to_string();
        truncate_handle(&mut handle, max_len);
        return handle;
    }
    let suffix = format!("_{attempt}");
    let mut stem = base.to_string();
    truncate_handle(&mut stem, max_len.saturating_sub(suffix.len()));
    stem + &suffix
}

/// Email address synthesized for a created user.
pub fn synthesized_email(handle: &str, email_domain: &str) -> String {
    format!("{handle}@{email_domain}")
}

// Handles are ASCII, so byte truncation is safe.
fn truncate_handle(handle: &mut String, max_len: usize) {
    handle.truncate(max_len);
    while handle.ends_with('_') {
        handle.pop();
    }
}

/// Resolves origin participants to destination handles.
///
/// Resolution of a single participant is serialized, so concurrent callers
/// for the same participant never create two destination accounts.
pub struct IdentityResolver {
    store: Arc<dyn MappingStore>,
    destination: Arc<dyn DestinationWriter>,
    config: IdentityConfig,
    locks: KeyedLocks,
}

impl IdentityResolver {
    pub fn new(
        store: Arc<dyn MappingStore>,
        destination: Arc<dyn DestinationWriter>,
        config: IdentityConfig,
    ) -> Self {
        Self {
            store,
            destination,
            config,
            locks: KeyedLocks::new(),
        }
    }

    /// Returns the destination handle for `participant`, creating the
    /// destination user if this participant has never been seen.
    pub async fn resolve(&self, participant: &Participant) -> Result<String, SyncError> {
        if let Some(handle) = self.mapped_handle(participant).await? {
            return Ok(handle);
        }
        if participant.is_bot {
            return Err(SyncError::NonSyncableParticipant {
                participant_id: participant.id.clone(),
            });
        }

        let _guard = self.locks.lock(&participant.id).await;
        // Another task may have finished while we waited.
        if let Some(handle) = self.mapped_handle(participant).await? {
            return Ok(handle);
        }

        let base = derive_handle(
            &participant.display_name,
            self.config.min_length,
            self.config.max_length,
        )
        .ok_or_else(|| SyncError::UnresolvableIdentity {
            participant_id: participant.id.clone(),
            display_name: participant.display_name.clone(),
        })?;

        for attempt in 0..self.config.max_handle_attempts {
            let handle = candidate_handle(&base, attempt, self.config.max_length);
            let email = synthesized_email(&handle, &self.config.email_domain);

            let request = NewUser {
                username: handle.clone(),
                name: participant.display_name.clone(),
                email,
            };
            let user = match self.destination.find_or_create_user(&request).await {
                Ok(user) => user,
                Err(SyncError::Conflict { message }) => {
                    debug!(
                        handle = %handle,
                        attempt,
                        %message,
                        "user creation conflicted, trying next candidate"
                    );
                    continue;
                }
                Err(e) => return Err(e),
            };

            // A user carrying our synthesized email was created for this
            // participant, now or by an interrupted earlier resolution.
            let ours = user
                .email
                .as_deref()
                .is_some_and(|e| e.eq_ignore_ascii_case(&request.email));
            if ours
                && self
                    .store
                    .get_by_destination(MappingKind::User, &user.username)
                    .await?
                    .is_none()
            {
                info!(
                    participant_id = %participant.id,
                    handle = %user.username,
                    "resolved destination user"
                );
                return self.persist(participant, user.username).await;
            }
            debug!(handle = %handle, attempt, "handle taken, trying next candidate");
        }

        Err(SyncError::IdentityExhausted {
            base,
            attempts: self.config.max_handle_attempts,
        })
    }

    async fn mapped_handle(&self, participant: &Participant) -> Result<Option<String>, SyncError> {
        self.store
            .get_destination(MappingKind::User, &participant.id)
            .await
    }

    async fn persist(
        &self,
        participant: &Participant,
        handle: String,
    ) -> Result<String, SyncError> {
        let record = UserRecord {
            origin_id: participant.id.clone(),
            handle: handle.clone(),
            display_name: participant.display_name.clone(),
            email: participant.email.clone(),
        };
        match self.store.record_user(&record).await {
            Ok(()) => Ok(handle),
            Err(SyncError::MappingConflict { existing, .. }) => Ok(existing),
            Err(e) => Err(e),
        }
    }
}
