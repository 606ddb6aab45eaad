use crate::domain_model::UserId;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkSource {
    /// An existing local account matched on email.
    Email,
    /// A local account was created for the identity.
    Created,
}

/// Observable outcomes of identity resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IdentityEvent {
    Resolved {
        user_id: UserId,
        provider: String,
        external_id: String,
    },
    Created {
        user_id: UserId,
        provider: String,
    },
    Linked {
        user_id: UserId,
        provider: String,
        external_id: String,
        source: LinkSource,
    },
    Unlinked {
        user_id: UserId,
        provider: String,
        external_id: String,
    },
    /// The local user exists but its index entry could not be written.
    LinkIncomplete {
        user_id: UserId,
        provider: String,
        external_id: String,
        reason: String,
    },
}

impl IdentityEvent {
    pub fn name(&self) -> &'static str {
        match self {
            IdentityEvent::Resolved { .. } => "identity_resolved",
            IdentityEvent::Created { .. } => "identity_created",
            IdentityEvent::Linked { .. } => "identity_linked",
            IdentityEvent::Unlinked { .. } => "identity_unlinked",
            IdentityEvent::LinkIncomplete { .. } => "identity_link_incomplete",
        }
    }

    pub fn user_id(&self) -> UserId {
        match self {
            IdentityEvent::Resolved { user_id, .. }
            | IdentityEvent::Created { user_id, .. }
            | IdentityEvent::Linked { user_id, .. }
            | IdentityEvent::Unlinked { user_id, .. }
            | IdentityEvent::LinkIncomplete { user_id, .. } => *user_id,
        }
    }
}
