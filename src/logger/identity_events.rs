use crate::domain_model::IdentityEvent;
use crate::domain_port::IdentityEventSink;
use tracing::{info, warn};

/// Renders identity events as structured log records under the
/// `identity` target.
#[derive(Debug, Default)]
pub struct TracingEventSink;

impl TracingEventSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl IdentityEventSink for TracingEventSink {
    async fn publish(&self, event: IdentityEvent) {
        let name = event.name();
        match &event {
            IdentityEvent::Resolved {
                user_id,
                provider,
                external_id,
            } => info!(target: "identity", event = name, %user_id, provider, external_id),
            IdentityEvent::Created { user_id, provider } => {
                info!(target: "identity", event = name, %user_id, provider)
            }
            IdentityEvent::Linked {
                user_id,
                provider,
                external_id,
                source,
            } => {
                info!(target: "identity", event = name, %user_id, provider, external_id, source = ?source)
            }
            IdentityEvent::Unlinked {
                user_id,
                provider,
                external_id,
            } => info!(target: "identity", event = name, %user_id, provider, external_id),
            IdentityEvent::LinkIncomplete {
                user_id,
                provider,
                external_id,
                reason,
            } => {
                warn!(target: "identity", event = name, %user_id, provider, external_id, reason)
            }
        }
    }
}
