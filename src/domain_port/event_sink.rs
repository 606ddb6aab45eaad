use crate::domain_model::IdentityEvent;

#[async_trait::async_trait]
pub trait IdentityEventSink: Send + Sync {
    /// Delivery problems are the sink's own business and never reach the caller.
    async fn publish(&self, event: IdentityEvent);
}
