use crate::domain_model::IdentityEvent;
use crate::domain_port::IdentityEventSink;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<IdentityEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<IdentityEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl IdentityEventSink for MemoryEventSink {
    async fn publish(&self, event: IdentityEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
