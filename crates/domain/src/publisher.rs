//! Domain event publication.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::sale::SaleEvent;

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns when the fact took place.
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// Error returned by a publisher that could not deliver an event.
#[derive(Debug, Error)]
#[error("Failed to publish {event_type}: {reason}")]
pub struct PublishError {
    pub event_type: &'static str,
    pub reason: String,
}

/// Outbound notification of sale changes.
///
/// Publishing happens after the change is persisted. A failure is reported
/// to the caller of `publish` but never undoes the stored change.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: SaleEvent) -> Result<(), PublishError>;
}

/// Publisher that writes one structured log line per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventPublisher;

#[async_trait]
impl EventPublisher for LoggingEventPublisher {
    async fn publish(&self, event: SaleEvent) -> Result<(), PublishError> {
        let payload = serde_json::to_string(&event).map_err(|e| PublishError {
            event_type: event.event_type(),
            reason: e.to_string(),
        })?;

        tracing::info!(
            event_type = event.event_type(),
            sale_id = %event.sale_id(),
            sale_number = %event.sale_number(),
            occurred_at = %event.occurred_at(),
            payload = %payload,
            "Domain event published"
        );
        Ok(())
    }
}

/// Publisher that keeps every event in memory.
///
/// Can be switched into a failing mode to exercise publish-failure handling.
#[derive(Debug, Clone, Default)]
pub struct RecordingEventPublisher {
    state: Arc<RwLock<RecordingState>>,
}

#[derive(Debug, Default)]
struct RecordingState {
    events: Vec<SaleEvent>,
    fail: bool,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent publish fail without recording.
    pub fn set_fail(&self, fail: bool) {
        if let Ok(mut state) = self.state.write() {
            state.fail = fail;
        }
    }

    /// Returns a copy of the events published so far.
    pub fn events(&self) -> Vec<SaleEvent> {
        self.state
            .read()
            .map(|state| state.events.clone())
            .unwrap_or_default()
    }

    /// Returns the type names of the events published so far, in order.
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events().iter().map(DomainEvent::event_type).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut state) = self.state.write() {
            state.events.clear();
        }
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(&self, event: SaleEvent) -> Result<(), PublishError> {
        let mut state = self.state.write().map_err(|e| PublishError {
            event_type: event.event_type(),
            reason: e.to_string(),
        })?;

        if state.fail {
            return Err(PublishError {
                event_type: event.event_type(),
                reason: "publisher unavailable".to_string(),
            });
        }

        state.events.push(event);
        Ok(())
    }
}

#[async_trait]
impl<P: EventPublisher + ?Sized> EventPublisher for Arc<P> {
    async fn publish(&self, event: SaleEvent) -> Result<(), PublishError> {
        (**self).publish(event).await
    }
}
