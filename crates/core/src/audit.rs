use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::quotation::CycleId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditCategory {
    Availability,
    Selection,
    Consolidation,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditOutcome {
    Success,
    Rejected,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditContext {
    pub cycle_id: Option<CycleId>,
    pub correlation_id: String,
    pub actor: String,
}

impl AuditContext {
    pub fn new(
        cycle_id: Option<CycleId>,
        correlation_id: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Self { cycle_id, correlation_id: correlation_id.into(), actor: actor.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub cycle_id: Option<CycleId>,
    pub correlation_id: String,
    pub event_type: String,
    pub category: AuditCategory,
    pub actor: String,
    pub outcome: AuditOutcome,
    pub metadata: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        context: &AuditContext,
        event_type: impl Into<String>,
        category: AuditCategory,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            cycle_id: context.cycle_id.clone(),
            correlation_id: context.correlation_id.clone(),
            event_type: event_type.into(),
            category,
            actor: context.actor.clone(),
            outcome,
            metadata: BTreeMap::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }
}

pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AuditSink for InMemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// blake3 hex digest of the JSON encoding of `value`. Inputs keyed by
/// `BTreeMap` encode in a stable order, so equal inputs hash equally.
pub fn inputs_hash<T: Serialize + ?Sized>(value: &T) -> String {
    let encoded = serde_json::to_vec(value).unwrap_or_default();
    blake3::hash(&encoded).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::{
        audit::{inputs_hash, AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink},
        domain::quotation::CycleId,
    };

    #[test]
    fn in_memory_sink_records_events_with_correlation_fields() {
        let sink = InMemoryAuditSink::default();
        let context = AuditContext::new(Some(CycleId::from("C-2024-0042")), "req-123", "tender-cli");
        sink.emit(
            AuditEvent::new(
                &context,
                "consolidation.report_computed",
                AuditCategory::Consolidation,
                AuditOutcome::Success,
            )
            .with_metadata("grand_total", "45")
            .with_metadata("supplier_count", 1),
        );

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].correlation_id, "req-123");
        assert_eq!(events[0].cycle_id.as_ref().map(|id| id.0.as_str()), Some("C-2024-0042"));
        assert_eq!(events[0].metadata.get("supplier_count").map(String::as_str), Some("1"));
    }

    #[test]
    fn inputs_hash_is_stable_for_equal_inputs() {
        let first = BTreeMap::from([("b", 2), ("a", 1)]);
        let second = BTreeMap::from([("a", 1), ("b", 2)]);

        assert_eq!(inputs_hash(&first), inputs_hash(&second));
        assert_ne!(inputs_hash(&first), inputs_hash(&BTreeMap::from([("a", 1)])));
        assert_eq!(inputs_hash(&first).len(), 64);
    }
}
