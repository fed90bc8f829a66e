use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entity type under which quotation approval flows are registered.
pub const QUOTATION_ENTITY_TYPE: &str = "cotacao_compra";

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApprovalFlowKey {
    pub entity_type: String,
    pub entity_id: String,
    pub company_id: String,
}

impl ApprovalFlowKey {
    pub fn quotation(entity_id: impl Into<String>, company_id: impl Into<String>) -> Self {
        Self {
            entity_type: QUOTATION_ENTITY_TYPE.to_owned(),
            entity_id: entity_id.into(),
            company_id: company_id.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStepStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStep {
    pub level: u32,
    pub approver_id: String,
    pub approver_name: String,
    pub status: ApprovalStepStatus,
    pub approved_at: Option<DateTime<Utc>>,
    pub observations: Option<String>,
}

/// Read-only view of a sequential approval flow owned by the approvals service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalFlowSnapshot {
    pub rule: String,
    pub total_levels: u32,
    pub completed: bool,
    pub steps: Vec<ApprovalStep>,
}

impl ApprovalFlowSnapshot {
    /// Lowest level still waiting on its approver.
    pub fn pending_step(&self) -> Option<&ApprovalStep> {
        self.steps
            .iter()
            .filter(|step| step.status == ApprovalStepStatus::Pending)
            .min_by_key(|step| step.level)
    }

    pub fn current_level(&self) -> Option<u32> {
        if self.completed || self.is_rejected() {
            return None;
        }
        self.pending_step().map(|step| step.level)
    }

    pub fn is_rejected(&self) -> bool {
        self.steps.iter().any(|step| step.status == ApprovalStepStatus::Rejected)
    }
}
