use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{AvailabilityView, AvailableRequisition};
use crate::domain::requisition::RequisitionType;

/// List filters applied to an availability view before bulk selection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequisitionCriteria {
    /// Case-insensitive match on requisition number or requester name.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub requisition_type: Option<RequisitionType>,
    #[serde(default)]
    pub cost_center_id: Option<String>,
    /// Only honoured together with `cost_center_id`.
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub requested_from: Option<NaiveDate>,
    #[serde(default)]
    pub requested_to: Option<NaiveDate>,
    #[serde(default)]
    pub emergency_only: bool,
}

impl RequisitionCriteria {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Narrows `view` to matching requisitions; the exploded item list keeps
    /// only items of requisitions that survived.
    pub fn apply(
        &self,
        view: &AvailabilityView,
        requester_names: &BTreeMap<String, String>,
    ) -> AvailabilityView {
        let requisitions: Vec<AvailableRequisition> = view
            .requisitions
            .iter()
            .filter(|entry| self.matches(entry, requester_names))
            .cloned()
            .collect();
        let items = view
            .items
            .iter()
            .filter(|entry| {
                requisitions.iter().any(|kept| kept.requisition.id == entry.item.requisition_id)
            })
            .cloned()
            .collect();

        AvailabilityView {
            requisitions,
            items,
            anchor_type: view.anchor_type,
            warnings: view.warnings.clone(),
        }
    }

    fn matches(
        &self,
        entry: &AvailableRequisition,
        requester_names: &BTreeMap<String, String>,
    ) -> bool {
        let requisition = &entry.requisition;

        if let Some(search) = self.search.as_deref().map(str::trim).filter(|term| !term.is_empty())
        {
            let needle = search.to_lowercase();
            let requester = requester_names
                .get(&requisition.requester_id)
                .map(|name| name.to_lowercase())
                .unwrap_or_default();
            if !requisition.number.to_lowercase().contains(&needle) && !requester.contains(&needle) {
                return false;
            }
        }

        if self.requisition_type.is_some_and(|kind| kind != requisition.requisition_type) {
            return false;
        }

        if let Some(cost_center) = &self.cost_center_id {
            if requisition.cost_center_id.as_ref() != Some(cost_center) {
                return false;
            }
            if let Some(project) = &self.project_id {
                if requisition.project_id.as_ref() != Some(project) {
                    return false;
                }
            }
        }

        if self.requested_from.is_some() || self.requested_to.is_some() {
            let Some(requested_on) = requisition.requested_on else {
                return false;
            };
            if self.requested_from.is_some_and(|from| requested_on < from) {
                return false;
            }
            if self.requested_to.is_some_and(|to| requested_on > to) {
                return false;
            }
        }

        if self.emergency_only
            && requisition.requisition_type != RequisitionType::Emergency
            && !requisition.is_high_priority()
        {
            return false;
        }

        true
    }
}
