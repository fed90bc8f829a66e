//! Type exclusivity between requisitions merged into one quotation.
//!
//! Emergency purchases are only ever quoted with other emergency purchases,
//! and replenishment never mixes with direct purchase. `Selection` is the
//! caller-owned selection state; every operation returns a new value.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{AvailableItem, AvailableRequisition};
use crate::domain::requisition::{RequisitionId, RequisitionItemId, RequisitionType};
use crate::errors::DomainError;

#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeConflict {
    #[error("emergency requisitions cannot be combined with {}", join_types(others))]
    EmergencyMixed { others: Vec<RequisitionType> },
    #[error("replenishment and direct_purchase requisitions cannot be combined")]
    ReplenishmentWithDirectPurchase,
    #[error("{candidate} cannot join a selection anchored on {anchor}")]
    IncompatibleWithAnchor { anchor: RequisitionType, candidate: RequisitionType },
}

fn join_types(types: &[RequisitionType]) -> String {
    types.iter().map(|kind| kind.as_str()).collect::<Vec<_>>().join(", ")
}

/// Whether `candidate` may join a selection whose anchor type is `anchor`.
pub fn validate_type_selection(anchor: Option<RequisitionType>, candidate: RequisitionType) -> bool {
    use RequisitionType::*;

    match (anchor, candidate) {
        (None, _) => true,
        (Some(Emergency), Emergency) => true,
        (Some(Emergency), _) | (Some(_), Emergency) => false,
        (Some(Replenishment), DirectPurchase) | (Some(DirectPurchase), Replenishment) => false,
        (Some(Replenishment), Replenishment) | (Some(DirectPurchase), DirectPurchase) => true,
    }
}

/// Checks a bulk selection as a whole. Returns the anchor the selection would
/// carry, or the conflict that rejects it.
pub fn check_bulk_types<I>(types: I) -> Result<Option<RequisitionType>, TypeConflict>
where
    I: IntoIterator<Item = RequisitionType>,
{
    let distinct: BTreeSet<RequisitionType> = types.into_iter().collect();

    if distinct.contains(&RequisitionType::Emergency) && distinct.len() > 1 {
        let others =
            distinct.iter().copied().filter(|kind| *kind != RequisitionType::Emergency).collect();
        return Err(TypeConflict::EmergencyMixed { others });
    }

    if distinct.contains(&RequisitionType::Replenishment)
        && distinct.contains(&RequisitionType::DirectPurchase)
    {
        return Err(TypeConflict::ReplenishmentWithDirectPurchase);
    }

    Ok(distinct.into_iter().next())
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    requisitions: BTreeMap<RequisitionId, RequisitionType>,
    items: BTreeMap<RequisitionItemId, RequisitionType>,
    anchor: Option<RequisitionType>,
}

impl Selection {
    pub fn anchor(&self) -> Option<RequisitionType> {
        self.anchor
    }

    pub fn is_empty(&self) -> bool {
        self.requisitions.is_empty() && self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.requisitions.len() + self.items.len()
    }

    pub fn contains_requisition(&self, id: &RequisitionId) -> bool {
        self.requisitions.contains_key(id)
    }

    pub fn contains_item(&self, id: &RequisitionItemId) -> bool {
        self.items.contains_key(id)
    }

    pub fn requisition_ids(&self) -> impl Iterator<Item = &RequisitionId> {
        self.requisitions.keys()
    }

    pub fn item_ids(&self) -> impl Iterator<Item = &RequisitionItemId> {
        self.items.keys()
    }

    pub fn toggle_requisition(
        &self,
        id: &RequisitionId,
        kind: RequisitionType,
    ) -> Result<Self, DomainError> {
        let mut next = self.clone();
        if next.requisitions.remove(id).is_some() {
            next.reset_anchor_if_empty();
            return Ok(next);
        }

        next.admit(kind)?;
        next.requisitions.insert(id.clone(), kind);
        Ok(next)
    }

    pub fn toggle_item(&self, id: &RequisitionItemId, kind: RequisitionType) -> Result<Self, DomainError> {
        let mut next = self.clone();
        if next.items.remove(id).is_some() {
            next.reset_anchor_if_empty();
            return Ok(next);
        }

        next.admit(kind)?;
        next.items.insert(id.clone(), kind);
        Ok(next)
    }

    /// Replaces the selection with every requisition in `view`, or rejects the
    /// whole action when the view mixes incompatible types.
    pub fn select_all_requisitions(view: &[AvailableRequisition]) -> Result<Self, DomainError> {
        let anchor = check_bulk_types(view.iter().map(|entry| entry.requisition.requisition_type))?;
        let requisitions = view
            .iter()
            .map(|entry| (entry.requisition.id.clone(), entry.requisition.requisition_type))
            .collect();

        Ok(Self { requisitions, items: BTreeMap::new(), anchor })
    }

    pub fn select_all_items(view: &[AvailableItem]) -> Result<Self, DomainError> {
        let anchor = check_bulk_types(view.iter().map(|entry| entry.requisition_type))?;
        let items =
            view.iter().map(|entry| (entry.item.id.clone(), entry.requisition_type)).collect();

        Ok(Self { requisitions: BTreeMap::new(), items, anchor })
    }

    pub fn clear(&self) -> Self {
        Self::default()
    }

    fn admit(&mut self, kind: RequisitionType) -> Result<(), TypeConflict> {
        if !validate_type_selection(self.anchor, kind) {
            return Err(TypeConflict::IncompatibleWithAnchor {
                anchor: self.anchor.unwrap_or(kind),
                candidate: kind,
            });
        }
        self.anchor.get_or_insert(kind);
        Ok(())
    }

    fn reset_anchor_if_empty(&mut self) {
        if self.is_empty() {
            self.anchor = None;
        }
    }
}
