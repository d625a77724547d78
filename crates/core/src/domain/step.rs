use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::order::Phase;
use crate::errors::WorkflowError;

pub const STEP_ACKNOWLEDGE: u8 = 1;
pub const STEP_STOCKING: u8 = 2;
pub const STEP_INSPECTION: u8 = 3;
pub const STEP_LOGISTICS: u8 = 4;
pub const STEP_RECEIPT: u8 = 5;

pub const FIRST_STEP: u8 = STEP_ACKNOWLEDGE;
pub const LAST_STEP: u8 = STEP_RECEIPT;

impl Phase {
    pub fn first_step(&self) -> u8 {
        match self {
            Self::Inbound => STEP_ACKNOWLEDGE,
            Self::Outbound => STEP_LOGISTICS,
        }
    }

    pub fn final_step(&self) -> u8 {
        match self {
            Self::Inbound => STEP_INSPECTION,
            Self::Outbound => STEP_RECEIPT,
        }
    }
}

/// The phase a step number belongs to. Steps outside 1..=5 belong to none.
pub fn phase_of_step(step: u8) -> Option<Phase> {
    match step {
        STEP_ACKNOWLEDGE..=STEP_INSPECTION => Some(Phase::Inbound),
        STEP_LOGISTICS..=STEP_RECEIPT => Some(Phase::Outbound),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogisticsItemId(pub String);

impl fmt::Display for LogisticsItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One shipment leg recorded at the logistics step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogisticsItem {
    pub id: LogisticsItemId,
    pub carrier_name: String,
    pub tracking_ref: String,
    pub images: Vec<String>,
}

impl LogisticsItem {
    /// A leg counts as evidence only once it has a tracking reference and at
    /// least one photo.
    pub fn is_complete(&self) -> bool {
        !self.tracking_ref.trim().is_empty() && !self.images.is_empty()
    }
}

/// Per-step evidence, shaped by the kind of step. The acknowledgement step
/// carries no evidence of its own; photo steps carry an ordered image list;
/// the logistics step carries shipment legs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepEvidence {
    Acknowledgement,
    Photos { images: Vec<String> },
    Logistics { items: Vec<LogisticsItem> },
}

/// Evidence plus the completion stamp for one step. `completion_time` is
/// overwritten on every re-completion and never cleared; `extra` is a
/// free-form scalar bag the workflow guards ignore.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub evidence: StepEvidence,
    pub completion_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl StepRecord {
    fn empty_for(step: u8) -> Self {
        let evidence = match step {
            STEP_ACKNOWLEDGE => StepEvidence::Acknowledgement,
            STEP_LOGISTICS => StepEvidence::Logistics { items: Vec::new() },
            _ => StepEvidence::Photos { images: Vec::new() },
        };
        Self { evidence, completion_time: None, extra: BTreeMap::new() }
    }
}

/// A single mutation to one step's evidence, merged via
/// [`StepLedger::apply_patch`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EvidencePatch {
    AddImage { url: String },
    RemoveImage { index: usize },
    SetField { key: String, value: String },
    AddLogisticsItem { carrier_name: String, tracking_ref: String },
    UpdateLogisticsItem {
        item_id: LogisticsItemId,
        carrier_name: Option<String>,
        tracking_ref: Option<String>,
    },
    RemoveLogisticsItem { item_id: LogisticsItemId },
    AddLogisticsImage { item_id: LogisticsItemId, url: String },
    RemoveLogisticsImage { item_id: LogisticsItemId, index: usize },
}

/// Per-order evidence store, keyed by step number. Records accumulate and
/// are never dropped by the workflow; rejection leaves them untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepLedger {
    records: BTreeMap<u8, StepRecord>,
}

impl StepLedger {
    pub fn record(&self, step: u8) -> Option<&StepRecord> {
        self.records.get(&step)
    }

    fn record_mut(&mut self, step: u8) -> &mut StepRecord {
        self.records.entry(step).or_insert_with(|| StepRecord::empty_for(step))
    }

    pub fn completion_time(&self, step: u8) -> Option<DateTime<Utc>> {
        self.records.get(&step).and_then(|record| record.completion_time)
    }

    /// Stamps (or re-stamps) the step's completion time.
    pub fn mark_complete(&mut self, step: u8, at: DateTime<Utc>) {
        self.record_mut(step).completion_time = Some(at);
    }

    pub fn images(&self, step: u8) -> &[String] {
        match self.records.get(&step).map(|record| &record.evidence) {
            Some(StepEvidence::Photos { images }) => images,
            _ => &[],
        }
    }

    pub fn logistics_items(&self, step: u8) -> &[LogisticsItem] {
        match self.records.get(&step).map(|record| &record.evidence) {
            Some(StepEvidence::Logistics { items }) => items,
            _ => &[],
        }
    }

    /// Returns the unmet evidence requirement for a step, or `None` when the
    /// step can be completed. Only the enumerated evidence fields are
    /// examined; `extra` never participates.
    pub fn unmet_requirement(&self, step: u8) -> Option<String> {
        match step {
            STEP_ACKNOWLEDGE => None,
            STEP_STOCKING | STEP_INSPECTION | STEP_RECEIPT => {
                if self.images(step).is_empty() {
                    Some("at least one photo is required".to_string())
                } else {
                    None
                }
            }
            STEP_LOGISTICS => {
                let items = self.logistics_items(step);
                if items.is_empty() {
                    return Some("at least one logistics item is required".to_string());
                }
                items.iter().find(|item| !item.is_complete()).map(|item| {
                    format!(
                        "logistics item `{}` needs a tracking reference and at least one photo",
                        item.id
                    )
                })
            }
            _ => Some(format!("step {step} is not part of the workflow")),
        }
    }

    pub fn evidence_satisfied(&self, step: u8) -> bool {
        self.unmet_requirement(step).is_none()
    }

    /// Merges one evidence mutation into the step's record. Shape mismatches
    /// (photo ops against the logistics step and vice versa) and dangling
    /// references are rejected without mutating anything.
    pub fn apply_patch(&mut self, step: u8, patch: EvidencePatch) -> Result<(), WorkflowError> {
        if phase_of_step(step).is_none() {
            return Err(WorkflowError::InvalidEvidence {
                step,
                detail: "step is not part of the workflow".to_string(),
            });
        }

        match patch {
            EvidencePatch::AddImage { url } => {
                self.photos_step(step)?.push(url);
            }
            EvidencePatch::RemoveImage { index } => {
                let images = self.photos_step(step)?;
                if index >= images.len() {
                    return Err(WorkflowError::InvalidEvidence {
                        step,
                        detail: format!("image index {index} is out of range"),
                    });
                }
                images.remove(index);
            }
            EvidencePatch::SetField { key, value } => {
                self.record_mut(step).extra.insert(key, value);
            }
            EvidencePatch::AddLogisticsItem { carrier_name, tracking_ref } => {
                let items = self.logistics_step(step)?;
                items.push(LogisticsItem {
                    id: LogisticsItemId(Uuid::new_v4().to_string()),
                    carrier_name,
                    tracking_ref,
                    images: Vec::new(),
                });
            }
            EvidencePatch::UpdateLogisticsItem { item_id, carrier_name, tracking_ref } => {
                let item = self.logistics_item_mut(step, &item_id)?;
                if let Some(carrier_name) = carrier_name {
                    item.carrier_name = carrier_name;
                }
                if let Some(tracking_ref) = tracking_ref {
                    item.tracking_ref = tracking_ref;
                }
            }
            EvidencePatch::RemoveLogisticsItem { item_id } => {
                let items = self.logistics_step(step)?;
                let position = items.iter().position(|item| item.id == item_id).ok_or_else(
                    || WorkflowError::InvalidEvidence {
                        step,
                        detail: format!("unknown logistics item `{item_id}`"),
                    },
                )?;
                items.remove(position);
            }
            EvidencePatch::AddLogisticsImage { item_id, url } => {
                self.logistics_item_mut(step, &item_id)?.images.push(url);
            }
            EvidencePatch::RemoveLogisticsImage { item_id, index } => {
                let item = self.logistics_item_mut(step, &item_id)?;
                if index >= item.images.len() {
                    return Err(WorkflowError::InvalidEvidence {
                        step,
                        detail: format!("image index {index} is out of range"),
                    });
                }
                item.images.remove(index);
            }
        }

        Ok(())
    }

    fn photos_step(&mut self, step: u8) -> Result<&mut Vec<String>, WorkflowError> {
        if !matches!(step, STEP_STOCKING | STEP_INSPECTION | STEP_RECEIPT) {
            return Err(WorkflowError::InvalidEvidence {
                step,
                detail: "step does not carry photo evidence".to_string(),
            });
        }
        match &mut self.record_mut(step).evidence {
            StepEvidence::Photos { images } => Ok(images),
            _ => Err(WorkflowError::InvalidEvidence {
                step,
                detail: "step record does not hold photo evidence".to_string(),
            }),
        }
    }

    fn logistics_step(&mut self, step: u8) -> Result<&mut Vec<LogisticsItem>, WorkflowError> {
        if step != STEP_LOGISTICS {
            return Err(WorkflowError::InvalidEvidence {
                step,
                detail: "step does not carry logistics items".to_string(),
            });
        }
        match &mut self.record_mut(step).evidence {
            StepEvidence::Logistics { items } => Ok(items),
            _ => Err(WorkflowError::InvalidEvidence {
                step,
                detail: "step record does not hold logistics evidence".to_string(),
            }),
        }
    }

    fn logistics_item_mut(
        &mut self,
        step: u8,
        item_id: &LogisticsItemId,
    ) -> Result<&mut LogisticsItem, WorkflowError> {
        let detail = format!("unknown logistics item `{item_id}`");
        let items = self.logistics_step(step)?;
        items
            .iter_mut()
            .find(|item| &item.id == item_id)
            .ok_or(WorkflowError::InvalidEvidence { step, detail })
    }
}
