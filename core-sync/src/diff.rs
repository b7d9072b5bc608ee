//! # Diff Engine
//!
//! Classifies each listed purchase against the stored record snapshot.
//!
//! A purchase with no record is [`Classification::New`]; one whose record
//! carries a different `updated_at` string is [`Classification::Updated`];
//! everything else is left alone. Timestamps are compared as exact strings.

use std::collections::{HashMap, HashSet};

use bridge_traits::catalog::{ItemId, Purchase};
use bridge_traits::record::Record;
use tracing::warn;

use crate::task::{ChangeKind, SyncTask};

/// Outcome of comparing one purchase with the record snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification<'a> {
    New,
    Updated { previous: &'a Record },
    Unchanged,
}

/// Result of diffing a full catalog listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffPlan {
    /// One task per new or changed item, in listing order
    pub tasks: Vec<SyncTask>,
    /// Items whose record is already current
    pub unchanged: Vec<ItemId>,
}

impl DiffPlan {
    pub fn new_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.kind == ChangeKind::New).count()
    }

    pub fn updated_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.kind == ChangeKind::Updated)
            .count()
    }
}

/// Classify a single purchase against records indexed by id
pub fn classify<'a>(
    purchase: &Purchase,
    records_by_id: &HashMap<ItemId, &'a Record>,
) -> Classification<'a> {
    match records_by_id.get(&purchase.item_id) {
        None => Classification::New,
        Some(record) if record.updated_at != purchase.updated_at => {
            Classification::Updated { previous: record }
        }
        Some(_) => Classification::Unchanged,
    }
}

/// Build the task list for one cycle
pub fn plan(purchases: &[Purchase], records: &[Record]) -> DiffPlan {
    let records_by_id: HashMap<ItemId, &Record> = records.iter().map(|r| (r.id, r)).collect();
    let mut seen = HashSet::with_capacity(purchases.len());
    let mut plan = DiffPlan::default();

    for purchase in purchases {
        if !seen.insert(purchase.item_id) {
            warn!(
                item_id = %purchase.item_id,
                item_name = %purchase.name,
                "Catalog listed item more than once; ignoring duplicate"
            );
            continue;
        }

        match classify(purchase, &records_by_id) {
            Classification::New => plan
                .tasks
                .push(SyncTask::new(purchase.clone(), ChangeKind::New)),
            Classification::Updated { .. } => plan
                .tasks
                .push(SyncTask::new(purchase.clone(), ChangeKind::Updated)),
            Classification::Unchanged => plan.unchanged.push(purchase.item_id),
        }
    }

    plan
}
