//! Append-only record of executed instructions, kept for diagnostics.

use crate::error::Result;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::SystemTime;
use uuid::Uuid;

/// One executed instruction.
#[derive(Clone, Debug, Serialize)]
pub struct InstructionRecord {
    pub kind: String,
    pub start_time: SystemTime,
    /// Set when the instruction finishes, never before `start_time`
    pub end_time: Option<SystemTime>,
    pub parameters: Map<String, Value>,
}

#[derive(Serialize)]
struct LedgerEntry<'a> {
    id: Uuid,
    #[serde(flatten)]
    record: &'a InstructionRecord,
}

#[derive(Default)]
struct LedgerInner {
    order: Vec<Uuid>,
    records: HashMap<Uuid, InstructionRecord>,
}

/// Thread-safe instruction ledger preserving insertion order.
#[derive(Default)]
pub struct InstructionLedger {
    inner: Mutex<LedgerInner>,
}

impl InstructionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a record for an instruction starting now.
    pub fn begin(&self, kind: &str, parameters: Map<String, Value>) -> Uuid {
        let id = Uuid::new_v4();
        let record = InstructionRecord {
            kind: kind.to_string(),
            start_time: SystemTime::now(),
            end_time: None,
            parameters,
        };

        let mut inner = self.inner.lock();
        inner.order.push(id);
        inner.records.insert(id, record);
        tracing::debug!("Ledger: {} started ({})", kind, id);
        id
    }

    /// Close a record. Returns false for unknown ids.
    pub fn finish(&self, id: Uuid) -> bool {
        let now = SystemTime::now();
        let mut inner = self.inner.lock();
        match inner.records.get_mut(&id) {
            Some(record) => {
                // Wall clock may step backward between begin and finish
                record.end_time = Some(now.max(record.start_time));
                true
            }
            None => false,
        }
    }

    /// Attach or overwrite a parameter on an existing record.
    pub fn annotate(&self, id: Uuid, key: &str, value: Value) -> bool {
        let mut inner = self.inner.lock();
        match inner.records.get_mut(&id) {
            Some(record) => {
                record.parameters.insert(key.to_string(), value);
                true
            }
            None => false,
        }
    }

    /// Record an instruction with no duration.
    pub fn record(&self, kind: &str, parameters: Map<String, Value>) -> Uuid {
        let id = self.begin(kind, parameters);
        self.finish(id);
        id
    }

    pub fn get(&self, id: Uuid) -> Option<InstructionRecord> {
        self.inner.lock().records.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Kinds of all records in insertion order.
    pub fn kinds(&self) -> Vec<String> {
        let inner = self.inner.lock();
        inner
            .order
            .iter()
            .filter_map(|id| inner.records.get(id).map(|r| r.kind.clone()))
            .collect()
    }

    /// Export every record, in insertion order, as a JSON array.
    pub fn to_json(&self) -> Result<String> {
        let inner = self.inner.lock();
        let entries: Vec<LedgerEntry<'_>> = inner
            .order
            .iter()
            .filter_map(|id| {
                inner
                    .records
                    .get(id)
                    .map(|record| LedgerEntry { id: *id, record })
            })
            .collect();
        Ok(serde_json::to_string_pretty(&entries)?)
    }
}

/// Build a parameter map from key/value pairs.
pub fn params<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
