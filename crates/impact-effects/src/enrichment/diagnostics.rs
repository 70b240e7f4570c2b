use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::sources::SourceId;

/// Record of a source that degraded to an empty field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDiagnostic {
    pub source: SourceId,
    pub reason: String,
}

/// Side channel receiving one record per failed source.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, diagnostic: &SourceDiagnostic);
}

/// Default sink: emits a structured warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnosticSink;

impl DiagnosticSink for TracingDiagnosticSink {
    fn record(&self, diagnostic: &SourceDiagnostic) {
        warn!(
            source = %diagnostic.source,
            reason = %diagnostic.reason,
            "enrichment source degraded"
        );
    }
}

/// Keeps every record in memory; used by the CLI summary and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDiagnosticSink {
    records: Arc<Mutex<Vec<SourceDiagnostic>>>,
}

impl InMemoryDiagnosticSink {
    pub fn records(&self) -> Vec<SourceDiagnostic> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl DiagnosticSink for InMemoryDiagnosticSink {
    fn record(&self, diagnostic: &SourceDiagnostic) {
        let mut guard = match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(diagnostic.clone());
    }
}
