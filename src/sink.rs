//! Result sink - accepted pairs as subject/predicate/object records

use crate::candidate::EntityKind;
use crate::config::AlignmentConfig;
use crate::error::Result;
use crate::orchestrator::{AlignmentReport, AlignmentTotals, ScopeSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquivalenceRecord {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub kind: EntityKind,
}

/// JSON document written by [`ResultSink::write_json`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquivalenceDocument {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub totals: AlignmentTotals,
    pub scopes: Vec<ScopeSummary>,
    pub equivalences: Vec<EquivalenceRecord>,
}

pub struct ResultSink {
    class_predicate: String,
    property_predicate: String,
}

impl ResultSink {
    pub fn new(config: &AlignmentConfig) -> Self {
        Self {
            class_predicate: config.class_predicate.clone(),
            property_predicate: config.property_predicate.clone(),
        }
    }

    pub fn predicate_for(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Class => &self.class_predicate,
            EntityKind::Property => &self.property_predicate,
        }
    }

    pub fn records(&self, report: &AlignmentReport) -> Vec<EquivalenceRecord> {
        report
            .accepted
            .iter()
            .map(|pair| EquivalenceRecord {
                subject: pair.entity_a.to_string(),
                predicate: self.predicate_for(pair.kind).to_string(),
                object: pair.entity_b.to_string(),
                kind: pair.kind,
            })
            .collect()
    }

    pub fn write_json<W: Write>(&self, report: &AlignmentReport, writer: W) -> Result<()> {
        let document = EquivalenceDocument {
            run_id: report.run_id,
            generated_at: report.generated_at,
            totals: report.totals.clone(),
            scopes: report.scopes.clone(),
            equivalences: self.records(report),
        };
        serde_json::to_writer_pretty(writer, &document)?;
        Ok(())
    }

    pub fn write_csv<W: Write>(&self, report: &AlignmentReport, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for record in self.records(report) {
            wtr.serialize(record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
