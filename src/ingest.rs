//! Candidate ingestion - turns scored rows into validated, scoped candidates
//!
//! Rows come from CSV (with a header line) or a JSON array of objects. Each
//! row names two entities, the vocabularies defining them, the entity kind
//! and a score. The score is either a raw similarity, bucketed here, or an
//! already bucketed interval identifier such as `http://value/0.85_0.86`.
//!
//! Bad rows are recorded and skipped; only unreadable input fails the call.

use crate::candidate::{EntityKind, EntityRef, ScopedCandidate, VocabularyRef};
use crate::config::AlignmentConfig;
use crate::error::{NexusError, Result};
use crate::score::ScoreInterval;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

const REQUIRED_COLUMNS: [&str; 6] = ["entity_a", "vocabulary_a", "entity_b", "vocabulary_b", "kind", "score"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Json,
}

impl InputFormat {
    /// Guess the format from a file extension (`.json` or anything else as CSV).
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => InputFormat::Json,
            _ => InputFormat::Csv,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowIssue {
    /// The row could not be decoded at all (wrong JSON types, invalid UTF-8)
    MalformedRow,
    MissingEntity,
    MissingVocabulary,
    UnknownKind,
    MalformedScore,
    BelowThreshold,
    SelfPair,
    SameVocabulary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRow {
    /// 1-based line (CSV) or element (JSON) the row came from
    pub line: u64,
    pub issue: RowIssue,
    pub detail: String,
}

#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub candidates: Vec<ScopedCandidate>,
    pub rejected: Vec<RejectedRow>,
}

impl IngestReport {
    pub fn rejected_count(&self, issue: RowIssue) -> usize {
        self.rejected.iter().filter(|r| r.issue == issue).count()
    }
}

/// A row as read, before validation. Every field may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateRow {
    #[serde(default)]
    pub entity_a: Option<String>,
    #[serde(default)]
    pub vocabulary_a: Option<String>,
    #[serde(default)]
    pub entity_b: Option<String>,
    #[serde(default)]
    pub vocabulary_b: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub score: Option<serde_json::Value>,
}

pub struct Ingestor {
    threshold: f64,
    bucket_width: f64,
    precision: u32,
}

impl Ingestor {
    pub fn new(config: &AlignmentConfig) -> Self {
        Self {
            threshold: config.global_threshold,
            bucket_width: config.bucket_width,
            precision: config.precision,
        }
    }

    pub fn read_path(&self, path: impl AsRef<Path>, format: Option<InputFormat>) -> Result<IngestReport> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| NexusError::Ingest(format!("Failed to open {}: {}", path.display(), e)))?;
        let report = match format.unwrap_or_else(|| InputFormat::from_path(path)) {
            InputFormat::Csv => self.read_csv(file)?,
            InputFormat::Json => self.read_json(file)?,
        };
        info!(
            "Ingested {} candidates from {} ({} rows rejected)",
            report.candidates.len(),
            path.display(),
            report.rejected.len()
        );
        Ok(report)
    }

    pub fn read_csv<R: Read>(&self, reader: R) -> Result<IngestReport> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: HashMap<String, usize> = rdr
            .headers()?
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.to_ascii_lowercase(), idx))
            .collect();

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| !headers.contains_key(*c))
            .collect();
        if !missing.is_empty() {
            return Err(NexusError::Ingest(format!("missing CSV columns: {}", missing.join(", "))));
        }

        let mut report = IngestReport::default();
        let mut record = csv::ByteRecord::new();
        let mut idx: u64 = 0;
        while rdr.read_byte_record(&mut record)? {
            idx += 1;
            // header is line 1
            let line = record.position().map(|p| p.line()).unwrap_or(idx + 1);
            match decode_record(&headers, &record) {
                Ok(row) => self.push_row(&mut report, line, row),
                Err(detail) => reject(&mut report, line, RowIssue::MalformedRow, detail),
            }
        }
        Ok(report)
    }

    /// Read a JSON array of row objects. Elements that do not decode into a
    /// row are rejected one by one; only a non-array document fails the call.
    pub fn read_json<R: Read>(&self, reader: R) -> Result<IngestReport> {
        let values: Vec<serde_json::Value> = serde_json::from_reader(reader)?;
        let mut report = IngestReport::default();
        for (idx, value) in values.into_iter().enumerate() {
            let line = idx as u64 + 1;
            match serde_json::from_value::<CandidateRow>(value) {
                Ok(row) => self.push_row(&mut report, line, row),
                Err(e) => reject(&mut report, line, RowIssue::MalformedRow, e.to_string()),
            }
        }
        Ok(report)
    }

    fn push_row(&self, report: &mut IngestReport, line: u64, row: CandidateRow) {
        match self.validate(row) {
            Ok(candidate) => report.candidates.push(candidate),
            Err((issue, detail)) => reject(report, line, issue, detail),
        }
    }

    /// Validate one row into a scoped candidate.
    pub fn validate(&self, row: CandidateRow) -> std::result::Result<ScopedCandidate, (RowIssue, String)> {
        let entity_a = non_blank(row.entity_a).ok_or((RowIssue::MissingEntity, "entity_a is empty".to_string()))?;
        let entity_b = non_blank(row.entity_b).ok_or((RowIssue::MissingEntity, "entity_b is empty".to_string()))?;
        let vocabulary_a =
            non_blank(row.vocabulary_a).ok_or((RowIssue::MissingVocabulary, "vocabulary_a is empty".to_string()))?;
        let vocabulary_b =
            non_blank(row.vocabulary_b).ok_or((RowIssue::MissingVocabulary, "vocabulary_b is empty".to_string()))?;

        let kind_label = row.kind.unwrap_or_default();
        let kind = EntityKind::parse(&kind_label)
            .ok_or_else(|| (RowIssue::UnknownKind, format!("unknown entity kind '{}'", kind_label)))?;

        let score = match self.parse_score(row.score)? {
            Some(score) => score,
            None => return Err((RowIssue::BelowThreshold, format!("score below {}", self.threshold))),
        };

        if entity_a == entity_b {
            return Err((RowIssue::SelfPair, format!("{} paired with itself", entity_a)));
        }
        if vocabulary_a == vocabulary_b {
            return Err((
                RowIssue::SameVocabulary,
                format!("{} and {} are both defined by {}", entity_a, entity_b, vocabulary_a),
            ));
        }

        Ok(ScopedCandidate::new(
            EntityRef::new(entity_a),
            VocabularyRef::new(vocabulary_a),
            EntityRef::new(entity_b),
            VocabularyRef::new(vocabulary_b),
            kind,
            score,
        ))
    }

    fn parse_score(
        &self,
        raw: Option<serde_json::Value>,
    ) -> std::result::Result<Option<ScoreInterval>, (RowIssue, String)> {
        let malformed = |detail: String| (RowIssue::MalformedScore, detail);
        match raw {
            Some(serde_json::Value::Number(n)) => {
                let value = n.as_f64().ok_or_else(|| malformed(format!("unrepresentable score {}", n)))?;
                self.bucket(value).map_err(|e| malformed(e.to_string()))
            }
            Some(serde_json::Value::String(s)) => {
                let s = s.trim();
                if s.contains('_') {
                    ScoreInterval::parse_identifier(s, self.precision)
                        .map(Some)
                        .map_err(|e| malformed(e.to_string()))
                } else {
                    let value: f64 = s.parse().map_err(|_| malformed(format!("unparsable score '{}'", s)))?;
                    self.bucket(value).map_err(|e| malformed(e.to_string()))
                }
            }
            Some(other) => Err(malformed(format!("unsupported score value {}", other))),
            None => Err(malformed("score is missing".to_string())),
        }
    }

    fn bucket(&self, value: f64) -> Result<Option<ScoreInterval>> {
        ScoreInterval::from_raw(value, self.threshold, self.bucket_width, self.precision)
    }
}

fn reject(report: &mut IngestReport, line: u64, issue: RowIssue, detail: String) {
    warn!("Dropping candidate row {}: {:?} ({})", line, issue, detail);
    report.rejected.push(RejectedRow { line, issue, detail });
}

/// Pull the named columns out of a raw CSV record. Fails on the first
/// column that is not valid UTF-8.
fn decode_record(
    headers: &HashMap<String, usize>,
    record: &csv::ByteRecord,
) -> std::result::Result<CandidateRow, String> {
    let field = |name: &str| -> std::result::Result<Option<String>, String> {
        match headers.get(name).and_then(|&i| record.get(i)) {
            Some(bytes) => std::str::from_utf8(bytes)
                .map(|v| Some(v.to_string()).filter(|v| !v.is_empty()))
                .map_err(|e| format!("{} is not valid UTF-8: {}", name, e)),
            None => Ok(None),
        }
    };
    Ok(CandidateRow {
        entity_a: field("entity_a")?,
        vocabulary_a: field("vocabulary_a")?,
        entity_b: field("entity_b")?,
        vocabulary_b: field("vocabulary_b")?,
        kind: field("kind")?,
        score: field("score")?.map(serde_json::Value::String),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
