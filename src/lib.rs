pub mod candidate;
pub mod config;
pub mod error;
pub mod ingest;
pub mod matcher;
pub mod orchestrator;
pub mod score;
pub mod sink;

pub use candidate::{CandidatePair, EntityKind, EntityRef, ScopeKey, ScopedCandidate, VocabularyRef};
pub use config::{AlignmentConfig, TieBreak};
pub use error::{NexusError, Result};
pub use ingest::{IngestReport, Ingestor, InputFormat};
pub use matcher::{GreedyMatcher, Ledger, MatchOutcome, Matching};
pub use orchestrator::{AcceptedPair, AlignmentOrchestrator, AlignmentReport};
pub use score::ScoreInterval;
pub use sink::ResultSink;
