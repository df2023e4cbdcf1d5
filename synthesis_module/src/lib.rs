pub mod classifier;
pub mod config;
pub mod error;
pub mod extractor;
pub mod grouper;
pub mod issue;
pub mod message;
pub mod normalizer;
pub mod pipeline;
pub mod stats;
pub mod synthesizer;

pub use config::{ResponsibleEntry, SynthesisConfig};
pub use error::SynthesisError;
pub use issue::{Importance, Issue, IssueStatus, SynthesisReport, EXPORT_SCHEMA_VERSION};
pub use message::{InboundMessage, Message, SourceTag};
pub use pipeline::{synthesize_issues, synthesize_issues_at};
pub use stats::Stats;
