use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SynthesisError;
use crate::extractor::{extract_sender_email, extract_timestamp};

/// Conversation key used when neither a thread id nor a subject is available.
pub const UNKNOWN_CONVERSATION: &str = "unknown";

// Reply and forward markers seen in English, German and Ukrainian Outlook clients.
const SUBJECT_PREFIXES: [&str; 8] = ["re:", "fw:", "fwd:", "відп:", "пер:", "aw:", "wg:", "вiдп:"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SourceTag {
    #[default]
    Email,
    Jira,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Email => "Email",
            SourceTag::Jira => "Jira",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message as delivered by an ingestion adapter.
///
/// The mailbox-file adapter cannot always read a timestamp or sender address
/// from the stored item, so both are optional here and backfilled during
/// admission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    #[serde(default)]
    pub conversation_key: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub sender_email: Option<String>,
    #[serde(default)]
    pub sender_name: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub raw_body: String,
    #[serde(default)]
    pub source: SourceTag,
}

/// Canonical message consumed by the grouping and synthesis stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub conversation_key: String,
    pub subject: String,
    pub sender_email: String,
    pub sender_name: String,
    pub timestamp: DateTime<Utc>,
    pub raw_body: String,
    pub source: SourceTag,
}

impl InboundMessage {
    /// Turns an adapter message into a canonical one.
    ///
    /// `index` is the position in the batch and only feeds the error. `now`
    /// is substituted when no timestamp can be recovered from the body.
    pub fn admit(self, index: usize, now: DateTime<Utc>) -> Result<Message, SynthesisError> {
        let sender_missing = self
            .sender_email
            .as_deref()
            .map(|value| value.trim().is_empty())
            .unwrap_or(true);
        if self.subject.trim().is_empty() && self.raw_body.trim().is_empty() && sender_missing {
            return Err(SynthesisError::EmptyMessage { index });
        }

        let timestamp = self
            .timestamp
            .or_else(|| extract_timestamp(&self.raw_body))
            .unwrap_or(now);

        let sender_email = if sender_missing {
            extract_sender_email(&self.raw_body)
        } else {
            self.sender_email.unwrap_or_default().trim().to_string()
        };

        let conversation_key = self
            .conversation_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .unwrap_or_else(|| conversation_key_from_subject(&self.subject));

        Ok(Message {
            conversation_key,
            subject: self.subject,
            sender_email,
            sender_name: self.sender_name.trim().to_string(),
            timestamp,
            raw_body: self.raw_body,
            source: self.source,
        })
    }
}

impl Message {
    /// Name shown in conversation transcripts.
    pub fn display_sender(&self) -> &str {
        if !self.sender_name.is_empty() {
            &self.sender_name
        } else if !self.sender_email.is_empty() {
            &self.sender_email
        } else {
            "Unknown"
        }
    }
}

/// Derives a grouping key from a subject line by dropping reply/forward
/// prefixes and normalizing case and whitespace.
pub fn conversation_key_from_subject(subject: &str) -> String {
    let mut rest = subject.trim();
    loop {
        let lower = rest.to_lowercase();
        let Some(prefix) = SUBJECT_PREFIXES
            .iter()
            .find(|prefix| lower.starts_with(*prefix))
        else {
            break;
        };
        let prefix_chars = prefix.chars().count();
        let cut = rest
            .char_indices()
            .nth(prefix_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());
        rest = rest[cut..].trim_start();
    }

    let key = rest
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    if key.is_empty() {
        UNKNOWN_CONVERSATION.to_string()
    } else {
        key
    }
}
