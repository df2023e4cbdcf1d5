use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::ProblemType;
use crate::message::SourceTag;
use crate::stats::Stats;

/// Bumped whenever [`Issue::EXPORT_COLUMNS`] changes.
pub const EXPORT_SCHEMA_VERSION: u32 = 1;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueStatus {
    Resolved,
    PartiallyResolved,
    InProgress,
    Unresolved,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Resolved => "Resolved",
            IssueStatus::PartiallyResolved => "PartiallyResolved",
            IssueStatus::InProgress => "InProgress",
            IssueStatus::Unresolved => "Unresolved",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Importance {
    High,
    Medium,
    Low,
}

impl Importance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::High => "High",
            Importance::Medium => "Medium",
            Importance::Low => "Low",
        }
    }
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One synthesized ticket-like record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub date_registered: String,
    pub time_registered: String,
    pub system: String,
    pub message_count: usize,
    pub subject: String,
    pub description: String,
    pub problem_type: ProblemType,
    pub request_text: String,
    pub response_text: String,
    pub conversation_history: String,
    pub thread_position: String,
    pub status: IssueStatus,
    pub responsible: String,
    pub solution: String,
    pub date_resolved: Option<String>,
    pub time_resolved: Option<String>,
    pub importance: Importance,
    pub source: SourceTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracker_key: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Issue {
    /// Column order handed to the CSV export collaborator.
    pub const EXPORT_COLUMNS: [&'static str; 19] = [
        "dateRegistered",
        "timeRegistered",
        "system",
        "messageCount",
        "subject",
        "problemType",
        "description",
        "requestText",
        "responseText",
        "threadPosition",
        "status",
        "responsible",
        "solution",
        "dateResolved",
        "timeResolved",
        "importance",
        "conversationHistory",
        "trackerKey",
        "source",
    ];

    /// Field values in [`Issue::EXPORT_COLUMNS`] order.
    pub fn export_row(&self) -> Vec<String> {
        vec![
            self.date_registered.clone(),
            self.time_registered.clone(),
            self.system.clone(),
            self.message_count.to_string(),
            self.subject.clone(),
            self.problem_type.to_string(),
            self.description.clone(),
            self.request_text.clone(),
            self.response_text.clone(),
            self.thread_position.clone(),
            self.status.to_string(),
            self.responsible.clone(),
            self.solution.clone(),
            self.date_resolved.clone().unwrap_or_default(),
            self.time_resolved.clone().unwrap_or_default(),
            self.importance.to_string(),
            self.conversation_history.clone(),
            self.tracker_key.clone().unwrap_or_default(),
            self.source.to_string(),
        ]
    }
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisReport {
    pub issues: Vec<Issue>,
    pub stats: Stats,
}

pub fn format_date(value: &DateTime<Utc>) -> String {
    value.format(DATE_FORMAT).to_string()
}

pub fn format_time(value: &DateTime<Utc>) -> String {
    value.format(TIME_FORMAT).to_string()
}
