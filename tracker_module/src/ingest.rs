//! Maps issue-tracker records into the same issue rows the mailbox pipeline
//! produces.
//!
//! A record's status history plays the role of the message thread: the move
//! into `Assigned` registers the issue and the move into `Completed`
//! resolves it.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use synthesis_module::classifier::{detect_problem_type, extract_system, match_keywords};
use synthesis_module::issue::{format_date, format_time};
use synthesis_module::normalizer::{clean, single_line, truncate_with_ellipsis};
use synthesis_module::stats::aggregate;
use synthesis_module::{
    Importance, Issue, IssueStatus, SourceTag, SynthesisConfig, SynthesisReport,
};

use crate::error::TrackerError;

const ASSIGNED_STATUS: &str = "Assigned";
const COMPLETED_STATUS: &str = "Completed";
const COMPLETED_SOLUTION: &str = "Task completed";
const UNASSIGNED: &str = "Unassigned";
const TRACKER_THREAD_POSITION: &str = "1 of 1";

// Offsets without a colon, as the tracker REST API writes them.
const OFFSET_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";
const NAIVE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub from: String,
    pub to: String,
    pub date: String,
    #[serde(default)]
    pub author: String,
}

/// One issue as exported by the tracker, with its status changelog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerRecord {
    pub key: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    pub status: String,
    #[serde(default)]
    pub assignee: Option<String>,
    pub created: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub status_history: Vec<StatusTransition>,
}

pub fn records_from_json(json: &str) -> Result<Vec<TrackerRecord>, TrackerError> {
    Ok(serde_json::from_str(json)?)
}

/// Parses the timestamp shapes the tracker emits. Values without an offset
/// are taken as UTC.
pub fn parse_tracker_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    match DateTime::parse_from_str(value, OFFSET_TIMESTAMP_FORMAT) {
        Ok(parsed) => Ok(parsed.with_timezone(&Utc)),
        Err(_) => NaiveDateTime::parse_from_str(value, NAIVE_TIMESTAMP_FORMAT)
            .map(|naive| naive.and_utc()),
    }
}

/// Converts a batch of tracker records. Records with an unreadable
/// registration timestamp are logged and skipped.
pub fn issues_from_tracker(records: &[TrackerRecord], config: &SynthesisConfig) -> SynthesisReport {
    info!("processing {} tracker records", records.len());

    let mut issues = Vec::with_capacity(records.len());
    for record in records {
        match issue_from_record(record, config) {
            Ok(issue) => issues.push(issue),
            Err(err) => warn!("skipping tracker record: {}", err),
        }
    }
    info!("created {} issues from tracker records", issues.len());

    let stats = aggregate(&issues, records.len());
    SynthesisReport { issues, stats }
}

pub fn issue_from_record(
    record: &TrackerRecord,
    config: &SynthesisConfig,
) -> Result<Issue, TrackerError> {
    let registered = match first_transition_into(record, ASSIGNED_STATUS) {
        Some(transition) => parse_field(record, "assigned", &transition.date)?,
        None => parse_field(record, "created", &record.created)?,
    };

    let resolved = first_transition_into(record, COMPLETED_STATUS).and_then(|transition| {
        match parse_field(record, "completed", &transition.date) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("ignoring completion time: {}", err);
                None
            }
        }
    });

    let description = clean(&record.description, config.aggressive_clean);
    let classified_text = format!("{} {}", record.summary, description);
    let request_text = truncate_with_ellipsis(&single_line(&description), config.request_max_chars);
    let solution = if resolved.is_some() {
        COMPLETED_SOLUTION.to_string()
    } else {
        String::new()
    };
    let responsible = record
        .assignee
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(UNASSIGNED)
        .to_string();

    Ok(Issue {
        date_registered: format_date(&registered),
        time_registered: format_time(&registered),
        system: extract_system(&classified_text, &config.known_systems),
        message_count: record.status_history.len() + 1,
        subject: record.summary.trim().to_string(),
        description: request_text.clone(),
        problem_type: detect_problem_type(&description),
        request_text,
        response_text: solution.clone(),
        conversation_history: status_history_text(record),
        thread_position: TRACKER_THREAD_POSITION.to_string(),
        status: map_status(&record.status),
        responsible,
        solution,
        date_resolved: resolved.as_ref().map(format_date),
        time_resolved: resolved.as_ref().map(format_time),
        importance: map_priority(record.priority.as_deref()),
        source: SourceTag::Jira,
        tracker_key: Some(record.key.clone()),
        keywords: match_keywords(&classified_text, &config.keywords),
    })
}

fn first_transition_into<'a>(
    record: &'a TrackerRecord,
    status: &str,
) -> Option<&'a StatusTransition> {
    record
        .status_history
        .iter()
        .find(|transition| transition.to.trim().eq_ignore_ascii_case(status))
}

fn parse_field(
    record: &TrackerRecord,
    field: &'static str,
    value: &str,
) -> Result<DateTime<Utc>, TrackerError> {
    parse_tracker_timestamp(value).map_err(|source| TrackerError::Timestamp {
        key: record.key.clone(),
        field,
        value: value.to_string(),
        source,
    })
}

fn map_status(status: &str) -> IssueStatus {
    match status.trim().to_lowercase().as_str() {
        "completed" | "done" | "resolved" | "closed" => IssueStatus::Resolved,
        "assigned" | "in progress" => IssueStatus::InProgress,
        _ => IssueStatus::Unresolved,
    }
}

fn map_priority(priority: Option<&str>) -> Importance {
    match priority.map(|value| value.trim().to_lowercase()).as_deref() {
        Some("highest") | Some("high") => Importance::High,
        Some("low") | Some("lowest") => Importance::Low,
        _ => Importance::Medium,
    }
}

fn status_history_text(record: &TrackerRecord) -> String {
    record
        .status_history
        .iter()
        .enumerate()
        .map(|(idx, transition)| {
            let when = parse_tracker_timestamp(&transition.date)
                .map(|value| format!("{} {}", format_date(&value), format_time(&value)))
                .unwrap_or_else(|_| transition.date.clone());
            let author = if transition.author.trim().is_empty() {
                "Unknown"
            } else {
                transition.author.trim()
            };
            format!(
                "[{}] {} - {}: {} -> {}",
                idx + 1,
                when,
                author,
                transition.from,
                transition.to
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn transition(from: &str, to: &str, date: &str) -> StatusTransition {
        StatusTransition {
            from: from.to_string(),
            to: to.to_string(),
            date: date.to_string(),
            author: "Ігор Драга".to_string(),
        }
    }

    fn record() -> TrackerRecord {
        TrackerRecord {
            key: "SUP-12".to_string(),
            summary: "FICO receipts missing".to_string(),
            description: "<p>Квитанції з FICO не надходять</p>".to_string(),
            status: "Completed".to_string(),
            assignee: Some("Ігор Драга".to_string()),
            created: "2025-01-09T07:00:00.000+0000".to_string(),
            priority: Some("Highest".to_string()),
            status_history: vec![
                transition("Open", "Assigned", "2025-01-10T10:30:00.000+0200"),
                transition("Assigned", "Completed", "2025-01-11T16:45:00.000+0200"),
            ],
        }
    }

    #[test]
    fn parses_tracker_offsets() {
        let expected = Utc.with_ymd_and_hms(2025, 1, 10, 8, 30, 0).unwrap();
        assert_eq!(
            parse_tracker_timestamp("2025-01-10T10:30:00.000+0200").unwrap(),
            expected
        );
        assert_eq!(
            parse_tracker_timestamp("2025-01-10T10:30:00+02:00").unwrap(),
            expected
        );
        assert_eq!(
            parse_tracker_timestamp("2025-01-10T08:30:00").unwrap(),
            expected
        );
        assert!(parse_tracker_timestamp("yesterday").is_err());
    }

    #[test]
    fn completed_record_maps_to_resolved_issue() {
        let config = SynthesisConfig::default();
        let issue = issue_from_record(&record(), &config).unwrap();
        assert_eq!(issue.date_registered, "2025-01-10");
        assert_eq!(issue.time_registered, "08:30:00");
        assert_eq!(issue.date_resolved.as_deref(), Some("2025-01-11"));
        assert_eq!(issue.time_resolved.as_deref(), Some("14:45:00"));
        assert_eq!(issue.status, IssueStatus::Resolved);
        assert_eq!(issue.importance, Importance::High);
        assert_eq!(issue.system, "FICO");
        assert_eq!(issue.message_count, 3);
        assert_eq!(issue.solution, "Task completed");
        assert_eq!(issue.description, "Квитанції з FICO не надходять");
        assert_eq!(issue.source, SourceTag::Jira);
        assert_eq!(issue.tracker_key.as_deref(), Some("SUP-12"));
        assert!(issue
            .conversation_history
            .starts_with("[1] 2025-01-10 08:30:00 - Ігор Драга: Open -> Assigned"));
    }

    #[test]
    fn unassigned_open_record_uses_created_time() {
        let mut rec = record();
        rec.status = "Open".to_string();
        rec.assignee = None;
        rec.priority = Some("Low".to_string());
        rec.status_history.clear();

        let issue = issue_from_record(&rec, &SynthesisConfig::default()).unwrap();
        assert_eq!(issue.date_registered, "2025-01-09");
        assert_eq!(issue.time_registered, "07:00:00");
        assert_eq!(issue.status, IssueStatus::Unresolved);
        assert_eq!(issue.importance, Importance::Low);
        assert_eq!(issue.responsible, "Unassigned");
        assert!(issue.solution.is_empty());
        assert!(issue.date_resolved.is_none());
        assert_eq!(issue.message_count, 1);
    }

    #[test]
    fn status_and_priority_tables() {
        assert_eq!(map_status("Done"), IssueStatus::Resolved);
        assert_eq!(map_status("Closed"), IssueStatus::Resolved);
        assert_eq!(map_status("In Progress"), IssueStatus::InProgress);
        assert_eq!(map_status("Assigned"), IssueStatus::InProgress);
        assert_eq!(map_status("Waiting for customer"), IssueStatus::Unresolved);
        assert_eq!(map_priority(Some("High")), Importance::High);
        assert_eq!(map_priority(Some("Lowest")), Importance::Low);
        assert_eq!(map_priority(Some("Medium")), Importance::Medium);
        assert_eq!(map_priority(None), Importance::Medium);
    }

    #[test]
    fn bad_registration_time_skips_only_that_record() {
        let mut broken = record();
        broken.key = "SUP-13".to_string();
        broken.status_history[0].date = "not a date".to_string();

        let report = issues_from_tracker(&[record(), broken], &SynthesisConfig::default());
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.stats.total_threads, 2);
        assert_eq!(report.stats.resolved, 1);
    }

    #[test]
    fn bad_completion_time_leaves_issue_open_dated() {
        let mut rec = record();
        rec.status_history[1].date = "soon".to_string();
        let issue = issue_from_record(&rec, &SynthesisConfig::default()).unwrap();
        assert!(issue.date_resolved.is_none());
        assert!(issue.solution.is_empty());
        assert!(issue.conversation_history.contains("soon"));
    }
}
