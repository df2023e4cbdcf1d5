use serde::{Deserialize, Serialize};

use crate::issue::{Issue, IssueStatus};

/// Counters reported alongside a batch of issues.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_threads: usize,
    pub total: usize,
    pub resolved: usize,
    pub partial: usize,
    /// Open issues: in progress plus unresolved.
    pub in_progress: usize,
    /// One decimal place, `"0"` for an empty batch.
    pub avg_messages_per_issue: String,
}

pub fn aggregate(issues: &[Issue], total_threads: usize) -> Stats {
    let mut stats = Stats {
        total_threads,
        total: issues.len(),
        ..Stats::default()
    };
    for issue in issues {
        match issue.status {
            IssueStatus::Resolved => stats.resolved += 1,
            IssueStatus::PartiallyResolved => stats.partial += 1,
            IssueStatus::InProgress | IssueStatus::Unresolved => stats.in_progress += 1,
        }
    }

    stats.avg_messages_per_issue = if issues.is_empty() {
        "0".to_string()
    } else {
        let messages: usize = issues.iter().map(|issue| issue.message_count).sum();
        format!("{:.1}", messages as f64 / issues.len() as f64)
    };
    stats
}
