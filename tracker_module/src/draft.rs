use serde::{Deserialize, Serialize};
use serde_json::json;

use synthesis_module::classifier::UNKNOWN_RESPONSIBLE;
use synthesis_module::{Issue, IssueStatus};

pub const IMPORT_LABEL: &str = "email-import";
pub const DEFAULT_ISSUE_TYPE: &str = "Task";
const DEFAULT_SUMMARY: &str = "Support request from email";

/// Everything the tracker export collaborator needs to create one remote
/// ticket. Assignee lookup, transitions and throttling happen on its side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDraft {
    pub project_key: String,
    pub summary: String,
    pub description: String,
    pub issue_type: String,
    pub priority: String,
    pub labels: Vec<String>,
    /// Display name to resolve into a tracker account.
    pub assignee_hint: Option<String>,
    /// Transition the ticket to `Completed` right after creation.
    pub complete_on_create: bool,
}

impl TicketDraft {
    pub fn from_issue(issue: &Issue, project_key: &str) -> Self {
        let summary = match issue.subject.trim() {
            "" => DEFAULT_SUMMARY.to_string(),
            subject => subject.to_string(),
        };

        let mut labels = vec![IMPORT_LABEL.to_string()];
        let system = issue.system.trim();
        if !system.is_empty() {
            labels.push(system.to_lowercase());
        }

        let assignee_hint = match issue.responsible.trim() {
            "" | UNKNOWN_RESPONSIBLE => None,
            name => Some(name.to_string()),
        };

        Self {
            project_key: project_key.to_string(),
            summary,
            description: wiki_description(issue),
            issue_type: DEFAULT_ISSUE_TYPE.to_string(),
            priority: issue.importance.as_str().to_string(),
            labels,
            assignee_hint,
            complete_on_create: issue.status == IssueStatus::Resolved,
        }
    }

    /// Create-issue request body in the tracker's REST shape.
    pub fn create_payload(&self) -> serde_json::Value {
        json!({
            "fields": {
                "project": { "key": self.project_key },
                "summary": self.summary,
                "description": self.description,
                "issuetype": { "name": self.issue_type },
                "priority": { "name": self.priority },
                "labels": self.labels,
            }
        })
    }
}

pub fn drafts_from_issues(issues: &[Issue], project_key: &str) -> Vec<TicketDraft> {
    issues
        .iter()
        .map(|issue| TicketDraft::from_issue(issue, project_key))
        .collect()
}

fn wiki_description(issue: &Issue) -> String {
    let mut desc = String::from("h2. Request details\n\n");
    desc.push_str(&format!(
        "*Date:* {} {}\n",
        issue.date_registered, issue.time_registered
    ));
    desc.push_str(&format!("*System:* {}\n", issue.system));
    desc.push_str(&format!("*Messages:* {}\n", issue.message_count.max(1)));
    desc.push_str(&format!("*Importance:* {}\n\n", issue.importance));
    desc.push_str(&format!("h2. Description\n\n{}\n", issue.description));
    if !issue.solution.is_empty() {
        desc.push_str(&format!("\nh2. Solution\n\n{}\n", issue.solution));
    }
    desc
}
