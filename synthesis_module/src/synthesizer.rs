//! Turns one sorted conversation thread into issues.
//!
//! Each support-side message closes the message right before it (or the
//! thread's first message when the response opens the thread). A thread with
//! no support-side message produces nothing. When counterpart messages
//! follow the last support response, one extra unresolved issue is emitted
//! for the first of them.

use crate::classifier::{
    calculate_importance, detect_problem_type, extract_system, is_support_sender,
    match_keywords, resolve_responsible, UNKNOWN_RESPONSIBLE,
};
use crate::config::SynthesisConfig;
use crate::grouper::Thread;
use crate::issue::{format_date, format_time, Importance, Issue, IssueStatus};
use crate::message::Message;
use crate::normalizer::{clean, single_line, truncate_with_ellipsis};

/// Thread position of the trailing unanswered request.
pub const OPEN_THREAD_POSITION: &str = "open";

const HISTORY_MIN_CHARS: usize = 10;
const HISTORY_SEPARATOR: &str = "\n\n---\n\n";

/// A thread message together with its cleaned body and side.
struct Entry<'a> {
    message: &'a Message,
    body: String,
    from_support: bool,
}

pub fn synthesize_thread(thread: &Thread<Message>, config: &SynthesisConfig) -> Vec<Issue> {
    let entries: Vec<Entry<'_>> = thread
        .messages
        .iter()
        .map(|message| Entry {
            message,
            body: clean(&message.raw_body, config.aggressive_clean),
            from_support: is_support_sender(&message.sender_email, &config.support_addresses),
        })
        .collect();

    let responses: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.from_support)
        .map(|(idx, _)| idx)
        .collect();
    let Some(&last_response) = responses.last() else {
        return Vec::new();
    };

    let history = conversation_history(&entries, config.history_entry_max_chars);
    let message_count = entries.len();
    let mut issues = Vec::with_capacity(responses.len() + 1);

    for (ordinal, &response_idx) in responses.iter().enumerate() {
        let request = &entries[response_idx.saturating_sub(1)];
        let response = &entries[response_idx];

        let mut issue = base_issue(request, &history, message_count, config);
        let response_text = truncate_with_ellipsis(
            &single_line(&response.body),
            config.response_max_chars,
        );
        issue.response_text = response_text.clone();
        issue.solution = response_text;
        issue.thread_position = format!("{} of {}", ordinal + 1, responses.len());
        issue.status = IssueStatus::Resolved;
        issue.responsible =
            resolve_responsible(&response.message.sender_email, &config.responsible);
        issue.date_resolved = Some(format_date(&response.message.timestamp));
        issue.time_resolved = Some(format_time(&response.message.timestamp));
        issues.push(issue);
    }

    // Everything after the last response is counterpart-side.
    if let Some(open_request) = entries.get(last_response + 1) {
        let mut issue = base_issue(open_request, &history, message_count, config);
        issue.thread_position = OPEN_THREAD_POSITION.to_string();
        issue.status = IssueStatus::Unresolved;
        issue.importance = Importance::High;
        issue.responsible = UNKNOWN_RESPONSIBLE.to_string();
        issues.push(issue);
    }

    issues
}

/// Fields derived from the request side alone.
fn base_issue(
    request: &Entry<'_>,
    history: &str,
    message_count: usize,
    config: &SynthesisConfig,
) -> Issue {
    let message = request.message;
    let subject = message.subject.trim().to_string();
    let classified_text = format!("{} {}", subject, request.body);
    let request_text =
        truncate_with_ellipsis(&single_line(&request.body), config.request_max_chars);

    Issue {
        date_registered: format_date(&message.timestamp),
        time_registered: format_time(&message.timestamp),
        system: extract_system(&classified_text, &config.known_systems),
        message_count,
        subject,
        description: request_text.clone(),
        problem_type: detect_problem_type(&request.body),
        request_text,
        response_text: String::new(),
        conversation_history: history.to_string(),
        thread_position: String::new(),
        status: IssueStatus::Unresolved,
        responsible: UNKNOWN_RESPONSIBLE.to_string(),
        solution: String::new(),
        date_resolved: None,
        time_resolved: None,
        importance: calculate_importance(&classified_text),
        source: message.source,
        tracker_key: None,
        keywords: match_keywords(&classified_text, &config.keywords),
    }
}

fn conversation_history(entries: &[Entry<'_>], max_chars: usize) -> String {
    entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.body.chars().count() >= HISTORY_MIN_CHARS)
        .map(|(idx, entry)| {
            format!(
                "[{}] {} {} - {}:\n{}",
                idx + 1,
                format_date(&entry.message.timestamp),
                format_time(&entry.message.timestamp),
                entry.message.display_sender(),
                truncate_with_ellipsis(&entry.body, max_chars)
            )
        })
        .collect::<Vec<_>>()
        .join(HISTORY_SEPARATOR)
}
