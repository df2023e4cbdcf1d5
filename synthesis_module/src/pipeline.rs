use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::SynthesisConfig;
use crate::grouper::group_by_conversation;
use crate::issue::SynthesisReport;
use crate::message::{InboundMessage, Message};
use crate::stats::aggregate;
use crate::synthesizer::synthesize_thread;

/// Runs the whole batch: admission, grouping, synthesis and statistics.
///
/// Never fails. Items that cannot be admitted are logged and skipped.
pub fn synthesize_issues(
    messages: Vec<InboundMessage>,
    config: &SynthesisConfig,
) -> SynthesisReport {
    synthesize_issues_at(messages, config, Utc::now())
}

/// Same as [`synthesize_issues`] with an explicit substitute for timestamps
/// that cannot be recovered.
pub fn synthesize_issues_at(
    messages: Vec<InboundMessage>,
    config: &SynthesisConfig,
    now: DateTime<Utc>,
) -> SynthesisReport {
    info!("synthesizing issues from {} messages", messages.len());

    let mut admitted: Vec<Message> = Vec::with_capacity(messages.len());
    let mut skipped = 0usize;
    for (index, inbound) in messages.into_iter().enumerate() {
        match inbound.admit(index, now) {
            Ok(message) => admitted.push(message),
            Err(err) => {
                skipped += 1;
                warn!("skipping message: {}", err);
            }
        }
    }
    if skipped > 0 {
        info!("skipped {} messages that could not be admitted", skipped);
    }

    let threads = group_by_conversation(admitted);
    info!("grouped into {} conversations", threads.len());

    let mut issues = Vec::new();
    for thread in &threads {
        let produced = synthesize_thread(thread, config);
        debug!(
            "conversation '{}': {} messages, {} issues",
            thread.key,
            thread.len(),
            produced.len()
        );
        issues.extend(produced);
    }
    info!("created {} issues", issues.len());

    let stats = aggregate(&issues, threads.len());
    SynthesisReport { issues, stats }
}
