//! Keyword-table classification of request text.
//!
//! Every lookup is an ordered first-match scan, so table order is part of the
//! behavior.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ResponsibleEntry;
use crate::issue::Importance;

pub const DEFAULT_SYSTEM: &str = "ESB";
pub const UNKNOWN_RESPONSIBLE: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProblemType {
    LogRequest,
    Restart,
    Error,
    Outage,
    Receipts,
    Access,
    Integration,
    Configuration,
    Monitoring,
    Analysis,
    Other,
}

impl ProblemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemType::LogRequest => "LogRequest",
            ProblemType::Restart => "Restart",
            ProblemType::Error => "Error",
            ProblemType::Outage => "Outage",
            ProblemType::Receipts => "Receipts",
            ProblemType::Access => "Access",
            ProblemType::Integration => "Integration",
            ProblemType::Configuration => "Configuration",
            ProblemType::Monitoring => "Monitoring",
            ProblemType::Analysis => "Analysis",
            ProblemType::Other => "Other",
        }
    }
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const PROBLEM_TYPE_KEYWORDS: [(ProblemType, &[&str]); 10] = [
    (ProblemType::LogRequest, &["лог", "log"]),
    (
        ProblemType::Restart,
        &["перезавантаж", "перезапуст", "restart", "reboot"],
    ),
    (
        ProblemType::Error,
        &["помилк", "error", "exception", "fail"],
    ),
    (
        ProblemType::Outage,
        &["не працює", "не відправля", "не передає", "not working", "outage"],
    ),
    (ProblemType::Receipts, &["квитанці", "receipt"]),
    (
        ProblemType::Access,
        &["доступ", "права", "access", "permission"],
    ),
    (ProblemType::Integration, &["інтеграці", "integration"]),
    (
        ProblemType::Configuration,
        &["налаштуван", "конфігураці", "config", "setup"],
    ),
    (
        ProblemType::Monitoring,
        &["ранкова перевірка", "моніторинг", "morning check", "monitoring"],
    ),
    (
        ProblemType::Analysis,
        &["аналіз", "перевірк", "analysis", "check"],
    ),
];

const HIGH_IMPORTANCE_KEYWORDS: [&str; 7] = [
    "прод",
    "prod",
    "терміново",
    "критично",
    "urgent",
    "critical",
    "високий",
];

const LOW_IMPORTANCE_KEYWORDS: [&str; 4] = ["тест", "test", "аналіз", "консультаці"];

/// First configured system name found in `text`, ignoring case.
pub fn extract_system(text: &str, known_systems: &[String]) -> String {
    let haystack = text.to_uppercase();
    known_systems
        .iter()
        .find(|system| {
            let needle = system.trim().to_uppercase();
            !needle.is_empty() && haystack.contains(&needle)
        })
        .map(|system| system.trim().to_string())
        .unwrap_or_else(|| DEFAULT_SYSTEM.to_string())
}

pub fn detect_problem_type(text: &str) -> ProblemType {
    let haystack = text.to_lowercase();
    PROBLEM_TYPE_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| haystack.contains(keyword)))
        .map(|(problem_type, _)| *problem_type)
        .unwrap_or(ProblemType::Other)
}

/// High-tier terms win over low-tier ones when both occur.
pub fn calculate_importance(text: &str) -> Importance {
    let haystack = text.to_lowercase();
    if HIGH_IMPORTANCE_KEYWORDS
        .iter()
        .any(|keyword| haystack.contains(keyword))
    {
        return Importance::High;
    }
    if LOW_IMPORTANCE_KEYWORDS
        .iter()
        .any(|keyword| haystack.contains(keyword))
    {
        return Importance::Low;
    }
    Importance::Medium
}

pub fn resolve_responsible(email: &str, directory: &[ResponsibleEntry]) -> String {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return UNKNOWN_RESPONSIBLE.to_string();
    }
    directory
        .iter()
        .find(|entry| {
            let address = entry.address.trim().to_lowercase();
            !address.is_empty() && email.contains(&address)
        })
        .map(|entry| entry.name.clone())
        .unwrap_or_else(|| UNKNOWN_RESPONSIBLE.to_string())
}

/// Whether `email` belongs to the support side.
///
/// Identifiers starting with `@` match by domain suffix; anything else
/// matches when the address equals or contains it.
pub fn is_support_sender(email: &str, support_addresses: &[String]) -> bool {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return false;
    }
    support_addresses.iter().any(|identifier| {
        let identifier = identifier.trim().to_lowercase();
        if identifier.is_empty() {
            return false;
        }
        if identifier.starts_with('@') {
            email.ends_with(&identifier)
        } else {
            email == identifier || email.contains(&identifier)
        }
    })
}

/// Configured keywords present in `text`, in configuration order.
pub fn match_keywords(text: &str, keywords: &[String]) -> Vec<String> {
    let haystack = text.to_lowercase();
    keywords
        .iter()
        .filter(|keyword| {
            let needle = keyword.trim().to_lowercase();
            !needle.is_empty() && haystack.contains(&needle)
        })
        .cloned()
        .collect()
}
