//! Builds an issue report from a JSON batch of inbound messages.

use std::env;
use std::fs;
use std::process::exit;

use synthesis_module::{synthesize_issues, InboundMessage, SynthesisConfig};
use tracing::info;

fn print_usage() {
    eprintln!(
        r##"Usage: issue-report <messages.json> [--out <report.json>]

Reads a JSON array of inbound messages, reconstructs support issues and
prints the report as JSON (to stdout unless --out is given).

Environment Variables:
  ISSUE_CONFIG_PATH  - (optional) TOML config file
  SUPPORT_EMAILS     - comma-separated support addresses or @domains
  KEYWORDS           - comma-separated keywords to record on issues
  KNOWN_SYSTEMS      - comma-separated system names, in match order
  AGGRESSIVE_CLEAN   - true/1/yes for encoding-damaged mailboxes
"##
    );
}

fn parse_arg(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{}=", flag);
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            return Some(value.to_string());
        }
        if arg == flag {
            return args.get(idx + 1).cloned();
        }
    }
    None
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_target(false).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args[1].starts_with("--") {
        print_usage();
        exit(1);
    }

    let config = SynthesisConfig::from_env()?;
    let content = fs::read_to_string(&args[1])?;
    let messages: Vec<InboundMessage> = serde_json::from_str(&content)?;

    let report = synthesize_issues(messages, &config);
    let json = serde_json::to_string_pretty(&report)?;

    match parse_arg(&args, "--out") {
        Some(path) => {
            fs::write(&path, json)?;
            info!("wrote {} issues to {}", report.issues.len(), path);
        }
        None => println!("{}", json),
    }
    Ok(())
}
