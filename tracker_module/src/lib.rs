//! Issue-tracker side of the report: tracker records in, ticket drafts out.

mod draft;
mod error;
mod ingest;

pub use draft::{drafts_from_issues, TicketDraft, DEFAULT_ISSUE_TYPE, IMPORT_LABEL};
pub use error::TrackerError;
pub use ingest::{
    issue_from_record, issues_from_tracker, parse_tracker_timestamp, records_from_json,
    StatusTransition, TrackerRecord,
};
