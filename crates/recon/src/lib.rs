//! `mdmcheck-recon`: reconciles installed MDM profiles against an expected template.
//!
//! Pure engine crate: receives parsed plist documents, returns verdicts.
//! No process, network or terminal dependencies.

mod access;
pub mod classify;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod extract;
pub mod matcher;
pub mod model;
pub mod overrides;
pub mod payload;
pub mod profiles;
pub mod template;

pub use diagnostics::{Diagnostic, DocumentKind};
pub use engine::{check, load_input, run, DocumentSet};
pub use error::ReconError;
pub use model::{
    Candidate, InstalledProfiles, Location, OnboardingVerdict, OverrideOutcome, ProfileEntry,
    ReconInput, ReconResult, ReconSummary, Severity, Verdict, VerdictKind,
};
pub use overrides::{OverrideRecord, OverrideStore};
pub use payload::{Identity, Payload, PayloadType, PayloadValues};

/// Parse a plist document (XML or binary) from bytes.
pub fn parse_document(bytes: &[u8], source: &str) -> Result<plist::Value, ReconError> {
    plist::Value::from_reader(std::io::Cursor::new(bytes))
        .map_err(|e| ReconError::document(source, e.to_string()))
}
