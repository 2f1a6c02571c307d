use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::diagnostics::Diagnostic;
use crate::overrides::OverrideStore;
use crate::payload::{Identity, Payload, PayloadType, PayloadValues, TccValues};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Where an installed payload came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub source: String,
    /// Enrollment level, e.g. `_computerlevel` or a user name.
    pub level: String,
    pub profile_name: String,
    pub installed_at: Option<DateTime<Utc>>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, profile: \"{}\", deployed: ", self.source, self.profile_name)?;
        match self.installed_at {
            Some(at) => write!(f, "{}", at.format("%Y-%m-%d %H:%M:%S %z")),
            None => write!(f, "unknown"),
        }
    }
}

/// One installed payload together with the profile that carries it.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileEntry {
    pub payload: Payload,
    pub location: Location,
}

/// Installed payloads grouped by identity.
///
/// Entries under one identity keep document traversal order, so competing
/// definitions are listed first-seen-first.
#[derive(Debug, Clone, Default)]
pub struct InstalledProfiles {
    entries: BTreeMap<Identity, Vec<ProfileEntry>>,
}

impl InstalledProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ProfileEntry) {
        self.entries
            .entry(entry.payload.identity().clone())
            .or_default()
            .push(entry);
    }

    pub fn get(&self, identity: &Identity) -> &[ProfileEntry] {
        self.entries.get(identity).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every entry of the given payload type, in key order then traversal order.
    pub fn of_type(&self, payload_type: PayloadType) -> Vec<&ProfileEntry> {
        self.entries
            .iter()
            .filter(|(k, _)| k.payload_type == payload_type)
            .flat_map(|(_, v)| v.iter())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Identity, &[ProfileEntry])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Number of distinct identities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The three parsed collections, read-only during reconciliation.
#[derive(Debug)]
pub struct ReconInput {
    pub installed: InstalledProfiles,
    pub expected: Vec<Payload>,
    pub overrides: OverrideStore,
    pub sources: SourceNames,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceNames {
    pub installed: String,
    pub template: String,
    pub overrides: String,
}

// ---------------------------------------------------------------------------
// Verdicts
// ---------------------------------------------------------------------------

/// Ordered from best to worst so the overall severity is a `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "OK"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictKind {
    Ok,
    Missing,
    ValueMismatch,
    OverrideMismatch,
    AmbiguousDuplicate,
}

impl VerdictKind {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Ok => Severity::Success,
            Self::ValueMismatch | Self::OverrideMismatch | Self::AmbiguousDuplicate => {
                Severity::Warning
            }
            Self::Missing => Severity::Error,
        }
    }
}

impl fmt::Display for VerdictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Missing => write!(f, "missing"),
            Self::ValueMismatch => write!(f, "value_mismatch"),
            Self::OverrideMismatch => write!(f, "override_mismatch"),
            Self::AmbiguousDuplicate => write!(f, "ambiguous_duplicate"),
        }
    }
}

/// One installed definition competing for an expected identity.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub location: Location,
    pub values: PayloadValues,
    pub matches_expected: bool,
    /// `None` when the payload kind is not cross-checked against the override store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_override_store: Option<bool>,
}

/// What the override store says about an expected SystemPolicyAllFiles grant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OverrideOutcome {
    /// The store enforces exactly the expected values.
    Reflected,
    /// The store has the identity with other values.
    Differs { enforced: TccValues },
    /// The store is absent or has no record for the identity.
    NotInStore,
}

#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub expected: Payload,
    pub kind: VerdictKind,
    pub candidates: Vec<Candidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_outcome: Option<OverrideOutcome>,
}

/// Result of the onboarding singleton scan.
#[derive(Debug, Clone, Serialize)]
pub struct OnboardingVerdict {
    pub kind: VerdictKind,
    pub entries: Vec<Location>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReconSummary {
    pub expected: usize,
    pub ok: usize,
    pub missing: usize,
    pub value_mismatches: usize,
    pub override_mismatches: usize,
    pub duplicates: usize,
    pub diagnostic_warnings: usize,
    pub diagnostic_errors: usize,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub engine_version: String,
    pub run_at: String,
    pub sources: SourceNames,
    pub override_store_present: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub verdicts: Vec<Verdict>,
    pub onboarding: OnboardingVerdict,
    pub diagnostics: Vec<Diagnostic>,
}

impl ReconResult {
    /// Worst severity across verdicts, the onboarding check and diagnostics.
    pub fn severity(&self) -> Severity {
        self.summary.severity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn location(name: &str) -> Location {
        Location {
            source: "/tmp/profiles.xml".into(),
            level: "_computerlevel".into(),
            profile_name: name.into(),
            installed_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).single(),
        }
    }

    #[test]
    fn location_format() {
        assert_eq!(
            location("Defender").to_string(),
            "/tmp/profiles.xml, profile: \"Defender\", deployed: 2026-03-01 09:30:00 +0000"
        );
    }

    #[test]
    fn installed_groups_by_identity_in_order() {
        let mut installed = InstalledProfiles::new();
        installed.push(ProfileEntry {
            payload: Payload::kernel_extension("UBF8T346G9"),
            location: location("first"),
        });
        installed.push(ProfileEntry {
            payload: Payload::kernel_extension("OTHER"),
            location: location("other"),
        });
        installed.push(ProfileEntry {
            payload: Payload::kernel_extension("UBF8T346G9"),
            location: location("second"),
        });

        let entries = installed.get(Payload::kernel_extension("UBF8T346G9").identity());
        let names: Vec<_> = entries.iter().map(|e| e.location.profile_name.as_str()).collect();
        assert_eq!(names, ["first", "second"]);
        assert_eq!(installed.len(), 2);
        assert_eq!(installed.of_type(PayloadType::KernelExtensionPolicy).len(), 3);
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Success);
        assert_eq!(VerdictKind::Missing.severity(), Severity::Error);
        assert_eq!(VerdictKind::AmbiguousDuplicate.severity(), Severity::Warning);
    }
}
