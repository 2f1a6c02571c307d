use std::path::PathBuf;

use proptest::prelude::*;

use mdmcheck_recon::model::{OverrideOutcome, Severity, VerdictKind};
use mdmcheck_recon::payload::TccValues;
use mdmcheck_recon::{
    check, load_input, parse_document, DocumentKind, DocumentSet, Payload, ReconResult,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load(name: &str) -> plist::Value {
    let path = fixtures_dir().join(name);
    let bytes = std::fs::read(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    parse_document(&bytes, name).unwrap()
}

fn run_fixtures(with_overrides: bool) -> ReconResult {
    let installed = load("profiles.xml");
    let template = load("template.mobileconfig");
    let overrides = load("overrides.plist");
    let docs = DocumentSet {
        installed: &installed,
        installed_source: "profiles.xml",
        template: &template,
        template_source: "template.mobileconfig",
        overrides: with_overrides.then_some(&overrides),
        overrides_source: "MDMOverrides.plist",
    };
    check(&docs).unwrap()
}

fn kinds(result: &ReconResult) -> Vec<(String, VerdictKind)> {
    result
        .verdicts
        .iter()
        .map(|v| (v.expected.to_string(), v.kind))
        .collect()
}

// -------------------------------------------------------------------------
// Full runs
// -------------------------------------------------------------------------

#[test]
fn verdicts_follow_template_order() {
    let result = run_fixtures(true);
    let tcc = "com.apple.TCC.configuration-profile-policy/SystemPolicyAllFiles";

    assert_eq!(
        kinds(&result),
        vec![
            (format!("{tcc} (com.microsoft.wdav)"), VerdictKind::Ok),
            (format!("{tcc} (com.microsoft.wdav.epsext)"), VerdictKind::AmbiguousDuplicate),
            (format!("{tcc} (com.microsoft.dlp.daemon)"), VerdictKind::Missing),
            ("com.apple.syspolicy.kernel-extension-policy (UBF8T346G9)".to_string(), VerdictKind::Ok),
            (
                "com.apple.system-extension-policy (UBF8T346G9, com.microsoft.wdav.epsext)".to_string(),
                VerdictKind::Ok
            ),
            (
                "com.apple.system-extension-policy (UBF8T346G9, com.microsoft.wdav.netext)".to_string(),
                VerdictKind::Missing
            ),
            ("com.apple.webcontent-filter (com.microsoft.wdav.netext)".to_string(), VerdictKind::Ok),
            ("com.apple.notificationsettings (com.microsoft.wdav.tray)".to_string(), VerdictKind::ValueMismatch),
        ]
    );
}

#[test]
fn summary_counts_and_severity() {
    let result = run_fixtures(true);
    let s = &result.summary;
    assert_eq!(s.expected, 8);
    assert_eq!(s.ok, 4);
    assert_eq!(s.missing, 2);
    assert_eq!(s.value_mismatches, 1);
    assert_eq!(s.override_mismatches, 0);
    assert_eq!(s.duplicates, 1);
    assert_eq!(s.severity, Severity::Error);
    assert!(result.meta.override_store_present);
}

#[test]
fn duplicate_candidates_carry_labels() {
    let result = run_fixtures(true);
    let dup = &result.verdicts[1];
    assert_eq!(dup.kind, VerdictKind::AmbiguousDuplicate);

    let labels: Vec<_> = dup
        .candidates
        .iter()
        .map(|c| (c.location.profile_name.as_str(), c.matches_expected, c.in_override_store))
        .collect();
    assert_eq!(
        labels,
        [
            ("Defender Full Disk Access", true, Some(true)),
            ("Legacy Full Disk Access", false, Some(false)),
        ]
    );
}

#[test]
fn value_mismatch_reports_both_sides() {
    let result = run_fixtures(true);
    let mismatch = &result.verdicts[7];
    assert_eq!(mismatch.kind, VerdictKind::ValueMismatch);
    assert_eq!(mismatch.candidates.len(), 1);
    assert_ne!(&mismatch.candidates[0].values, mismatch.expected.values());
    assert_eq!(mismatch.candidates[0].location.profile_name, "Defender Notifications");
}

#[test]
fn missing_override_store_downgrades_tcc_ok() {
    let result = run_fixtures(false);
    let first = &result.verdicts[0];
    assert_eq!(first.kind, VerdictKind::OverrideMismatch);
    assert_eq!(first.override_outcome, Some(OverrideOutcome::NotInStore));
    assert!(!result.meta.override_store_present);
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.document == DocumentKind::Overrides && d.severity == Severity::Warning));
}

#[test]
fn malformed_onboarding_is_contained() {
    let result = run_fixtures(true);

    // The broken item is reported ...
    let errors: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("Broken Onboarding"));

    // ... the good onboarding profile still counts, and so does the other item
    // in the broken profile.
    assert_eq!(result.onboarding.kind, VerdictKind::Ok);
    assert_eq!(result.onboarding.entries[0].profile_name, "Defender Onboarding");

    let installed = load("profiles.xml");
    let template = load("template.mobileconfig");
    let input = load_input(&DocumentSet {
        installed: &installed,
        installed_source: "profiles.xml",
        template: &template,
        template_source: "template.mobileconfig",
        overrides: None,
        overrides_source: "MDMOverrides.plist",
    })
    .unwrap();
    let sibling = Payload::system_extension("UBF8T346G9", "com.microsoft.dlp.daemon.ext");
    let entries = input.installed.get(sibling.identity());
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].location.profile_name, "Broken Onboarding");
}

#[test]
fn unknown_template_item_warns() {
    let result = run_fixtures(true);
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.document == DocumentKind::Template && d.message.contains("com.apple.security.firewall")));
}

#[test]
fn reconciliation_is_idempotent() {
    let first = run_fixtures(true);
    let second = run_fixtures(true);
    let strip = |r: &ReconResult| serde_json::to_value(&r.verdicts).unwrap();
    assert_eq!(strip(&first), strip(&second));
    assert_eq!(kinds(&first), kinds(&second));
}

#[test]
fn json_report_shape() {
    let result = run_fixtures(true);
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["verdicts"][0]["kind"], "ok");
    assert_eq!(json["verdicts"][0]["override_outcome"]["status"], "reflected");
    assert_eq!(json["verdicts"][2]["kind"], "missing");
    assert_eq!(json["onboarding"]["kind"], "ok");
    assert_eq!(
        json["verdicts"][0]["expected"]["identity"]["payload_type"],
        "com.apple.TCC.configuration-profile-policy"
    );
}

#[test]
fn unparsable_document_fails() {
    let err = parse_document(b"not a plist", "garbage").unwrap_err();
    assert!(err.to_string().contains("garbage"));
}

// -------------------------------------------------------------------------
// Identity vs. value independence
// -------------------------------------------------------------------------

fn tcc_strategy() -> impl Strategy<Value = TccValues> {
    (any::<bool>(), "[a-z]{1,8}", "[a-zA-Z]{1,8}", "[a-z.]{1,12}").prop_map(
        |(allowed, code_requirement, identifier_type, identifier)| TccValues {
            allowed,
            code_requirement,
            identifier_type,
            identifier,
        },
    )
}

proptest! {
    #[test]
    fn equality_iff_identity_matches(a in tcc_strategy(), b in tcc_strategy()) {
        let pa = Payload::system_policy_all_files(a.clone());
        let pb = Payload::system_policy_all_files(b.clone());
        prop_assert_eq!(pa == pb, a.identifier == b.identifier);
        prop_assert_eq!(pa == pb, pa.identity() == pb.identity());
    }

    #[test]
    fn keyed_kinds_ignore_values(team in "[A-Z0-9]{10}", x in "[a-z]{1,6}", y in "[a-z]{1,6}") {
        let a = Payload::notification_settings(&team, plist::Value::String(x));
        let b = Payload::notification_settings(&team, plist::Value::String(y));
        prop_assert_eq!(&a, &b);
        prop_assert_ne!(Payload::kernel_extension(&team), a);
    }
}
