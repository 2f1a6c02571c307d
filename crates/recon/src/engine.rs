use plist::Value;

use crate::classify::{classify, classify_onboarding};
use crate::diagnostics::Diagnostics;
use crate::error::ReconError;
use crate::evidence::compute_summary;
use crate::matcher::{match_candidates, override_outcome};
use crate::model::{
    InstalledProfiles, OnboardingVerdict, ReconInput, ReconMeta, ReconResult, SourceNames, Verdict,
};
use crate::overrides::{parse_overrides, OverrideStore};
use crate::payload::{Payload, PayloadType};
use crate::profiles::parse_installed;
use crate::template::parse_expected;

/// The three parsed documents plus names to report them by.
pub struct DocumentSet<'a> {
    pub installed: &'a Value,
    pub installed_source: &'a str,
    pub template: &'a Value,
    pub template_source: &'a str,
    /// `None` when the override store could not be read.
    pub overrides: Option<&'a Value>,
    pub overrides_source: &'a str,
}

/// Parse the three documents into reconciliation input.
pub fn load_input(docs: &DocumentSet<'_>) -> Result<ReconInput, ReconError> {
    let mut diags = Diagnostics::new();
    let installed = parse_installed(docs.installed, docs.installed_source, &mut diags)?;
    let expected = parse_expected(docs.template, docs.template_source, &mut diags)?;
    let overrides = parse_overrides(docs.overrides, docs.overrides_source, &mut diags)?;

    Ok(ReconInput {
        installed,
        expected,
        overrides,
        sources: SourceNames {
            installed: docs.installed_source.to_string(),
            template: docs.template_source.to_string(),
            overrides: docs.overrides_source.to_string(),
        },
        diagnostics: diags.into_vec(),
    })
}

/// Parse and reconcile in one step.
pub fn check(docs: &DocumentSet<'_>) -> Result<ReconResult, ReconError> {
    let input = load_input(docs)?;
    Ok(run(&input))
}

/// Run reconciliation. Returns one verdict per expected payload + summary.
pub fn run(input: &ReconInput) -> ReconResult {
    let verdicts: Vec<Verdict> = input
        .expected
        .iter()
        .map(|expected| reconcile_one(expected, &input.installed, &input.overrides))
        .collect();

    let onboarding = check_onboarding(&input.installed);
    let summary = compute_summary(&verdicts, &onboarding, &input.diagnostics);

    ReconResult {
        meta: ReconMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            sources: input.sources.clone(),
            override_store_present: input.overrides.is_present(),
        },
        summary,
        verdicts,
        onboarding,
        diagnostics: input.diagnostics.clone(),
    }
}

/// Verdict for a single expected payload.
pub fn reconcile_one(
    expected: &Payload,
    installed: &InstalledProfiles,
    overrides: &OverrideStore,
) -> Verdict {
    let entries = installed.get(expected.identity());
    let override_check = expected.identity().needs_override_check();
    let record = if override_check { overrides.get(expected.identity()) } else { None };

    let candidates = match_candidates(expected, entries, override_check, record);
    let outcome = (override_check && !candidates.is_empty()).then(|| override_outcome(expected, record));
    let kind = classify(&candidates, outcome.as_ref());

    log::debug!("{expected}: {kind} ({} candidate(s))", candidates.len());

    Verdict { expected: expected.clone(), kind, candidates, override_outcome: outcome }
}

/// The onboarding blob is a singleton across every installed profile.
pub fn check_onboarding(installed: &InstalledProfiles) -> OnboardingVerdict {
    let entries: Vec<_> = installed
        .of_type(PayloadType::ManagedClientPreferences)
        .into_iter()
        .map(|e| e.location.clone())
        .collect();
    OnboardingVerdict { kind: classify_onboarding(entries.len()), entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Location, OverrideOutcome, ProfileEntry, VerdictKind};
    use crate::overrides::parse_overrides;
    use crate::payload::TccValues;
    use plist::Dictionary;

    fn values(allowed: bool) -> TccValues {
        TccValues {
            allowed,
            code_requirement: "identifier \"com.microsoft.wdav\"".into(),
            identifier_type: "bundleID".into(),
            identifier: "com.microsoft.wdav".into(),
        }
    }

    fn location(name: &str) -> Location {
        Location {
            source: "p".into(),
            level: "_computerlevel".into(),
            profile_name: name.into(),
            installed_at: None,
        }
    }

    fn installed_with(payloads: Vec<(Payload, &str)>) -> InstalledProfiles {
        let mut installed = InstalledProfiles::new();
        for (payload, name) in payloads {
            installed.push(ProfileEntry { payload, location: location(name) });
        }
        installed
    }

    fn store_with(values: Option<TccValues>) -> OverrideStore {
        let mut root = Dictionary::new();
        if let Some(v) = values {
            let mut grant = Dictionary::new();
            grant.insert("Allowed".into(), plist::Value::Boolean(v.allowed));
            grant.insert("CodeRequirement".into(), plist::Value::String(v.code_requirement));
            grant.insert("IdentifierType".into(), plist::Value::String(v.identifier_type));
            grant.insert("Identifier".into(), plist::Value::String(v.identifier.clone()));
            let mut entry = Dictionary::new();
            entry.insert(
                crate::overrides::OVERRIDE_SERVICE_KEY.into(),
                plist::Value::Dictionary(grant),
            );
            root.insert(v.identifier, plist::Value::Dictionary(entry));
        }
        let doc = plist::Value::Dictionary(root);
        parse_overrides(Some(&doc), "o", &mut Diagnostics::new()).unwrap()
    }

    #[test]
    fn single_match_without_override_requirement_is_ok() {
        let expected = Payload::kernel_extension("UBF8T346G9");
        let installed = installed_with(vec![(Payload::kernel_extension("UBF8T346G9"), "kext")]);
        let v = reconcile_one(&expected, &installed, &OverrideStore::absent());
        assert_eq!(v.kind, VerdictKind::Ok);
        assert_eq!(v.candidates[0].location.profile_name, "kext");
        assert!(v.override_outcome.is_none());
    }

    #[test]
    fn tcc_reflected_in_store_is_ok() {
        let expected = Payload::system_policy_all_files(values(true));
        let installed = installed_with(vec![(Payload::system_policy_all_files(values(true)), "fda")]);
        let v = reconcile_one(&expected, &installed, &store_with(Some(values(true))));
        assert_eq!(v.kind, VerdictKind::Ok);
        assert_eq!(v.override_outcome, Some(OverrideOutcome::Reflected));
    }

    #[test]
    fn tcc_absent_from_store_is_override_mismatch() {
        let expected = Payload::system_policy_all_files(values(true));
        let installed = installed_with(vec![(Payload::system_policy_all_files(values(true)), "fda")]);
        let v = reconcile_one(&expected, &installed, &store_with(None));
        assert_eq!(v.kind, VerdictKind::OverrideMismatch);
        assert_eq!(v.override_outcome, Some(OverrideOutcome::NotInStore));
    }

    #[test]
    fn differing_values_are_value_mismatch() {
        let expected = Payload::system_policy_all_files(values(true));
        let installed = installed_with(vec![(Payload::system_policy_all_files(values(false)), "fda")]);
        let v = reconcile_one(&expected, &installed, &store_with(Some(values(true))));
        assert_eq!(v.kind, VerdictKind::ValueMismatch);
        assert_eq!(v.candidates[0].values.as_tcc(), Some(&values(false)));
        assert_eq!(v.expected.values().as_tcc(), Some(&values(true)));
    }

    #[test]
    fn duplicates_listed_in_order_with_labels() {
        let expected = Payload::system_policy_all_files(values(true));
        let installed = installed_with(vec![
            (Payload::system_policy_all_files(values(false)), "first"),
            (Payload::system_policy_all_files(values(true)), "second"),
        ]);
        let v = reconcile_one(&expected, &installed, &store_with(Some(values(true))));
        assert_eq!(v.kind, VerdictKind::AmbiguousDuplicate);
        let labels: Vec<_> = v
            .candidates
            .iter()
            .map(|c| (c.location.profile_name.as_str(), c.matches_expected, c.in_override_store))
            .collect();
        assert_eq!(labels, [("first", false, Some(false)), ("second", true, Some(true))]);
    }

    #[test]
    fn duplicates_of_other_kinds_skip_override_labels() {
        let expected = Payload::kernel_extension("T");
        let installed = installed_with(vec![
            (Payload::kernel_extension("T"), "a"),
            (Payload::kernel_extension("T"), "b"),
        ]);
        let v = reconcile_one(&expected, &installed, &OverrideStore::absent());
        assert_eq!(v.kind, VerdictKind::AmbiguousDuplicate);
        assert!(v.candidates.iter().all(|c| c.in_override_store.is_none()));
    }

    #[test]
    fn absent_identity_is_missing() {
        let expected = Payload::system_extension("T", "com.microsoft.wdav.epsext");
        let v = reconcile_one(&expected, &InstalledProfiles::new(), &OverrideStore::absent());
        assert_eq!(v.kind, VerdictKind::Missing);
        assert!(v.candidates.is_empty());
        assert!(v.override_outcome.is_none());
    }

    #[test]
    fn onboarding_singleton() {
        let blob = || plist::Value::String("{}".into());
        assert_eq!(check_onboarding(&InstalledProfiles::new()).kind, VerdictKind::Missing);

        let one = installed_with(vec![(Payload::onboarding_info(blob()), "onboard")]);
        assert_eq!(check_onboarding(&one).kind, VerdictKind::Ok);

        let two = installed_with(vec![
            (Payload::onboarding_info(blob()), "onboard-1"),
            (Payload::onboarding_info(blob()), "onboard-2"),
        ]);
        let verdict = check_onboarding(&two);
        assert_eq!(verdict.kind, VerdictKind::AmbiguousDuplicate);
        let names: Vec<_> = verdict.entries.iter().map(|l| l.profile_name.as_str()).collect();
        assert_eq!(names, ["onboard-1", "onboard-2"]);
    }
}
