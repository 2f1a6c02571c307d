use crate::diagnostics::Diagnostic;
use crate::model::{OnboardingVerdict, ReconSummary, Severity, Verdict, VerdictKind};

/// Compute summary statistics from verdicts and diagnostics.
pub fn compute_summary(
    verdicts: &[Verdict],
    onboarding: &OnboardingVerdict,
    diagnostics: &[Diagnostic],
) -> ReconSummary {
    let mut ok = 0;
    let mut missing = 0;
    let mut value_mismatches = 0;
    let mut override_mismatches = 0;
    let mut duplicates = 0;

    for v in verdicts {
        match v.kind {
            VerdictKind::Ok => ok += 1,
            VerdictKind::Missing => missing += 1,
            VerdictKind::ValueMismatch => value_mismatches += 1,
            VerdictKind::OverrideMismatch => override_mismatches += 1,
            VerdictKind::AmbiguousDuplicate => duplicates += 1,
        }
    }

    let diagnostic_warnings = diagnostics.iter().filter(|d| d.severity == Severity::Warning).count();
    let diagnostic_errors = diagnostics.iter().filter(|d| d.severity == Severity::Error).count();

    let severity = verdicts
        .iter()
        .map(|v| v.kind.severity())
        .chain(std::iter::once(onboarding.kind.severity()))
        .chain(diagnostics.iter().map(|d| d.severity))
        .max()
        .unwrap_or(Severity::Success);

    ReconSummary {
        expected: verdicts.len(),
        ok,
        missing,
        value_mismatches,
        override_mismatches,
        duplicates,
        diagnostic_warnings,
        diagnostic_errors,
        severity,
    }
}
