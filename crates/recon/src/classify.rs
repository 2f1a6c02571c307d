use crate::model::{Candidate, OverrideOutcome, VerdictKind};

/// Classify one expected payload from its labelled candidates.
///
/// - no candidate → `Missing`
/// - one candidate, values differ → `ValueMismatch`
/// - one candidate, values equal, override store disagrees → `OverrideMismatch`
/// - one candidate, values equal otherwise → `Ok`
/// - several candidates → `AmbiguousDuplicate`, whatever their values
pub fn classify(candidates: &[Candidate], outcome: Option<&OverrideOutcome>) -> VerdictKind {
    match candidates {
        [] => VerdictKind::Missing,
        [only] if !only.matches_expected => VerdictKind::ValueMismatch,
        [_] => match outcome {
            None | Some(OverrideOutcome::Reflected) => VerdictKind::Ok,
            Some(_) => VerdictKind::OverrideMismatch,
        },
        _ => VerdictKind::AmbiguousDuplicate,
    }
}

/// The onboarding blob must be defined exactly once across all profiles.
pub fn classify_onboarding(count: usize) -> VerdictKind {
    match count {
        0 => VerdictKind::Missing,
        1 => VerdictKind::Ok,
        _ => VerdictKind::AmbiguousDuplicate,
    }
}
