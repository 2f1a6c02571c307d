use crate::model::{Candidate, OverrideOutcome, ProfileEntry};
use crate::overrides::OverrideRecord;
use crate::payload::Payload;

/// Label every installed candidate against the expected payload.
///
/// Candidates keep the order they were found in. When `override_check` is
/// set, each candidate is also labelled with whether the override store
/// enforces exactly its values.
pub fn match_candidates(
    expected: &Payload,
    entries: &[ProfileEntry],
    override_check: bool,
    record: Option<&OverrideRecord>,
) -> Vec<Candidate> {
    entries
        .iter()
        .map(|entry| {
            let in_override_store = override_check.then(|| match (record, entry.payload.values().as_tcc()) {
                (Some(r), Some(values)) => &r.values == values,
                _ => false,
            });
            Candidate {
                location: entry.location.clone(),
                values: entry.payload.values().clone(),
                matches_expected: entry.payload.same_values(expected),
                in_override_store,
            }
        })
        .collect()
}

/// Compare the override store against the expected values.
pub fn override_outcome(expected: &Payload, record: Option<&OverrideRecord>) -> OverrideOutcome {
    match (record, expected.values().as_tcc()) {
        (Some(r), Some(values)) if &r.values == values => OverrideOutcome::Reflected,
        (Some(r), _) => OverrideOutcome::Differs { enforced: r.values.clone() },
        (None, _) => OverrideOutcome::NotInStore,
    }
}
