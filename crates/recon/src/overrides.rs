//! Override store: the OS record of which SystemPolicyAllFiles grants are in force.

use std::collections::HashMap;

use plist::Value;
use serde::Serialize;

use crate::access::Node;
use crate::diagnostics::{DocumentKind, Diagnostics};
use crate::error::ReconError;
use crate::extract::tcc_values;
use crate::payload::{Identity, TccValues};

/// Sub-key of an override entry that carries a full-disk-access grant.
pub const OVERRIDE_SERVICE_KEY: &str = "kTCCServiceSystemPolicyAllFiles";

const DOC: DocumentKind = DocumentKind::Overrides;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverrideRecord {
    pub identity: Identity,
    pub values: TccValues,
}

#[derive(Debug, Clone, Default)]
pub struct OverrideStore {
    records: HashMap<Identity, OverrideRecord>,
    present: bool,
}

impl OverrideStore {
    /// A store that could not be read. Every lookup misses.
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn get(&self, identity: &Identity) -> Option<&OverrideRecord> {
        self.records.get(identity)
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Build the override map. A missing document degrades to an empty store.
pub fn parse_overrides(
    doc: Option<&Value>,
    source: &str,
    diags: &mut Diagnostics,
) -> Result<OverrideStore, ReconError> {
    let Some(doc) = doc else {
        diags.warn(DOC, format!("No {source} found, is the machine enrolled into MDM?"));
        return Ok(OverrideStore::absent());
    };

    let services = Node::root(doc, "overrides")
        .entries()
        .map_err(|e| ReconError::document(source, e.to_string()))?;

    let mut store = OverrideStore { records: HashMap::new(), present: true };
    for (name, detail) in services {
        // Entries for other services are not dictionaries we care about.
        let Ok(Some(grant)) = detail.get_opt(OVERRIDE_SERVICE_KEY) else {
            continue;
        };
        match tcc_values(&grant) {
            Ok(values) => {
                let identity = Identity::system_policy_all_files(&values.identifier);
                store.records.insert(identity.clone(), OverrideRecord { identity, values });
            }
            Err(e) => diags.warn(DOC, format!("ignoring override entry '{name}': {e}")),
        }
    }

    log::debug!("{source}: {} override record(s)", store.len());
    Ok(store)
}
