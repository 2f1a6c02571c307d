//! Installed-profiles document: enrollment level -> profiles -> items.

use std::time::SystemTime;

use chrono::{DateTime, NaiveDateTime, Utc};
use plist::Value;

use crate::access::Node;
use crate::diagnostics::{DocumentKind, Diagnostics};
use crate::error::ReconError;
use crate::extract::extract_item;
use crate::model::{InstalledProfiles, Location, ProfileEntry};

const DOC: DocumentKind = DocumentKind::Installed;

/// Group every payload of every installed profile by identity.
///
/// Only a document whose top level is not a dictionary fails; malformed
/// levels, profiles and items are recorded in `diags` and skipped.
pub fn parse_installed(
    doc: &Value,
    source: &str,
    diags: &mut Diagnostics,
) -> Result<InstalledProfiles, ReconError> {
    let root = Node::root(doc, "profiles");
    let levels = root
        .entries()
        .map_err(|e| ReconError::document(source, e.to_string()))?;

    let mut installed = InstalledProfiles::new();
    let mut items_seen = 0usize;

    for (level, profiles) in levels {
        let profiles = match profiles.items() {
            Ok(p) => p,
            Err(e) => {
                diags.error(DOC, format!("skipping enrollment level '{level}': {e}"));
                continue;
            }
        };

        for profile in profiles {
            let (name, installed_at, items) = match profile_header(&profile) {
                Ok(header) => header,
                Err(e) => {
                    diags.error(DOC, format!("skipping profile at {}: {e}", profile.path()));
                    continue;
                }
            };
            let context = format!("profile \"{name}\"");

            for item in items {
                items_seen += 1;
                let (tag, content) = match item_parts(&item) {
                    Ok(parts) => parts,
                    Err(e) => {
                        diags.error(DOC, format!("skipping item in {context}: {e}"));
                        continue;
                    }
                };

                let Some(payloads) = extract_item(tag, content, &context, DOC, diags) else {
                    continue;
                };
                for payload in payloads {
                    installed.push(ProfileEntry {
                        payload,
                        location: Location {
                            source: source.to_string(),
                            level: level.to_string(),
                            profile_name: name.clone(),
                            installed_at,
                        },
                    });
                }
            }
        }
    }

    log::debug!(
        "{source}: {items_seen} profile item(s), {} distinct payload(s)",
        installed.len()
    );
    Ok(installed)
}

fn profile_header<'a>(
    profile: &Node<'a>,
) -> Result<(String, Option<DateTime<Utc>>, Vec<Node<'a>>), ReconError> {
    let name = profile.get("ProfileDisplayName")?.as_str()?.to_string();
    let installed_at = profile.get_opt("ProfileInstallDate")?.and_then(|n| install_date(n.value()));
    let items = profile.get("ProfileItems")?.items()?;
    Ok((name, installed_at, items))
}

fn item_parts<'a>(item: &Node<'a>) -> Result<(&'a str, &'a Value), ReconError> {
    let tag = item.get("PayloadType")?.as_str()?;
    let content = item.get("PayloadContent")?.value();
    Ok((tag, content))
}

/// Install dates are plist dates, or strings as printed by `profiles -P`.
fn install_date(value: &Value) -> Option<DateTime<Utc>> {
    if let Some(date) = value.as_date() {
        return Some(SystemTime::from(date).into());
    }
    let text = value.as_string()?;
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at.with_timezone(&Utc));
    }
    if let Ok(at) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S %z") {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
