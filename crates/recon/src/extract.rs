//! Turns one profile item (type tag + raw content) into typed payloads.

use plist::Value;

use crate::access::Node;
use crate::diagnostics::{DocumentKind, Diagnostics};
use crate::error::ReconError;
use crate::payload::{FilterValues, Payload, PayloadType, TccValues, SYSTEM_POLICY_ALL_FILES};

/// Managed-preferences domain that carries the onboarding blob.
pub const ONBOARDING_PREFERENCE_DOMAIN: &str = "com.microsoft.wdav.atp";

/// Extract every payload an item carries.
///
/// Unknown tags yield nothing. Unexpected sub-variants of known tags are
/// recorded as warnings. Structural problems fail the whole item; use
/// [`extract_item`] to recover them at the item boundary.
pub fn extract(
    tag: &str,
    content: &Value,
    document: DocumentKind,
    diags: &mut Diagnostics,
) -> Result<Vec<Payload>, ReconError> {
    let Some(payload_type) = PayloadType::from_tag(tag) else {
        return Ok(Vec::new());
    };
    let node = Node::root(content, tag);

    match payload_type {
        PayloadType::TccPolicy => extract_tcc(&node, document, diags),
        PayloadType::KernelExtensionPolicy => extract_kernel_extensions(&node),
        PayloadType::SystemExtensionPolicy => extract_system_extensions(&node),
        PayloadType::WebContentFilter => extract_web_content_filter(&node).map(|p| vec![p]),
        PayloadType::NotificationSettings => extract_notifications(&node),
        PayloadType::ManagedClientPreferences => extract_onboarding(&node),
    }
}

/// [`extract`], with structural errors recorded against `context` instead of returned.
pub fn extract_item(
    tag: &str,
    content: &Value,
    context: &str,
    document: DocumentKind,
    diags: &mut Diagnostics,
) -> Option<Vec<Payload>> {
    match extract(tag, content, document, diags) {
        Ok(payloads) => Some(payloads),
        Err(e) => {
            let hint = if tag == PayloadType::ManagedClientPreferences.as_str() {
                " (probably a malformed onboarding blob)"
            } else {
                ""
            };
            diags.error(document, format!("malformed {tag} item in {context}: {e}{hint}"));
            None
        }
    }
}

fn extract_tcc(
    node: &Node<'_>,
    document: DocumentKind,
    diags: &mut Diagnostics,
) -> Result<Vec<Payload>, ReconError> {
    let mut out = Vec::new();
    for (service, definitions) in node.get("Services")?.entries()? {
        for definition in definitions.items()? {
            if service == SYSTEM_POLICY_ALL_FILES {
                out.push(Payload::system_policy_all_files(tcc_values(&definition)?));
            } else {
                diags.warn(
                    document,
                    format!("Unexpected payload type: {}, {service}", PayloadType::TccPolicy),
                );
            }
        }
    }
    Ok(out)
}

/// The four required SystemPolicyAllFiles fields of a definition.
pub(crate) fn tcc_values(definition: &Node<'_>) -> Result<TccValues, ReconError> {
    Ok(TccValues {
        allowed: definition.get("Allowed")?.as_bool()?,
        code_requirement: definition.get("CodeRequirement")?.as_str()?.to_string(),
        identifier_type: definition.get("IdentifierType")?.as_str()?.to_string(),
        identifier: definition.get("Identifier")?.as_str()?.to_string(),
    })
}

fn extract_kernel_extensions(node: &Node<'_>) -> Result<Vec<Payload>, ReconError> {
    node.get("AllowedTeamIdentifiers")?
        .items()?
        .iter()
        .map(|team| Ok(Payload::kernel_extension(team.as_str()?)))
        .collect()
}

fn extract_system_extensions(node: &Node<'_>) -> Result<Vec<Payload>, ReconError> {
    let mut out = Vec::new();
    for (team, bundles) in node.get("AllowedSystemExtensions")?.entries()? {
        for bundle in bundles.items()? {
            out.push(Payload::system_extension(team, bundle.as_str()?));
        }
    }
    Ok(out)
}

fn extract_web_content_filter(node: &Node<'_>) -> Result<Payload, ReconError> {
    let bundle_identifier = node.opt_str("FilterDataProviderBundleIdentifier")?;
    let values = FilterValues {
        filter_type: node.opt_str("FilterType")?,
        plugin_bundle_id: node.opt_str("PluginBundleID")?,
        filter_sockets: node.opt_bool("FilterSockets")?,
        designated_requirement: node.opt_str("FilterDataProviderDesignatedRequirement")?,
        filter_grade: node.opt_str("FilterGrade")?,
    };
    Ok(Payload::web_content_filter(bundle_identifier.as_deref(), values))
}

fn extract_notifications(node: &Node<'_>) -> Result<Vec<Payload>, ReconError> {
    node.get("NotificationSettings")?
        .items()?
        .iter()
        .map(|entry| {
            let bundle = entry.get("BundleIdentifier")?.as_str()?;
            Ok(Payload::notification_settings(bundle, entry.value().clone()))
        })
        .collect()
}

fn extract_onboarding(node: &Node<'_>) -> Result<Vec<Payload>, ReconError> {
    let Some(prefs) = node.get_opt("PayloadContentManagedPreferences")? else {
        return Ok(Vec::new());
    };
    let Some(domain) = prefs.get_opt(ONBOARDING_PREFERENCE_DOMAIN)? else {
        return Ok(Vec::new());
    };
    let blob = domain
        .get("Forced")?
        .index(0)?
        .get("mcx_preference_settings")?
        .get("OnboardingInfo")?;
    Ok(vec![Payload::onboarding_info(blob.value().clone())])
}
