//! Expected-template document: a flat `PayloadContent` list of items.

use plist::Value;

use crate::access::Node;
use crate::diagnostics::{DocumentKind, Diagnostics};
use crate::error::ReconError;
use crate::extract::extract_item;
use crate::payload::Payload;

const DOC: DocumentKind = DocumentKind::Template;

/// Expected payloads in template order.
///
/// Template items are flat, so each item is handed to extraction as its own
/// content. Items that produce no payload are reported as warnings.
pub fn parse_expected(
    doc: &Value,
    source: &str,
    diags: &mut Diagnostics,
) -> Result<Vec<Payload>, ReconError> {
    let items = Node::root(doc, "template")
        .get("PayloadContent")
        .and_then(|n| n.items())
        .map_err(|e| ReconError::document(source, e.to_string()))?;

    let mut expected = Vec::new();
    for item in items {
        let tag = match item.get("PayloadType").and_then(|n| n.as_str()) {
            Ok(tag) => tag,
            Err(e) => {
                diags.error(DOC, format!("skipping template item: {e}"));
                continue;
            }
        };
        let context = format!("template item {}", item.path());

        match extract_item(tag, item.value(), &context, DOC, diags) {
            Some(payloads) if payloads.is_empty() => {
                diags.warn(DOC, format!("Unexpected payload type: {tag}, no payloads defined"));
            }
            Some(payloads) => expected.extend(payloads),
            None => {}
        }
    }

    log::debug!("{source}: {} expected payload(s)", expected.len());
    Ok(expected)
}
