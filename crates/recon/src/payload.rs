//! Payload model and identity.
//!
//! A [`Payload`] is split into two independent parts:
//! - an [`Identity`] (payload type + variant key) that decides whether two
//!   payloads describe the same setting, and
//! - [`PayloadValues`] that hold what the setting is configured to.
//!
//! `Payload` equality and hashing go through the identity only, so an
//! installed payload with a different configured value still lines up with
//! the expected one and is reported as a value mismatch, not as missing.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Service name of the only TCC service this tool reconciles.
pub const SYSTEM_POLICY_ALL_FILES: &str = "SystemPolicyAllFiles";

// ---------------------------------------------------------------------------
// Payload type tags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum PayloadType {
    #[serde(rename = "com.apple.TCC.configuration-profile-policy")]
    TccPolicy,
    #[serde(rename = "com.apple.syspolicy.kernel-extension-policy")]
    KernelExtensionPolicy,
    #[serde(rename = "com.apple.system-extension-policy")]
    SystemExtensionPolicy,
    #[serde(rename = "com.apple.webcontent-filter")]
    WebContentFilter,
    #[serde(rename = "com.apple.notificationsettings")]
    NotificationSettings,
    #[serde(rename = "com.apple.ManagedClient.preferences")]
    ManagedClientPreferences,
}

impl PayloadType {
    pub const ALL: [PayloadType; 6] = [
        Self::TccPolicy,
        Self::KernelExtensionPolicy,
        Self::SystemExtensionPolicy,
        Self::WebContentFilter,
        Self::NotificationSettings,
        Self::ManagedClientPreferences,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TccPolicy => "com.apple.TCC.configuration-profile-policy",
            Self::KernelExtensionPolicy => "com.apple.syspolicy.kernel-extension-policy",
            Self::SystemExtensionPolicy => "com.apple.system-extension-policy",
            Self::WebContentFilter => "com.apple.webcontent-filter",
            Self::NotificationSettings => "com.apple.notificationsettings",
            Self::ManagedClientPreferences => "com.apple.ManagedClient.preferences",
        }
    }

    /// Unknown tags are not security relevant and map to `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Full identity of a payload: its type tag plus the variant-specific key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Identity {
    pub payload_type: PayloadType,
    pub key: Vec<String>,
}

impl Identity {
    pub fn new(payload_type: PayloadType, key: Vec<String>) -> Self {
        Self { payload_type, key }
    }

    /// Identity shared by TCC profile payloads and override-store records.
    pub fn system_policy_all_files(identifier: &str) -> Self {
        Self::new(
            PayloadType::TccPolicy,
            vec![identifier.to_string(), SYSTEM_POLICY_ALL_FILES.to_string()],
        )
    }

    /// The singleton identity of the onboarding preferences payload.
    pub fn onboarding() -> Self {
        Self::new(PayloadType::ManagedClientPreferences, Vec::new())
    }

    /// Whether payloads with this identity are cross-checked against the override store.
    pub fn needs_override_check(&self) -> bool {
        self.payload_type == PayloadType::TccPolicy
            && self.key.get(1).map(String::as_str) == Some(SYSTEM_POLICY_ALL_FILES)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.payload_type, self.key.as_slice()) {
            (PayloadType::TccPolicy, [identifier, service]) => {
                write!(f, "{}/{service} ({identifier})", self.payload_type)
            }
            (_, []) => write!(f, "{}", self.payload_type),
            (_, key) => write!(f, "{} ({})", self.payload_type, key.join(", ")),
        }
    }
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// Value fields of a SystemPolicyAllFiles grant, shared with override records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TccValues {
    pub allowed: bool,
    pub code_requirement: String,
    pub identifier_type: String,
    pub identifier: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterValues {
    pub filter_type: Option<String>,
    pub plugin_bundle_id: Option<String>,
    pub filter_sockets: Option<bool>,
    pub designated_requirement: Option<String>,
    pub filter_grade: Option<String>,
}

/// An uninterpreted nested settings blob, compared structurally.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBlob(pub plist::Value);

impl Serialize for RawBlob {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        plist_to_json(&self.0).serialize(serializer)
    }
}

/// Convert a plist tree into JSON for machine-readable reports.
pub fn plist_to_json(value: &plist::Value) -> serde_json::Value {
    use serde_json::Value as Json;

    match value {
        plist::Value::Array(items) => Json::Array(items.iter().map(plist_to_json).collect()),
        plist::Value::Dictionary(dict) => Json::Object(
            dict.iter().map(|(k, v)| (k.clone(), plist_to_json(v))).collect(),
        ),
        plist::Value::Boolean(b) => Json::Bool(*b),
        plist::Value::Data(bytes) => Json::Array(bytes.iter().map(|b| Json::from(*b)).collect()),
        plist::Value::Date(date) => {
            let at: DateTime<Utc> = SystemTime::from(date.clone()).into();
            Json::String(at.to_rfc3339())
        }
        plist::Value::Real(r) => serde_json::Number::from_f64(*r).map(Json::Number).unwrap_or(Json::Null),
        plist::Value::Integer(i) => match (i.as_signed(), i.as_unsigned()) {
            (Some(s), _) => Json::from(s),
            (None, Some(u)) => Json::from(u),
            (None, None) => Json::Null,
        },
        plist::Value::String(s) => Json::String(s.clone()),
        plist::Value::Uid(uid) => Json::from(uid.get()),
        _ => Json::Null,
    }
}

/// Value fields, one case per payload kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "fields", rename_all = "snake_case")]
pub enum PayloadValues {
    SystemPolicyAllFiles(TccValues),
    KernelExtensionPolicy,
    SystemExtensionPolicy,
    WebContentFilter(FilterValues),
    NotificationSettings(RawBlob),
    OnboardingInfo(RawBlob),
}

impl PayloadValues {
    pub fn as_tcc(&self) -> Option<&TccValues> {
        match self {
            Self::SystemPolicyAllFiles(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for PayloadValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(mut map)) => match map.remove("fields") {
                Some(fields) => write!(f, "{fields}"),
                None => f.write_str("{}"),
            },
            _ => f.write_str("{}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// One extracted, immutable unit of enforced configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Payload {
    identity: Identity,
    values: PayloadValues,
}

impl Payload {
    pub fn system_policy_all_files(values: TccValues) -> Self {
        Self {
            identity: Identity::system_policy_all_files(&values.identifier),
            values: PayloadValues::SystemPolicyAllFiles(values),
        }
    }

    pub fn kernel_extension(team_identifier: &str) -> Self {
        Self {
            identity: Identity::new(
                PayloadType::KernelExtensionPolicy,
                vec![team_identifier.to_string()],
            ),
            values: PayloadValues::KernelExtensionPolicy,
        }
    }

    pub fn system_extension(team_identifier: &str, bundle_identifier: &str) -> Self {
        Self {
            identity: Identity::new(
                PayloadType::SystemExtensionPolicy,
                vec![team_identifier.to_string(), bundle_identifier.to_string()],
            ),
            values: PayloadValues::SystemExtensionPolicy,
        }
    }

    /// An absent bundle identifier keys as the empty string.
    pub fn web_content_filter(bundle_identifier: Option<&str>, values: FilterValues) -> Self {
        Self {
            identity: Identity::new(
                PayloadType::WebContentFilter,
                vec![bundle_identifier.unwrap_or_default().to_string()],
            ),
            values: PayloadValues::WebContentFilter(values),
        }
    }

    pub fn notification_settings(bundle_identifier: &str, settings: plist::Value) -> Self {
        Self {
            identity: Identity::new(
                PayloadType::NotificationSettings,
                vec![bundle_identifier.to_string()],
            ),
            values: PayloadValues::NotificationSettings(RawBlob(settings)),
        }
    }

    pub fn onboarding_info(blob: plist::Value) -> Self {
        Self {
            identity: Identity::onboarding(),
            values: PayloadValues::OnboardingInfo(RawBlob(blob)),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn values(&self) -> &PayloadValues {
        &self.values
    }

    pub fn payload_type(&self) -> PayloadType {
        self.identity.payload_type
    }

    pub fn same_values(&self, other: &Payload) -> bool {
        self.values == other.values
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for Payload {}

impl Hash for Payload {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.identity, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn tcc(identifier: &str, allowed: bool) -> Payload {
        Payload::system_policy_all_files(TccValues {
            allowed,
            code_requirement: "anchor apple".into(),
            identifier_type: "bundleID".into(),
            identifier: identifier.into(),
        })
    }

    #[test]
    fn equality_ignores_values() {
        let a = tcc("com.microsoft.wdav", true);
        let b = tcc("com.microsoft.wdav", false);
        assert_eq!(a, b);
        assert!(!a.same_values(&b));

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn different_kinds_never_equal() {
        let kext = Payload::kernel_extension("UBF8T346G9");
        let sysext = Payload::system_extension("UBF8T346G9", "com.microsoft.wdav.epsext");
        assert_ne!(kext, sysext);
    }

    #[test]
    fn tag_round_trip() {
        for t in PayloadType::ALL {
            assert_eq!(PayloadType::from_tag(t.as_str()), Some(t));
        }
        assert_eq!(PayloadType::from_tag("com.apple.wifi.managed"), None);
    }

    #[test]
    fn labels() {
        assert_eq!(
            tcc("com.microsoft.wdav", true).to_string(),
            "com.apple.TCC.configuration-profile-policy/SystemPolicyAllFiles (com.microsoft.wdav)"
        );
        assert_eq!(
            Payload::system_extension("T", "b").to_string(),
            "com.apple.system-extension-policy (T, b)"
        );
        assert_eq!(
            Payload::onboarding_info(plist::Value::String("{}".into())).to_string(),
            "com.apple.ManagedClient.preferences"
        );
    }

    #[test]
    fn override_check_only_for_tcc() {
        assert!(tcc("x", true).identity().needs_override_check());
        assert!(!Payload::kernel_extension("T").identity().needs_override_check());
    }

    #[test]
    fn values_display_as_json_fields() {
        let shown = tcc("com.microsoft.wdav", true).values().to_string();
        assert!(shown.contains("\"allowed\":true"));
        assert!(shown.contains("\"identifier\":\"com.microsoft.wdav\""));
    }
}
