use std::fmt;

use serde::Serialize;

use crate::model::Severity;

/// Which of the three input documents a diagnostic came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Installed,
    Template,
    Overrides,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installed => write!(f, "installed profiles"),
            Self::Template => write!(f, "template"),
            Self::Overrides => write!(f, "override store"),
        }
    }
}

/// A recovered problem found while reading a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub document: DocumentKind,
    pub message: String,
}

/// Ordered sink for diagnostics. Every entry is mirrored to the `log` facade.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, document: DocumentKind, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{document}: {message}");
        self.entries.push(Diagnostic { severity: Severity::Warning, document, message });
    }

    pub fn error(&mut self, document: DocumentKind, message: impl Into<String>) {
        let message = message.into();
        log::error!("{document}: {message}");
        self.entries.push(Diagnostic { severity: Severity::Error, document, message });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
