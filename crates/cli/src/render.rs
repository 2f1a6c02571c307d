//! Human-readable report.
//!
//! Colour is decided once by the caller and passed in as a [`Palette`]; every
//! renderer writes to a caller-supplied sink.

use std::io::{self, Write};

use mdmcheck_recon::{
    Diagnostic, InstalledProfiles, OverrideOutcome, Payload, ReconResult, Severity, Verdict,
    VerdictKind,
};

use crate::config::ColorMode;

// ---------------------------------------------------------------------------
// Palette
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub green: &'static str,
    pub yellow: &'static str,
    pub red: &'static str,
    pub grey: &'static str,
    pub reset: &'static str,
}

impl Palette {
    pub const PLAIN: Palette = Palette { green: "", yellow: "", red: "", grey: "", reset: "" };

    pub const ANSI: Palette = Palette {
        green: "\x1b[92m",
        yellow: "\x1b[93m",
        red: "\x1b[91m",
        grey: "\x1b[2m",
        reset: "\x1b[0m",
    };

    /// `Auto` colours only when stdout is a terminal.
    pub fn resolve(mode: ColorMode) -> Self {
        let color = match mode {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => atty::is(atty::Stream::Stdout),
        };
        if color {
            Self::ANSI
        } else {
            Self::PLAIN
        }
    }

    fn severity(&self, severity: Severity) -> &'static str {
        match severity {
            Severity::Success => self.green,
            Severity::Warning => self.yellow,
            Severity::Error => self.red,
        }
    }
}

// ---------------------------------------------------------------------------
// Line writer
// ---------------------------------------------------------------------------

struct Lines<'a, W: Write> {
    out: &'a mut W,
    palette: &'a Palette,
}

impl<W: Write> Lines<'_, W> {
    fn marked(&mut self, severity: Severity, msg: &str) -> io::Result<()> {
        let p = self.palette;
        writeln!(self.out, "{}[{severity}]{} {msg}", p.severity(severity), p.reset)
    }

    fn debug(&mut self, msg: &str) -> io::Result<()> {
        writeln!(self.out, "{}{msg}{}", self.palette.grey, self.palette.reset)
    }

    fn label(&self, good: bool, text: &str) -> String {
        let color = if good { self.palette.green } else { self.palette.red };
        format!("{color}[{text}]{}", self.palette.reset)
    }
}

// ---------------------------------------------------------------------------
// Reconciliation report
// ---------------------------------------------------------------------------

/// Full report: sources, diagnostics, one block per expected payload, onboarding.
pub fn render_result(out: &mut impl Write, result: &ReconResult, palette: &Palette) -> io::Result<()> {
    let mut lines = Lines { out, palette };

    let sources = &result.meta.sources;
    for source in [&sources.installed, &sources.template, &sources.overrides] {
        lines.debug(&format!("Reading {source}"))?;
    }

    for diagnostic in &result.diagnostics {
        render_diagnostic(&mut lines, diagnostic)?;
    }

    for verdict in &result.verdicts {
        render_verdict(&mut lines, verdict)?;
    }

    let onboarding = &result.onboarding;
    let severity = onboarding.kind.severity();
    match onboarding.kind {
        VerdictKind::Ok => lines.marked(severity, "Onboarding info found")?,
        VerdictKind::Missing => lines.marked(severity, "Onboarding info not found")?,
        _ => {
            lines.marked(severity, "Multiple onboarding info found")?;
            for (i, location) in onboarding.entries.iter().enumerate() {
                lines.debug(&format!("  {}: {location}", i + 1))?;
            }
        }
    }

    Ok(())
}

fn render_diagnostic<W: Write>(lines: &mut Lines<'_, W>, diagnostic: &Diagnostic) -> io::Result<()> {
    lines.marked(diagnostic.severity, &format!("{}: {}", diagnostic.document, diagnostic.message))
}

pub fn render_diagnostics(
    out: &mut impl Write,
    diagnostics: &[Diagnostic],
    palette: &Palette,
) -> io::Result<()> {
    let mut lines = Lines { out, palette };
    for diagnostic in diagnostics {
        render_diagnostic(&mut lines, diagnostic)?;
    }
    Ok(())
}

fn render_verdict<W: Write>(lines: &mut Lines<'_, W>, verdict: &Verdict) -> io::Result<()> {
    let expected = &verdict.expected;
    let severity = verdict.kind.severity();

    match (verdict.kind, verdict.candidates.as_slice()) {
        (VerdictKind::Missing, _) => lines.marked(severity, &format!("Not provided: {expected}")),

        (VerdictKind::Ok, [only]) => {
            lines.marked(severity, &format!("Found {expected} in {}", only.location))
        }

        (VerdictKind::ValueMismatch, [only]) => {
            lines.marked(
                severity,
                &format!("Found, but does not match expected {expected} in {}", only.location),
            )?;
            lines.debug(&format!("    Expected: {}", expected.values()))?;
            lines.debug(&format!("    Found: {}", only.values))
        }

        (VerdictKind::OverrideMismatch, [only]) => match &verdict.override_outcome {
            Some(OverrideOutcome::Differs { enforced }) => {
                lines.marked(
                    severity,
                    &format!(
                        "Found {expected} in {} but TCC database enforces different values",
                        only.location
                    ),
                )?;
                lines.debug(&format!("    Enforced: {}", serde_json_line(enforced)))
            }
            _ => lines.marked(
                severity,
                &format!("Found {expected} in {} but not in TCC database", only.location),
            ),
        },

        (_, candidates) => {
            lines.marked(
                severity,
                &format!("Duplicate definitions, only one of them is active: {expected}"),
            )?;
            for (n, candidate) in candidates.iter().enumerate() {
                let match_label = lines.label(
                    candidate.matches_expected,
                    if candidate.matches_expected { "Match" } else { "Mismatch" },
                );
                let tcc_label = match candidate.in_override_store {
                    Some(true) => format!(" {}", lines.label(true, "In TCC")),
                    Some(false) => format!(" {}", lines.label(false, "Not in TCC")),
                    None => String::new(),
                };
                lines.debug(&format!(
                    "    Candidate {}: {} {match_label}{tcc_label}",
                    n + 1,
                    candidate.location
                ))?;
            }
            Ok(())
        }
    }
}

fn serde_json_line(value: &impl serde::Serialize) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// One-line summary for stderr.
pub fn summary_line(result: &ReconResult) -> String {
    let s = &result.summary;
    format!(
        "{}: {} expected, {} ok, {} missing, {} value mismatches, {} override mismatches, {} duplicates, onboarding {}",
        s.severity,
        s.expected,
        s.ok,
        s.missing,
        s.value_mismatches,
        s.override_mismatches,
        s.duplicates,
        result.onboarding.kind,
    )
}

// ---------------------------------------------------------------------------
// Payload listings
// ---------------------------------------------------------------------------

/// Installed payloads grouped by identity, with the profile each came from.
pub fn render_installed(
    out: &mut impl Write,
    installed: &InstalledProfiles,
    palette: &Palette,
) -> io::Result<()> {
    let mut lines = Lines { out, palette };
    for (identity, entries) in installed.iter() {
        writeln!(lines.out, "{identity}")?;
        for entry in entries {
            lines.debug(&format!("    {}", entry.location))?;
            lines.debug(&format!("    {}", entry.payload.values()))?;
        }
    }
    Ok(())
}

/// Template payloads in template order.
pub fn render_expected(out: &mut impl Write, expected: &[Payload], palette: &Palette) -> io::Result<()> {
    let mut lines = Lines { out, palette };
    for payload in expected {
        writeln!(lines.out, "{payload}")?;
        lines.debug(&format!("    {}", payload.values()))?;
    }
    Ok(())
}
