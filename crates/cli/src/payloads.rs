//! `mdmcheck payloads`: list what the extractor sees in one document.

use std::io::Write;
use std::path::PathBuf;

use mdmcheck_recon::diagnostics::Diagnostics;
use mdmcheck_recon::profiles::parse_installed;
use mdmcheck_recon::template::parse_expected;
use mdmcheck_recon::{parse_document, ProfileEntry, Severity};

use crate::exit_codes::{severity_exit_code, EXIT_ERROR, EXIT_PARSE, EXIT_SOURCE, EXIT_SUCCESS};
use crate::render::{render_diagnostics, render_expected, render_installed, Palette};
use crate::CliError;

pub fn cmd_payloads(file: PathBuf, template: bool, json: bool) -> Result<(), CliError> {
    let bytes = std::fs::read(&file).map_err(|e| CliError {
        code: EXIT_SOURCE,
        message: format!("cannot read {}: {e}", file.display()),
        hint: None,
    })?;
    let source = file.display().to_string();
    let parse_err = |e: mdmcheck_recon::ReconError| CliError { code: EXIT_PARSE, message: e.to_string(), hint: None };

    let doc = parse_document(&bytes, &source).map_err(parse_err)?;
    let mut diags = Diagnostics::new();
    let palette = Palette::resolve(crate::config::ColorMode::Auto);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let written = if template {
        let expected = parse_expected(&doc, &source, &mut diags).map_err(parse_err)?;
        if json {
            write_json(&mut out, &expected)
        } else {
            render_expected(&mut out, &expected, &palette)
        }
    } else {
        let installed = parse_installed(&doc, &source, &mut diags).map_err(parse_err)?;
        if json {
            let entries: Vec<&ProfileEntry> = installed.iter().flat_map(|(_, e)| e.iter()).collect();
            write_json(&mut out, &entries)
        } else {
            render_installed(&mut out, &installed, &palette)
        }
    };
    written
        .and_then(|()| out.flush())
        .map_err(|e| CliError { code: EXIT_ERROR, message: format!("cannot write output: {e}"), hint: None })?;

    let diagnostics = diags.into_vec();
    render_diagnostics(&mut std::io::stderr(), &diagnostics, &Palette::PLAIN)
        .map_err(|e| CliError { code: EXIT_ERROR, message: e.to_string(), hint: None })?;

    let worst = diagnostics.iter().map(|d| d.severity).max().unwrap_or(Severity::Success);
    match severity_exit_code(worst) {
        EXIT_SUCCESS => Ok(()),
        code => Err(CliError { code, message: String::new(), hint: None }),
    }
}

fn write_json(out: &mut impl Write, value: &impl serde::Serialize) -> std::io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}
