//! `mdmcheck check`: reconcile installed profiles against the template.

use std::io::Write;
use std::path::PathBuf;

use mdmcheck_recon::{parse_document, DocumentSet, ReconError};

use crate::config::{CheckConfig, ColorMode};
use crate::exit_codes::{severity_exit_code, EXIT_ERROR, EXIT_PARSE, EXIT_SUCCESS};
use crate::render::{render_result, summary_line, Palette};
use crate::sources;
use crate::CliError;

pub struct CheckArgs {
    pub template: Option<PathBuf>,
    pub installed: Option<PathBuf>,
    pub overrides: Option<PathBuf>,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub color: Option<ColorMode>,
    pub config: Option<PathBuf>,
}

fn parse_err(e: ReconError) -> CliError {
    CliError { code: EXIT_PARSE, message: e.to_string(), hint: None }
}

pub fn cmd_check(args: CheckArgs) -> Result<(), CliError> {
    let config = CheckConfig::load(args.config.as_deref()).map_err(|e| {
        CliError::args(e.to_string())
            .with_hint(format!("default location: {}", CheckConfig::default_path().display()))
    })?;
    let palette = Palette::resolve(args.color.unwrap_or(config.report.color));

    // Acquire
    let installed_path = args.installed.or_else(|| config.sources.profiles.clone());
    let installed_src = sources::installed_profiles(installed_path.as_deref())?;
    let template_src = sources::template(args.template.as_deref(), &config.sources)?;
    let overrides_path = args.overrides.unwrap_or_else(|| config.sources.overrides.clone());
    let overrides_src = sources::override_store(&overrides_path);

    // Parse
    let installed = parse_document(&installed_src.bytes, &installed_src.source).map_err(parse_err)?;
    let template = parse_document(&template_src.bytes, &template_src.source).map_err(parse_err)?;
    let overrides = overrides_src
        .as_ref()
        .map(|doc| parse_document(&doc.bytes, &doc.source))
        .transpose()
        .map_err(parse_err)?;

    let overrides_source = overrides_path.display().to_string();
    let docs = DocumentSet {
        installed: &installed,
        installed_source: &installed_src.source,
        template: &template,
        template_source: &template_src.source,
        overrides: overrides.as_ref(),
        overrides_source: &overrides_source,
    };
    let result = mdmcheck_recon::check(&docs).map_err(parse_err)?;

    // Output
    if args.json || args.output.is_some() {
        let json_str = serde_json::to_string_pretty(&result).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("JSON serialization error: {e}"),
            hint: None,
        })?;

        if let Some(ref path) = args.output {
            std::fs::write(path, &json_str).map_err(|e| CliError {
                code: EXIT_ERROR,
                message: format!("cannot write output: {e}"),
                hint: None,
            })?;
            eprintln!("wrote {}", path.display());
        }

        if args.json {
            println!("{json_str}");
        }
    }

    if !args.json {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        render_result(&mut out, &result, &palette)
            .and_then(|()| out.flush())
            .map_err(|e| CliError { code: EXIT_ERROR, message: format!("cannot write report: {e}"), hint: None })?;
    }

    eprintln!("{}", summary_line(&result));

    match severity_exit_code(result.summary.severity) {
        EXIT_SUCCESS => Ok(()),
        code => Err(CliError { code, message: String::new(), hint: None }),
    }
}
