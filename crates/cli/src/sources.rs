//! Acquires the three documents: installed profiles, template, override store.
//!
//! Everything here touches the machine (processes, network, files). The bytes
//! are handed to the core untouched; parsing happens there.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tempfile::TempDir;

use crate::config::SourcesConfig;
use crate::exit_codes::EXIT_SOURCE;
use crate::CliError;

const TEMPLATE_FILE_NAME: &str = "mdatp.mobileconfig";
const USER_AGENT: &str = concat!("mdmcheck/", env!("CARGO_PKG_VERSION"));

/// Raw bytes of a document and the name it is reported by.
#[derive(Debug)]
pub struct SourceDocument {
    pub source: String,
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    fn read(path: &Path) -> Result<Self, CliError> {
        log::debug!("reading {}", path.display());
        let bytes = std::fs::read(path)
            .map_err(|e| source_err(format!("cannot read {}: {e}", path.display())))?;
        Ok(Self { source: path.display().to_string(), bytes })
    }
}

fn source_err(msg: impl Into<String>) -> CliError {
    CliError { code: EXIT_SOURCE, message: msg.into(), hint: None }
}

// ---------------------------------------------------------------------------
// Installed profiles
// ---------------------------------------------------------------------------

/// Read exported profiles from `path`, or export them with `profiles show`.
pub fn installed_profiles(path: Option<&Path>) -> Result<SourceDocument, CliError> {
    match path {
        Some(path) => SourceDocument::read(path),
        None => export_profiles(),
    }
}

fn export_profiles() -> Result<SourceDocument, CliError> {
    which::which("profiles").map_err(|_| CliError {
        code: EXIT_SOURCE,
        message: "`profiles` command not found".to_string(),
        hint: Some("run on macOS, or pass an exported document with --in".to_string()),
    })?;

    let scratch = TempDir::new().map_err(|e| source_err(format!("cannot create temp dir: {e}")))?;
    let out = scratch.path().join("profiles.xml");

    eprintln!("Running \"profiles\" command, sudo password may be required...");
    let status = Command::new("sudo")
        .arg("profiles")
        .arg("show")
        .arg("-output")
        .arg(&out)
        .status()
        .map_err(|e| source_err(format!("failed to run profiles: {e}")))?;

    if !status.success() {
        return Err(source_err(format!(
            "profiles failed (exit {})",
            status.code().unwrap_or(-1)
        )));
    }

    let mut doc = SourceDocument::read(&out)?;
    doc.source = exported_source(&out);
    Ok(doc)
}

/// Report name for an export: the command, plus the file it wrote.
fn exported_source(path: &Path) -> String {
    format!("profiles show ({})", path.display())
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

/// Resolve the template: flag, then config, then a file next to the binary,
/// then a download.
pub fn template(flag: Option<&Path>, config: &SourcesConfig) -> Result<SourceDocument, CliError> {
    if let Some(path) = flag.or(config.template.as_deref()) {
        return SourceDocument::read(path);
    }

    if let Some(path) = bundled_template().filter(|p| p.is_file()) {
        return SourceDocument::read(&path);
    }

    let timeout = Duration::from_secs(config.download_timeout_secs);
    let bytes = download(&config.template_url, timeout)?;
    Ok(SourceDocument { source: config.template_url.clone(), bytes })
}

fn bundled_template() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    Some(exe.parent()?.join(TEMPLATE_FILE_NAME))
}

fn download(url: &str, timeout: Duration) -> Result<Vec<u8>, CliError> {
    eprintln!("Downloading template from {url}");

    let http = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| source_err(format!("cannot build HTTP client: {e}")))?;

    let response = http
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| CliError {
            code: EXIT_SOURCE,
            message: format!("template download failed: {e}"),
            hint: Some("pass a local template with --template".to_string()),
        })?;

    let bytes = response
        .bytes()
        .map_err(|e| source_err(format!("template download failed: {e}")))?;
    log::debug!("downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}

// ---------------------------------------------------------------------------
// Override store
// ---------------------------------------------------------------------------

/// Copy the override store aside and read it, converting to XML when `plutil`
/// is available. `None` when the store cannot be read.
pub fn override_store(path: &Path) -> Option<SourceDocument> {
    let scratch = match TempDir::new() {
        Ok(dir) => dir,
        Err(e) => {
            log::warn!("cannot create temp dir: {e}");
            return None;
        }
    };
    let copy = scratch.path().join("MDMOverrides.plist");

    if let Err(e) = std::fs::copy(path, &copy) {
        log::debug!("cannot copy {}: {e}", path.display());
        return None;
    }

    if which::which("plutil").is_ok() {
        match Command::new("plutil").arg("-convert").arg("xml1").arg(&copy).status() {
            Ok(status) if status.success() => {}
            Ok(status) => log::warn!("plutil exited with {status}, reading the copy as is"),
            Err(e) => log::warn!("cannot run plutil: {e}"),
        }
    }

    let bytes = std::fs::read(&copy).ok()?;
    Some(SourceDocument { source: path.display().to_string(), bytes })
}
