use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use serde_json::Value;

use crate::foundation::error::{BridgeError, BridgeResult};
use crate::readiness::registry::DEFAULT_HANDLE_TIMEOUT;

/// Version string the driver is expected to report.
pub const BRIDGE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// One file from the public folder manifest.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticFile {
    /// Path relative to the public folder.
    pub name: String,
    /// URL the page loads it from.
    pub src: String,
    /// File size.
    #[serde(default)]
    pub size_in_bytes: u64,
    /// Modification time, milliseconds since the Unix epoch.
    #[serde(default)]
    pub last_modified: u64,
}

/// Inputs the driver injects at page load.
///
/// Every field has a default, so `{}` is a valid environment.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageEnv {
    /// URL prefix static files are served under.
    pub static_base: String,
    /// Public folder manifest.
    pub static_files: Vec<StaticFile>,
    /// Absolute public folder path, when it exists.
    pub public_folder_exists: Option<String>,
    /// Input props as JSON text.
    pub input_props: String,
    /// Environment variables visible to compositions, as a JSON object of strings.
    pub env_variables: String,
    /// Include audio assets in collections.
    pub audio_enabled: bool,
    /// Include video assets in collections.
    pub video_enabled: bool,
    /// Default budget for pending handles.
    pub timeout_in_milliseconds: u64,
    /// Frame selected right after mounting a composition.
    pub initial_frame: u64,
    /// Version of the collaborating build tooling.
    pub version: Option<String>,
}

impl Default for PageEnv {
    fn default() -> Self {
        Self {
            static_base: "/static".to_owned(),
            static_files: Vec::new(),
            public_folder_exists: None,
            input_props: "{}".to_owned(),
            env_variables: "{}".to_owned(),
            audio_enabled: true,
            video_enabled: true,
            timeout_in_milliseconds: DEFAULT_HANDLE_TIMEOUT.as_millis() as u64,
            initial_frame: 0,
            version: None,
        }
    }
}

impl PageEnv {
    /// Parse an environment from JSON text.
    pub fn from_json(s: &str) -> BridgeResult<Self> {
        serde_json::from_str(s).map_err(|e| BridgeError::serde(format!("parse page env: {e}")))
    }

    /// Parse an environment from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            BridgeError::validation(format!("open page env '{}': {e}", path.display()))
        })?;
        serde_json::from_reader(BufReader::new(f)).map_err(|e| {
            BridgeError::serde(format!("parse page env '{}': {e}", path.display()))
        })
    }

    /// Default handle budget.
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_in_milliseconds)
    }

    /// Deserialized input props. Empty text means no props.
    pub fn input_props(&self) -> BridgeResult<Value> {
        if self.input_props.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        serde_json::from_str(&self.input_props)
            .map_err(|e| BridgeError::serde(format!("parse input props: {e}")))
    }

    /// Deserialized environment variables.
    pub fn env_variables(&self) -> BridgeResult<BTreeMap<String, String>> {
        if self.env_variables.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&self.env_variables)
            .map_err(|e| BridgeError::serde(format!("parse env variables: {e}")))
    }

    /// Compare the reported tooling version against `expected`. Warns on mismatch, never fails.
    pub fn check_version(&self, expected: &str) -> bool {
        match self.version.as_deref() {
            None => true,
            Some(v) if v == expected => true,
            Some(v) => {
                tracing::warn!(
                    page = v,
                    expected,
                    "version mismatch between the page bridge and the build tooling"
                );
                false
            }
        }
    }

    /// URL of a file from the public folder.
    pub fn static_file(&self, name: &str) -> BridgeResult<String> {
        let rel = normalize_static_path(name)?;
        if !self.static_files.is_empty() && !self.static_files.iter().any(|f| f.name == rel) {
            tracing::warn!(name = %rel, "static file is not in the public folder manifest");
        }
        let base = self.static_base.trim_end_matches('/');
        Ok(format!("{base}/{}", encode_path(&rel)))
    }
}

/// Normalize a public-folder relative path (`a//b/./c` -> `a/b/c`).
pub fn normalize_static_path(source: &str) -> BridgeResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(BridgeError::validation(format!(
            "static file '{source}' must be relative to the public folder"
        )));
    }
    if s.is_empty() {
        return Err(BridgeError::validation("static file path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(BridgeError::validation(format!(
                "static file '{source}' must not contain '..'"
            )));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(BridgeError::validation(
            "static file path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

fn encode_path(rel: &str) -> String {
    let mut s = String::with_capacity(rel.len());
    for c in rel.chars() {
        match c {
            ' ' => s.push_str("%20"),
            '#' => s.push_str("%23"),
            '%' => s.push_str("%25"),
            '?' => s.push_str("%3F"),
            _ => s.push(c),
        }
    }
    s
}

#[cfg(test)]
#[path = "../../tests/unit/bridge/env.rs"]
mod tests;
