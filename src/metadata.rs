/**
 * Metadata gateway: reads/writes a single text field via the external
 * exiftool binary, behind a trait so tests can substitute an in-memory fake
 */

use log::debug;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("exiftool could not be started: {0}")]
    ToolNotFound(#[source] std::io::Error),

    #[error("exiftool failed: {0}")]
    Tool(String),

    #[error("unparseable exiftool output: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Read/write access to one text field of a file's metadata.
///
/// `get_field` returns `Ok(None)` when the field is unset; tool errors are a
/// distinct, retrievable failure. Writing an empty string removes the field.
pub trait MetadataGateway: Sync {
    fn get_field(&self, path: &Path, field: &str) -> Result<Option<String>, GatewayError>;

    fn set_field(
        &self,
        path: &Path,
        field: &str,
        value: &str,
        overwrite: bool,
    ) -> Result<(), GatewayError>;
}

/// Gateway backed by an `exiftool` subprocess per call.
pub struct ExiftoolGateway {
    executable: PathBuf,
}

impl ExiftoolGateway {
    pub fn new() -> Self {
        Self::with_executable("exiftool")
    }

    pub fn with_executable(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Check that the exiftool binary is runnable. A missing tool is a
    /// setup failure, caught before any file is processed.
    pub fn probe(&self) -> Result<(), GatewayError> {
        let output = Command::new(&self.executable)
            .arg("-ver")
            .output()
            .map_err(GatewayError::ToolNotFound)?;
        if !output.status.success() {
            return Err(GatewayError::Tool(format!(
                "{} -ver exited with {}",
                self.executable.display(),
                output.status
            )));
        }
        debug!(
            "exiftool version: {}",
            String::from_utf8_lossy(&output.stdout).trim()
        );
        Ok(())
    }
}

impl Default for ExiftoolGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataGateway for ExiftoolGateway {
    fn get_field(&self, path: &Path, field: &str) -> Result<Option<String>, GatewayError> {
        let output = Command::new(&self.executable)
            .arg("-ignoreMinorErrors")
            .arg("-json")
            .arg(format!("-{}", field))
            .arg(path)
            .output()
            .map_err(GatewayError::ToolNotFound)?;

        if !output.status.success() {
            return Err(GatewayError::Tool(format!(
                "unable to get field \"{}\" for {}: {}",
                field,
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_field_output(&output.stdout, field)
    }

    fn set_field(
        &self,
        path: &Path,
        field: &str,
        value: &str,
        overwrite: bool,
    ) -> Result<(), GatewayError> {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("-ignoreMinorErrors")
            .arg(format!("-{}={}", field, value));
        if overwrite {
            cmd.arg("-overwrite_original");
        }
        cmd.arg(path);

        let output = cmd.output().map_err(GatewayError::ToolNotFound)?;
        if !output.status.success() {
            return Err(GatewayError::Tool(format!(
                "unable to set field \"{}\" to \"{}\" for {}: {}",
                field,
                value,
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// Parse exiftool's `-json` output (an array with one record per file) and
/// pull out one field. A missing field is absence, not an error.
fn parse_field_output(stdout: &[u8], field: &str) -> Result<Option<String>, GatewayError> {
    let records: Vec<Value> = serde_json::from_slice(stdout)?;
    let record = records
        .into_iter()
        .next()
        .ok_or_else(|| GatewayError::Tool("empty exiftool response".to_string()))?;

    Ok(record.get(field).and_then(|value| match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }))
}

/// In-memory gateway for tests. Fields live in a map keyed by (path, field);
/// writing an empty value removes the entry, matching exiftool semantics.
#[cfg(test)]
pub(crate) struct MemoryGateway {
    fields: std::sync::Mutex<std::collections::HashMap<(PathBuf, String), String>>,
    fail: std::sync::Mutex<std::collections::HashSet<PathBuf>>,
}

#[cfg(test)]
impl MemoryGateway {
    pub(crate) fn new() -> Self {
        Self {
            fields: std::sync::Mutex::new(std::collections::HashMap::new()),
            fail: std::sync::Mutex::new(std::collections::HashSet::new()),
        }
    }

    pub(crate) fn preload(&self, path: &Path, field: &str, value: &str) {
        self.fields
            .lock()
            .unwrap()
            .insert((path.to_path_buf(), field.to_string()), value.to_string());
    }

    /// Make every gateway call against `path` fail, to exercise the
    /// per-file error path.
    pub(crate) fn fail_on(&self, path: &Path) {
        self.fail.lock().unwrap().insert(path.to_path_buf());
    }

    pub(crate) fn stored(&self, path: &Path, field: &str) -> Option<String> {
        self.fields
            .lock()
            .unwrap()
            .get(&(path.to_path_buf(), field.to_string()))
            .cloned()
    }
}

#[cfg(test)]
impl MetadataGateway for MemoryGateway {
    fn get_field(&self, path: &Path, field: &str) -> Result<Option<String>, GatewayError> {
        if self.fail.lock().unwrap().contains(path) {
            return Err(GatewayError::Tool(format!(
                "injected failure for {}",
                path.display()
            )));
        }
        Ok(self.stored(path, field))
    }

    fn set_field(
        &self,
        path: &Path,
        field: &str,
        value: &str,
        _overwrite: bool,
    ) -> Result<(), GatewayError> {
        if self.fail.lock().unwrap().contains(path) {
            return Err(GatewayError::Tool(format!(
                "injected failure for {}",
                path.display()
            )));
        }
        let key = (path.to_path_buf(), field.to_string());
        let mut fields = self.fields.lock().unwrap();
        if value.is_empty() {
            fields.remove(&key);
        } else {
            fields.insert(key, value.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field_present() {
        let json = br#"[{"SourceFile": "a.jpg", "Description": "hello there"}]"#;
        let value = parse_field_output(json, "Description").unwrap();
        assert_eq!(value, Some("hello there".to_string()));
    }

    #[test]
    fn test_parse_field_absent_is_none_not_error() {
        let json = br#"[{"SourceFile": "a.jpg"}]"#;
        let value = parse_field_output(json, "Description").unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_parse_field_non_string_values_stringified() {
        let json = br#"[{"SourceFile": "a.jpg", "ImageWidth": 2688}]"#;
        let value = parse_field_output(json, "ImageWidth").unwrap();
        assert_eq!(value, Some("2688".to_string()));
    }

    #[test]
    fn test_parse_field_malformed_output() {
        let result = parse_field_output(b"not json at all", "Description");
        assert!(matches!(result, Err(GatewayError::Malformed(_))));
    }

    #[test]
    fn test_parse_field_empty_array() {
        let result = parse_field_output(b"[]", "Description");
        assert!(matches!(result, Err(GatewayError::Tool(_))));
    }

    #[test]
    fn test_memory_gateway_roundtrip_and_remove() {
        let gateway = MemoryGateway::new();
        let path = Path::new("/photos/a.jpg");

        assert_eq!(gateway.get_field(path, "Description").unwrap(), None);

        gateway
            .set_field(path, "Description", "note", true)
            .unwrap();
        assert_eq!(
            gateway.get_field(path, "Description").unwrap(),
            Some("note".to_string())
        );

        // Empty write removes the field.
        gateway.set_field(path, "Description", "", true).unwrap();
        assert_eq!(gateway.get_field(path, "Description").unwrap(), None);
    }

    #[test]
    fn test_memory_gateway_failure_injection() {
        let gateway = MemoryGateway::new();
        let path = Path::new("/photos/bad.jpg");
        gateway.fail_on(path);
        assert!(gateway.get_field(path, "Description").is_err());
        assert!(gateway.set_field(path, "Description", "x", true).is_err());
    }
}
