//! Procfile reading.
//!
//! A Procfile maps process-type names to start commands, one `name: command`
//! pair per line. It is read as a flat YAML mapping.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use thiserror::Error;

/// Largest Procfile accepted (1 MiB).
pub const MAX_MANIFEST_BYTES: u64 = 1024 * 1024;

/// Procfile errors.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read Procfile {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Procfile {} exceeds {limit} bytes", .path.display())]
    TooLarge { path: PathBuf, limit: u64 },

    #[error("invalid Procfile {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid Procfile {}: entry '{key}' {reason}", .path.display())]
    InvalidEntry {
        path: PathBuf,
        key: String,
        reason: &'static str,
    },
}

/// Process types declared by a Procfile.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct ProcessManifest {
    processes: BTreeMap<String, String>,
}

impl ProcessManifest {
    /// Read and parse a Procfile from disk.
    pub fn read(path: &Path) -> Result<Self, ManifestError> {
        let io_err = |source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(io_err)?;
        let mut contents = String::new();
        file.take(MAX_MANIFEST_BYTES + 1)
            .read_to_string(&mut contents)
            .map_err(io_err)?;

        if contents.len() as u64 > MAX_MANIFEST_BYTES {
            return Err(ManifestError::TooLarge {
                path: path.to_path_buf(),
                limit: MAX_MANIFEST_BYTES,
            });
        }

        Self::parse(path, &contents)
    }

    /// Parse Procfile contents. `path` is only used in error messages.
    ///
    /// Commands keep the text as written, so `web: 010` stays `010` rather
    /// than being read back as a number.
    pub fn parse(path: &Path, contents: &str) -> Result<Self, ManifestError> {
        let parse_err = |source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        };
        let invalid = |key: String, reason| ManifestError::InvalidEntry {
            path: path.to_path_buf(),
            key,
            reason,
        };

        let mapping = match serde_yaml::from_str::<Value>(contents).map_err(parse_err)? {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(mapping) => mapping,
            _ => return Err(invalid(String::new(), "is not a name: command mapping")),
        };

        for (key, value) in &mapping {
            if !is_scalar(key) {
                return Err(invalid(format!("{key:?}"), "has a non-scalar name"));
            }
            if !is_scalar(value) {
                return Err(invalid(scalar_label(key), "has no command"));
            }
        }

        // Plain scalars deserialized as strings keep their source text.
        let processes: BTreeMap<String, String> =
            serde_yaml::from_str(contents).map_err(parse_err)?;

        Ok(Self { processes })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.processes.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.processes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Log-friendly rendering: one `name: command` per line, continuation
    /// lines indented with a tab.
    pub fn render(&self) -> String {
        self.iter()
            .map(|(name, command)| format!("{name}: {command}"))
            .collect::<Vec<_>>()
            .join("\n\t")
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

fn scalar_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => format!("{other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use proptest::prelude::*;

    use super::*;

    fn parse(contents: &str) -> Result<ProcessManifest, ManifestError> {
        ProcessManifest::parse(Path::new("Procfile"), contents)
    }

    #[test]
    fn parses_process_types() {
        let manifest =
            parse("web: ./bin/server -listen=:$PORT\nworker: bin/worker --queue default\n")
                .unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.get("web"), Some("./bin/server -listen=:$PORT"));
        assert_eq!(manifest.get("worker"), Some("bin/worker --queue default"));
    }

    #[test]
    fn render_indents_continuation_lines() {
        let manifest = parse("worker: bin/worker\nweb: bin/web\n").unwrap();
        assert_eq!(manifest.render(), "web: bin/web\n\tworker: bin/worker");
    }

    #[test]
    fn empty_file_is_empty_manifest() {
        let manifest = parse("").unwrap();
        assert!(manifest.is_empty());
        assert_eq!(manifest.render(), "");
    }

    #[test]
    fn numeric_commands_become_strings() {
        let manifest = parse("web: 42").unwrap();
        assert_eq!(manifest.get("web"), Some("42"));
    }

    #[test]
    fn number_like_commands_keep_their_text() {
        assert_eq!(parse("web: 0x1F").unwrap().get("web"), Some("0x1F"));
        assert_eq!(parse("web: 010").unwrap().get("web"), Some("010"));
        assert_eq!(parse("web: 1.50").unwrap().get("web"), Some("1.50"));
        assert_eq!(parse("web: yes").unwrap().get("web"), Some("yes"));
        assert_eq!(parse("007: bin/bond").unwrap().get("007"), Some("bin/bond"));
    }

    #[test]
    fn missing_command_is_rejected() {
        let err = parse("web:\n").unwrap_err();
        assert!(matches!(err, ManifestError::InvalidEntry { ref key, .. } if key == "web"));
    }

    #[test]
    fn nested_values_are_rejected() {
        let err = parse("web:\n  cmd: bin/web\n").unwrap_err();
        assert!(matches!(err, ManifestError::InvalidEntry { .. }));
    }

    #[test]
    fn top_level_list_is_rejected() {
        let err = parse("- web\n- worker\n").unwrap_err();
        assert!(matches!(err, ManifestError::InvalidEntry { .. }));
    }

    #[test]
    fn malformed_yaml_is_parse_error() {
        let err = parse("web: [unclosed\n").unwrap_err();
        assert!(matches!(err, ManifestError::Parse { .. }));
    }

    #[test]
    fn read_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProcessManifest::read(&dir.path().join("Procfile")).unwrap_err();
        assert!(matches!(err, ManifestError::Io { .. }));
    }

    fn write_procfile_of_len(path: &Path, len: u64) {
        let prefix = "web: ";
        let mut file = File::create(path).unwrap();
        file.write_all(prefix.as_bytes()).unwrap();
        let body = "x".repeat(len as usize - prefix.len());
        file.write_all(body.as_bytes()).unwrap();
    }

    #[test]
    fn read_rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Procfile");
        write_procfile_of_len(&path, MAX_MANIFEST_BYTES + 5 * 1024);

        let err = ProcessManifest::read(&path).unwrap_err();
        assert!(
            matches!(err, ManifestError::TooLarge { limit, .. } if limit == MAX_MANIFEST_BYTES)
        );
    }

    #[test]
    fn read_accepts_file_at_exact_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Procfile");
        write_procfile_of_len(&path, MAX_MANIFEST_BYTES);

        let manifest = ProcessManifest::read(&path).unwrap();
        assert_eq!(
            manifest.get("web").map(str::len),
            Some(MAX_MANIFEST_BYTES as usize - "web: ".len())
        );
    }

    #[test]
    fn read_rejects_file_one_byte_over_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Procfile");
        write_procfile_of_len(&path, MAX_MANIFEST_BYTES + 1);

        let err = ProcessManifest::read(&path).unwrap_err();
        assert!(matches!(err, ManifestError::TooLarge { .. }));
    }

    #[test]
    fn read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Procfile");
        std::fs::write(&path, "web: bin/web\n").unwrap();
        let manifest = ProcessManifest::read(&path).unwrap();
        assert_eq!(manifest.get("web"), Some("bin/web"));
    }

    fn process_name() -> impl Strategy<Value = String> {
        "(web|worker|clock|release|job)[a-z0-9_]{0,6}"
    }

    fn process_command() -> impl Strategy<Value = String> {
        "(\\./)?bin/[a-z]{1,8}( -[a-z]{1,6}(=[a-z0-9$]{1,6})?){0,3}"
    }

    proptest! {
        #[test]
        fn render_then_parse_preserves_every_pair(
            processes in prop::collection::btree_map(process_name(), process_command(), 0..8)
        ) {
            let source: String = processes
                .iter()
                .map(|(k, v)| format!("{k}: {v}\n"))
                .collect();
            let manifest = parse(&source).unwrap();

            let rendered = manifest.render().replace("\n\t", "\n");
            let reparsed = parse(&rendered).unwrap();

            prop_assert_eq!(&reparsed, &manifest);
            prop_assert_eq!(reparsed.len(), processes.len());
            for (name, command) in &processes {
                prop_assert_eq!(reparsed.get(name), Some(command.as_str()));
            }
        }
    }
}
