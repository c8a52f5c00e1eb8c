//! Local persistence of the user's model-provider credential.
//!
//! The credential lives in a small JSON object on disk under the key
//! [`CREDENTIAL_KEY`], alongside whatever other keys the file already holds.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Key the credential is stored under.
pub const CREDENTIAL_KEY: &str = "openai_api_key";

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("credential file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("credential file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$HOME/.config/promptlift/credentials.json`, or a relative
    /// `.promptlift/credentials.json` when `HOME` is unset.
    pub fn default_path() -> PathBuf {
        match std::env::var_os("HOME") {
            Some(home) => Path::new(&home)
                .join(".config")
                .join("promptlift")
                .join("credentials.json"),
            None => PathBuf::from(".promptlift").join("credentials.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored credential. A missing file or empty value reads as `None`.
    pub fn load(&self) -> Result<Option<String>, CredentialError> {
        let entries = self.read()?;
        Ok(entries
            .get(CREDENTIAL_KEY)
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
            .map(str::to_string))
    }

    /// Store `credential`, creating the file and its directory as needed.
    pub fn save(&self, credential: &str) -> Result<(), CredentialError> {
        let mut entries = self.read()?;
        entries.insert(
            CREDENTIAL_KEY.to_string(),
            Value::String(credential.to_string()),
        );
        self.write(&entries)?;
        debug!(path = %self.path.display(), "credential saved");
        Ok(())
    }

    /// Remove the credential. Returns whether one was stored.
    pub fn clear(&self) -> Result<bool, CredentialError> {
        let mut entries = self.read()?;
        if entries.remove(CREDENTIAL_KEY).is_none() {
            return Ok(false);
        }
        self.write(&entries)?;
        debug!(path = %self.path.display(), "credential cleared");
        Ok(true)
    }

    /// Whole file as a JSON object; values other than the credential are
    /// carried through untouched.
    fn read(&self) -> Result<Map<String, Value>, CredentialError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(Map::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, entries: &Map<String, Value>) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string_pretty(entries)?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        // New files are owner-only from the moment they exist.
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        // `mode` only applies on creation; tighten files that already existed.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(body.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> CredentialStore {
        CredentialStore::new(dir.path().join("nested").join("credentials.json"))
    }

    #[test]
    fn missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(store(&dir).load().unwrap(), None);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(&dir);
        s.save("sk-test").unwrap();
        assert_eq!(s.load().unwrap().as_deref(), Some("sk-test"));

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(s.path()).unwrap()).unwrap();
        assert_eq!(raw["openai_api_key"], "sk-test");
    }

    #[test]
    fn save_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let s = CredentialStore::new(dir.path().join("credentials.json"));
        fs::write(s.path(), r#"{"theme": "dark"}"#).unwrap();
        s.save("sk-1").unwrap();
        s.save("sk-2").unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(s.path()).unwrap()).unwrap();
        assert_eq!(raw["theme"], "dark");
        assert_eq!(raw[CREDENTIAL_KEY], "sk-2");
    }

    #[test]
    fn non_string_keys_survive_load_save_clear() {
        let dir = tempfile::tempdir().unwrap();
        let s = CredentialStore::new(dir.path().join("credentials.json"));
        fs::write(
            s.path(),
            r#"{"theme": {"dark": true}, "retries": 3, "openai_api_key": "sk-1"}"#,
        )
        .unwrap();

        assert_eq!(s.load().unwrap().as_deref(), Some("sk-1"));
        s.save("sk-2").unwrap();
        assert_eq!(s.load().unwrap().as_deref(), Some("sk-2"));
        assert!(s.clear().unwrap());

        let raw: Value = serde_json::from_str(&fs::read_to_string(s.path()).unwrap()).unwrap();
        assert_eq!(raw["theme"], serde_json::json!({"dark": true}));
        assert_eq!(raw["retries"], 3);
        assert!(raw.get(CREDENTIAL_KEY).is_none());
    }

    #[test]
    fn non_string_credential_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let s = CredentialStore::new(dir.path().join("credentials.json"));
        fs::write(s.path(), r#"{"openai_api_key": 42}"#).unwrap();
        assert_eq!(s.load().unwrap(), None);
    }

    #[test]
    fn empty_value_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(&dir);
        s.save("").unwrap();
        assert_eq!(s.load().unwrap(), None);
    }

    #[test]
    fn clear_removes_credential() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(&dir);
        assert!(!s.clear().unwrap());
        s.save("sk-test").unwrap();
        assert!(s.clear().unwrap());
        assert_eq!(s.load().unwrap(), None);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let s = CredentialStore::new(dir.path().join("credentials.json"));
        fs::write(s.path(), "not json").unwrap();
        assert!(matches!(s.load(), Err(CredentialError::Json(_))));
    }

    #[cfg(unix)]
    #[test]
    fn file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let s = store(&dir);
        s.save("sk-test").unwrap();
        let mode = fs::metadata(s.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn existing_readable_file_is_tightened() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let s = CredentialStore::new(dir.path().join("credentials.json"));
        fs::write(s.path(), "{}").unwrap();
        fs::set_permissions(s.path(), fs::Permissions::from_mode(0o644)).unwrap();

        s.save("sk-test").unwrap();
        let mode = fs::metadata(s.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(s.load().unwrap().as_deref(), Some("sk-test"));
    }
}
