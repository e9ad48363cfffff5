//! CLI profiles and the config root that holds them.
//!
//! Layout on disk:
//!
//! ```text
//! ~/.iobeam/
//!   profile                  {"profile": "default"}
//!   default/
//!     profile.config         server + active user/project
//!     token.json             cached user token
//!     proj_42.json           cached project token for project 42
//! ```
//!
//! The root can be moved with the `IOBEAM_CONFIG_DIR` environment variable.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::fsutil::{ensure_dir, replace_file};
use crate::{ConfigError, Result};

/// Default API server for new profiles.
pub const DEFAULT_API_SERVER: &str = "https://api.iobeam.com";

/// Name of the profile created on first run.
pub const DEFAULT_PROFILE: &str = "default";

/// Environment variable overriding the config root.
pub const CONFIG_DIR_ENV: &str = "IOBEAM_CONFIG_DIR";

const DOT_DIR_NAME: &str = ".iobeam";
const ACTIVE_PROFILE_FILE: &str = "profile";
const PROFILE_FILE: &str = "profile.config";
const LOG_DIR_NAME: &str = "logs";

// ─────────────────────────────────────────────────────────────────────────────
// Profile
// ─────────────────────────────────────────────────────────────────────────────

/// A CLI profile: a workspace that tracks the API server plus the active user
/// and project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Profile name (the directory name, not stored in the file).
    #[serde(skip)]
    pub name: String,

    /// Directory holding this profile's files.
    #[serde(skip)]
    dir: PathBuf,

    /// API server base URL.
    pub server: String,

    /// Project used when a command's project flag is omitted (0 = none).
    #[serde(default)]
    pub active_project: u64,

    /// Logged-in user id (0 = none).
    #[serde(default)]
    pub active_user: u64,

    /// Email of the logged-in user, looked up lazily.
    #[serde(default, alias = "activer_user_email")]
    pub active_user_email: String,
}

impl Profile {
    /// Directory where this profile's data (including cached tokens) lives.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of this profile's metadata file.
    pub fn file(&self) -> PathBuf {
        self.dir.join(PROFILE_FILE)
    }

    /// Write the profile to disk, replacing the previous file.
    pub fn save(&self) -> Result<()> {
        ensure_dir(&self.dir).map_err(|e| ConfigError::WriteFile {
            path: self.dir.display().to_string(),
            source: e,
        })?;
        let json = serde_json::to_vec_pretty(self)?;
        let path = self.file();
        replace_file(&path, &json).map_err(|e| ConfigError::WriteFile {
            path: path.display().to_string(),
            source: e,
        })?;
        tracing::debug!(profile = %self.name, "profile saved");
        Ok(())
    }

    /// Change the active user id and email.
    pub fn update_active_user(&mut self, user_id: u64, email: impl Into<String>) -> Result<()> {
        self.active_user = user_id;
        self.active_user_email = email.into();
        self.save()
    }

    /// Change the active project id.
    pub fn update_active_project(&mut self, project_id: u64) -> Result<()> {
        self.active_project = project_id;
        self.save()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ActiveProfile {
    profile: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Store
// ─────────────────────────────────────────────────────────────────────────────

/// The config root: active-profile pointer plus one directory per profile.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    /// Locate the config root from `IOBEAM_CONFIG_DIR` or the home directory.
    pub fn discover() -> Result<Self> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
            && !dir.is_empty()
        {
            return Ok(Self::at(dir));
        }
        let home = dirs::home_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::at(home.join(DOT_DIR_NAME)))
    }

    /// Use an explicit config root.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The config root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for profile `name`, which must be a single plain path
    /// component that does not collide with the root's own entries.
    fn profile_dir(&self, name: &str) -> Result<PathBuf> {
        let reserved = [".", "..", LOG_DIR_NAME, ACTIVE_PROFILE_FILE];
        if name.is_empty()
            || reserved.contains(&name)
            || name.contains(['/', '\\'])
            || Path::new(name).is_absolute()
        {
            return Err(ConfigError::InvalidProfileName(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    fn active_file(&self) -> PathBuf {
        self.root.join(ACTIVE_PROFILE_FILE)
    }

    /// Name of the active profile, if one has been selected.
    pub fn active_profile_name(&self) -> Result<Option<String>> {
        let path = self.active_file();
        if !path.is_file() {
            return Ok(None);
        }
        let contents = fs::read(&path).map_err(|e| ConfigError::ReadFile {
            path: path.display().to_string(),
            source: e,
        })?;
        let active: ActiveProfile = serde_json::from_slice(&contents)?;
        Ok(Some(active.profile))
    }

    /// Load the active profile, creating the default profile on first run.
    pub fn active_profile(&self) -> Result<Profile> {
        match self.active_profile_name()? {
            Some(name) => self.read_profile(&name),
            None => {
                tracing::info!(root = %self.root.display(), "initializing default profile");
                let profile = if self.profile_dir(DEFAULT_PROFILE)?.join(PROFILE_FILE).is_file() {
                    self.read_profile(DEFAULT_PROFILE)?
                } else {
                    self.create_profile(DEFAULT_PROFILE, DEFAULT_API_SERVER)?
                };
                self.write_active(DEFAULT_PROFILE)?;
                Ok(profile)
            }
        }
    }

    /// Create a new profile named `name` talking to `server`.
    pub fn create_profile(&self, name: &str, server: &str) -> Result<Profile> {
        let dir = self.profile_dir(name)?;
        if dir.join(PROFILE_FILE).is_file() {
            return Err(ConfigError::ProfileExists(name.to_string()));
        }
        let profile = Profile {
            name: name.to_string(),
            dir,
            server: server.to_string(),
            active_project: 0,
            active_user: 0,
            active_user_email: String::new(),
        };
        profile.save()?;
        Ok(profile)
    }

    /// Read a profile by name.
    pub fn read_profile(&self, name: &str) -> Result<Profile> {
        let dir = self.profile_dir(name)?;
        let path = dir.join(PROFILE_FILE);
        if !path.is_file() {
            return Err(ConfigError::ProfileNotFound(name.to_string()));
        }
        let contents = fs::read(&path).map_err(|e| ConfigError::ReadFile {
            path: path.display().to_string(),
            source: e,
        })?;
        let mut profile: Profile = serde_json::from_slice(&contents)?;
        profile.name = name.to_string();
        profile.dir = dir;
        Ok(profile)
    }

    /// Names of all profiles, sorted.
    pub fn list_profiles(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ConfigError::ReadFile {
                    path: self.root.display().to_string(),
                    source: e,
                });
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().join(PROFILE_FILE).is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Make `name` the active profile.
    pub fn switch_profile(&self, name: &str) -> Result<()> {
        if !self.profile_dir(name)?.join(PROFILE_FILE).is_file() {
            return Err(ConfigError::ProfileNotFound(name.to_string()));
        }
        self.write_active(name)
    }

    /// Remove a profile and everything cached under it.
    ///
    /// Only directories holding a profile file are removed.
    pub fn delete_profile(&self, name: &str) -> Result<()> {
        let dir = self.profile_dir(name)?;
        if !dir.join(PROFILE_FILE).is_file() {
            return Err(ConfigError::ProfileNotFound(name.to_string()));
        }
        fs::remove_dir_all(&dir).map_err(|e| ConfigError::WriteFile {
            path: dir.display().to_string(),
            source: e,
        })
    }

    fn write_active(&self, name: &str) -> Result<()> {
        ensure_dir(&self.root).map_err(|e| ConfigError::WriteFile {
            path: self.root.display().to_string(),
            source: e,
        })?;
        let json = serde_json::to_vec(&ActiveProfile {
            profile: name.to_string(),
        })?;
        let path = self.active_file();
        replace_file(&path, &json).map_err(|e| ConfigError::WriteFile {
            path: path.display().to_string(),
            source: e,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_first_run_creates_default_profile() {
        let temp = tempdir().unwrap();
        let store = ConfigStore::at(temp.path());

        let profile = store.active_profile().unwrap();
        assert_eq!(profile.name, DEFAULT_PROFILE);
        assert_eq!(profile.server, DEFAULT_API_SERVER);
        assert_eq!(profile.active_project, 0);
        assert_eq!(
            store.active_profile_name().unwrap().as_deref(),
            Some(DEFAULT_PROFILE)
        );
    }

    #[test]
    fn test_profile_roundtrip() {
        let temp = tempdir().unwrap();
        let store = ConfigStore::at(temp.path());

        let mut profile = store.create_profile("dev", "http://localhost:8080").unwrap();
        profile.update_active_project(42).unwrap();
        profile.update_active_user(7, "me@example.com").unwrap();

        let reread = store.read_profile("dev").unwrap();
        assert_eq!(reread, profile);
        assert_eq!(reread.dir(), temp.path().join("dev"));
    }

    #[test]
    fn test_reads_legacy_email_key() {
        let temp = tempdir().unwrap();
        let store = ConfigStore::at(temp.path());
        let dir = temp.path().join("old");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(PROFILE_FILE),
            r#"{"server":"https://api.iobeam.com","active_project":3,"active_user":9,"activer_user_email":"x@y.z"}"#,
        )
        .unwrap();

        let profile = store.read_profile("old").unwrap();
        assert_eq!(profile.active_user_email, "x@y.z");
        assert_eq!(profile.active_project, 3);
    }

    #[test]
    fn test_create_existing_profile_fails() {
        let temp = tempdir().unwrap();
        let store = ConfigStore::at(temp.path());
        store.create_profile("dev", "http://a").unwrap();

        let err = store.create_profile("dev", "http://b").unwrap_err();
        assert!(matches!(err, ConfigError::ProfileExists(_)));
    }

    #[test]
    fn test_switch_and_list() {
        let temp = tempdir().unwrap();
        let store = ConfigStore::at(temp.path());
        store.active_profile().unwrap();
        store.create_profile("staging", "http://staging").unwrap();
        fs::create_dir_all(temp.path().join("logs")).unwrap();

        store.switch_profile("staging").unwrap();
        assert_eq!(store.active_profile().unwrap().server, "http://staging");
        assert_eq!(store.list_profiles().unwrap(), vec!["default", "staging"]);

        let err = store.switch_profile("missing").unwrap_err();
        assert_eq!(err.to_string(), "Profile 'missing' does not exist");
    }

    #[test]
    fn test_delete_profile() {
        let temp = tempdir().unwrap();
        let store = ConfigStore::at(temp.path());
        store.create_profile("gone", "http://a").unwrap();

        store.delete_profile("gone").unwrap();
        assert!(store.list_profiles().unwrap().is_empty());
        assert!(matches!(
            store.delete_profile("gone").unwrap_err(),
            ConfigError::ProfileNotFound(_)
        ));
    }

    #[test]
    fn test_delete_never_leaves_the_root() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("cfg");
        let store = ConfigStore::at(&root);
        store.active_profile().unwrap();
        fs::write(temp.path().join("precious.txt"), b"keep").unwrap();
        fs::create_dir_all(root.join("logs")).unwrap();

        let outside = temp.path().display().to_string();
        for name in ["..", ".", "", "logs", "profile", "../cfg", "a/b", outside.as_str()] {
            let err = store.delete_profile(name).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidProfileName(_)), "{name:?}");
        }
        assert!(temp.path().join("precious.txt").is_file());
        assert!(root.join("logs").is_dir());
        assert!(root.join(DEFAULT_PROFILE).join(PROFILE_FILE).is_file());
    }

    #[test]
    fn test_delete_requires_profile_file() {
        let temp = tempdir().unwrap();
        let store = ConfigStore::at(temp.path());
        fs::create_dir_all(temp.path().join("stray")).unwrap();

        let err = store.delete_profile("stray").unwrap_err();
        assert!(matches!(err, ConfigError::ProfileNotFound(_)));
        assert!(temp.path().join("stray").is_dir());
    }

    #[test]
    fn test_unsafe_names_rejected_everywhere() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("cfg");
        let store = ConfigStore::at(&root);

        assert!(matches!(
            store.create_profile("../escape", "http://a").unwrap_err(),
            ConfigError::InvalidProfileName(_)
        ));
        assert!(!temp.path().join("escape").exists());
        assert!(matches!(
            store.read_profile("..").unwrap_err(),
            ConfigError::InvalidProfileName(_)
        ));
        assert!(matches!(
            store.switch_profile("logs").unwrap_err(),
            ConfigError::InvalidProfileName(_)
        ));
    }
}
