//! Bearer tokens and the on-disk token cache.
//!
//! Each profile directory caches at most one user token (`token.json`) and
//! one token per project (`proj_<id>.json`). The cache is re-derivable from
//! the API, so saves replace the file outright instead of merging.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use iobeam_config::Profile;
use iobeam_config::fsutil::{ensure_dir, replace_file};
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::{Error, Result};

/// Textual format of token expiry timestamps, e.g. `2016-03-01 12:00:00 +0000`.
pub const EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// File name of the cached user token.
pub const USER_TOKEN_FILE: &str = "token.json";

/// Endpoint trading an expired project token for a fresh one.
pub const REFRESH_PATH: &str = "/v1/tokens/project";

fn is_false(b: &bool) -> bool {
    !*b
}

// ─────────────────────────────────────────────────────────────────────────────
// AuthToken
// ─────────────────────────────────────────────────────────────────────────────

/// Who a token authorizes as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenScope {
    /// A human user.
    User,
    /// A single project.
    Project(u64),
}

/// A bearer credential for either a user or a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    /// The bearer token string.
    #[serde(alias = "Token")]
    pub token: String,

    /// Expiry timestamp in [`EXPIRY_FORMAT`].
    #[serde(alias = "Expires")]
    pub expires: String,

    /// Owning user, for user tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,

    /// Owning project, for project tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<u64>,

    #[serde(default, alias = "Read", skip_serializing_if = "is_false")]
    pub read: bool,

    #[serde(default, alias = "Write", skip_serializing_if = "is_false")]
    pub write: bool,

    #[serde(default, alias = "Admin", skip_serializing_if = "is_false")]
    pub admin: bool,
}

impl AuthToken {
    /// User or project scope. A project id of 0 counts as user scope.
    pub fn scope(&self) -> TokenScope {
        match self.project_id {
            Some(id) if id > 0 => TokenScope::Project(id),
            _ => TokenScope::User,
        }
    }

    /// Parsed expiry timestamp.
    pub fn expires_at(&self) -> Result<DateTime<Utc>> {
        DateTime::parse_from_str(&self.expires, EXPIRY_FORMAT)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|source| Error::MalformedExpiry {
                expires: self.expires.clone(),
                source,
            })
    }

    /// Whether the token has expired as of now.
    pub fn is_expired(&self) -> Result<bool> {
        self.is_expired_at(Utc::now())
    }

    /// Whether the token has expired as of `now`.
    ///
    /// A timestamp that does not parse is an error, never expired or valid.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> Result<bool> {
        Ok(now > self.expires_at()?)
    }

    /// Trade this expired project token for a fresh one.
    ///
    /// The new token is written to the profile's cache and becomes the
    /// profile's active project. The exchange itself is sent without any
    /// token, so it can never trigger another refresh.
    pub fn refresh(&self, client: &Client, profile: &mut Profile) -> Result<AuthToken> {
        let TokenScope::Project(project_id) = self.scope() else {
            return Err(Error::NotProjectToken);
        };

        #[derive(Serialize)]
        struct RefreshRequest<'a> {
            refresh_token: &'a str,
        }

        tracing::info!(project_id, "refreshing expired project token");
        let fresh: AuthToken = client
            .post(REFRESH_PATH)
            .json(&RefreshRequest {
                refresh_token: &self.token,
            })
            .expect(200)
            .without_refresh()
            .fetch()
            .map_err(|e| Error::Refresh {
                source: Box::new(e),
            })?;

        // A scopeless reply would land in the user token's slot.
        let TokenScope::Project(new_id) = fresh.scope() else {
            return Err(Error::NotProjectToken);
        };

        if let Err(e) = TokenStore::for_profile(profile).save(&fresh) {
            tracing::warn!(error = %e, "could not save refreshed token");
        }

        if new_id != profile.active_project {
            profile.update_active_project(new_id)?;
        }

        tracing::info!(expires = %fresh.expires, "new project token acquired");
        Ok(fresh)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TokenStore
// ─────────────────────────────────────────────────────────────────────────────

/// File-backed token cache rooted in a profile directory.
#[derive(Debug, Clone)]
pub struct TokenStore {
    dir: PathBuf,
}

impl TokenStore {
    /// Cache tokens in `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache tokens in the profile's directory.
    pub fn for_profile(profile: &Profile) -> Self {
        Self::new(profile.dir())
    }

    /// Directory holding the cached tokens.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file caching a token of `scope`.
    pub fn path(&self, scope: TokenScope) -> PathBuf {
        match scope {
            TokenScope::User => self.dir.join(USER_TOKEN_FILE),
            TokenScope::Project(id) => self.dir.join(format!("proj_{id}.json")),
        }
    }

    /// The cached user token, if any.
    pub fn load_user(&self) -> Result<Option<AuthToken>> {
        self.load(TokenScope::User)
    }

    /// The cached token for `project_id`, if any.
    pub fn load_project(&self, project_id: u64) -> Result<Option<AuthToken>> {
        self.load(TokenScope::Project(project_id))
    }

    fn load(&self, scope: TokenScope) -> Result<Option<AuthToken>> {
        let path = self.path(scope);
        let contents = match fs::read(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(Error::TokenFile {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        Ok(Some(serde_json::from_slice(&contents)?))
    }

    /// Write `token` to the file for its scope, replacing any previous one.
    pub fn save(&self, token: &AuthToken) -> Result<()> {
        let path = self.path(token.scope());
        let write_err = |source| Error::TokenFile {
            path: path.display().to_string(),
            source,
        };

        ensure_dir(&self.dir).map_err(write_err)?;
        let json = serde_json::to_vec(token)?;
        replace_file(&path, &json).map_err(write_err)?;

        tracing::info!(path = %path.display(), "token saved");
        Ok(())
    }

    /// Forget the cached token for `project_id`. Missing files are fine.
    pub fn remove_project(&self, project_id: u64) -> Result<()> {
        let path = self.path(TokenScope::Project(project_id));
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(Error::TokenFile {
                path: path.display().to_string(),
                source,
            }),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
