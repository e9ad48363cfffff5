//! Fluent builder for a single authenticated API call.
//!
//! A [`Request`] is built from a [`Client`], configured with chained setters
//! and consumed by [`Request::execute`] or [`Request::fetch`]:
//!
//! ```no_run
//! # fn example(client: &iobeam_client::Client, profile: &mut iobeam_config::Profile) -> iobeam_client::Result<()> {
//! let devices: serde_json::Value = client
//!     .get("/v1/devices")
//!     .param("project_id", 42)
//!     .project_token(profile, 42)
//!     .expect(200)
//!     .fetch()?;
//! # Ok(())
//! # }
//! ```

use std::fmt::Display;
use std::io::Read;

use iobeam_config::Profile;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::response::Response;
use crate::token::{AuthToken, TokenStore};

/// How many refresh exchanges one request may trigger.
pub const MAX_REFRESH_DEPTH: u8 = 1;

enum Auth<'a> {
    None,
    Basic {
        username: String,
        password: String,
    },
    UserToken(&'a Profile),
    ProjectToken {
        profile: &'a mut Profile,
        project_id: u64,
    },
}

enum Body {
    None,
    Json(Vec<u8>),
    Stream(Box<dyn Read + Send>),
    Invalid(serde_json::Error),
}

/// One API call under construction.
pub struct Request<'a> {
    client: &'a Client,
    method: Method,
    path: String,
    params: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Body,
    auth: Auth<'a>,
    expected: Option<u16>,
    refresh_budget: u8,
}

impl<'a> Request<'a> {
    pub(crate) fn new(client: &'a Client, method: Method, path: String) -> Self {
        Self {
            client,
            method,
            path,
            params: Vec::new(),
            headers: Vec::new(),
            body: Body::None,
            auth: Auth::None,
            expected: None,
            refresh_budget: MAX_REFRESH_DEPTH,
        }
    }

    /// Add a query parameter. Repeated names are kept in order.
    pub fn param(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.params.push((name.into(), value.to_string()));
        self
    }

    /// Add a request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// JSON-encode `body` and send it with `Content-Type: application/json`.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        self.body = match serde_json::to_vec(body) {
            Ok(bytes) => Body::Json(bytes),
            Err(e) => Body::Invalid(e),
        };
        self
    }

    /// Stream raw bytes as the body, without JSON framing.
    pub fn body_stream(mut self, reader: impl Read + Send + 'static) -> Self {
        self.body = Body::Stream(Box::new(reader));
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authentication (last setter wins)
    // ─────────────────────────────────────────────────────────────────────────

    /// Authenticate with HTTP Basic credentials.
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Auth::Basic {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    /// Authenticate with the profile's cached user token.
    ///
    /// User tokens are never refreshed; an expired one is sent as is and the
    /// server decides.
    pub fn user_token(mut self, profile: &'a Profile) -> Self {
        self.auth = Auth::UserToken(profile);
        self
    }

    /// Authenticate with the cached token for `project_id`.
    ///
    /// Without a cached token the request goes out unauthenticated. An expired
    /// token is refreshed once before sending, which may update the profile's
    /// active project.
    pub fn project_token(mut self, profile: &'a mut Profile, project_id: u64) -> Self {
        self.auth = Auth::ProjectToken {
            profile,
            project_id,
        };
        self
    }

    /// Never refresh a token while sending this request.
    pub fn without_refresh(mut self) -> Self {
        self.refresh_budget = 0;
        self
    }

    /// Declare the one status code that counts as success.
    pub fn expect(mut self, status: u16) -> Self {
        self.expected = Some(status);
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Execution
    // ─────────────────────────────────────────────────────────────────────────

    /// Send the request and read the whole response.
    ///
    /// Fails if the observed status differs from the one passed to
    /// [`Request::expect`].
    pub fn execute(self) -> Result<Response> {
        let Request {
            client,
            method,
            path,
            params,
            headers,
            body,
            auth,
            expected,
            refresh_budget,
        } = self;

        let url = client.url(&path)?;
        let mut builder = client.http().request(method.clone(), url);
        if !params.is_empty() {
            builder = builder.query(&params);
        }
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match body {
            Body::None => builder,
            Body::Json(bytes) => builder.header(CONTENT_TYPE, "application/json").body(bytes),
            Body::Stream(reader) => builder.body(reqwest::blocking::Body::new(reader)),
            Body::Invalid(e) => return Err(Error::Json(e)),
        };

        builder = match auth {
            Auth::None => builder,
            Auth::Basic { username, password } => builder.basic_auth(username, Some(password)),
            Auth::UserToken(profile) => {
                match TokenStore::for_profile(profile).load_user()? {
                    Some(token) => bearer(builder, &token),
                    None => {
                        tracing::debug!("no user token cached, sending unauthenticated");
                        builder
                    }
                }
            }
            Auth::ProjectToken {
                profile,
                project_id,
            } => match project_token(client, profile, project_id, refresh_budget)? {
                Some(token) => bearer(builder, &token),
                None => {
                    tracing::debug!(project_id, "no project token cached, sending unauthenticated");
                    builder
                }
            },
        };

        tracing::debug!(%method, %path, "sending request");
        let response = Response::read(builder.send()?)?;
        tracing::debug!(status = response.status(), %path, "received response");

        if let Some(want) = expected
            && want != response.status()
        {
            return Err(response.status_error());
        }
        Ok(response)
    }

    /// Execute, then decode the body into `T`.
    pub fn fetch<T: DeserializeOwned>(self) -> Result<T> {
        self.execute()?.decode()
    }
}

fn bearer(
    builder: reqwest::blocking::RequestBuilder,
    token: &AuthToken,
) -> reqwest::blocking::RequestBuilder {
    builder.header(AUTHORIZATION, format!("Bearer {}", token.token))
}

/// Load the cached project token, refreshing it if it has expired and the
/// budget allows.
fn project_token(
    client: &Client,
    profile: &mut Profile,
    project_id: u64,
    refresh_budget: u8,
) -> Result<Option<AuthToken>> {
    let Some(token) = TokenStore::for_profile(profile).load_project(project_id)? else {
        return Ok(None);
    };

    if !token.is_expired()? {
        return Ok(Some(token));
    }
    if refresh_budget == 0 {
        tracing::debug!(project_id, "token expired, refresh disabled for this request");
        return Ok(Some(token));
    }
    token.refresh(client, profile).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::EXPIRY_FORMAT;
    use chrono::{Duration, Utc};
    use httpmock::Method::PATCH;
    use httpmock::prelude::*;
    use iobeam_config::ConfigStore;
    use serde_json::json;
    use tempfile::{TempDir, tempdir};

    fn setup(server: &MockServer) -> (TempDir, Profile, Client) {
        let temp = tempdir().unwrap();
        let store = ConfigStore::at(temp.path());
        let profile = store.create_profile("test", &server.base_url()).unwrap();
        let client = Client::builder()
            .base_url(server.base_url())
            .build()
            .unwrap();
        (temp, profile, client)
    }

    fn token_expiring(project_id: u64, token: &str, offset: Duration) -> AuthToken {
        AuthToken {
            token: token.into(),
            expires: (Utc::now() + offset).format(EXPIRY_FORMAT).to_string(),
            user_id: None,
            project_id: Some(project_id),
            read: true,
            write: true,
            admin: true,
        }
    }

    #[test]
    fn test_expect_mismatch_uses_error_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/devices/abc");
            then.status(404)
                .header("content-type", "application/json")
                .json_body(json!({"errors": [{"code": 404, "message": "device not found", "details": ""}]}));
        });
        let (_temp, _profile, client) = setup(&server);

        let err = client.get("/v1/devices/abc").expect(200).execute().unwrap_err();
        assert_eq!(err.to_string(), "Error: device not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_expect_mismatch_without_body_uses_status_line() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(PATCH).path("/v1/projects/1");
            then.status(204);
        });
        let (_temp, _profile, client) = setup(&server);

        let err = client.patch("/v1/projects/1").expect(200).execute().unwrap_err();
        assert_eq!(err.to_string(), "Unexpected status code 204 No Content");
        assert_eq!(err.status(), Some(204));
    }

    #[test]
    fn test_no_expectation_accepts_any_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(DELETE).path("/v1/files/a.jar");
            then.status(500);
        });
        let (_temp, _profile, client) = setup(&server);

        let rsp = client.delete("/v1/files/a.jar").execute().unwrap();
        assert_eq!(rsp.status(), 500);
    }

    #[test]
    fn test_json_body_and_params() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/imports")
                .query_param("fmt", "table")
                .query_param("project_id", "42")
                .header("content-type", "application/json")
                .header_exists("user-agent")
                .json_body(json!({"device_id": "d1"}));
            then.status(200);
        });
        let (_temp, _profile, client) = setup(&server);

        client
            .post("/v1/imports")
            .param("fmt", "table")
            .param("project_id", 42u64)
            .json(&json!({"device_id": "d1"}))
            .expect(200)
            .execute()
            .unwrap();
        mock.assert();
    }

    #[test]
    fn test_stream_body_is_sent_raw() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(PUT).path("/v1/files/blob.bin").body("raw bytes");
            then.status(201);
        });
        let (_temp, _profile, client) = setup(&server);

        client
            .put("/v1/files/blob.bin")
            .body_stream(std::io::Cursor::new(b"raw bytes".to_vec()))
            .expect(201)
            .execute()
            .unwrap();
        mock.assert();
    }

    #[test]
    fn test_basic_auth_header() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/tokens/user")
                // "me:secret"
                .header("authorization", "Basic bWU6c2VjcmV0");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"token": "u", "expires": "2030-01-01 00:00:00 +0000", "user_id": 7}));
        });
        let (_temp, _profile, client) = setup(&server);

        let token: AuthToken = client
            .get("/v1/tokens/user")
            .basic_auth("me", "secret")
            .expect(200)
            .fetch()
            .unwrap();
        mock.assert();
        assert_eq!(token.user_id, Some(7));
    }

    #[test]
    fn test_user_token_attached() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/users/me")
                .header("authorization", "Bearer user-abc");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"user_id": 7}));
        });
        let (_temp, profile, client) = setup(&server);
        TokenStore::for_profile(&profile)
            .save(&AuthToken {
                token: "user-abc".into(),
                expires: "2000-01-01 00:00:00 +0000".into(),
                user_id: Some(7),
                project_id: None,
                read: false,
                write: false,
                admin: false,
            })
            .unwrap();

        client
            .get("/v1/users/me")
            .user_token(&profile)
            .expect(200)
            .execute()
            .unwrap();
        mock.assert();
    }

    #[test]
    fn test_missing_project_token_sends_unauthenticated() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/v1/devices");
            then.status(401)
                .header("content-type", "application/json")
                .json_body(json!({"errors": [{"code": 401, "message": "unauthorized", "details": ""}]}));
        });
        let (_temp, mut profile, client) = setup(&server);

        let err = client
            .get("/v1/devices")
            .project_token(&mut profile, 42)
            .expect(200)
            .execute()
            .unwrap_err();
        mock.assert();
        assert!(err.is_auth_error());
    }

    #[test]
    fn test_valid_project_token_is_not_refreshed() {
        let server = MockServer::start();
        let refresh = server.mock(|when, then| {
            when.method(POST).path("/v1/tokens/project");
            then.status(500);
        });
        let call = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/devices")
                .header("authorization", "Bearer fresh");
            then.status(200);
        });
        let (_temp, mut profile, client) = setup(&server);
        TokenStore::for_profile(&profile)
            .save(&token_expiring(42, "fresh", Duration::hours(1)))
            .unwrap();

        client
            .get("/v1/devices")
            .project_token(&mut profile, 42)
            .expect(200)
            .execute()
            .unwrap();
        call.assert();
        refresh.assert_calls(0);
    }

    #[test]
    fn test_expired_project_token_is_refreshed_once() {
        let server = MockServer::start();
        let new_token = token_expiring(42, "new-token", Duration::hours(24));
        let refresh = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/tokens/project")
                .json_body(json!({"refresh_token": "old-token"}));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::to_value(&new_token).unwrap());
        });
        let call = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/devices")
                .header("authorization", "Bearer new-token");
            then.status(200);
        });
        let (_temp, mut profile, client) = setup(&server);
        let store = TokenStore::for_profile(&profile);
        store
            .save(&token_expiring(42, "old-token", Duration::seconds(-10)))
            .unwrap();

        client
            .get("/v1/devices")
            .project_token(&mut profile, 42)
            .expect(200)
            .execute()
            .unwrap();

        refresh.assert_calls(1);
        call.assert();
        assert_eq!(store.load_project(42).unwrap(), Some(new_token));
        assert_eq!(profile.active_project, 42);
    }

    #[test]
    fn test_failed_refresh_is_surfaced() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/tokens/project");
            then.status(401)
                .header("content-type", "application/json")
                .json_body(json!({"errors": [{"code": 401, "message": "refresh token revoked", "details": ""}]}));
        });
        let call = server.mock(|when, then| {
            when.method(GET).path("/v1/devices");
            then.status(200);
        });
        let (_temp, mut profile, client) = setup(&server);
        TokenStore::for_profile(&profile)
            .save(&token_expiring(42, "old-token", Duration::seconds(-10)))
            .unwrap();

        let err = client
            .get("/v1/devices")
            .project_token(&mut profile, 42)
            .expect(200)
            .execute()
            .unwrap_err();

        assert!(matches!(err, Error::Refresh { .. }));
        assert!(err.to_string().contains("refresh token revoked"));
        call.assert_calls(0);
    }

    #[test]
    fn test_refresh_disabled_sends_stale_token() {
        let server = MockServer::start();
        let refresh = server.mock(|when, then| {
            when.method(POST).path("/v1/tokens/project");
            then.status(200);
        });
        let call = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/devices")
                .header("authorization", "Bearer stale");
            then.status(200);
        });
        let (_temp, mut profile, client) = setup(&server);
        TokenStore::for_profile(&profile)
            .save(&token_expiring(42, "stale", Duration::seconds(-10)))
            .unwrap();

        client
            .get("/v1/devices")
            .project_token(&mut profile, 42)
            .without_refresh()
            .expect(200)
            .execute()
            .unwrap();
        call.assert();
        refresh.assert_calls(0);
    }

    #[test]
    fn test_malformed_expiry_blocks_request() {
        let server = MockServer::start();
        let call = server.mock(|when, then| {
            when.method(GET).path("/v1/devices");
            then.status(200);
        });
        let (_temp, mut profile, client) = setup(&server);
        TokenStore::for_profile(&profile)
            .save(&AuthToken {
                expires: "not a time".into(),
                ..token_expiring(42, "t", Duration::hours(1))
            })
            .unwrap();

        let err = client
            .get("/v1/devices")
            .project_token(&mut profile, 42)
            .execute()
            .unwrap_err();
        assert!(matches!(err, Error::MalformedExpiry { .. }));
        call.assert_calls(0);
    }

    #[test]
    fn test_last_auth_setter_wins() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/tokens/user")
                .header("authorization", "Basic bWU6c2VjcmV0");
            then.status(200);
        });
        let (_temp, profile, client) = setup(&server);
        TokenStore::for_profile(&profile)
            .save(&AuthToken {
                token: "user-abc".into(),
                expires: "2030-01-01 00:00:00 +0000".into(),
                user_id: Some(1),
                project_id: None,
                read: false,
                write: false,
                admin: false,
            })
            .unwrap();

        client
            .get("/v1/tokens/user")
            .user_token(&profile)
            .basic_auth("me", "secret")
            .expect(200)
            .execute()
            .unwrap();
        mock.assert();
    }
}
