//! Blocking client for the iobeam REST API.
//!
//! This crate provides:
//! - [`Client`]: a shared HTTP client bound to one API server
//! - [`Request`]: a fluent builder for a single call, with Basic, user-token
//!   or project-token authentication and a declared success status
//! - [`Response`]: content-type driven body decoding
//! - [`AuthToken`] / [`TokenStore`]: cached bearer tokens and the refresh
//!   exchange for expired project tokens
//!
//! # Example
//!
//! ```no_run
//! use iobeam_client::{AuthToken, Client, TokenStore};
//! use iobeam_config::ConfigStore;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let profile = ConfigStore::discover()?.active_profile()?;
//! let client = Client::builder().base_url(&profile.server).build()?;
//!
//! let token: AuthToken = client
//!     .get("/v1/tokens/user")
//!     .basic_auth("me@example.com", "hunter2")
//!     .expect(200)
//!     .fetch()?;
//! TokenStore::for_profile(&profile).save(&token)?;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod request;
mod response;
mod token;

pub use client::{Client, ClientBuilder, default_user_agent};
pub use error::{Error, Result};
pub use request::{MAX_REFRESH_DEPTH, Request};
pub use response::Response;
pub use token::{AuthToken, EXPIRY_FORMAT, REFRESH_PATH, TokenScope, TokenStore, USER_TOKEN_FILE};
