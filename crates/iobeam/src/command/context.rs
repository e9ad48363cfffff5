//! Per-invocation dispatch state.

use iobeam_client::Client;
use iobeam_config::{ConfigStore, Profile};

use super::registry::Registry;

/// The argv cursor plus everything commands share during one invocation.
///
/// Fields are public so an action can borrow the client and the profile
/// at the same time, e.g. `ctx.client.get(..).project_token(&mut ctx.profile, id)`.
pub struct Context {
    args: Vec<String>,
    index: usize,
    /// Client bound to the active profile's server.
    pub client: Client,
    /// The active profile.
    pub profile: Profile,
    /// Config root holding all profiles.
    pub config: ConfigStore,
    /// Keyword lookup built with the command tree.
    pub registry: Registry,
}

impl Context {
    pub fn new(
        args: Vec<String>,
        client: Client,
        profile: Profile,
        config: ConfigStore,
        registry: Registry,
    ) -> Self {
        Self {
            args,
            index: 0,
            client,
            profile,
            config,
            registry,
        }
    }

    /// The full argv.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Cursor position in argv.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Token under the cursor, if any.
    pub fn current(&self) -> Option<&str> {
        self.args.get(self.index).map(String::as_str)
    }

    /// Tokens from the cursor on.
    pub fn remaining(&self) -> &[String] {
        self.args.get(self.index..).unwrap_or_default()
    }

    /// Move the cursor forward; it never moves back.
    pub fn advance(&mut self, by: usize) {
        self.index = (self.index + by).min(self.args.len());
    }
}
