//! Recursive command dispatch.
//!
//! The CLI is a tree of [`Command`] nodes. Executing a node consumes its own
//! name from argv, parses its options, and then either runs its action or
//! routes the next token to a subcommand. Anything else ends in usage text.

pub mod context;
pub mod options;
pub mod registry;

use std::collections::BTreeMap;

use clap::{Arg, ArgMatches};

use crate::commands::Payload;
use crate::error::{CommandError, Result};

pub use context::Context;
pub use registry::Registry;

/// Action that needs no parsed input.
pub type Handler = fn(&Command, &mut Context) -> Result<()>;

/// Builds a command's payload from its parsed options and the context.
pub type Binder = fn(&ArgMatches, &Context) -> Payload;

/// What a node does when it is the last one on the command line.
#[derive(Clone, Copy)]
pub enum Action {
    /// Run directly.
    Run(Handler),
    /// Bind a payload, then run it if it is valid.
    Bind(Binder),
}

/// One node of the command tree.
pub struct Command {
    name: &'static str,
    usage: &'static str,
    flag_set: String,
    api_path: String,
    options: Vec<Arg>,
    subcommands: BTreeMap<&'static str, Command>,
    action: Option<Action>,
}

impl Command {
    pub fn new(name: &'static str, usage: &'static str) -> Self {
        Self {
            name,
            usage,
            flag_set: name.to_string(),
            api_path: String::new(),
            options: Vec::new(),
            subcommands: BTreeMap::new(),
            action: None,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Construction
    // ─────────────────────────────────────────────────────────────────────────

    pub fn api_path(mut self, path: impl Into<String>) -> Self {
        self.api_path = path.into();
        self
    }

    pub fn option(mut self, arg: Arg) -> Self {
        self.options.push(arg);
        self
    }

    pub fn subcommand(mut self, mut sub: Command) -> Self {
        sub.qualify(&self.flag_set);
        self.subcommands.insert(sub.name, sub);
        self
    }

    pub fn run(mut self, handler: Handler) -> Self {
        self.action = Some(Action::Run(handler));
        self
    }

    pub fn bind(mut self, binder: Binder) -> Self {
        self.action = Some(Action::Bind(binder));
        self
    }

    /// Prefix this node's usage name (and its children's) with `parent`.
    fn qualify(&mut self, parent: &str) {
        self.flag_set = format!("{parent} {}", self.name);
        let prefix = self.flag_set.clone();
        for sub in self.subcommands.values_mut() {
            sub.qualify(&prefix);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Base API path this node talks to.
    pub fn path(&self) -> &str {
        &self.api_path
    }

    /// Full name shown in usage, e.g. `iobeam device get`.
    pub fn flag_set(&self) -> &str {
        &self.flag_set
    }

    pub fn find(&self, name: &str) -> Option<&Command> {
        self.subcommands.get(name)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dispatch
    // ─────────────────────────────────────────────────────────────────────────

    /// Execute this node against the context's argv cursor.
    pub fn execute(&self, ctx: &mut Context) -> Result<()> {
        ctx.advance(1);

        let parsed = match options::parse(self.name, &self.options, ctx.remaining()) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.print_usage();
                return Err(e);
            }
        };
        ctx.advance(parsed.consumed);

        let payload = match self.action {
            Some(Action::Bind(bind)) => Some(bind(&parsed.matches, ctx)),
            _ => None,
        };
        let valid = payload.as_ref().is_none_or(Payload::is_valid);

        if valid {
            if ctx.current().is_none() {
                if let Some(payload) = payload {
                    tracing::debug!(command = %self.flag_set, "running action");
                    return payload.run(self, ctx);
                }
                if let Some(Action::Run(handler)) = self.action {
                    tracing::debug!(command = %self.flag_set, "running action");
                    return handler(self, ctx);
                }
            }

            let next = ctx.current().map(str::to_string);
            if !self.subcommands.is_empty()
                && let Some(token) = next
                && !options::is_help(&token)
            {
                return match self.subcommands.get(token.as_str()) {
                    Some(sub) => sub.execute(ctx),
                    None => Err(CommandError::InvalidCommand(token)),
                };
            }
        } else {
            tracing::debug!(command = %self.flag_set, "input not valid, showing usage");
        }

        self.print_usage();
        match ctx.current() {
            Some(token) if !options::is_help(token) => {
                Err(CommandError::UnrecognizedInput(token.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Usage text for this node.
    pub fn usage(&self) -> String {
        let flags = if self.options.is_empty() { "" } else { " [FLAGS]" };
        let mut out = String::new();

        if self.subcommands.is_empty() {
            out.push_str(&format!("Usage: {}{flags}\n\n{}\n", self.flag_set, self.usage));
        } else {
            out.push_str(&format!(
                "Usage: {} COMMAND{flags}\n\n{}\n\nAvailable Commands:\n",
                self.flag_set, self.usage
            ));
            for sub in self.subcommands.values() {
                out.push_str(&format!("  {:<20} :: {}\n", sub.name, sub.usage));
            }
        }

        if !self.options.is_empty() {
            out.push_str("\nAvailable Flags:\n");
            out.push_str(&options::describe(&self.options));
        }
        out
    }

    fn print_usage(&self) {
        eprint!("{}", self.usage());
    }
}
