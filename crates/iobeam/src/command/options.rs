//! Per-node option parsing on top of `clap::Arg` declarations.
//!
//! Each command node declares its options as `clap::Arg`s. Parsing a node
//! builds a throwaway `clap::Command` from them plus a trailing catch-all
//! positional, so parsing stops at the first token that is not an option
//! and everything from there on is left for routing.
//!
//! Options may be written with one dash or two: `-id abc`, `-id=abc` and
//! `--id abc` are equivalent.

use clap::{Arg, ArgAction, ArgMatches, value_parser};

use crate::error::Result;

/// Tokens that ask for usage text instead of running anything.
pub const HELP_TOKENS: [&str; 4] = ["-h", "-help", "--help", "--h"];

const REST: &str = "__rest";

/// Whether `token` is one of [`HELP_TOKENS`].
pub fn is_help(token: &str) -> bool {
    HELP_TOKENS.contains(&token)
}

// ─────────────────────────────────────────────────────────────────────────────
// Declarations
// ─────────────────────────────────────────────────────────────────────────────

/// A string option, `-name value`.
pub fn string(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .value_name("string")
        .allow_hyphen_values(true)
        .help(help)
}

/// An unsigned integer option, used for ids.
pub fn uint(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .value_name("uint")
        .value_parser(value_parser!(u64))
        .allow_hyphen_values(true)
        .help(help)
}

/// A signed integer option.
pub fn int(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .value_name("int")
        .value_parser(value_parser!(i64))
        .allow_hyphen_values(true)
        .help(help)
}

/// A repeatable string option; every occurrence is kept, in order.
pub fn strings(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .value_name("string")
        .action(ArgAction::Append)
        .allow_hyphen_values(true)
        .help(help)
}

/// A boolean switch: `-read` or `-read=false`.
pub fn flag(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .action(ArgAction::Set)
        .num_args(0..=1)
        .require_equals(true)
        .default_missing_value("true")
        .value_parser(value_parser!(bool))
        .help(help)
}

// ─────────────────────────────────────────────────────────────────────────────
// Reading parsed values
// ─────────────────────────────────────────────────────────────────────────────

/// String value of `id`, empty if absent.
pub fn get_string(m: &ArgMatches, id: &str) -> String {
    m.try_get_one::<String>(id)
        .ok()
        .flatten()
        .cloned()
        .unwrap_or_default()
}

/// Every value given for a repeatable option.
pub fn get_strings(m: &ArgMatches, id: &str) -> Vec<String> {
    m.try_get_many::<String>(id)
        .ok()
        .flatten()
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

/// Unsigned value of `id`, if given.
pub fn get_u64(m: &ArgMatches, id: &str) -> Option<u64> {
    m.try_get_one::<u64>(id).ok().flatten().copied()
}

/// Signed value of `id`, if given.
pub fn get_i64(m: &ArgMatches, id: &str) -> Option<i64> {
    m.try_get_one::<i64>(id).ok().flatten().copied()
}

/// Boolean value of `id`, false if absent.
pub fn get_bool(m: &ArgMatches, id: &str) -> bool {
    m.try_get_one::<bool>(id)
        .ok()
        .flatten()
        .copied()
        .unwrap_or(false)
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Result of parsing a node's options.
#[derive(Debug)]
pub struct Parsed {
    /// Values of the declared options.
    pub matches: ArgMatches,
    /// Number of tokens taken by options.
    pub consumed: usize,
}

/// Parse `tokens` against the declared `args`.
pub fn parse(name: &'static str, args: &[Arg], tokens: &[String]) -> Result<Parsed> {
    let cmd = clap::Command::new(name)
        .no_binary_name(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .args_override_self(true)
        .args(args.iter().cloned())
        .arg(
            Arg::new(REST)
                .num_args(0..)
                .trailing_var_arg(true)
                .allow_hyphen_values(true)
                .action(ArgAction::Append),
        );

    let normalized: Vec<String> = tokens.iter().map(|t| normalize(args, t)).collect();
    let matches = cmd.try_get_matches_from(normalized)?;
    let leftover = matches.get_raw(REST).map(|v| v.count()).unwrap_or(0);

    Ok(Parsed {
        consumed: tokens.len() - leftover,
        matches,
    })
}

/// Rewrite `-name` / `-name=value` to the double-dash form when `name` is a
/// declared option.
fn normalize(args: &[Arg], token: &str) -> String {
    let Some(rest) = token.strip_prefix('-') else {
        return token.to_string();
    };
    if rest.starts_with('-') || rest.is_empty() {
        return token.to_string();
    }
    let name = rest.split('=').next().unwrap_or(rest);
    if args.iter().any(|a| a.get_long() == Some(name)) {
        format!("-{token}")
    } else {
        token.to_string()
    }
}

/// The "Available Flags" lines for `args`.
pub fn describe(args: &[Arg]) -> String {
    let mut out = String::new();
    for arg in args {
        let Some(long) = arg.get_long() else {
            continue;
        };
        let value = arg
            .get_value_names()
            .and_then(|names| names.first())
            .map(|v| format!(" {v}"))
            .unwrap_or_default();
        let help = arg.get_help().map(|h| h.to_string()).unwrap_or_default();
        out.push_str(&format!("  -{long}{value}\n    \t{help}\n"));
    }
    out
}
