//! `iobeam import`: write a single data point to a device series.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Value, json};

use super::Payload;
use crate::command::options::{get_i64, get_string, get_u64, int, string, uint};
use crate::command::{Command, Context, Registry};
use crate::error::{CommandError, Result};

pub const KEY: &str = "import";

pub const DEFAULT_NAMESPACE: &str = "input";

const DOUBLE_PATTERN: &str = r"^[-+]?[0-9]+\.[0-9]+$";
const LONG_PATTERN: &str = r"^[-+]?[0-9]+$";
const STRING_PATTERN: &str = r#"^".*"$"#;

/// A value pattern, compiled on first use.
type Pattern = LazyLock<Option<Regex>>;

static DOUBLE: Pattern = LazyLock::new(|| Regex::new(DOUBLE_PATTERN).ok());
static LONG: Pattern = LazyLock::new(|| Regex::new(LONG_PATTERN).ok());
static STRING: Pattern = LazyLock::new(|| Regex::new(STRING_PATTERN).ok());

fn matches(pattern: &Pattern, value: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(value))
}

/// Type a command-line value: decimals become doubles, integers longs and
/// double-quoted text a string without its quotes.
pub fn typed_value(value: &str) -> Option<Value> {
    if matches(&DOUBLE, value) {
        return value.parse::<f64>().ok().map(Value::from);
    }
    if matches(&LONG, value) {
        return value.parse::<i64>().ok().map(Value::from);
    }
    if matches(&STRING, value) {
        let inner = value.strip_prefix('"').unwrap_or(value);
        let inner = inner.strip_suffix('"').unwrap_or(inner);
        return Some(Value::from(inner));
    }
    None
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub project_id: u64,
    pub device_id: String,
    pub namespace: String,
    pub series: String,
    /// Milliseconds since the epoch.
    pub time: i64,
    pub value: String,
}

impl Import {
    pub fn is_valid(&self) -> bool {
        self.project_id != 0
            && !self.device_id.is_empty()
            && !self.series.is_empty()
            && self.time >= 0
            && typed_value(&self.value).is_some()
    }

    /// Request body in table form: one `[time, value]` row.
    fn body(&self) -> Option<ImportBody<'_>> {
        let value = typed_value(&self.value)?;
        Some(ImportBody {
            project_id: self.project_id,
            device_id: &self.device_id,
            namespace: &self.namespace,
            data: Table {
                fields: ["time", &self.series],
                data: [json!([self.time, value])],
            },
        })
    }
}

#[derive(Serialize)]
struct Table<'a> {
    fields: [&'a str; 2],
    data: [Value; 1],
}

#[derive(Serialize)]
struct ImportBody<'a> {
    project_id: u64,
    device_id: &'a str,
    data: Table<'a>,
    namespace: &'a str,
}

pub fn command(registry: &mut Registry) -> Command {
    let path = registry.register(KEY, "/v1/imports");

    Command::new(KEY, "Add new data points.")
        .api_path(path)
        .option(uint("projectId", "Project ID (if omitted, defaults to active project)"))
        .option(string("deviceId", "Device ID (REQUIRED)"))
        .option(
            string("namespace", "Namespace to write to (Defaults to 'input')")
                .default_value(DEFAULT_NAMESPACE),
        )
        .option(string("series", "Series name (REQUIRED)"))
        .option(int(
            "time",
            "Timestamp, in milliseconds, of the data (if omitted, defaults to current time)",
        ))
        .option(string("value", "Data value (REQUIRED)"))
        .bind(|m, ctx| {
            Payload::Import(Import {
                project_id: get_u64(m, "projectId").unwrap_or(ctx.profile.active_project),
                device_id: get_string(m, "deviceId"),
                namespace: get_string(m, "namespace"),
                series: get_string(m, "series"),
                time: get_i64(m, "time").unwrap_or_else(|| chrono::Utc::now().timestamp_millis()),
                value: get_string(m, "value"),
            })
        })
}

pub fn send(cmd: &Command, ctx: &mut Context, import: Import) -> Result<()> {
    let body = import
        .body()
        .ok_or_else(|| CommandError::Input("Failed to determine type of series value.".into()))?;

    ctx.client
        .post(cmd.path())
        .param("fmt", "table")
        .project_token(&mut ctx.profile, import.project_id)
        .json(&body)
        .expect(200)
        .execute()?;

    println!("Data successfully imported.");
    Ok(())
}
