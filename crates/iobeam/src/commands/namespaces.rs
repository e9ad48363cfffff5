//! `iobeam namespace`: typed data namespaces within a project.
//!
//! A namespace declares its fields (`name:TYPE`) and carries free-form
//! labels. Updates can only add fields; labels given on update replace
//! labels of the same name.

use std::collections::BTreeMap;

use clap::ArgMatches;
use console::{Style, style};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::imports::typed_value;
use super::{Payload, is_zero};
use crate::command::options::{get_string, get_strings, get_u64, string, strings, uint};
use crate::command::{Command, Context, Registry};
use crate::error::{CommandError, Result};

pub const KEY: &str = "namespace";

/// Field types a namespace can declare.
pub const FIELD_TYPES: [&str; 3] = ["DOUBLE", "LONG", "STRING"];

const FIELD_HELP: &str =
    "Field on form name:type (ex: temp:DOUBLE). Supported types are DOUBLE, LONG, and STRING";

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Namespace resource as sent to and returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    #[serde(default)]
    pub project_id: u64,
    #[serde(default, rename = "namespace_name")]
    pub name: String,
    #[serde(default)]
    pub partitioning_field: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fields: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub namespace_id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_modified: String,
}

impl Namespace {
    fn print(&self) {
        println!("Name: {}", style(&self.name).bold());
        println!("Id: {}", style(self.namespace_id).cyan());
        println!("Partitioning field: {}", self.partitioning_field);
        let dim = Style::new().dim();
        println!("Created: {}", dim.apply_to(&self.created));
        println!("Last modified: {}", dim.apply_to(&self.last_modified));
        println!("Fields:");
        for (name, kind) in &self.fields {
            println!("\t{name}:{kind}");
        }
        println!("Labels:");
        for (name, value) in &self.labels {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            println!("\t{name}:{value}");
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceList {
    pub project_id: u64,
}

impl NamespaceList {
    pub fn is_valid(&self) -> bool {
        self.project_id != 0
    }
}

/// `namespace create` input. Fields and labels are kept as typed on the
/// command line and parsed when the command runs.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNamespace {
    pub project_id: u64,
    pub name: String,
    pub partitioning_field: String,
    pub fields: Vec<String>,
    pub labels: Vec<String>,
}

impl NewNamespace {
    pub fn is_valid(&self) -> bool {
        self.project_id != 0
            && !self.name.is_empty()
            && !self.partitioning_field.is_empty()
            && !self.fields.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceUpdate {
    pub project_id: u64,
    pub namespace_id: u64,
    pub fields: Vec<String>,
    pub labels: Vec<String>,
}

impl NamespaceUpdate {
    pub fn is_valid(&self) -> bool {
        self.project_id != 0 && self.namespace_id != 0 && !self.fields.is_empty()
    }
}

/// Parse `name:TYPE` field declarations.
pub fn parse_fields(raw: &[String]) -> Result<BTreeMap<String, String>> {
    let mut fields = BTreeMap::new();
    for field in raw {
        let Some((name, kind)) = field.split_once(':').filter(|(_, k)| !k.contains(':')) else {
            return Err(CommandError::Input(format!("Bad field: {field}")));
        };
        if !FIELD_TYPES.contains(&kind) {
            return Err(CommandError::Input(format!("Bad type {kind} on field {name}")));
        }
        fields.insert(name.to_string(), kind.to_string());
    }
    Ok(fields)
}

/// Parse `name=value` labels, typing each value like an imported data point.
pub fn parse_labels(raw: &[String]) -> Result<BTreeMap<String, Value>> {
    let mut labels = BTreeMap::new();
    for label in raw {
        let Some((name, value)) = label.split_once('=').filter(|(_, v)| !v.contains('=')) else {
            return Err(CommandError::Input(format!("Bad label arg: {label}")));
        };
        let typed = typed_value(value)
            .ok_or_else(|| CommandError::Input(format!("Bad label value: {value}")))?;
        labels.insert(name.to_string(), typed);
    }
    Ok(labels)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tree
// ─────────────────────────────────────────────────────────────────────────────

pub fn command(registry: &mut Registry) -> Command {
    let path = registry.register(KEY, "/v1/namespaces");
    let project = || uint("projectId", "Project ID (defaults to active project).");

    Command::new(KEY, "Commands for managing namespaces.")
        .subcommand(
            Command::new("create", "Create a namespace")
                .api_path(&path)
                .option(project())
                .option(string("name", "Namespace name"))
                .option(string("partitioningField", "Field to partition incoming data on."))
                .option(strings("field", FIELD_HELP))
                .option(strings("label", "Label to set, can occur multiple times (ex. site=\"lab\")"))
                .bind(|m, ctx| {
                    Payload::NamespaceCreate(NewNamespace {
                        project_id: project_id(m, ctx),
                        name: get_string(m, "name"),
                        partitioning_field: get_string(m, "partitioningField"),
                        fields: get_strings(m, "field"),
                        labels: get_strings(m, "label"),
                    })
                }),
        )
        .subcommand(
            Command::new("list", "List namespaces")
                .api_path(&path)
                .option(project())
                .bind(|m, ctx| {
                    Payload::NamespaceList(NamespaceList {
                        project_id: project_id(m, ctx),
                    })
                }),
        )
        .subcommand(
            Command::new("update", "Update a namespace. Fields can only be added; labels are added or replaced.")
                .api_path(&path)
                .option(project())
                .option(uint("id", "Namespace id."))
                .option(strings("field", FIELD_HELP))
                .option(strings("label", "Label to set, can occur multiple times"))
                .bind(|m, ctx| {
                    Payload::NamespaceUpdate(NamespaceUpdate {
                        project_id: project_id(m, ctx),
                        namespace_id: get_u64(m, "id").unwrap_or(0),
                        fields: get_strings(m, "field"),
                        labels: get_strings(m, "label"),
                    })
                }),
        )
}

fn project_id(m: &ArgMatches, ctx: &Context) -> u64 {
    get_u64(m, "projectId").unwrap_or(ctx.profile.active_project)
}

// ─────────────────────────────────────────────────────────────────────────────
// Actions
// ─────────────────────────────────────────────────────────────────────────────

pub fn list(cmd: &Command, ctx: &mut Context, args: NamespaceList) -> Result<()> {
    #[derive(Deserialize)]
    struct Listing {
        #[serde(default, alias = "Namespaces", deserialize_with = "null_as_default")]
        namespaces: Vec<Namespace>,
    }

    let listing: Listing = ctx
        .client
        .get(cmd.path())
        .project_token(&mut ctx.profile, args.project_id)
        .expect(200)
        .fetch()?;

    for namespace in listing.namespaces {
        namespace.print();
        println!();
    }
    Ok(())
}

pub fn create(cmd: &Command, ctx: &mut Context, args: NewNamespace) -> Result<()> {
    let namespace = Namespace {
        project_id: args.project_id,
        name: args.name,
        partitioning_field: args.partitioning_field,
        fields: parse_fields(&args.fields)?,
        labels: parse_labels(&args.labels)?,
        ..Namespace::default()
    };

    let response = ctx
        .client
        .post(cmd.path())
        .project_token(&mut ctx.profile, namespace.project_id)
        .json(&namespace)
        .expect(201)
        .execute()?;

    println!("Namespace created at {}.", response.location().unwrap_or_default());
    Ok(())
}

pub fn update(cmd: &Command, ctx: &mut Context, args: NamespaceUpdate) -> Result<()> {
    let labels = parse_labels(&args.labels)?;
    let fields = parse_fields(&args.fields)?;
    let path = format!("{}/{}", cmd.path(), args.namespace_id);

    let mut namespace: Namespace = ctx
        .client
        .get(&path)
        .project_token(&mut ctx.profile, args.project_id)
        .expect(200)
        .fetch()?;

    namespace.labels.extend(labels);
    for (name, kind) in fields {
        if namespace.fields.contains_key(&name) {
            return Err(CommandError::Input(format!(
                "Update field is not supported. Field {name}"
            )));
        }
        namespace.fields.insert(name, kind);
    }

    ctx.client
        .put(&path)
        .project_token(&mut ctx.profile, args.project_id)
        .json(&namespace)
        .expect(204)
        .execute()?;

    println!("Namespace updated.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use iobeam_client::{AuthToken, Client, TokenStore};
    use iobeam_config::ConfigStore;
    use serde_json::json;
    use tempfile::{TempDir, tempdir};

    fn raw(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    /// A context against `server` holding a project token for project 4.
    fn context(server: &MockServer) -> (TempDir, Command, Context) {
        let temp = tempdir().unwrap();
        let store = ConfigStore::at(temp.path());
        let profile = store.create_profile("test", &server.base_url()).unwrap();
        TokenStore::for_profile(&profile)
            .save(&AuthToken {
                token: "proj".into(),
                expires: "2099-01-01 00:00:00 +0000".into(),
                user_id: None,
                project_id: Some(4),
                read: true,
                write: true,
                admin: false,
            })
            .unwrap();
        let client = Client::builder().base_url(server.base_url()).build().unwrap();
        let (root, registry) = super::super::build_tree();
        let ctx = Context::new(Vec::new(), client, profile, store, registry);
        (temp, root, ctx)
    }

    #[test]
    fn test_parse_fields() {
        let fields = parse_fields(&raw(&["temp:DOUBLE", "site:STRING"])).unwrap();
        assert_eq!(fields["temp"], "DOUBLE");
        assert_eq!(fields["site"], "STRING");

        let err = parse_fields(&raw(&["temp"])).unwrap_err();
        assert_eq!(err.to_string(), "Bad field: temp");
        assert!(parse_fields(&raw(&["a:b:c"])).is_err());
        let err = parse_fields(&raw(&["temp:FLOAT"])).unwrap_err();
        assert_eq!(err.to_string(), "Bad type FLOAT on field temp");
    }

    #[test]
    fn test_parse_labels_types_values() {
        let labels = parse_labels(&raw(&["floor=3", "ratio=0.5", "site=\"lab\""])).unwrap();
        assert_eq!(labels["floor"], json!(3));
        assert_eq!(labels["ratio"], json!(0.5));
        assert_eq!(labels["site"], json!("lab"));

        assert!(parse_labels(&raw(&["site"])).is_err());
        assert!(parse_labels(&raw(&["site=lab"])).is_err());
    }

    #[test]
    fn test_validity() {
        let create = NewNamespace {
            project_id: 4,
            name: "env".into(),
            partitioning_field: "device_id".into(),
            fields: raw(&["temp:DOUBLE"]),
            labels: Vec::new(),
        };
        assert!(create.is_valid());
        assert!(!NewNamespace { fields: Vec::new(), ..create.clone() }.is_valid());
        assert!(!NewNamespace { partitioning_field: String::new(), ..create }.is_valid());

        let update = NamespaceUpdate {
            project_id: 4,
            namespace_id: 0,
            fields: raw(&["temp:DOUBLE"]),
            labels: Vec::new(),
        };
        assert!(!update.is_valid());
        assert!(NamespaceUpdate { namespace_id: 2, ..update }.is_valid());
        assert!(!NamespaceList { project_id: 0 }.is_valid());
    }

    #[test]
    fn test_reads_null_maps() {
        let ns: Namespace = serde_json::from_value(json!({
            "namespace_name": "env",
            "namespace_id": 2,
            "fields": null,
            "labels": null
        }))
        .unwrap();
        assert!(ns.fields.is_empty());
        assert!(ns.labels.is_empty());
    }

    #[test]
    fn test_create_posts_parsed_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/namespaces")
                .header("authorization", "Bearer proj")
                .json_body(json!({
                    "project_id": 4,
                    "namespace_name": "env",
                    "partitioning_field": "device_id",
                    "fields": {"temp": "DOUBLE"},
                    "labels": {"floor": 3}
                }));
            then.status(201).header("location", "/v1/namespaces/9");
        });
        let (_temp, root, mut ctx) = context(&server);
        let cmd = root.find(KEY).and_then(|c| c.find("create")).unwrap();

        let args = NewNamespace {
            project_id: 4,
            name: "env".into(),
            partitioning_field: "device_id".into(),
            fields: raw(&["temp:DOUBLE"]),
            labels: raw(&["floor=3"]),
        };
        create(cmd, &mut ctx, args).unwrap();
        mock.assert();
    }

    #[test]
    fn test_update_adds_fields_and_replaces_labels() {
        let server = MockServer::start();
        let current = json!({
            "project_id": 4,
            "namespace_name": "env",
            "partitioning_field": "device_id",
            "namespace_id": 2,
            "fields": {"temp": "DOUBLE"},
            "labels": {"floor": 1, "site": "lab"}
        });
        server.mock(|when, then| {
            when.method(GET).path("/v1/namespaces/2");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(current);
        });
        let put = server.mock(|when, then| {
            when.method(PUT).path("/v1/namespaces/2").json_body(json!({
                "project_id": 4,
                "namespace_name": "env",
                "partitioning_field": "device_id",
                "namespace_id": 2,
                "fields": {"hum": "LONG", "temp": "DOUBLE"},
                "labels": {"floor": 3, "site": "lab"}
            }));
            then.status(204);
        });
        let (_temp, root, mut ctx) = context(&server);
        let cmd = root.find(KEY).and_then(|c| c.find("update")).unwrap();

        let args = NamespaceUpdate {
            project_id: 4,
            namespace_id: 2,
            fields: raw(&["hum:LONG"]),
            labels: raw(&["floor=3"]),
        };
        update(cmd, &mut ctx, args).unwrap();
        put.assert();
    }

    #[test]
    fn test_update_refuses_existing_field() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/namespaces/2");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"namespace_id": 2, "fields": {"temp": "DOUBLE"}}));
        });
        let put = server.mock(|when, then| {
            when.method(PUT);
            then.status(204);
        });
        let (_temp, root, mut ctx) = context(&server);
        let cmd = root.find(KEY).and_then(|c| c.find("update")).unwrap();

        let args = NamespaceUpdate {
            project_id: 4,
            namespace_id: 2,
            fields: raw(&["temp:LONG"]),
            labels: Vec::new(),
        };
        let err = update(cmd, &mut ctx, args).unwrap_err();
        assert_eq!(err.to_string(), "Update field is not supported. Field temp");
        put.assert_calls(0);
    }
}
