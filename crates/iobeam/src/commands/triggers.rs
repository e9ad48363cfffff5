//! `iobeam trigger`: actions the server fires when data arrives.
//!
//! Every trigger carries one action: an HTTP POST, an MQTT publish or a
//! Twilio SMS. `trigger test` sends a synthetic event so an action can be
//! checked without real data.

use std::collections::BTreeMap;

use clap::ArgMatches;
use console::{Style, style};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Payload, is_zero};
use crate::command::options::{get_string, get_strings, get_u64, string, strings, uint};
use crate::command::{Command, Context, Registry};
use crate::error::Result;

pub const KEY: &str = "trigger";

/// Endpoint receiving synthetic test events.
pub const TEST_PATH: &str = "/v1/triggers/events/test";

pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Highest MQTT quality-of-service level.
const MAX_QOS: u8 = 2;

/// One action of a trigger, as stored by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub min_delay: u64,
    #[serde(default)]
    pub args: Value,
}

/// Trigger resource as sent to and returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub trigger_id: u64,
    #[serde(default)]
    pub project_id: u64,
    #[serde(default)]
    pub trigger_name: String,
    /// Milliseconds after which data is too old to fire the trigger (0 = never).
    #[serde(default)]
    pub data_expiry: u64,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Trigger {
    fn print(&self) {
        println!("Trigger ID  : {}", style(self.trigger_id).cyan());
        println!("Trigger name: {}", style(&self.trigger_name).bold());
        println!("Project ID  : {}", self.project_id);
        println!("Data expiry : {}", self.data_expiry);
        println!("Actions:");
        let dim = Style::new().dim();
        for (i, action) in self.actions.iter().enumerate() {
            if i > 0 {
                println!();
            }
            println!("  {}) Action type: {}", i + 1, action.kind);
            println!("     Min delay  : {}", action.min_delay);
            println!("     Args: {}", dim.apply_to(&action.args));
        }
        println!();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Action arguments
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HttpArgs {
    pub url: String,
    pub payload: String,
    pub auth_header: String,
    pub content_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MqttArgs {
    #[serde(rename = "broker_addr")]
    pub broker: String,
    pub username: String,
    pub password: String,
    pub qos: u8,
    pub topic: String,
    pub payload: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SmsArgs {
    pub account_sid: String,
    pub auth_token: String,
    pub from: String,
    pub to: String,
    #[serde(rename = "message")]
    pub payload: String,
}

/// Arguments of a new trigger's action; serialized as the bare argument object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActionArgs {
    Http(HttpArgs),
    Mqtt(MqttArgs),
    Sms(SmsArgs),
}

impl ActionArgs {
    /// Action type name on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            ActionArgs::Http(_) => "http",
            ActionArgs::Mqtt(_) => "mqtt",
            ActionArgs::Sms(_) => "sms",
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            ActionArgs::Http(a) => !a.url.is_empty() && !a.content_type.is_empty(),
            ActionArgs::Mqtt(a) => {
                !a.broker.is_empty() && !a.topic.is_empty() && !a.payload.is_empty() && a.qos <= MAX_QOS
            }
            ActionArgs::Sms(a) => [&a.account_sid, &a.auth_token, &a.from, &a.to, &a.payload]
                .iter()
                .all(|s| !s.is_empty()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Payloads
// ─────────────────────────────────────────────────────────────────────────────

/// `trigger create <kind>` input.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrigger {
    pub project_id: u64,
    pub name: String,
    pub data_expiry: u64,
    pub min_delay: u64,
    pub action: ActionArgs,
}

impl NewTrigger {
    pub fn is_valid(&self) -> bool {
        self.project_id != 0 && !self.name.is_empty() && self.action.is_valid()
    }

    /// Request body: the trigger with its single action.
    pub fn body(&self) -> Result<Trigger> {
        let args = serde_json::to_value(&self.action).map_err(iobeam_client::Error::from)?;
        Ok(Trigger {
            trigger_id: 0,
            project_id: self.project_id,
            trigger_name: self.name.clone(),
            data_expiry: self.data_expiry,
            actions: vec![Action {
                kind: self.action.kind().to_string(),
                min_delay: self.min_delay,
                args,
            }],
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerList {
    pub project_id: u64,
}

impl TriggerList {
    pub fn is_valid(&self) -> bool {
        self.project_id != 0
    }
}

/// A trigger addressed by id or, for lookups, by name.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerRef {
    pub project_id: u64,
    pub id: u64,
    pub name: String,
}

impl TriggerRef {
    pub fn is_valid(&self) -> bool {
        self.project_id != 0 && (self.id != 0 || !self.name.is_empty())
    }
}

/// `trigger test` input; each param is `key,value`.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerTest {
    pub project_id: u64,
    pub name: String,
    pub params: Vec<String>,
}

impl TriggerTest {
    pub fn is_valid(&self) -> bool {
        self.project_id != 0 && !self.name.is_empty() && self.params.iter().all(|p| p.contains(','))
    }

    /// Event data; the value is everything after the first comma.
    pub fn data(&self) -> BTreeMap<String, String> {
        self.params
            .iter()
            .filter_map(|p| p.split_once(','))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tree
// ─────────────────────────────────────────────────────────────────────────────

pub fn command(registry: &mut Registry) -> Command {
    let path = registry.register(KEY, "/v1/triggers");

    Command::new(KEY, "Commands for managing triggers.")
        .subcommand(
            Command::new("create", "Commands for adding new triggers")
                .subcommand(
                    with_common_options(Command::new("http", "Create a new HTTP trigger"), &path)
                        .option(string("url", "URL to POST to when trigger is executed."))
                        .option(string("payload", "Body of POST request (optional)."))
                        .option(string(
                            "authHeader",
                            "Value of 'Authorization' header of POST request, if needed (optional).",
                        ))
                        .option(string("contentType", "Content type of payload.").default_value(DEFAULT_CONTENT_TYPE))
                        .bind(|m, ctx| {
                            new_trigger(
                                m,
                                ctx,
                                ActionArgs::Http(HttpArgs {
                                    url: get_string(m, "url"),
                                    payload: get_string(m, "payload"),
                                    auth_header: get_string(m, "authHeader"),
                                    content_type: get_string(m, "contentType"),
                                }),
                            )
                        }),
                )
                .subcommand(
                    with_common_options(Command::new("mqtt", "Create a new MQTT trigger"), &path)
                        .option(string("broker", "MQTT broker address to send to."))
                        .option(string("username", "Username to use with MQTT broker"))
                        .option(string("password", "Password to use with MQTT broker"))
                        .option(uint("qos", "Quality of service level (0, 1 or 2)."))
                        .option(string("topic", "MQTT topic to post message to."))
                        .option(string("payload", "Body of the MQTT request."))
                        .bind(|m, ctx| {
                            let qos = get_u64(m, "qos").unwrap_or(0);
                            new_trigger(
                                m,
                                ctx,
                                ActionArgs::Mqtt(MqttArgs {
                                    broker: get_string(m, "broker"),
                                    username: get_string(m, "username"),
                                    password: get_string(m, "password"),
                                    qos: u8::try_from(qos).unwrap_or(u8::MAX),
                                    topic: get_string(m, "topic"),
                                    payload: get_string(m, "payload"),
                                }),
                            )
                        }),
                )
                .subcommand(
                    with_common_options(Command::new("sms", "Create a new Twilio SMS trigger"), &path)
                        .option(string("accountSid", "Twilio account SID."))
                        .option(string("authToken", "Twilio authorization token."))
                        .option(string("from", "Phone number of the SMS sender."))
                        .option(string("to", "Phone number of the SMS recipient."))
                        .option(string("payload", "SMS message body."))
                        .bind(|m, ctx| {
                            new_trigger(
                                m,
                                ctx,
                                ActionArgs::Sms(SmsArgs {
                                    account_sid: get_string(m, "accountSid"),
                                    auth_token: get_string(m, "authToken"),
                                    from: get_string(m, "from"),
                                    to: get_string(m, "to"),
                                    payload: get_string(m, "payload"),
                                }),
                            )
                        }),
                ),
        )
        .subcommand(
            Command::new("delete", "Delete trigger by id")
                .api_path(&path)
                .option(uint("projectId", "Project ID to delete trigger from."))
                .option(uint("id", "Trigger ID to delete."))
                .bind(|m, ctx| Payload::TriggerDelete(trigger_ref(m, ctx))),
        )
        .subcommand(
            Command::new("get", "Get trigger matching a name or id")
                .api_path(&path)
                .option(uint("projectId", "Project ID to get trigger from."))
                .option(uint("id", "Trigger ID to get (either this or -name must be set)."))
                .option(string("name", "Trigger name to get (either this or -id must be set)."))
                .bind(|m, ctx| Payload::TriggerGet(trigger_ref(m, ctx))),
        )
        .subcommand(
            Command::new("list", "Get all triggers for a project")
                .api_path(&path)
                .option(uint("projectId", "Project ID to get triggers from."))
                .bind(|m, ctx| {
                    Payload::TriggerList(TriggerList {
                        project_id: project_id(m, ctx),
                    })
                }),
        )
        .subcommand(
            Command::new("test", "Test that a trigger works.")
                .api_path(TEST_PATH)
                .option(uint("projectId", "Project ID of trigger."))
                .option(string("name", "Trigger name to test."))
                .option(strings(
                    "param",
                    "Parameters for trigger in form of \"param_key,param_value\" (flag can be used multiple times).",
                ))
                .bind(|m, ctx| {
                    Payload::TriggerTest(TriggerTest {
                        project_id: project_id(m, ctx),
                        name: get_string(m, "name"),
                        params: get_strings(m, "param"),
                    })
                }),
        )
}

/// Options shared by every `trigger create` kind.
fn with_common_options(cmd: Command, path: &str) -> Command {
    cmd.api_path(path)
        .option(uint("projectId", "Project ID this trigger belongs to (defaults to active project)."))
        .option(string("name", "Name of the new trigger."))
        .option(uint(
            "dataExpiry",
            "Time (in milliseconds) after which data is considered too old to fire trigger (0 = never too old).",
        ))
        .option(uint(
            "minDelay",
            "Minimum time (in milliseconds) between successive trigger firings (used to rate limit trigger events).",
        ))
}

fn project_id(m: &ArgMatches, ctx: &Context) -> u64 {
    get_u64(m, "projectId").unwrap_or(ctx.profile.active_project)
}

fn new_trigger(m: &ArgMatches, ctx: &Context, action: ActionArgs) -> Payload {
    Payload::TriggerCreate(NewTrigger {
        project_id: project_id(m, ctx),
        name: get_string(m, "name"),
        data_expiry: get_u64(m, "dataExpiry").unwrap_or(0),
        min_delay: get_u64(m, "minDelay").unwrap_or(0),
        action,
    })
}

fn trigger_ref(m: &ArgMatches, ctx: &Context) -> TriggerRef {
    TriggerRef {
        project_id: project_id(m, ctx),
        id: get_u64(m, "id").unwrap_or(0),
        name: get_string(m, "name"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Actions
// ─────────────────────────────────────────────────────────────────────────────

pub fn create(cmd: &Command, ctx: &mut Context, args: NewTrigger) -> Result<()> {
    let body = args.body()?;
    let created: Trigger = ctx
        .client
        .post(cmd.path())
        .project_token(&mut ctx.profile, args.project_id)
        .json(&body)
        .expect(201)
        .fetch()?;

    println!(
        "Trigger '{}' created with ID: {}",
        created.trigger_name,
        style(created.trigger_id).cyan()
    );
    Ok(())
}

pub fn list(cmd: &Command, ctx: &mut Context, args: TriggerList) -> Result<()> {
    #[derive(Deserialize)]
    struct Listing {
        #[serde(default, alias = "Triggers")]
        triggers: Vec<Trigger>,
    }

    let listing: Listing = ctx
        .client
        .get(cmd.path())
        .project_token(&mut ctx.profile, args.project_id)
        .expect(200)
        .fetch()?;

    for trigger in &listing.triggers {
        trigger.print();
    }
    Ok(())
}

pub fn get(cmd: &Command, ctx: &mut Context, target: TriggerRef) -> Result<()> {
    let req = if target.id != 0 {
        ctx.client.get(format!("{}/{}", cmd.path(), target.id))
    } else {
        ctx.client.get(cmd.path()).param("name", &target.name)
    };
    let trigger: Trigger = req
        .project_token(&mut ctx.profile, target.project_id)
        .expect(200)
        .fetch()?;

    trigger.print();
    Ok(())
}

pub fn delete(cmd: &Command, ctx: &mut Context, target: TriggerRef) -> Result<()> {
    ctx.client
        .delete(format!("{}/{}", cmd.path(), target.id))
        .project_token(&mut ctx.profile, target.project_id)
        .expect(204)
        .execute()?;

    println!("Trigger successfully deleted");
    Ok(())
}

pub fn send_test(cmd: &Command, ctx: &mut Context, args: TriggerTest) -> Result<()> {
    #[derive(Serialize)]
    struct Event {
        event_name: String,
        data: BTreeMap<String, String>,
    }

    let event = Event {
        data: args.data(),
        event_name: args.name,
    };
    ctx.client
        .put(cmd.path())
        .project_token(&mut ctx.profile, args.project_id)
        .json(&event)
        .expect(204)
        .execute()?;

    println!("Test event sent to trigger '{}'.", event.event_name);
    Ok(())
}
