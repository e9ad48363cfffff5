//! `iobeam app`: deploy and control apps running on iobeam.
//!
//! Deploying uploads the bundle through the file store first, then creates
//! the app pointing at it. Start and stop only record the requested status;
//! the command then polls the app until the server reports that it got there.

use console::{Style, style};
use serde::{Deserialize, Serialize};

use super::files::{self, Checksum, Upload};
use super::{Payload, is_zero};
use crate::command::options::{get_string, get_u64, string, uint};
use crate::command::{Command, Context, Registry};
use crate::error::Result;
use crate::poll::{PollConfig, poll_status};

pub const KEY: &str = "app";

pub const STATUS_RUNNING: &str = "RUNNING";
pub const STATUS_STOPPED: &str = "STOPPED";

const BUNDLE_TYPE: &str = "JAR";
const BUNDLE_CHECKSUM_ALG: &str = "SHA256";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    #[serde(default)]
    pub checksum: Checksum,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub uri: String,
}

/// An app as the API describes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct App {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub app_id: u64,
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub project_id: u64,
    #[serde(default)]
    pub bundle: Bundle,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_modified: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub requested_status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub current_status: String,
}

impl App {
    fn print(&self) {
        let dim = Style::new().dim();
        println!("App ID  : {}", style(self.app_id).cyan());
        println!("App Name: {}", style(&self.app_name).bold());
        println!("Created : {}", dim.apply_to(&self.created));
        if !self.requested_status.is_empty() {
            println!("Requested Status: {}", self.requested_status);
        }
        if !self.current_status.is_empty() {
            let current = &self.current_status;
            println!("Current Status  : {}", status_style(current).apply_to(current));
        }
        println!();
        println!("{}", style("BUNDLE INFO").bold());
        println!("URI     : {}", self.bundle.uri);
        println!("Type    : {}", self.bundle.kind);
        self.bundle.checksum.print();
        println!();
    }
}

fn status_style(status: &str) -> Style {
    match status {
        STATUS_RUNNING => Style::new().green(),
        STATUS_STOPPED => Style::new().yellow(),
        _ => Style::new().red(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Deploy {
    pub upload: Upload,
    pub name: String,
}

impl Deploy {
    pub fn is_valid(&self) -> bool {
        self.upload.is_valid() && !self.name.is_empty()
    }
}

/// An app addressed by id or by name within a project.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppRef {
    pub project_id: u64,
    pub id: u64,
    pub name: String,
}

impl AppRef {
    pub fn is_valid(&self) -> bool {
        self.project_id != 0 && (self.id != 0 || !self.name.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppList {
    pub project_id: u64,
}

impl AppList {
    pub fn is_valid(&self) -> bool {
        self.project_id != 0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tree
// ─────────────────────────────────────────────────────────────────────────────

fn project_option(help: &'static str) -> clap::Arg {
    uint("projectId", help)
}

fn app_ref(m: &clap::ArgMatches, ctx: &Context) -> AppRef {
    AppRef {
        project_id: get_u64(m, "projectId").unwrap_or(ctx.profile.active_project),
        id: get_u64(m, "id").unwrap_or(0),
        name: get_string(m, "name"),
    }
}

pub fn command(registry: &mut Registry) -> Command {
    let path = registry.register(KEY, "/v1/apps");

    Command::new(KEY, "Commands for managing apps.")
        .subcommand(
            Command::new("deploy", "Launch a Spark app on iobeam.")
                .api_path(&path)
                .option(project_option("Project ID (defaults to active project)."))
                .option(string("name", "Name of the app. (REQUIRED)"))
                .option(string("path", "Path to app to upload. (REQUIRED)"))
                .bind(|m, ctx| {
                    Payload::AppDeploy(Deploy {
                        upload: Upload {
                            project_id: get_u64(m, "projectId").unwrap_or(ctx.profile.active_project),
                            path: get_string(m, "path"),
                        },
                        name: get_string(m, "name"),
                    })
                }),
        )
        .subcommand(
            Command::new("delete", "Delete an app.")
                .api_path(&path)
                .option(uint("id", "App ID to delete (REQUIRED)"))
                .option(project_option("Project ID to delete from (defaults to active project)"))
                .bind(|m, ctx| Payload::AppDelete(app_ref(m, ctx))),
        )
        .subcommand(
            Command::new("get", "Get app information.")
                .api_path(&path)
                .option(uint("id", "App ID to get (this or -name is required)"))
                .option(string("name", "App name to get (this or -id is required)"))
                .option(project_option("Project ID to get from (defaults to active project)"))
                .bind(|m, ctx| Payload::AppGet(app_ref(m, ctx))),
        )
        .subcommand(
            Command::new("list", "List apps for a project.")
                .api_path(&path)
                .option(project_option("Project ID to list from (defaults to active project)."))
                .bind(|m, ctx| {
                    Payload::AppList(AppList {
                        project_id: get_u64(m, "projectId").unwrap_or(ctx.profile.active_project),
                    })
                }),
        )
        .subcommand(
            Command::new("start", "Start an app by id.")
                .api_path(&path)
                .option(uint("id", "App ID to start (REQUIRED)."))
                .option(project_option("Project ID of app (defaults to active project)"))
                .bind(|m, ctx| Payload::AppStart(app_ref(m, ctx))),
        )
        .subcommand(
            Command::new("stop", "Stop an app by id.")
                .api_path(&path)
                .option(uint("id", "App ID to stop (REQUIRED)."))
                .option(project_option("Project ID of app (defaults to active project)"))
                .bind(|m, ctx| Payload::AppStop(app_ref(m, ctx))),
        )
}

// ─────────────────────────────────────────────────────────────────────────────
// Actions
// ─────────────────────────────────────────────────────────────────────────────

pub fn deploy(cmd: &Command, ctx: &mut Context, args: Deploy) -> Result<()> {
    let digest = files::upload_file(ctx, &args.upload)?;

    let app = App {
        app_name: args.name,
        project_id: args.upload.project_id,
        requested_status: STATUS_RUNNING.to_string(),
        bundle: Bundle {
            kind: BUNDLE_TYPE.to_string(),
            uri: format!("file://{}", args.upload.file_name()),
            checksum: Checksum {
                alg: BUNDLE_CHECKSUM_ALG.to_string(),
                sum: digest,
            },
        },
        ..App::default()
    };

    let created: App = ctx
        .client
        .post(cmd.path())
        .project_token(&mut ctx.profile, app.project_id)
        .json(&app)
        .expect(201)
        .fetch()?;

    println!("New app created.");
    println!("App ID: {}", created.app_id);
    println!("App Name: {}", created.app_name);
    println!();
    Ok(())
}

/// Look an app up by id, or by name when no id is given.
fn fetch_app(cmd: &Command, ctx: &mut Context, target: &AppRef) -> iobeam_client::Result<App> {
    let req = if target.id != 0 {
        ctx.client.get(format!("{}/{}", cmd.path(), target.id))
    } else {
        ctx.client.get(cmd.path()).param("name", &target.name)
    };
    req.project_token(&mut ctx.profile, target.project_id)
        .expect(200)
        .fetch()
}

pub fn get(cmd: &Command, ctx: &mut Context, target: AppRef) -> Result<()> {
    fetch_app(cmd, ctx, &target)?.print();
    Ok(())
}

pub fn list(cmd: &Command, ctx: &mut Context, args: AppList) -> Result<()> {
    #[derive(Deserialize)]
    struct Listing {
        #[serde(default)]
        apps: Vec<App>,
    }

    let listing: Listing = ctx
        .client
        .get(cmd.path())
        .project_token(&mut ctx.profile, args.project_id)
        .expect(200)
        .fetch()?;

    if listing.apps.is_empty() {
        println!("No apps found for project {}.", args.project_id);
    }
    for (i, app) in listing.apps.iter().enumerate() {
        if i > 0 {
            println!("{}", Style::new().dim().apply_to("----------"));
        }
        app.print();
    }
    Ok(())
}

pub fn delete(cmd: &Command, ctx: &mut Context, target: AppRef) -> Result<()> {
    ctx.client
        .delete(format!("{}/{}", cmd.path(), target.id))
        .project_token(&mut ctx.profile, target.project_id)
        .expect(204)
        .execute()?;

    println!("App {} successfully deleted.", target.id);
    Ok(())
}

pub fn start(cmd: &Command, ctx: &mut Context, target: AppRef) -> Result<()> {
    change_status(cmd, ctx, &target, STATUS_RUNNING, PollConfig::default())
}

pub fn stop(cmd: &Command, ctx: &mut Context, target: AppRef) -> Result<()> {
    change_status(cmd, ctx, &target, STATUS_STOPPED, PollConfig::default())
}

/// Request `status` for the app, then wait until it is reported as current.
fn change_status(
    cmd: &Command,
    ctx: &mut Context,
    target: &AppRef,
    status: &str,
    poll: PollConfig,
) -> Result<()> {
    let mut app = fetch_app(cmd, ctx, target)?;
    app.requested_status = status.to_string();

    let req = if target.id != 0 {
        ctx.client.patch(format!("{}/{}", cmd.path(), target.id))
    } else {
        ctx.client.patch(cmd.path()).param("name", &target.name)
    };
    let result = req
        .project_token(&mut ctx.profile, target.project_id)
        .json(&app)
        .expect(200)
        .execute();

    match result {
        Ok(_) => {}
        Err(e) if e.status() == Some(204) => {
            tracing::debug!(app = app.app_id, status, "app status not modified");
        }
        Err(e) => return Err(e.into()),
    }

    println!("Waiting for app {} to reach {status}...", app.app_id);
    poll_status(
        || fetch_app(cmd, ctx, target).map(|a| a.current_status),
        status,
        poll,
    )?;
    println!("App {} is {}.", app.app_id, status_style(status).apply_to(status));
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::commands::build_tree;
    use httpmock::Method::PATCH;
    use httpmock::prelude::*;
    use iobeam_client::Client;
    use iobeam_config::ConfigStore;
    use serde_json::json;
    use tempfile::{TempDir, tempdir};

    fn context(server: &MockServer) -> (TempDir, Context) {
        let temp = tempdir().unwrap();
        let store = ConfigStore::at(temp.path().join("config"));
        let profile = store.create_profile("test", &server.base_url()).unwrap();
        let client = Client::builder().base_url(server.base_url()).build().unwrap();
        let (_, registry) = build_tree();
        (temp, Context::new(Vec::new(), client, profile, store, registry))
    }

    fn fast() -> PollConfig {
        PollConfig {
            max_attempts: 3,
            step: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_ref_validity() {
        let mut target = AppRef {
            project_id: 1,
            ..AppRef::default()
        };
        assert!(!target.is_valid());
        target.name = "spark".into();
        assert!(target.is_valid());
        target.project_id = 0;
        assert!(!target.is_valid());
    }

    #[test]
    fn test_start_patches_then_polls() {
        let server = MockServer::start();
        let get = server.mock(|when, then| {
            when.method(GET).path("/v1/apps/9");
            then.status(200).header("content-type", "application/json").json_body(json!({
                "app_id": 9,
                "app_name": "spark",
                "project_id": 1,
                "requested_status": "RUNNING",
                "current_status": "RUNNING"
            }));
        });
        let patch = server.mock(|when, then| {
            when.method(PATCH).path("/v1/apps/9");
            then.status(200);
        });
        let (_temp, mut ctx) = context(&server);
        let (root, _) = build_tree();
        let cmd = root.find(KEY).and_then(|a| a.find("start")).unwrap();

        let target = AppRef {
            project_id: 1,
            id: 9,
            name: String::new(),
        };
        change_status(cmd, &mut ctx, &target, STATUS_RUNNING, fast()).unwrap();

        patch.assert();
        // one lookup before the patch, one poll after
        get.assert_calls(2);
    }

    #[test]
    fn test_stop_gives_up_after_max_attempts() {
        let server = MockServer::start();
        let get = server.mock(|when, then| {
            when.method(GET).path("/v1/apps/9");
            then.status(200).header("content-type", "application/json").json_body(json!({
                "app_id": 9,
                "current_status": "RUNNING"
            }));
        });
        server.mock(|when, then| {
            when.method(PATCH).path("/v1/apps/9");
            then.status(204);
        });
        let (_temp, mut ctx) = context(&server);
        let (root, _) = build_tree();
        let cmd = root.find(KEY).and_then(|a| a.find("stop")).unwrap();

        let target = AppRef {
            project_id: 1,
            id: 9,
            name: String::new(),
        };
        let err = change_status(cmd, &mut ctx, &target, STATUS_STOPPED, fast()).unwrap_err();

        assert!(err.to_string().contains("RUNNING"));
        get.assert_calls(4);
    }

    #[test]
    fn test_deploy_body() {
        let app = App {
            app_name: "spark".into(),
            project_id: 2,
            requested_status: STATUS_RUNNING.into(),
            bundle: Bundle {
                kind: BUNDLE_TYPE.into(),
                uri: "file://app.jar".into(),
                checksum: Checksum {
                    alg: BUNDLE_CHECKSUM_ALG.into(),
                    sum: "ab".into(),
                },
            },
            ..App::default()
        };
        assert_eq!(
            serde_json::to_value(&app).unwrap(),
            json!({
                "app_name": "spark",
                "project_id": 2,
                "requested_status": "RUNNING",
                "bundle": {"type": "JAR", "uri": "file://app.jar", "checksum": {"alg": "SHA256", "sum": "ab"}}
            })
        );
    }
}
