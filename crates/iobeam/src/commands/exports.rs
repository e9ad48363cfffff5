//! `iobeam export`: read back data for a project, device or series.

use iobeam_client::TokenStore;
use serde_json::Value;

use super::Payload;
use crate::command::options::{get_string, get_u64, string, uint};
use crate::command::{Command, Context, Registry};
use crate::error::{CommandError, Result};

pub const KEY: &str = "export";

pub const DEFAULT_LIMIT: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    pub project_id: u64,
    pub device_id: String,
    pub series: String,
    pub limit: u64,
}

impl Export {
    pub fn is_valid(&self) -> bool {
        self.project_id != 0 && self.limit != 0
    }

    /// `<base>/<project>[/<device>[/<series>]]`; a series without a device is ignored.
    pub fn path(&self, base: &str) -> String {
        let mut path = format!("{base}/{}", self.project_id);
        if !self.device_id.is_empty() {
            path.push('/');
            path.push_str(&self.device_id);
            if !self.series.is_empty() {
                path.push('/');
                path.push_str(&self.series);
            }
        }
        path
    }
}

pub fn command(registry: &mut Registry) -> Command {
    let path = registry.register(KEY, "/v1/exports");

    Command::new(KEY, "Get data for projects, devices, and series")
        .api_path(path)
        .option(uint("projectId", "Project ID (if omitted, defaults to active project)"))
        .option(string("deviceId", "Device ID"))
        .option(string("series", "Series name"))
        .option(uint("limit", "Max number of results"))
        .bind(|m, ctx| {
            Payload::Export(Export {
                project_id: get_u64(m, "projectId").unwrap_or(ctx.profile.active_project),
                device_id: get_string(m, "deviceId"),
                series: get_string(m, "series"),
                limit: get_u64(m, "limit").unwrap_or(DEFAULT_LIMIT),
            })
        })
}

pub fn fetch(cmd: &Command, ctx: &mut Context, export: Export) -> Result<()> {
    if TokenStore::for_profile(&ctx.profile)
        .load_project(export.project_id)?
        .is_none()
    {
        return Err(CommandError::Input(format!(
            "Missing token for project {}.",
            export.project_id
        )));
    }

    let results: Value = ctx
        .client
        .get(export.path(cmd.path()))
        .param("limit", export.limit)
        .project_token(&mut ctx.profile, export.project_id)
        .expect(200)
        .fetch()?;

    println!("Results: ");
    println!("{}", serde_json::to_string_pretty(&results).map_err(iobeam_client::Error::from)?);
    Ok(())
}
