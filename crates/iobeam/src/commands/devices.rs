//! `iobeam device`: create, inspect and remove devices.

use clap::ArgMatches;
use console::{Style, style};
use serde::{Deserialize, Serialize};

use super::{Payload, is_zero};
use crate::command::options::{get_string, get_u64, string, uint};
use crate::command::{Command, Context, Registry};
use crate::error::Result;

pub const KEY: &str = "device";

/// Device resource as sent to and returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Device {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub project_id: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub device_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub device_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub device_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created: String,
}

impl Device {
    /// New devices need a project.
    pub fn is_valid_create(&self) -> bool {
        self.project_id != 0
    }

    /// Updates need a device and something to change.
    pub fn is_valid_update(&self) -> bool {
        !self.device_id.is_empty()
            && (self.project_id != 0 || !self.device_name.is_empty() || !self.device_type.is_empty())
    }
}

/// A single device, addressed within a project.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRef {
    pub device_id: String,
    pub project_id: u64,
}

impl DeviceRef {
    pub fn is_valid(&self) -> bool {
        !self.device_id.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceList {
    pub project_id: u64,
}

impl DeviceList {
    pub fn is_valid(&self) -> bool {
        self.project_id != 0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tree
// ─────────────────────────────────────────────────────────────────────────────

pub fn command(registry: &mut Registry) -> Command {
    let path = registry.register(KEY, "/v1/devices");

    Command::new(KEY, "Create, get, or delete devices")
        .subcommand(
            Command::new("create", "create device")
                .api_path(&path)
                .option(uint("projectId", "The project associated with the device (defaults to active project)"))
                .option(string("id", "The device's identifier"))
                .option(string("name", "The device name"))
                .option(string("type", "The type of device"))
                .bind(bind_create),
        )
        .subcommand(
            Command::new("update", "update device")
                .api_path(&path)
                .option(string("id", "The ID of the device to update (REQUIRED)"))
                .option(uint("projectId", "Move the device to this project"))
                .option(string("name", "The device name"))
                .option(string("type", "The type of device"))
                .bind(bind_update),
        )
        .subcommand(
            Command::new("get", "get device information")
                .api_path(&path)
                .option(string("id", "The ID of the device to query (REQUIRED)"))
                .bind(bind_get),
        )
        .subcommand(
            Command::new("list", "list devices")
                .api_path(&path)
                .option(uint("id", "List devices in this project (defaults to active project)"))
                .bind(bind_list),
        )
        .subcommand(
            Command::new("delete", "delete device")
                .api_path(&path)
                .option(string("id", "The ID of the device to delete (REQUIRED)"))
                .bind(bind_delete),
        )
}

fn fields(m: &ArgMatches, project_id: u64) -> Device {
    Device {
        project_id,
        device_id: get_string(m, "id"),
        device_name: get_string(m, "name"),
        device_type: get_string(m, "type"),
        created: String::new(),
    }
}

fn bind_create(m: &ArgMatches, ctx: &Context) -> Payload {
    let project_id = get_u64(m, "projectId").unwrap_or(ctx.profile.active_project);
    Payload::DeviceCreate(fields(m, project_id))
}

fn bind_update(m: &ArgMatches, _ctx: &Context) -> Payload {
    Payload::DeviceUpdate(fields(m, get_u64(m, "projectId").unwrap_or(0)))
}

fn device_ref(m: &ArgMatches, ctx: &Context) -> DeviceRef {
    DeviceRef {
        device_id: get_string(m, "id"),
        project_id: ctx.profile.active_project,
    }
}

fn bind_get(m: &ArgMatches, ctx: &Context) -> Payload {
    Payload::DeviceGet(device_ref(m, ctx))
}

fn bind_delete(m: &ArgMatches, ctx: &Context) -> Payload {
    Payload::DeviceDelete(device_ref(m, ctx))
}

fn bind_list(m: &ArgMatches, ctx: &Context) -> Payload {
    Payload::DeviceList(DeviceList {
        project_id: get_u64(m, "id").unwrap_or(ctx.profile.active_project),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Actions
// ─────────────────────────────────────────────────────────────────────────────

pub fn create(cmd: &Command, ctx: &mut Context, device: Device) -> Result<()> {
    let created: Device = ctx
        .client
        .post(cmd.path())
        .project_token(&mut ctx.profile, device.project_id)
        .json(&device)
        .expect(201)
        .fetch()?;

    println!("The new device ID is {}", created.device_id);
    Ok(())
}

pub fn update(cmd: &Command, ctx: &mut Context, device: Device) -> Result<()> {
    let project_id = match device.project_id {
        0 => ctx.profile.active_project,
        id => id,
    };
    let result = ctx
        .client
        .patch(format!("{}/{}", cmd.path(), device.device_id))
        .project_token(&mut ctx.profile, project_id)
        .json(&device)
        .expect(200)
        .execute();

    match result {
        Ok(_) => println!("Device successfully updated"),
        Err(e) if e.status() == Some(204) => println!("Device not modified"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub fn get(cmd: &Command, ctx: &mut Context, target: DeviceRef) -> Result<()> {
    let device: Device = ctx
        .client
        .get(format!("{}/{}", cmd.path(), target.device_id))
        .project_token(&mut ctx.profile, target.project_id)
        .expect(200)
        .fetch()?;

    println!("Device name: {}", style(&device.device_name).bold());
    println!("Device ID: {}", style(&device.device_id).cyan());
    println!("Project ID: {}", device.project_id);
    println!("Type: {}", device.device_type);
    println!("Created: {}", Style::new().dim().apply_to(&device.created));
    Ok(())
}

pub fn list(cmd: &Command, ctx: &mut Context, args: DeviceList) -> Result<()> {
    #[derive(Deserialize)]
    struct Listing {
        #[serde(default, alias = "Devices")]
        devices: Vec<Device>,
    }

    let listing: Listing = ctx
        .client
        .get(cmd.path())
        .param("project_id", args.project_id)
        .project_token(&mut ctx.profile, args.project_id)
        .expect(200)
        .fetch()?;

    let dim = Style::new().dim();
    println!("{}", style(format!("Devices in project {}", args.project_id)).bold());
    for device in listing.devices {
        println!();
        println!("Name: {}", device.device_name);
        println!("Device ID: {}", style(&device.device_id).cyan());
        println!("Type: {}", device.device_type);
        println!("Created: {}", dim.apply_to(&device.created));
    }
    Ok(())
}

pub fn delete(cmd: &Command, ctx: &mut Context, target: DeviceRef) -> Result<()> {
    ctx.client
        .delete(format!("{}/{}", cmd.path(), target.device_id))
        .project_token(&mut ctx.profile, target.project_id)
        .expect(204)
        .execute()?;

    println!("Device successfully deleted");
    Ok(())
}
