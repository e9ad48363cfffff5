//! `iobeam profile`: local profile management.

use clap::ArgMatches;
use console::style;
use iobeam_config::DEFAULT_API_SERVER;
use serde::Deserialize;

use super::Payload;
use crate::command::options::{flag, get_bool, get_string, string};
use crate::command::{Command, Context, Registry};
use crate::error::{CommandError, Result};

pub const KEY: &str = "profile";

const NONE: &str = "[None]";

#[derive(Debug, Clone, PartialEq)]
pub struct NewProfile {
    pub name: String,
    pub server: String,
    pub activate: bool,
}

impl NewProfile {
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty() && !self.server.is_empty()
    }
}

/// Names an existing profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileName {
    pub name: String,
}

impl ProfileName {
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
    }
}

pub fn command(registry: &mut Registry) -> Command {
    registry.register(KEY, "");

    Command::new(KEY, "Manage your CLI profiles.")
        .subcommand(
            Command::new("create", "Create a new local profile for the CLI.")
                .option(string("name", "Profile name/identifier"))
                .option(string("server", "URL of API server").default_value(DEFAULT_API_SERVER))
                .option(flag("active", "Make this the active profile after creation"))
                .bind(|m, _| {
                    Payload::ProfileCreate(NewProfile {
                        name: get_string(m, "name"),
                        server: get_string(m, "server"),
                        activate: get_bool(m, "active"),
                    })
                }),
        )
        .subcommand(
            Command::new("delete", "Delete a profile.")
                .option(string("name", "Name of profile to delete (cannot be active)"))
                .bind(|m, _| Payload::ProfileDelete(profile_name(m))),
        )
        .subcommand(Command::new("info", "Displays the current CLI profile info.").run(info))
        .subcommand(Command::new("list", "Displays all available profiles.").run(list))
        .subcommand(
            Command::new("switch", "Changes the active profile.")
                .option(string("name", "Name of profile to switch to"))
                .bind(|m, _| Payload::ProfileSwitch(profile_name(m))),
        )
}

fn profile_name(m: &ArgMatches) -> ProfileName {
    ProfileName {
        name: get_string(m, "name"),
    }
}

pub fn create(_cmd: &Command, ctx: &mut Context, args: NewProfile) -> Result<()> {
    ctx.config.create_profile(&args.name, &args.server)?;
    println!("Profile '{}' successfully created.", args.name);

    if args.activate {
        ctx.config.switch_profile(&args.name)?;
        println!("Active profile is now '{}'", args.name);
    }
    Ok(())
}

pub fn delete(_cmd: &Command, ctx: &mut Context, args: ProfileName) -> Result<()> {
    if args.name == ctx.profile.name {
        return Err(CommandError::Input("Cannot delete active profile".into()));
    }
    ctx.config.delete_profile(&args.name)?;
    println!("Profile '{}' successfully deleted", args.name);
    Ok(())
}

pub fn switch(_cmd: &Command, ctx: &mut Context, args: ProfileName) -> Result<()> {
    ctx.config.switch_profile(&args.name)?;
    println!("Active profile is now '{}'", args.name);
    Ok(())
}

fn info(_cmd: &Command, ctx: &mut Context) -> Result<()> {
    println!("Profile name  : {}", style(&ctx.profile.name).bold());
    println!("API server    : {}", style(&ctx.profile.server).cyan());
    println!();

    let (user, email) = match ctx.profile.active_user {
        0 => (NONE.to_string(), NONE.to_string()),
        id => (id.to_string(), active_email(ctx)),
    };
    println!("Active user id: {user}");
    println!("Active user   : {email}");
    println!();

    let project = match ctx.profile.active_project {
        0 => NONE.to_string(),
        id => id.to_string(),
    };
    println!("Active project: {project}");
    Ok(())
}

/// The active user's email, looked up and cached on first use.
///
/// A failed lookup only leaves the email blank.
fn active_email(ctx: &mut Context) -> String {
    if !ctx.profile.active_user_email.is_empty() {
        return ctx.profile.active_user_email.clone();
    }

    #[derive(Deserialize)]
    struct Me {
        #[serde(default)]
        email: String,
    }

    let me: Me = match ctx.client.get("/v1/users/me").user_token(&ctx.profile).expect(200).fetch() {
        Ok(me) => me,
        Err(e) => {
            tracing::warn!(error = %e, "could not look up active user");
            return String::new();
        }
    };

    let user = ctx.profile.active_user;
    if let Err(e) = ctx.profile.update_active_user(user, me.email.clone()) {
        tracing::warn!(error = %e, "could not cache active user email");
    }
    me.email
}

fn list(_cmd: &Command, ctx: &mut Context) -> Result<()> {
    for name in ctx.config.list_profiles()? {
        if name == ctx.profile.name {
            println!("{}", style(format!("* {name}")).green().bold());
        } else {
            println!("  {name}");
        }
    }
    Ok(())
}
