//! `iobeam project`: projects, their permissions and project tokens.

use clap::ArgMatches;
use console::{Style, style};
use iobeam_client::{AuthToken, TokenStore};
use serde::{Deserialize, Serialize};

use super::{Payload, is_zero, prompt};
use crate::command::options::{flag, get_bool, get_string, get_u64, string, uint};
use crate::command::{Command, Context, Registry};
use crate::error::Result;

pub const KEY: &str = "project";

const TOKEN_PATH: &str = "/v1/tokens/project";
const DEFAULT_ID_HELP: &str = "Project ID (if omitted, defaults to active project)";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub project_name: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub project_id: u64,
}

impl Project {
    pub fn is_valid_create(&self) -> bool {
        !self.project_name.is_empty()
    }

    pub fn is_valid_update(&self) -> bool {
        !self.project_name.is_empty() && self.project_id != 0
    }

    /// Lookups need a name or an id.
    pub fn is_valid_get(&self) -> bool {
        !self.project_name.is_empty() || self.project_id != 0
    }
}

/// A project addressed by id alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectId {
    pub id: u64,
}

impl ProjectId {
    pub fn is_valid(&self) -> bool {
        self.id != 0
    }
}

/// Grant, change or revoke a user's permissions on a project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddUser {
    #[serde(skip)]
    pub project_id: u64,
    pub user_id: u64,
    pub read: bool,
    pub write: bool,
    pub admin: bool,
}

impl AddUser {
    pub fn is_valid(&self) -> bool {
        self.project_id != 0 && self.user_id != 0
    }

    fn has_permissions(&self) -> bool {
        self.read || self.write || self.admin
    }
}

/// Permissions requested for a project token.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TokenRequest {
    pub project_id: u64,
    pub read: bool,
    pub write: bool,
    pub admin: bool,
}

impl TokenRequest {
    pub fn is_valid(&self) -> bool {
        self.project_id != 0
    }
}

#[derive(Debug, Default, Deserialize)]
struct UserRef {
    #[serde(default)]
    user_id: u64,
}

#[derive(Debug, Default, Deserialize)]
struct PermissionLists {
    #[serde(default, alias = "Read")]
    read: Vec<UserRef>,
    #[serde(default, alias = "Write")]
    write: Vec<UserRef>,
    #[serde(default, alias = "Admin")]
    admin: Vec<UserRef>,
}

fn ids(users: &[UserRef]) -> String {
    users.iter().map(|u| format!("{} ", u.user_id)).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tree
// ─────────────────────────────────────────────────────────────────────────────

pub fn command(registry: &mut Registry) -> Command {
    let path = registry.register(KEY, "/v1/projects");

    Command::new(KEY, "Commands for managing projects.")
        .subcommand(
            Command::new(
                "add-user",
                "Add/remove a user to a project. Setting all flags to false will remove a user from a project.",
            )
            .api_path(&path)
            .option(uint("id", DEFAULT_ID_HELP))
            .option(uint("userId", "User ID of user to add"))
            .option(flag("read", "Give user read permission"))
            .option(flag("write", "Give user write permission"))
            .option(flag("admin", "Give user admin permission"))
            .bind(|m, ctx| {
                Payload::ProjectAddUser(AddUser {
                    project_id: project_id(m, ctx),
                    user_id: get_u64(m, "userId").unwrap_or(0),
                    read: get_bool(m, "read"),
                    write: get_bool(m, "write"),
                    admin: get_bool(m, "admin"),
                })
            }),
        )
        .subcommand(
            Command::new("create", "create project")
                .api_path(&path)
                .option(string("name", "The name of the new project"))
                .bind(|m, _| {
                    Payload::ProjectCreate(Project {
                        project_name: get_string(m, "name"),
                        project_id: 0,
                    })
                }),
        )
        .subcommand(
            Command::new("get", "get information about a project")
                .api_path(&path)
                .option(uint("id", DEFAULT_ID_HELP))
                .option(string("name", "Project name"))
                .bind(|m, ctx| Payload::ProjectGet(named_project(m, ctx))),
        )
        .subcommand(Command::new("list", "list projects").api_path(&path).run(list))
        .subcommand(
            Command::new("permissions", "get project permissions")
                .api_path(&path)
                .option(uint("id", DEFAULT_ID_HELP))
                .bind(|m, ctx| {
                    Payload::ProjectPermissions(ProjectId {
                        id: project_id(m, ctx),
                    })
                }),
        )
        .subcommand(
            Command::new("switch", "Switch to a different project")
                .api_path(&path)
                .option(uint("id", "Project ID to switch to (REQUIRED)"))
                .bind(|m, _| {
                    Payload::ProjectSwitch(ProjectId {
                        id: get_u64(m, "id").unwrap_or(0),
                    })
                }),
        )
        .subcommand(
            Command::new("token", "Get a project token.")
                .api_path(TOKEN_PATH)
                .option(uint("id", DEFAULT_ID_HELP))
                .option(flag("read", "Read permission"))
                .option(flag("write", "Write permission"))
                .option(flag("admin", "Admin permissions"))
                .bind(|m, ctx| {
                    Payload::ProjectToken(TokenRequest {
                        project_id: project_id(m, ctx),
                        read: get_bool(m, "read"),
                        write: get_bool(m, "write"),
                        admin: get_bool(m, "admin"),
                    })
                }),
        )
        .subcommand(
            Command::new("update", "update project")
                .api_path(&path)
                .option(uint("id", DEFAULT_ID_HELP))
                .option(string("name", "The new name of the project"))
                .bind(|m, ctx| Payload::ProjectUpdate(named_project(m, ctx))),
        )
}

fn project_id(m: &ArgMatches, ctx: &Context) -> u64 {
    get_u64(m, "id").unwrap_or(ctx.profile.active_project)
}

fn named_project(m: &ArgMatches, ctx: &Context) -> Project {
    Project {
        project_name: get_string(m, "name"),
        project_id: project_id(m, ctx),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Actions
// ─────────────────────────────────────────────────────────────────────────────

pub fn create(cmd: &Command, ctx: &mut Context, project: Project) -> Result<()> {
    let created: Project = ctx
        .client
        .post(cmd.path())
        .user_token(&ctx.profile)
        .json(&project)
        .expect(201)
        .fetch()?;

    println!("Project '{}' created with ID: {}", created.project_name, created.project_id);
    println!("Acquiring project token...");
    acquire_token(
        ctx,
        TokenRequest {
            project_id: created.project_id,
            read: true,
            write: true,
            admin: true,
        },
    )
}

pub fn update(cmd: &Command, ctx: &mut Context, project: Project) -> Result<()> {
    let result = ctx
        .client
        .patch(format!("{}/{}", cmd.path(), project.project_id))
        .user_token(&ctx.profile)
        .json(&project)
        .expect(200)
        .execute();

    match result {
        Ok(_) => println!("Project successfully updated"),
        Err(e) if e.status() == Some(204) => println!("Project not modified"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub fn get(cmd: &Command, ctx: &mut Context, project: Project) -> Result<()> {
    #[derive(Deserialize)]
    struct Details {
        #[serde(default)]
        project_id: u64,
        #[serde(default)]
        project_name: String,
        #[serde(default, alias = "Created")]
        created: String,
        #[serde(default, alias = "Permissions")]
        permissions: PermissionLists,
    }

    let req = if project.project_name.is_empty() {
        ctx.client.get(format!("{}/{}", cmd.path(), project.project_id))
    } else {
        ctx.client.get(cmd.path()).param("name", &project.project_name)
    };
    let details: Details = req.user_token(&ctx.profile).expect(200).fetch()?;

    println!("ProjectId: {}", style(details.project_id).cyan());
    println!("Project name: {}", style(&details.project_name).bold());
    println!("Created: {}", details.created);
    println!("READ:  {}", ids(&details.permissions.read));
    println!("WRITE: {}", ids(&details.permissions.write));
    println!("ADMIN: {}", ids(&details.permissions.admin));
    Ok(())
}

fn list(cmd: &Command, ctx: &mut Context) -> Result<()> {
    #[derive(Default, Deserialize)]
    struct Flags {
        #[serde(default, alias = "Read")]
        read: bool,
        #[serde(default, alias = "Write")]
        write: bool,
        #[serde(default, alias = "Admin")]
        admin: bool,
    }

    #[derive(Deserialize)]
    struct Entry {
        #[serde(default)]
        project_id: u64,
        #[serde(default)]
        project_name: String,
        #[serde(default, alias = "Created")]
        created: String,
        #[serde(default, alias = "Permissions")]
        permissions: Flags,
    }

    #[derive(Deserialize)]
    struct Listing {
        #[serde(default, alias = "Projects")]
        projects: Vec<Entry>,
    }

    let listing: Listing = ctx
        .client
        .get(cmd.path())
        .user_token(&ctx.profile)
        .expect(200)
        .fetch()?;

    let bold = Style::new().bold();
    let dim = Style::new().dim();
    for p in listing.projects {
        let mut perms = String::new();
        for (granted, name) in [
            (p.permissions.read, "READ "),
            (p.permissions.write, "WRITE "),
            (p.permissions.admin, "ADMIN "),
        ] {
            if granted {
                perms.push_str(name);
            }
        }

        println!("Project ID: {}", bold.apply_to(p.project_id));
        println!("Project name: {}", p.project_name);
        println!("Created: {}", dim.apply_to(&p.created));
        println!("Permissions: {}", style(perms.trim_end()).green());
        println!();
    }
    Ok(())
}

pub fn permissions(cmd: &Command, ctx: &mut Context, project: ProjectId) -> Result<()> {
    #[derive(Deserialize)]
    struct Granted {
        #[serde(default, alias = "Permissions")]
        permissions: PermissionLists,
    }

    let result: Granted = ctx
        .client
        .get(format!("{}/{}/permissions", cmd.path(), project.id))
        .user_token(&ctx.profile)
        .expect(200)
        .fetch()?;

    println!("{}", style(format!("{:>10} | {:<6}", "Permission", "UserIds")).bold());
    println!("{:>10} | {}", "READ", ids(&result.permissions.read));
    println!("{:>10} | {}", "WRITE", ids(&result.permissions.write));
    println!("{:>10} | {}", "ADMIN", ids(&result.permissions.admin));
    Ok(())
}

pub fn add_user(cmd: &Command, ctx: &mut Context, grant: AddUser) -> Result<()> {
    let result = ctx
        .client
        .patch(format!("{}/{}/permissions", cmd.path(), grant.project_id))
        .user_token(&ctx.profile)
        .json(&grant)
        .expect(200)
        .execute();

    match result {
        Ok(_) if grant.has_permissions() => println!("User's project permissions modified."),
        Ok(_) => println!("User removed from project."),
        Err(e) if e.status() == Some(201) => println!("User successfully added to project."),
        Err(e) if e.status() == Some(204) => println!("User's project permissions unchanged."),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub fn token(_cmd: &Command, ctx: &mut Context, request: TokenRequest) -> Result<()> {
    acquire_token(ctx, request)
}

pub fn switch(_cmd: &Command, ctx: &mut Context, target: ProjectId) -> Result<()> {
    if target.id == ctx.profile.active_project {
        println!("Already using project {}", target.id);
        return Ok(());
    }

    let cached = TokenStore::for_profile(&ctx.profile).load_project(target.id)?;
    let Some(mut token) = cached else {
        println!("No token locally, need to fetch one...");
        let request = TokenRequest {
            project_id: target.id,
            read: prompt::confirm("Read permission? (t)rue/(f)alse: ")?,
            write: prompt::confirm("Write permission? (t)rue/(f)alse: ")?,
            admin: prompt::confirm("Admin permission? (t)rue/(f)alse: ")?,
        };
        return acquire_token(ctx, request);
    };

    if token.is_expired()? {
        token = token.refresh(&ctx.client, &mut ctx.profile).inspect_err(|_| {
            println!("{}", style("WARNING: Token is expired and could not be refreshed:").yellow());
        })?;
    }
    ctx.profile.update_active_project(token.project_id.unwrap_or(target.id))?;

    println!("Switched to project {}", target.id);
    println!("-----");
    print_token(&token);
    Ok(())
}

/// Ask for a project token, cache it and make its project active.
fn acquire_token(ctx: &mut Context, request: TokenRequest) -> Result<()> {
    let token: AuthToken = ctx
        .client
        .get(TOKEN_PATH)
        .param("project_id", request.project_id)
        .param("read", request.read)
        .param("write", request.write)
        .param("admin", request.admin)
        .param("include_user", false)
        .user_token(&ctx.profile)
        .expect(200)
        .fetch()?;

    if let Err(e) = TokenStore::for_profile(&ctx.profile).save(&token) {
        tracing::warn!(error = %e, "could not save project token");
        println!("Could not save token: {e}");
    }
    if let Err(e) = ctx
        .profile
        .update_active_project(token.project_id.unwrap_or(request.project_id))
    {
        println!("Could not update active project: {e}");
    }

    print_token(&token);
    Ok(())
}

fn print_token(token: &AuthToken) {
    println!("Expires: {}", token.expires);
    println!("Permissions:");
    println!("  {:<6}: {}", "READ", token.read);
    println!("  {:<6}: {}", "WRITE", token.write);
    println!("  {:<6}: {}", "ADMIN", token.admin);
    println!("{}", token.token);
}
