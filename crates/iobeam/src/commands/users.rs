//! `iobeam user`: accounts, login and password management.

use clap::ArgMatches;
use console::style;
use iobeam_client::{AuthToken, TokenStore};
use serde::{Deserialize, Serialize};

use super::{Payload, is_zero, prompt};
use crate::command::options::{get_string, get_u64, string, uint};
use crate::command::{Command, Context, Registry};
use crate::error::Result;

pub const KEY: &str = "user";

const LOGIN_PATH: &str = "/v1/tokens/user";

/// User fields sent on create and update, and returned by lookups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub invite: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub user_id: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub company_name: String,
}

impl User {
    pub fn is_valid_create(&self) -> bool {
        !self.email.is_empty() && !self.password.is_empty() && !self.invite.is_empty()
    }

    /// An update must change at least one field.
    pub fn is_valid_update(&self) -> bool {
        [
            &self.email,
            &self.password,
            &self.username,
            &self.url,
            &self.first_name,
            &self.last_name,
            &self.company_name,
        ]
        .iter()
        .any(|f| !f.is_empty())
    }
}

/// Lookup by id, by name, or the logged-in user when both are empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserQuery {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Login {
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifyEmail {
    #[serde(rename = "verification_key")]
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResetPassword {
    #[serde(rename = "reset_key")]
    pub key: String,
    pub password: String,
}

impl ResetPassword {
    pub fn is_valid(&self) -> bool {
        !self.key.is_empty() && !self.password.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tree
// ─────────────────────────────────────────────────────────────────────────────

fn required(help: &'static str, required: bool) -> String {
    if required {
        format!("{help} (REQUIRED)")
    } else {
        help.to_string()
    }
}

fn user_fields(name: &'static str, usage: &'static str, create: bool) -> Command {
    let mut cmd = Command::new(name, usage)
        .option(string("username", "Username associated with user"))
        .option(string("password", "").help(required("The user's password", create)))
        .option(string("email", "").help(required("The user's email address", create)))
        .option(string("firstname", "The user's first name"))
        .option(string("lastname", "The user's last name"))
        .option(string("company", "The user's company name"))
        .option(string("url", "The user's webpage"));
    if create {
        cmd = cmd.option(string("invite", "Invite code needed for closed beta (REQUIRED)"));
    }
    cmd
}

pub fn command(registry: &mut Registry) -> Command {
    let path = registry.register(KEY, "/v1/users");

    Command::new(KEY, "Commands for managing users.")
        .subcommand(
            user_fields("create", "create user", true)
                .api_path(&path)
                .bind(|m, _| Payload::UserCreate(bind_user(m))),
        )
        .subcommand(
            user_fields("update", "update user", false)
                .api_path(format!("{path}/me"))
                .bind(|m, _| Payload::UserUpdate(bind_user(m))),
        )
        .subcommand(
            Command::new("get", "get user information")
                .api_path(&path)
                .option(uint("id", "The ID of the user to query"))
                .option(string("name", "The username or email of the user to query"))
                .bind(|m, _| {
                    Payload::UserGet(UserQuery {
                        id: get_u64(m, "id").unwrap_or(0),
                        name: get_string(m, "name"),
                    })
                }),
        )
        .subcommand(
            Command::new("search", "search for users")
                .api_path(&path)
                .option(string("name", "The search string"))
                .bind(|m, _| {
                    Payload::UserSearch(UserQuery {
                        id: 0,
                        name: get_string(m, "name"),
                    })
                }),
        )
        .subcommand(
            Command::new(
                "login",
                "Log in as a user / switch active user. If flag is not set, you will be prompted for email/username.",
            )
            .api_path(LOGIN_PATH)
            .option(string("username", "Login username or email"))
            .bind(|m, _| {
                Payload::UserLogin(Login {
                    username: get_string(m, "username"),
                })
            }),
        )
        .subcommand(
            Command::new("verify-email", "verify email")
                .api_path(format!("{path}/email"))
                .option(string("key", "Verification key from email"))
                .bind(|m, _| Payload::VerifyEmail(VerifyEmail { key: get_string(m, "key") })),
        )
        .subcommand(
            Command::new("reset-pw", "change password")
                .api_path(format!("{path}/password"))
                .option(string("key", "Reset key from email"))
                .option(string("password", "New password"))
                .bind(|m, _| {
                    Payload::ResetPassword(ResetPassword {
                        key: get_string(m, "key"),
                        password: get_string(m, "password"),
                    })
                }),
        )
}

fn bind_user(m: &ArgMatches) -> User {
    User {
        email: get_string(m, "email"),
        password: get_string(m, "password"),
        invite: get_string(m, "invite"),
        user_id: 0,
        username: get_string(m, "username"),
        url: get_string(m, "url"),
        first_name: get_string(m, "firstname"),
        last_name: get_string(m, "lastname"),
        company_name: get_string(m, "company"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Actions
// ─────────────────────────────────────────────────────────────────────────────

pub fn create(cmd: &Command, ctx: &mut Context, user: User) -> Result<()> {
    let created: User = ctx.client.post(cmd.path()).json(&user).expect(201).fetch()?;

    println!("New user created. ID for '{}': {}", user.email, created.user_id);
    println!("Acquiring token...");
    acquire_user_token(ctx, &user.email, &user.password)
}

pub fn update(cmd: &Command, ctx: &mut Context, user: User) -> Result<()> {
    let mut req = ctx
        .client
        .patch(cmd.path())
        .user_token(&ctx.profile)
        .json(&user)
        .expect(200);

    if !user.password.is_empty() {
        let old = prompt::password("Enter old password: ")?;
        req = req.param("old_password", old);
    }

    match req.execute() {
        Ok(_) => println!("User successfully updated"),
        Err(e) if e.status() == Some(204) => println!("User not modified"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub fn get(cmd: &Command, ctx: &mut Context, query: UserQuery) -> Result<()> {
    let req = if query.id != 0 {
        ctx.client.get(format!("{}/{}", cmd.path(), query.id))
    } else if !query.name.is_empty() {
        ctx.client.get(cmd.path()).param("name", &query.name)
    } else {
        ctx.client.get(format!("{}/me", cmd.path()))
    };

    let user: User = req.user_token(&ctx.profile).expect(200).fetch()?;

    println!("Username: {}", style(&user.username).bold());
    println!("User ID: {}", style(user.user_id).cyan());
    println!("Email: {}", user.email);
    println!("First name: {}", user.first_name);
    println!("Last name: {}", user.last_name);
    Ok(())
}

pub fn search(cmd: &Command, ctx: &mut Context, query: UserQuery) -> Result<()> {
    #[derive(Deserialize)]
    struct Found {
        #[serde(default, alias = "Users")]
        users: Vec<User>,
    }

    let found: Found = ctx
        .client
        .get(cmd.path())
        .param("search", &query.name)
        .user_token(&ctx.profile)
        .expect(200)
        .fetch()?;

    for user in found.users {
        println!();
        println!("Username: {}", style(&user.username).bold());
        println!("User ID: {}", style(user.user_id).cyan());
        println!("Email: {}", user.email);
    }
    Ok(())
}

pub fn login(_cmd: &Command, ctx: &mut Context, args: Login) -> Result<()> {
    let username = match args.username {
        name if name.is_empty() => prompt::line("Username/email: ")?,
        name => name,
    };
    let password = prompt::password("Password: ")?;
    acquire_user_token(ctx, &username, &password)
}

/// Trade credentials for a user token, cache it and make that user active.
fn acquire_user_token(ctx: &mut Context, username: &str, password: &str) -> Result<()> {
    let token: AuthToken = ctx
        .client
        .get(LOGIN_PATH)
        .basic_auth(username, password)
        .expect(200)
        .fetch()?;

    if let Err(e) = TokenStore::for_profile(&ctx.profile).save(&token) {
        tracing::warn!(error = %e, "could not save user token");
        println!("Could not save token: {e}");
    }

    let email = if username.contains('@') { username } else { "" };
    ctx.profile.update_active_user(token.user_id.unwrap_or(0), email)?;

    println!("Token acquired:");
    println!("{}", token.token);
    Ok(())
}

pub fn verify_email(cmd: &Command, ctx: &mut Context, args: VerifyEmail) -> Result<()> {
    ctx.client.post(cmd.path()).json(&args).expect(204).execute()?;
    println!("Email successfully verified.");
    Ok(())
}

pub fn reset_password(cmd: &Command, ctx: &mut Context, args: ResetPassword) -> Result<()> {
    ctx.client.post(cmd.path()).json(&args).expect(204).execute()?;
    println!("Password successfully changed.");
    Ok(())
}
