//! The `iobeam` command tree and the payloads its commands carry.

pub mod apps;
pub mod devices;
pub mod exports;
pub mod files;
pub mod imports;
pub mod namespaces;
pub mod profile;
pub mod projects;
mod prompt;
pub mod triggers;
pub mod users;

use crate::command::registry::ROOT;
use crate::command::{Command, Context, Registry};
use crate::error::Result;

/// Input bound from a command's options, one variant per data-carrying command.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    ProfileCreate(profile::NewProfile),
    ProfileSwitch(profile::ProfileName),
    ProfileDelete(profile::ProfileName),

    UserCreate(users::User),
    UserGet(users::UserQuery),
    UserSearch(users::UserQuery),
    UserLogin(users::Login),
    UserUpdate(users::User),
    VerifyEmail(users::VerifyEmail),
    ResetPassword(users::ResetPassword),

    ProjectCreate(projects::Project),
    ProjectGet(projects::Project),
    ProjectUpdate(projects::Project),
    ProjectPermissions(projects::ProjectId),
    ProjectAddUser(projects::AddUser),
    ProjectToken(projects::TokenRequest),
    ProjectSwitch(projects::ProjectId),

    DeviceCreate(devices::Device),
    DeviceGet(devices::DeviceRef),
    DeviceList(devices::DeviceList),
    DeviceUpdate(devices::Device),
    DeviceDelete(devices::DeviceRef),

    FileUpload(files::Upload),
    FileList(files::FileList),
    FileDelete(files::FileRef),

    AppDeploy(apps::Deploy),
    AppGet(apps::AppRef),
    AppList(apps::AppList),
    AppDelete(apps::AppRef),
    AppStart(apps::AppRef),
    AppStop(apps::AppRef),

    TriggerCreate(triggers::NewTrigger),
    TriggerGet(triggers::TriggerRef),
    TriggerList(triggers::TriggerList),
    TriggerDelete(triggers::TriggerRef),
    TriggerTest(triggers::TriggerTest),

    NamespaceCreate(namespaces::NewNamespace),
    NamespaceList(namespaces::NamespaceList),
    NamespaceUpdate(namespaces::NamespaceUpdate),

    Import(imports::Import),
    Export(exports::Export),
}

impl Payload {
    /// Whether the bound input is complete enough to act on.
    pub fn is_valid(&self) -> bool {
        match self {
            Payload::ProfileCreate(p) => p.is_valid(),
            Payload::ProfileSwitch(p) | Payload::ProfileDelete(p) => p.is_valid(),

            Payload::UserCreate(u) => u.is_valid_create(),
            Payload::UserUpdate(u) => u.is_valid_update(),
            Payload::UserGet(_) | Payload::UserLogin(_) => true,
            Payload::UserSearch(q) => !q.name.is_empty(),
            Payload::VerifyEmail(v) => !v.key.is_empty(),
            Payload::ResetPassword(r) => r.is_valid(),

            Payload::ProjectCreate(p) => p.is_valid_create(),
            Payload::ProjectGet(p) => p.is_valid_get(),
            Payload::ProjectUpdate(p) => p.is_valid_update(),
            Payload::ProjectPermissions(p) | Payload::ProjectSwitch(p) => p.is_valid(),
            Payload::ProjectAddUser(a) => a.is_valid(),
            Payload::ProjectToken(t) => t.is_valid(),

            Payload::DeviceCreate(d) => d.is_valid_create(),
            Payload::DeviceUpdate(d) => d.is_valid_update(),
            Payload::DeviceGet(d) | Payload::DeviceDelete(d) => d.is_valid(),
            Payload::DeviceList(l) => l.is_valid(),

            Payload::FileUpload(u) => u.is_valid(),
            Payload::FileList(l) => l.is_valid(),
            Payload::FileDelete(f) => f.is_valid(),

            Payload::AppDeploy(d) => d.is_valid(),
            Payload::AppGet(a) => a.is_valid(),
            Payload::AppDelete(a) | Payload::AppStart(a) | Payload::AppStop(a) => {
                a.project_id != 0 && a.id != 0
            }
            Payload::AppList(l) => l.is_valid(),

            Payload::TriggerCreate(t) => t.is_valid(),
            Payload::TriggerGet(t) => t.is_valid(),
            Payload::TriggerList(l) => l.is_valid(),
            Payload::TriggerDelete(t) => t.project_id != 0 && t.id != 0,
            Payload::TriggerTest(t) => t.is_valid(),

            Payload::NamespaceCreate(n) => n.is_valid(),
            Payload::NamespaceList(l) => l.is_valid(),
            Payload::NamespaceUpdate(u) => u.is_valid(),

            Payload::Import(i) => i.is_valid(),
            Payload::Export(e) => e.is_valid(),
        }
    }

    /// Run the action for this payload on `cmd`, the node it was bound by.
    pub fn run(self, cmd: &Command, ctx: &mut Context) -> Result<()> {
        match self {
            Payload::ProfileCreate(p) => profile::create(cmd, ctx, p),
            Payload::ProfileSwitch(p) => profile::switch(cmd, ctx, p),
            Payload::ProfileDelete(p) => profile::delete(cmd, ctx, p),

            Payload::UserCreate(u) => users::create(cmd, ctx, u),
            Payload::UserGet(q) => users::get(cmd, ctx, q),
            Payload::UserSearch(q) => users::search(cmd, ctx, q),
            Payload::UserLogin(l) => users::login(cmd, ctx, l),
            Payload::UserUpdate(u) => users::update(cmd, ctx, u),
            Payload::VerifyEmail(v) => users::verify_email(cmd, ctx, v),
            Payload::ResetPassword(r) => users::reset_password(cmd, ctx, r),

            Payload::ProjectCreate(p) => projects::create(cmd, ctx, p),
            Payload::ProjectGet(p) => projects::get(cmd, ctx, p),
            Payload::ProjectUpdate(p) => projects::update(cmd, ctx, p),
            Payload::ProjectPermissions(p) => projects::permissions(cmd, ctx, p),
            Payload::ProjectAddUser(a) => projects::add_user(cmd, ctx, a),
            Payload::ProjectToken(t) => projects::token(cmd, ctx, t),
            Payload::ProjectSwitch(p) => projects::switch(cmd, ctx, p),

            Payload::DeviceCreate(d) => devices::create(cmd, ctx, d),
            Payload::DeviceGet(d) => devices::get(cmd, ctx, d),
            Payload::DeviceList(l) => devices::list(cmd, ctx, l),
            Payload::DeviceUpdate(d) => devices::update(cmd, ctx, d),
            Payload::DeviceDelete(d) => devices::delete(cmd, ctx, d),

            Payload::FileUpload(u) => files::upload(cmd, ctx, u),
            Payload::FileList(l) => files::list(cmd, ctx, l),
            Payload::FileDelete(f) => files::delete(cmd, ctx, f),

            Payload::AppDeploy(d) => apps::deploy(cmd, ctx, d),
            Payload::AppGet(a) => apps::get(cmd, ctx, a),
            Payload::AppList(l) => apps::list(cmd, ctx, l),
            Payload::AppDelete(a) => apps::delete(cmd, ctx, a),
            Payload::AppStart(a) => apps::start(cmd, ctx, a),
            Payload::AppStop(a) => apps::stop(cmd, ctx, a),

            Payload::TriggerCreate(t) => triggers::create(cmd, ctx, t),
            Payload::TriggerGet(t) => triggers::get(cmd, ctx, t),
            Payload::TriggerList(l) => triggers::list(cmd, ctx, l),
            Payload::TriggerDelete(t) => triggers::delete(cmd, ctx, t),
            Payload::TriggerTest(t) => triggers::send_test(cmd, ctx, t),

            Payload::NamespaceCreate(n) => namespaces::create(cmd, ctx, n),
            Payload::NamespaceList(l) => namespaces::list(cmd, ctx, l),
            Payload::NamespaceUpdate(u) => namespaces::update(cmd, ctx, u),

            Payload::Import(i) => imports::send(cmd, ctx, i),
            Payload::Export(e) => exports::fetch(cmd, ctx, e),
        }
    }
}

/// Serde helper for fields omitted from request bodies when unset.
pub(crate) fn is_zero(v: &u64) -> bool {
    *v == 0
}

/// Build the full command tree, collecting each resource's API path.
pub fn build_tree() -> (Command, Registry) {
    let mut registry = Registry::new();

    let root = Command::new(ROOT, "iobeam Command-Line Interface")
        .subcommand(apps::command(&mut registry))
        .subcommand(devices::command(&mut registry))
        .subcommand(exports::command(&mut registry))
        .subcommand(files::command(&mut registry))
        .subcommand(imports::command(&mut registry))
        .subcommand(namespaces::command(&mut registry))
        .subcommand(profile::command(&mut registry))
        .subcommand(projects::command(&mut registry))
        .subcommand(triggers::command(&mut registry))
        .subcommand(users::command(&mut registry));

    (root, registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_registers_every_resource() {
        let (root, registry) = build_tree();
        let keywords: Vec<&str> = registry.keywords().collect();
        assert_eq!(
            keywords,
            [
                "app", "device", "export", "file", "import", "namespace", "profile", "project",
                "trigger", "user"
            ]
        );
        for keyword in keywords {
            let node = root.find(keyword).unwrap();
            assert_eq!(node.flag_set(), registry.flag_set(keyword));
        }
        assert_eq!(registry.api_path("device"), "/v1/devices");
        assert_eq!(registry.api_path("profile"), "");
    }

    #[test]
    fn test_leaf_paths_come_from_registry() {
        let (root, _) = build_tree();
        let list = root.find("file").and_then(|f| f.find("list")).unwrap();
        assert_eq!(list.path(), "/v1/files");
        assert_eq!(list.flag_set(), "iobeam file list");
        let verify = root.find("user").and_then(|u| u.find("verify-email")).unwrap();
        assert_eq!(verify.path(), "/v1/users/email");
        let sms = root
            .find("trigger")
            .and_then(|t| t.find("create"))
            .and_then(|c| c.find("sms"))
            .unwrap();
        assert_eq!(sms.flag_set(), "iobeam trigger create sms");
        assert_eq!(sms.path(), "/v1/triggers");
    }

    #[test]
    fn test_app_control_needs_an_id() {
        let by_name = apps::AppRef {
            project_id: 1,
            id: 0,
            name: "spark".into(),
        };
        assert!(Payload::AppGet(by_name.clone()).is_valid());
        assert!(!Payload::AppStart(by_name.clone()).is_valid());
        assert!(!Payload::AppDelete(by_name).is_valid());
    }

    #[test]
    fn test_search_needs_text() {
        let empty = users::UserQuery::default();
        assert!(Payload::UserGet(empty.clone()).is_valid());
        assert!(!Payload::UserSearch(empty).is_valid());
    }
}
