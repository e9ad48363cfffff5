//! `iobeam file`: project file storage (app bundles and the like).

use std::fs::File;
use std::io;
use std::path::Path;

use console::{Style, style};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::Payload;
use crate::command::options::{get_string, get_u64, string, uint};
use crate::command::{Command, Context, Registry};
use crate::error::Result;

pub const KEY: &str = "file";

/// Algorithm name sent alongside upload checksums.
pub const CHECKSUM_ALG: &str = "SHA-256";

#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub project_id: u64,
    pub path: String,
}

impl Upload {
    pub fn is_valid(&self) -> bool {
        !self.path.is_empty() && self.project_id != 0
    }

    /// Name the file is stored under: the last path component.
    pub fn file_name(&self) -> String {
        Path::new(&self.path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileRef {
    pub project_id: u64,
    pub name: String,
}

impl FileRef {
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty() && self.project_id != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileList {
    pub project_id: u64,
}

impl FileList {
    pub fn is_valid(&self) -> bool {
        self.project_id != 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, Deserialize)]
pub struct Checksum {
    #[serde(default)]
    pub alg: String,
    #[serde(default)]
    pub sum: String,
}

impl Checksum {
    pub fn print(&self) {
        println!("Checksum: {} ({})", self.sum, self.alg);
    }
}

#[derive(Debug, Deserialize)]
struct FileInfo {
    #[serde(default)]
    file_name: String,
    #[serde(default)]
    created: String,
    #[serde(default)]
    checksum: Checksum,
}

/// Hex SHA-256 of everything `reader` yields.
pub fn sha256_hex(mut reader: impl io::Read) -> io::Result<String> {
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tree
// ─────────────────────────────────────────────────────────────────────────────

pub fn command(registry: &mut Registry) -> Command {
    let path = registry.register(KEY, "/v1/files");

    Command::new(KEY, "Commands for managing files on iobeam (e.g. app JARs).")
        .subcommand(
            Command::new("delete", "Delete a file from iobeam.")
                .api_path(&path)
                .option(uint(
                    "projectId",
                    "The ID of the project that contains the file (defaults to active project).",
                ))
                .option(string("name", "Name of the file to delete."))
                .bind(|m, ctx| {
                    Payload::FileDelete(FileRef {
                        project_id: get_u64(m, "projectId").unwrap_or(ctx.profile.active_project),
                        name: get_string(m, "name"),
                    })
                }),
        )
        .subcommand(
            Command::new("list", "List files for a project.")
                .api_path(&path)
                .option(uint(
                    "projectId",
                    "The ID of the project to get list of files from (defaults to active project).",
                ))
                .bind(|m, ctx| {
                    Payload::FileList(FileList {
                        project_id: get_u64(m, "projectId").unwrap_or(ctx.profile.active_project),
                    })
                }),
        )
        .subcommand(
            Command::new("upload", "Upload a file to iobeam.")
                .api_path(&path)
                .option(uint(
                    "projectId",
                    "The ID of the project to upload the file to (defaults to active project).",
                ))
                .option(string("path", "Path to file to upload."))
                .bind(|m, ctx| {
                    Payload::FileUpload(Upload {
                        project_id: get_u64(m, "projectId").unwrap_or(ctx.profile.active_project),
                        path: get_string(m, "path"),
                    })
                }),
        )
}

// ─────────────────────────────────────────────────────────────────────────────
// Actions
// ─────────────────────────────────────────────────────────────────────────────

pub fn upload(_cmd: &Command, ctx: &mut Context, args: Upload) -> Result<()> {
    upload_file(ctx, &args)?;
    Ok(())
}

/// Stream `args.path` to the project's file store; returns its checksum.
pub(crate) fn upload_file(ctx: &mut Context, args: &Upload) -> Result<String> {
    let checksum = File::open(&args.path)
        .and_then(sha256_hex)
        .inspect_err(|_| println!("Could not open file for upload:"))?;
    let body = File::open(&args.path)?;

    let path = format!("{}/{}", ctx.registry.api_path(KEY), args.file_name());
    ctx.client
        .put(path)
        .project_token(&mut ctx.profile, args.project_id)
        .param("checksum", &checksum)
        .param("checksum_alg", CHECKSUM_ALG)
        .body_stream(body)
        .expect(201)
        .execute()?;

    println!("File '{}' uploaded successfully.", args.path);
    Ok(checksum)
}

pub fn list(cmd: &Command, ctx: &mut Context, args: FileList) -> Result<()> {
    #[derive(Deserialize)]
    struct Listing {
        #[serde(default)]
        files: Vec<FileInfo>,
    }

    let listing: Listing = ctx
        .client
        .get(cmd.path())
        .project_token(&mut ctx.profile, args.project_id)
        .expect(200)
        .fetch()?;

    if listing.files.is_empty() {
        println!("No files found for project {}.", args.project_id);
    }
    let dim = Style::new().dim();
    for info in listing.files {
        println!("Name    : {}", style(&info.file_name).cyan());
        println!("Created : {}", dim.apply_to(&info.created));
        info.checksum.print();
    }
    Ok(())
}

pub fn delete(cmd: &Command, ctx: &mut Context, args: FileRef) -> Result<()> {
    ctx.client
        .delete(format!("{}/{}", cmd.path(), args.name))
        .project_token(&mut ctx.profile, args.project_id)
        .expect(204)
        .execute()?;

    println!("File successfully deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::build_tree;
    use httpmock::prelude::*;
    use iobeam_client::Client;
    use iobeam_config::ConfigStore;
    use tempfile::tempdir;

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(&b"abc"[..]).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_upload_validity_and_name() {
        let upload = Upload {
            project_id: 3,
            path: "build/libs/app.jar".into(),
        };
        assert!(upload.is_valid());
        assert_eq!(upload.file_name(), "app.jar");
        assert!(!Upload { project_id: 0, ..upload }.is_valid());
    }

    #[test]
    fn test_upload_streams_file_with_checksum() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("bundle.jar");
        std::fs::write(&file, b"abc").unwrap();

        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(PUT)
                .path("/v1/files/bundle.jar")
                .query_param(
                    "checksum",
                    "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
                )
                .query_param("checksum_alg", "SHA-256")
                .body("abc");
            then.status(201);
        });

        let store = ConfigStore::at(temp.path().join("config"));
        let profile = store.create_profile("test", &server.base_url()).unwrap();
        let client = Client::builder().base_url(server.base_url()).build().unwrap();
        let (_, registry) = build_tree();
        let mut ctx = Context::new(Vec::new(), client, profile, store, registry);

        let args = Upload {
            project_id: 3,
            path: file.display().to_string(),
        };
        let checksum = upload_file(&mut ctx, &args).unwrap();

        mock.assert();
        assert_eq!(checksum.len(), 64);
    }

    #[test]
    fn test_upload_missing_file_makes_no_request() {
        let server = MockServer::start();
        let any = server.mock(|_when, then| {
            then.status(201);
        });
        let temp = tempdir().unwrap();
        let store = ConfigStore::at(temp.path());
        let profile = store.create_profile("test", &server.base_url()).unwrap();
        let client = Client::builder().base_url(server.base_url()).build().unwrap();
        let (_, registry) = build_tree();
        let mut ctx = Context::new(Vec::new(), client, profile, store, registry);

        let args = Upload {
            project_id: 3,
            path: temp.path().join("nope.jar").display().to_string(),
        };
        assert!(upload_file(&mut ctx, &args).is_err());
        any.assert_calls(0);
    }
}
