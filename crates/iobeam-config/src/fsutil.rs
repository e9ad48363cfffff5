//! Small filesystem helpers shared by the profile store and the token cache.
//!
//! Files written here are replaced, never merged: the old file is removed
//! before the new one is created. A crash in between loses the file, which
//! is acceptable for everything the CLI keeps on disk.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Create `dir` and all of its parents, owner-only on unix.
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)
}

/// Replace the file at `path` with `contents`.
pub fn replace_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.flush()
}
