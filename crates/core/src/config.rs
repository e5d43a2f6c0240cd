//! State file location and access.
//!
//! The state file lives at `$XDG_CONFIG_HOME/llgd/config` when
//! `XDG_CONFIG_HOME` is set, otherwise at `$HOME/.llgd_config`. It is created
//! empty on first access. Every failure here is fatal to the calling
//! operation; there is no locking between processes.

use crate::error::{Error, Result};
use crate::ini::IniDocument;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory under `$XDG_CONFIG_HOME`.
pub const XDG_APP_DIR: &str = "llgd";
/// File name under the XDG directory.
pub const XDG_FILE_NAME: &str = "config";
/// File name under `$HOME` when XDG is not configured.
pub const HOME_FILE_NAME: &str = ".llgd_config";

/// Filesystem and environment access used by the state store.
pub trait FileSystem {
    /// Value of an environment variable, if set and non-empty.
    fn env_var(&self, key: &str) -> Option<String>;
    /// The user's home directory.
    fn home_dir(&self) -> Option<PathBuf>;
    /// Whether `path` exists. Errors other than "not found" are reported.
    fn exists(&self, path: &Path) -> io::Result<bool>;
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    /// Create an empty file.
    fn create(&self, path: &Path) -> io::Result<()>;
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;
}

/// [`FileSystem`] backed by the real OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn env_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }

    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }

    fn exists(&self, path: &Path) -> io::Result<bool> {
        match std::fs::metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn create(&self, path: &Path) -> io::Result<()> {
        std::fs::File::create(path).map(drop)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        std::fs::write(path, contents)
    }
}

/// Resolve the state file path, creating the XDG directory if needed.
pub fn resolve_config_path(fs: &dyn FileSystem) -> Result<PathBuf> {
    if let Some(xdg) = fs.env_var("XDG_CONFIG_HOME") {
        let dir = PathBuf::from(xdg).join(XDG_APP_DIR);
        let present = fs.exists(&dir).map_err(|e| Error::config_io(&dir, e))?;
        if !present {
            debug!(dir = %dir.display(), "Creating config directory");
            fs.create_dir_all(&dir)
                .map_err(|e| Error::config_io(&dir, e))?;
        }
        return Ok(dir.join(XDG_FILE_NAME));
    }

    let home = fs
        .home_dir()
        .ok_or_else(|| Error::ConfigPath("failed to find home directory".to_string()))?;
    Ok(home.join(HOME_FILE_NAME))
}

/// The persisted state file.
pub struct ConfigFile {
    fs: Box<dyn FileSystem>,
    path: PathBuf,
}

impl ConfigFile {
    /// Use the standard location.
    pub fn locate(fs: Box<dyn FileSystem>) -> Result<Self> {
        let path = resolve_config_path(fs.as_ref())?;
        Ok(Self { fs, path })
    }

    /// Use an explicit path.
    pub fn at(fs: Box<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the file, creating it empty if it does not exist.
    pub fn load(&self) -> Result<IniDocument> {
        let present = self
            .fs
            .exists(&self.path)
            .map_err(|e| Error::config_io(&self.path, e))?;
        if !present {
            info!(path = %self.path.display(), "Creating new config file");
            self.fs
                .create(&self.path)
                .map_err(|e| Error::config_io(&self.path, e))?;
        }

        let text = self
            .fs
            .read_to_string(&self.path)
            .map_err(|e| Error::config_io(&self.path, e))?;
        IniDocument::parse(&text).map_err(|e| Error::ConfigParse {
            path: self.path.clone(),
            line: e.line,
            message: e.message,
        })
    }

    /// Overwrite the file with `doc`.
    pub fn save(&self, doc: &IniDocument) -> Result<()> {
        debug!(path = %self.path.display(), "Saving config file");
        self.fs
            .write(&self.path, &doc.render())
            .map_err(|e| Error::config_io(&self.path, e))
    }
}

impl std::fmt::Debug for ConfigFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigFile").field("path", &self.path).finish()
    }
}
