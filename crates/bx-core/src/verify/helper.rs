use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::ToolContext;
use crate::download::{url_file_name, Downloader};
use crate::errors::ToolError;

const RCEDIT_URL: &str = "https://github.com/electron/rcedit/releases/download/v1.1.1/rcedit-x64.exe";
const LINUXDEPLOY_RELEASES: &str =
    "https://github.com/linuxdeploy/linuxdeploy/releases/download/continuous";
const PLUGIN_PREFIX: &str = "linuxdeploy-plugin-";
const PLUGIN_EXTENSIONS: [&str; 2] = ["sh", "AppImage"];
const PLUGIN_PATTERN: &str = "linuxdeploy-plugin-<name>[-<arch>].(sh|AppImage)";

/// A helper binary that lives in the tools directory and is fetched on demand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HelperTool {
    name: String,
    role: String,
    url: String,
    install_dir: PathBuf,
    file_name: String,
    executable: bool,
}

impl HelperTool {
    /// Windows resource editor used to brand executables.
    #[must_use]
    pub fn rcedit(tools_path: &Path) -> Self {
        Self {
            name: "RCEdit".to_string(),
            role: "RCEdit".to_string(),
            url: RCEDIT_URL.to_string(),
            install_dir: tools_path.to_path_buf(),
            file_name: "rcedit-x64.exe".to_string(),
            executable: false,
        }
    }

    /// AppImage bundler for the given CPU architecture.
    #[must_use]
    pub fn linuxdeploy(tools_path: &Path, arch: &str) -> Self {
        let file_name = format!("linuxdeploy-{arch}.AppImage");
        Self {
            name: "linuxdeploy".to_string(),
            role: "linuxdeploy".to_string(),
            url: format!("{LINUXDEPLOY_RELEASES}/{file_name}"),
            install_dir: tools_path.to_path_buf(),
            file_name,
            executable: true,
        }
    }

    /// A user-supplied bundler plugin, stored behind a hash of its URL so
    /// different sources of the same plugin never collide.
    ///
    /// # Errors
    /// [`ToolError::InvalidPluginUrl`] if the URL doesn't name a plugin.
    pub fn from_url(tools_path: &Path, url: &str) -> Result<Self, ToolError> {
        let invalid = || ToolError::InvalidPluginUrl {
            tool: "linuxdeploy".to_string(),
            url: url.to_string(),
            pattern: PLUGIN_PATTERN.to_string(),
        };
        let file_name = url_file_name(url).ok_or_else(invalid)?;
        let plugin_id = plugin_id(file_name).ok_or_else(invalid)?;
        let digest = hex::encode(Sha256::digest(url.as_bytes()));
        Ok(Self {
            name: format!("linuxdeploy {plugin_id} plugin"),
            role: "user-provided linuxdeploy plugin from URL".to_string(),
            url: url.to_string(),
            install_dir: tools_path.join("plugins").join(plugin_id).join(digest),
            file_name: file_name.to_string(),
            executable: true,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.install_dir.join(&self.file_name)
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    /// Make sure the tool is on disk, downloading it when allowed.
    ///
    /// # Errors
    /// [`ToolError::MissingTool`] when absent and `install` is false, or the
    /// download and install failures otherwise.
    pub fn verify(
        self,
        ctx: &ToolContext,
        install: bool,
        downloader: &dyn Downloader,
    ) -> Result<Self, ToolError> {
        if self.exists() {
            tracing::debug!(tool = %self.name, path = %self.path().display(), "helper present");
            return Ok(self);
        }
        if !install {
            return Err(ToolError::MissingTool { tool: self.name });
        }

        ctx.console
            .info(None, &format!("Downloading {}...", self.role));
        let downloaded = downloader.download(&self.url, &self.install_dir, &self.role)?;
        if downloaded != self.path() {
            fs::rename(&downloaded, self.path()).map_err(|source| ToolError::InstallFailed {
                tool: self.name.clone(),
                source,
            })?;
        }
        if self.executable {
            make_executable(&self.path()).map_err(|source| ToolError::InstallFailed {
                tool: self.name.clone(),
                source,
            })?;
        }
        tracing::info!(tool = %self.name, path = %self.path().display(), "helper installed");
        Ok(self)
    }
}

/// `linuxdeploy-plugin-gtk.sh` and `linuxdeploy-plugin-gtk-x86_64.AppImage` both name `gtk`.
fn plugin_id(file_name: &str) -> Option<&str> {
    let stem = file_name.strip_prefix(PLUGIN_PREFIX)?;
    let (stem, extension) = stem.rsplit_once('.')?;
    if !PLUGIN_EXTENSIONS.contains(&extension) {
        return None;
    }
    stem.split('-').next().filter(|id| !id.is_empty())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
