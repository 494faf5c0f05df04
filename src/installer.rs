use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tar::{Archive, EntryType};
use tokio::io::AsyncWriteExt;

use crate::error::InstallError;
use crate::layout::{InstalledBinary, Layout};
use crate::platform::ArtifactLocator;

const USER_AGENT: &str = concat!("kubo-plugin/", env!("CARGO_PKG_VERSION"));

/// Downloads the kubo archive into `tmp/` and unpacks it into `kubo/`.
pub struct ArchiveInstaller {
    locator: ArtifactLocator,
    layout: Layout,
    client: reqwest::Client,
}

impl ArchiveInstaller {
    pub fn new(
        locator: ArtifactLocator,
        layout: Layout,
        timeout: Duration,
    ) -> Result<Self, InstallError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| InstallError::Download {
                url: String::new(),
                reason: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            locator,
            layout,
            client,
        })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub async fn install(&self) -> Result<InstalledBinary, InstallError> {
        let url = self.locator.download_url()?;

        // A scratch dir left behind by an earlier failed run is reused.
        tokio::fs::create_dir_all(self.layout.scratch_dir()).await?;

        let archive_path = self.layout.archive_path();
        tracing::info!(url = %url, "Downloading kubo");
        self.download(&url, &archive_path).await?;
        tracing::info!(archive = %archive_path.display(), "Download finished, unpacking");

        let binary = match self.unpack(&archive_path).await {
            Ok(binary) => binary,
            Err(e) => {
                // A half-written kubo/ would otherwise look resolved on the next run.
                self.discard_install_dir().await;
                return Err(e);
            }
        };

        tracing::info!(path = %binary.display(), "Kubo resolved");
        Ok(InstalledBinary {
            path: binary,
            present: true,
        })
    }

    async fn unpack(&self, archive_path: &Path) -> Result<PathBuf, InstallError> {
        let root = self.layout.root().to_path_buf();
        let install_dir = self.layout.install_dir();
        let src = archive_path.to_path_buf();
        tokio::task::spawn_blocking(move || extract_archive(&src, &root, &install_dir))
            .await
            .map_err(|e| InstallError::Extract {
                path: archive_path.display().to_string(),
                reason: format!("extraction task failed: {}", e),
            })??;

        let binary = self.layout.binary_path();
        if !binary.is_file() {
            return Err(InstallError::Extract {
                path: binary.display().to_string(),
                reason: "binary not found in archive".to_string(),
            });
        }
        mark_executable(&binary).await?;
        Ok(binary)
    }

    async fn discard_install_dir(&self) {
        let install_dir = self.layout.install_dir();
        match tokio::fs::remove_dir_all(&install_dir).await {
            Ok(()) => tracing::debug!(path = %install_dir.display(), "Removed partial install"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %install_dir.display(),
                error = %e,
                "Failed to remove partial install"
            ),
        }
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<(), InstallError> {
        let download_err = |reason: String| InstallError::Download {
            url: url.to_string(),
            reason,
        };

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| download_err(e.to_string()))?;

        if !response.status().is_success() {
            return Err(download_err(format!("server returned {}", response.status())));
        }

        let pb = create_progress_bar(response.content_length());
        let mut file = tokio::fs::File::create(dest).await?;

        // Partial files are left in tmp/ for the cleanup hook.
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| download_err(e.to_string()))?
        {
            file.write_all(&chunk).await?;
            pb.inc(chunk.len() as u64);
        }
        file.flush().await?;

        pb.finish_and_clear();
        Ok(())
    }
}

/// Unpacks a gzipped tar archive entry by entry.
///
/// Only directories and regular files are accepted, and every entry must land inside
/// `install_dir`. The first failing entry aborts the whole extraction; whatever was
/// written before it stays on disk and must be removed by the caller before retrying.
pub fn extract_archive(archive: &Path, root: &Path, install_dir: &Path) -> Result<(), InstallError> {
    let file = File::open(archive)?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let entries = archive.entries().map_err(|e| InstallError::Extract {
        path: String::new(),
        reason: format!("failed to read tar archive: {}", e),
    })?;

    for entry in entries {
        let mut entry = entry.map_err(|e| InstallError::Extract {
            path: String::new(),
            reason: format!("failed to read tar entry: {}", e),
        })?;

        let entry_path = entry
            .path()
            .map_err(|e| InstallError::Extract {
                path: String::new(),
                reason: format!("failed to read entry path: {}", e),
            })?
            .into_owned();
        let entry_name = entry_path.display().to_string();
        let entry_type = entry.header().entry_type();

        let dest = entry_destination(root, install_dir, &entry_path).ok_or_else(|| {
            InstallError::UnsupportedEntry {
                path: entry_name.clone(),
                kind: "path outside install directory".to_string(),
            }
        })?;

        let extract_err = |e: io::Error| InstallError::Extract {
            path: entry_name.clone(),
            reason: e.to_string(),
        };

        match entry_type {
            EntryType::Directory => {
                tracing::trace!(path = %entry_name, "Creating directory");
                create_dir(&dest).map_err(extract_err)?;
            }
            EntryType::Regular => {
                tracing::trace!(path = %entry_name, size = entry.header().size().unwrap_or(0), "Writing file");
                if let Some(parent) = dest.parent() {
                    create_dir(parent).map_err(extract_err)?;
                }
                let mut out = File::create(&dest).map_err(extract_err)?;
                io::copy(&mut entry, &mut out).map_err(extract_err)?;
            }
            other => {
                return Err(InstallError::UnsupportedEntry {
                    path: entry_name,
                    kind: format!("{:?}", other),
                });
            }
        }
    }

    Ok(())
}

/// Joins a relative archive path onto `root`, refusing anything that escapes `install_dir`.
fn entry_destination(root: &Path, install_dir: &Path, entry_path: &Path) -> Option<PathBuf> {
    let mut dest = root.to_path_buf();
    for component in entry_path.components() {
        match component {
            Component::Normal(part) => dest.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    dest.starts_with(install_dir).then_some(dest)
}

fn create_dir(path: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(path)
}

async fn mark_executable(path: &Path) -> Result<(), InstallError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = tokio::fs::metadata(path).await?.permissions();
        perms.set_mode(0o755);
        tokio::fs::set_permissions(path, perms).await?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

fn create_progress_bar(len: Option<u64>) -> ProgressBar {
    let pb = match len {
        Some(len) => {
            let pb = ProgressBar::new(len);
            if let Ok(style) =
                ProgressStyle::with_template("{spinner:.green} kubo [{bar:30}] {bytes}/{total_bytes}")
            {
                pb.set_style(style);
            }
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.green} kubo {bytes}") {
                pb.set_style(style);
            }
            pb
        }
    };
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
