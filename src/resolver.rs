use tokio::sync::Mutex;

use crate::error::InstallError;
use crate::installer::ArchiveInstaller;
use crate::layout::{InstalledBinary, Layout};

/// Idempotent check-and-install for the kubo binary.
///
/// The check and the install run under one lock so two hooks firing together can never
/// extract into `kubo/` at the same time.
pub struct ResolutionGate {
    installer: ArchiveInstaller,
    lock: Mutex<()>,
}

impl ResolutionGate {
    pub fn new(installer: ArchiveInstaller) -> Self {
        Self {
            installer,
            lock: Mutex::new(()),
        }
    }

    pub fn layout(&self) -> &Layout {
        self.installer.layout()
    }

    pub async fn ensure_installed(&self) -> Result<InstalledBinary, InstallError> {
        let _guard = self.lock.lock().await;

        let binary = InstalledBinary::inspect(self.installer.layout());
        if binary.present {
            tracing::debug!(path = %binary.path.display(), "Kubo already resolved");
            return Ok(binary);
        }

        tracing::info!("Kubo binary missing, installing");
        self.installer.install().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installer::tests::{
        archive_with_symlink_after_binary, kubo_archive, linux_locator, ARCHIVE_PATH,
    };
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn gate_for(server: &MockServer, root: &std::path::Path) -> ResolutionGate {
        let installer = ArchiveInstaller::new(
            linux_locator(&server.uri()),
            Layout::new(root),
            Duration::from_secs(5),
        )
        .unwrap();
        ResolutionGate::new(installer)
    }

    #[tokio::test]
    async fn test_second_call_performs_no_download() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ARCHIVE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(kubo_archive(b"bin")))
            .expect(1)
            .mount(&server)
            .await;

        let root = tempfile::tempdir().unwrap();
        let gate = gate_for(&server, root.path()).await;

        let first = gate.ensure_installed().await.unwrap();
        let second = gate.ensure_installed().await.unwrap();
        assert_eq!(first, second);
        assert!(second.present);
    }

    #[tokio::test]
    async fn test_present_binary_skips_install() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let root = tempfile::tempdir().unwrap();
        let layout = Layout::new(root.path());
        std::fs::create_dir_all(layout.install_dir()).unwrap();
        std::fs::write(layout.binary_path(), b"bin").unwrap();

        let gate = gate_for(&server, root.path()).await;
        let binary = gate.ensure_installed().await.unwrap();
        assert!(binary.present);
        assert!(!layout.scratch_dir().exists());
    }

    #[tokio::test]
    async fn test_reinstalls_after_external_delete() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ARCHIVE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(kubo_archive(b"bin")))
            .expect(2)
            .mount(&server)
            .await;

        let root = tempfile::tempdir().unwrap();
        let gate = gate_for(&server, root.path()).await;

        let binary = gate.ensure_installed().await.unwrap();
        std::fs::remove_file(&binary.path).unwrap();
        assert!(gate.ensure_installed().await.unwrap().present);
    }

    #[tokio::test]
    async fn test_concurrent_calls_install_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ARCHIVE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(kubo_archive(b"bin")))
            .expect(1)
            .mount(&server)
            .await;

        let root = tempfile::tempdir().unwrap();
        let gate = Arc::new(gate_for(&server, root.path()).await);

        let a = tokio::spawn({
            let gate = Arc::clone(&gate);
            async move { gate.ensure_installed().await }
        });
        let b = tokio::spawn({
            let gate = Arc::clone(&gate);
            async move { gate.ensure_installed().await }
        });

        assert!(a.await.unwrap().unwrap().present);
        assert!(b.await.unwrap().unwrap().present);
    }

    #[tokio::test]
    async fn test_failed_install_is_not_resolved_on_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ARCHIVE_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(archive_with_symlink_after_binary()),
            )
            .expect(2)
            .mount(&server)
            .await;

        let root = tempfile::tempdir().unwrap();
        let layout = Layout::new(root.path());
        let gate = gate_for(&server, root.path()).await;

        assert!(gate.ensure_installed().await.is_err());
        assert!(!layout.binary_path().exists());

        // The retry downloads again instead of trusting the leftover binary.
        let err = gate.ensure_installed().await.unwrap_err();
        assert!(matches!(err, InstallError::UnsupportedEntry { .. }));
        assert!(!layout.install_dir().exists());
    }
}
