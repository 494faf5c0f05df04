//! Maps the running platform to the prebuilt kubo archive for it.

use std::fmt;

use crate::error::InstallError;

pub const DEFAULT_DIST_URL: &str = "https://dist.ipfs.tech";
pub const DEFAULT_VERSION: &str = "v0.16.0";

/// (os, arch) as reported by `std::env::consts` -> platform suffix used in dist archive names.
///
/// New platforms are added here and nowhere else.
const DOWNLOAD_TARGETS: &[(&str, &str, &str)] = &[
    ("linux", "x86_64", "linux-amd64"),
    ("linux", "aarch64", "linux-arm64"),
    ("macos", "x86_64", "darwin-amd64"),
    ("macos", "aarch64", "darwin-arm64"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformKey {
    pub os: String,
    pub arch: String,
}

impl PlatformKey {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The platform this process runs on.
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

/// Resolves download URLs for one kubo release hosted under `dist_url`.
#[derive(Debug, Clone)]
pub struct ArtifactLocator {
    dist_url: String,
    version: String,
    platform: PlatformKey,
}

impl ArtifactLocator {
    pub fn new(dist_url: &str, version: &str, platform: PlatformKey) -> Self {
        Self {
            dist_url: dist_url.trim_end_matches('/').to_string(),
            version: version.to_string(),
            platform,
        }
    }

    pub fn download_url(&self) -> Result<String, InstallError> {
        let suffix = platform_suffix(&self.platform)?;
        let url = format!(
            "{base}/kubo/{v}/kubo_{v}_{suffix}.tar.gz",
            base = self.dist_url,
            v = self.version,
        );
        tracing::trace!(platform = %self.platform, url = %url, "Resolved download target");
        Ok(url)
    }
}

impl Default for ArtifactLocator {
    fn default() -> Self {
        Self::new(DEFAULT_DIST_URL, DEFAULT_VERSION, PlatformKey::current())
    }
}

fn platform_suffix(platform: &PlatformKey) -> Result<&'static str, InstallError> {
    DOWNLOAD_TARGETS
        .iter()
        .find(|(os, arch, _)| *os == platform.os && *arch == platform.arch)
        .map(|(_, _, suffix)| *suffix)
        .ok_or_else(|| InstallError::UnsupportedPlatform {
            os: platform.os.clone(),
            arch: platform.arch.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_platforms_have_urls() {
        for (os, arch, suffix) in DOWNLOAD_TARGETS {
            let locator = ArtifactLocator::new(
                DEFAULT_DIST_URL,
                DEFAULT_VERSION,
                PlatformKey::new(*os, *arch),
            );
            let url = locator.download_url().unwrap();
            assert!(url.starts_with("https://dist.ipfs.tech/kubo/v0.16.0/"));
            assert!(url.ends_with(&format!("kubo_v0.16.0_{}.tar.gz", suffix)));
        }
    }

    #[test]
    fn test_linux_amd64_url() {
        let locator = ArtifactLocator::new(
            DEFAULT_DIST_URL,
            DEFAULT_VERSION,
            PlatformKey::new("linux", "x86_64"),
        );
        assert_eq!(
            locator.download_url().unwrap(),
            "https://dist.ipfs.tech/kubo/v0.16.0/kubo_v0.16.0_linux-amd64.tar.gz"
        );
    }

    #[test]
    fn test_unsupported_platforms_fail_closed() {
        for (os, arch) in [("windows", "x86_64"), ("linux", "riscv64"), ("freebsd", "aarch64")] {
            let locator =
                ArtifactLocator::new(DEFAULT_DIST_URL, DEFAULT_VERSION, PlatformKey::new(os, arch));
            match locator.download_url() {
                Err(InstallError::UnsupportedPlatform { os: o, arch: a }) => {
                    assert_eq!(o, os);
                    assert_eq!(a, arch);
                }
                other => panic!("expected UnsupportedPlatform, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_trailing_slash_in_mirror() {
        let locator = ArtifactLocator::new(
            "http://mirror.local/",
            "v0.17.0",
            PlatformKey::new("macos", "aarch64"),
        );
        assert_eq!(
            locator.download_url().unwrap(),
            "http://mirror.local/kubo/v0.17.0/kubo_v0.17.0_darwin-arm64.tar.gz"
        );
    }
}
