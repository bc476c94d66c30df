//! Cache naming and the critical asset manifest.
//!
//! The three cache names carry a version marker. Bumping the version is the
//! only way to bust caches: on activation every name that is not current is
//! deleted.

use serde::{Deserialize, Serialize};

pub const DEFAULT_CACHE_PREFIX: &str = "caffeine-cove";
pub const DEFAULT_CACHE_VERSION: &str = "v3";

/// Document root, script entry and stylesheet.
pub const CRITICAL_ASSETS: &[&str] = &["/", "/src/main.tsx", "/src/index.css"];

pub const CRITICAL_IMAGES: &[&str] =
    &["/src/assets/cafe-interior.jpg", "/src/assets/logo.png", "/src/assets/coffeebg2.png"];

/// Icons and the web manifest. Also the exact-path favicon match list.
pub const ICON_ASSETS: &[&str] =
    &["/favicon.ico", "/favicon-16x16.png", "/favicon-32x32.png", "/apple-touch-icon.png", "/site.webmanifest"];

/// The three current cache names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheNames {
    pub general: String,
    pub images: String,
    pub icons: String,
}

impl CacheNames {
    pub fn new(prefix: &str, version: &str) -> Self {
        Self {
            general: format!("{prefix}-{version}"),
            images: format!("{prefix}-images-{version}"),
            icons: format!("{prefix}-icons-{version}"),
        }
    }

    pub fn all(&self) -> [&str; 3] {
        [&self.general, &self.images, &self.icons]
    }

    pub fn is_current(&self, name: &str) -> bool {
        self.all().contains(&name)
    }
}

impl Default for CacheNames {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_PREFIX, DEFAULT_CACHE_VERSION)
    }
}

/// How install treats a failing critical asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallPolicy {
    /// One failing asset fails the whole cache's population and the install.
    #[default]
    AllOrNothing,
    /// Failing assets are skipped; the rest are stored.
    BestEffort,
}

/// Root-relative paths pre-populated at install time, one list per cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub critical_assets: Vec<String>,
    pub critical_images: Vec<String>,
    pub icon_assets: Vec<String>,
    /// Exact request paths served cache-first from the icon cache.
    pub favicon_paths: Vec<String>,
}

impl Manifest {
    pub fn is_favicon(&self, path: &str) -> bool {
        self.favicon_paths.iter().any(|p| p == path)
    }
}

impl Default for Manifest {
    fn default() -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            critical_assets: owned(CRITICAL_ASSETS),
            critical_images: owned(CRITICAL_IMAGES),
            icon_assets: owned(ICON_ASSETS),
            favicon_paths: owned(ICON_ASSETS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cache_names() {
        let names = CacheNames::default();
        assert_eq!(names.general, "caffeine-cove-v3");
        assert_eq!(names.images, "caffeine-cove-images-v3");
        assert_eq!(names.icons, "caffeine-cove-icons-v3");
    }

    #[test]
    fn test_is_current() {
        let names = CacheNames::default();
        assert!(names.is_current("caffeine-cove-images-v3"));
        assert!(!names.is_current("caffeine-cove-images-v2"));
        assert!(!names.is_current("caffeine-cove"));
    }

    #[test]
    fn test_favicon_exact_match() {
        let manifest = Manifest::default();
        assert!(manifest.is_favicon("/favicon.ico"));
        assert!(!manifest.is_favicon("/favicon.ico/extra"));
        assert!(!manifest.is_favicon("/assets/favicon.ico"));
    }

    #[test]
    fn test_install_policy_serde() {
        let policy: InstallPolicy = serde_json::from_str("\"best_effort\"").unwrap();
        assert_eq!(policy, InstallPolicy::BestEffort);
        assert_eq!(InstallPolicy::default(), InstallPolicy::AllOrNothing);
    }
}
