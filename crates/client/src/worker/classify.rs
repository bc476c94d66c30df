//! Pure request classification.

use std::sync::LazyLock;

use cove_core::{AssetRequest, Destination, Manifest};
use regex::Regex;
use serde::Serialize;

static IMAGE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(jpe?g|png|webp|gif|svg)$").expect("valid image path pattern"));

/// How a request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// The worker is not in control yet; straight to the network.
    Passthrough,
    CacheFirst,
    StaleWhileRevalidate,
    NetworkFirst,
}

/// Request class, evaluated in priority order Icon > Image > Other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Icon,
    Image,
    Other,
}

impl Route {
    pub fn strategy(self) -> Strategy {
        match self {
            Route::Icon => Strategy::CacheFirst,
            Route::Image => Strategy::StaleWhileRevalidate,
            Route::Other => Strategy::NetworkFirst,
        }
    }
}

/// Classify a request against the manifest's favicon list and the image rules.
pub fn classify(request: &AssetRequest, manifest: &Manifest) -> Route {
    let path = request.path();
    if manifest.is_favicon(path) {
        Route::Icon
    } else if request.destination == Destination::Image || IMAGE_PATH.is_match(path) {
        Route::Image
    } else {
        Route::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn request(path: &str) -> AssetRequest {
        AssetRequest::get(Url::parse("https://cove.test").unwrap().join(path).unwrap())
    }

    #[test]
    fn test_every_favicon_is_icon() {
        let manifest = Manifest::default();
        for path in &manifest.favicon_paths {
            assert_eq!(classify(&request(path), &manifest), Route::Icon, "{path}");
        }
    }

    #[test]
    fn test_icon_wins_over_image() {
        let manifest = Manifest::default();
        let req = request("/favicon-32x32.png").with_destination(Destination::Image);
        assert_eq!(classify(&req, &manifest), Route::Icon);
    }

    #[test]
    fn test_image_by_extension() {
        let manifest = Manifest::default();
        for path in ["/a.jpg", "/a.jpeg", "/a.png", "/a.webp", "/a.gif", "/a.svg", "/src/assets/LATTE.JPG", "/b.WebP"] {
            assert_eq!(classify(&request(path), &manifest), Route::Image, "{path}");
        }
    }

    #[test]
    fn test_image_by_destination() {
        let manifest = Manifest::default();
        let req = request("/api/avatar?id=7").with_destination(Destination::Image);
        assert_eq!(classify(&req, &manifest), Route::Image);
    }

    #[test]
    fn test_extension_must_end_path() {
        let manifest = Manifest::default();
        assert_eq!(classify(&request("/logo.png.html"), &manifest), Route::Other);
        assert_eq!(classify(&request("/jpg"), &manifest), Route::Other);
    }

    #[test]
    fn test_query_does_not_hide_extension() {
        let manifest = Manifest::default();
        assert_eq!(classify(&request("/src/assets/logo.png?v=2"), &manifest), Route::Image);
    }

    #[test]
    fn test_other_requests() {
        let manifest = Manifest::default();
        assert_eq!(classify(&request("/"), &manifest), Route::Other);
        assert_eq!(classify(&request("/src/main.tsx"), &manifest), Route::Other);
        assert_eq!(classify(&request("/favicon.ico.bak"), &manifest), Route::Other);
    }

    #[test]
    fn test_route_strategies() {
        assert_eq!(Route::Icon.strategy(), Strategy::CacheFirst);
        assert_eq!(Route::Image.strategy(), Strategy::StaleWhileRevalidate);
        assert_eq!(Route::Other.strategy(), Strategy::NetworkFirst);
    }
}
