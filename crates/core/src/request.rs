//! Intercepted requests and the responses served for them.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;
use crate::cache::hash::compute_request_key;

/// What the page intends to do with the response, as declared by the requester.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// No declared destination (plain `fetch()` calls).
    #[default]
    Empty,
    Document,
    Script,
    Style,
    Image,
    Font,
    Manifest,
}

impl Destination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Empty => "",
            Destination::Document => "document",
            Destination::Script => "script",
            Destination::Style => "style",
            Destination::Image => "image",
            Destination::Font => "font",
            Destination::Manifest => "manifest",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Destination {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "empty" => Ok(Destination::Empty),
            "document" => Ok(Destination::Document),
            "script" => Ok(Destination::Script),
            "style" => Ok(Destination::Style),
            "image" => Ok(Destination::Image),
            "font" => Ok(Destination::Font),
            "manifest" => Ok(Destination::Manifest),
            other => Err(Error::InvalidInput(format!("unknown destination: {other}"))),
        }
    }
}

/// A request observed by the worker.
///
/// The URL is always absolute; root-relative paths are resolved against the
/// site origin before a request is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
    pub method: String,
    pub url: Url,
    pub destination: Destination,
}

impl AssetRequest {
    /// A `GET` request with no declared destination.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".to_string(), url, destination: Destination::Empty }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.trim().to_ascii_uppercase();
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// URL used for cache matching: fragments never take part in matching.
    pub fn cache_url(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.to_string()
    }

    /// Normalized cache key (method + URL).
    pub fn cache_key(&self) -> String {
        compute_request_key(&self.method, &self.cache_url())
    }
}

/// A complete response: status, headers and the fully buffered body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetResponse {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl AssetResponse {
    /// 2xx-class status.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_destination_parse() {
        assert_eq!("image".parse::<Destination>().unwrap(), Destination::Image);
        assert_eq!("IMAGE".parse::<Destination>().unwrap(), Destination::Image);
        assert_eq!("".parse::<Destination>().unwrap(), Destination::Empty);
        assert!(matches!("video".parse::<Destination>(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_method_normalized() {
        let req = AssetRequest::get(url("https://cove.test/")).with_method(" post ");
        assert_eq!(req.method, "POST");
        assert!(!req.is_get());
    }

    #[test]
    fn test_cache_key_ignores_fragment() {
        let a = AssetRequest::get(url("https://cove.test/menu#drinks"));
        let b = AssetRequest::get(url("https://cove.test/menu"));
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_cache_key_includes_method() {
        let get = AssetRequest::get(url("https://cove.test/menu"));
        let head = get.clone().with_method("HEAD");
        assert_ne!(get.cache_key(), head.cache_key());
    }

    #[test]
    fn test_response_header_lookup() {
        let response = AssetResponse {
            url: "https://cove.test/logo.png".into(),
            status: 200,
            status_text: "OK".into(),
            headers: vec![("Content-Type".into(), "image/png".into())],
            body: Bytes::from_static(b"png"),
        };
        assert!(response.ok());
        assert_eq!(response.content_type(), Some("image/png"));
        assert_eq!(response.header("x-missing"), None);
    }
}
