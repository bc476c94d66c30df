//! URL resolution against the site origin for consistent cache keys.

use url::Url;

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a request URL, resolving root-relative paths against `origin`.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve relative input against the origin
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(origin: &Url, input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let parsed = if trimmed.contains("://") { Url::parse(trimmed) } else { origin.join(trimmed) };
    let mut parsed = parsed.map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://cove.test").unwrap()
    }

    #[test]
    fn test_canonicalize_root_relative() {
        let url = canonicalize(&origin(), "/src/assets/logo.png").unwrap();
        assert_eq!(url.as_str(), "https://cove.test/src/assets/logo.png");
    }

    #[test]
    fn test_canonicalize_document_root() {
        let url = canonicalize(&origin(), "/").unwrap();
        assert_eq!(url.as_str(), "https://cove.test/");
    }

    #[test]
    fn test_canonicalize_absolute_passthrough() {
        let url = canonicalize(&origin(), "https://cdn.example.com/font.woff2").unwrap();
        assert_eq!(url.host_str(), Some("cdn.example.com"));
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize(&origin(), "https://COVE.TEST/menu").unwrap();
        assert_eq!(url.host_str(), Some("cove.test"));
    }

    #[test]
    fn test_canonicalize_remove_fragment() {
        let url = canonicalize(&origin(), "/menu#espresso").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/menu");
    }

    #[test]
    fn test_canonicalize_preserve_query() {
        let url = canonicalize(&origin(), "/gallery?page=2&sort=new").unwrap();
        assert_eq!(url.query(), Some("page=2&sort=new"));
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        let result = canonicalize(&origin(), "file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize(&origin(), ""), Err(UrlError::Empty)));
        assert!(matches!(canonicalize(&origin(), "   "), Err(UrlError::Empty)));
    }
}
