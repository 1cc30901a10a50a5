//! Request URL resolution against the upstream origin.

use url::Url;

/// Error type for URL parsing failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a request target against the origin.
///
/// Origin-form targets (`/path?query`) always stay on the origin, even when
/// the path begins with `//`. Absolute URLs are accepted as-is so that
/// cross-origin requests can be recognized and passed through. Fragments are
/// always removed.
pub fn resolve(origin: &Url, target: &str) -> Result<Url, UrlError> {
    let trimmed = target.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    if trimmed.starts_with('/') {
        let without_fragment = trimmed.split_once('#').map_or(trimmed, |(before, _)| before);
        let (path, query) = match without_fragment.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (without_fragment, None),
        };

        let mut url = origin.clone();
        url.set_path(path);
        url.set_query(query);
        url.set_fragment(None);
        return Ok(url);
    }

    if trimmed.contains("://") {
        let mut url = Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
        url.set_fragment(None);
        return Ok(url);
    }

    Err(UrlError::InvalidUrl(format!("'{trimmed}' is neither a path nor an absolute URL")))
}

/// Whether two URLs share scheme, host and port.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}
