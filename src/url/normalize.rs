use crate::UrlError;
use url::Url;

/// Resolves an href against the page it was found on
///
/// # Steps
///
/// 1. Parse the base URL; reject if malformed
/// 2. Resolve `href` relative to the base (absolute hrefs replace it)
/// 3. Remove the fragment (everything after #)
///
/// Scheme is not restricted here; callers that are about to fetch use
/// [`parse_http_url`].
///
/// # Examples
///
/// ```
/// use harvest::url::normalize_url;
///
/// let url = normalize_url("https://dev.to/t/rust", "/ana/intro-to-tokio-4k2p#comments").unwrap();
/// assert_eq!(url.as_str(), "https://dev.to/ana/intro-to-tokio-4k2p");
/// ```
pub fn normalize_url(base: &str, href: &str) -> Result<Url, UrlError> {
    let base = Url::parse(base).map_err(|e| UrlError::Parse(e.to_string()))?;
    let mut resolved = base
        .join(href.trim())
        .map_err(|e| UrlError::Parse(e.to_string()))?;
    resolved.set_fragment(None);
    Ok(resolved)
}

/// Parses an absolute URL that the crawler is allowed to request
///
/// Only `http` and `https` with a host are accepted.
pub fn parse_http_url(raw: &str) -> Result<Url, UrlError> {
    let url = Url::parse(raw).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_resolved() {
        let url = normalize_url("https://dev.to/tags", "/t/rust").unwrap();
        assert_eq!(url.as_str(), "https://dev.to/t/rust");
    }

    #[test]
    fn test_relative_without_leading_slash() {
        let url = normalize_url("https://dev.to/t/rust", "latest").unwrap();
        assert_eq!(url.as_str(), "https://dev.to/t/latest");
    }

    #[test]
    fn test_absolute_href_wins() {
        let url = normalize_url("https://dev.to/", "https://example.com/a").unwrap();
        assert_eq!(url.as_str(), "https://example.com/a");
    }

    #[test]
    fn test_fragment_stripped() {
        let url = normalize_url("https://dev.to/", "/post#section").unwrap();
        assert_eq!(url.as_str(), "https://dev.to/post");
    }

    #[test]
    fn test_query_preserved() {
        let url = normalize_url("https://dev.to/", "/t/rust?page=2").unwrap();
        assert_eq!(url.as_str(), "https://dev.to/t/rust?page=2");
    }

    #[test]
    fn test_invalid_base() {
        assert!(matches!(
            normalize_url("not a url", "/x"),
            Err(UrlError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_http_url() {
        assert!(parse_http_url("https://dev.to/").is_ok());
        assert!(parse_http_url("http://127.0.0.1:9000/x").is_ok());
        assert!(matches!(
            parse_http_url("ftp://example.com/"),
            Err(UrlError::InvalidScheme(_))
        ));
        assert!(matches!(parse_http_url("::"), Err(UrlError::Parse(_))));
    }
}
