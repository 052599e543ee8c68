use url::Url;

const DEFAULT_SLUG: &str = "post";

/// Derives a file stem from the last non-empty path segment of a URL
///
/// Percent-encoded segments are decoded, spaces become underscores, and
/// path separators are dropped so the result is always a single file name.
/// Unparsable URLs and URLs without a usable segment yield `"post"`.
///
/// # Examples
///
/// ```
/// use harvest::url::url_slug;
///
/// assert_eq!(url_slug("https://dev.to/ana/intro-to-tokio-4k2p/"), "intro-to-tokio-4k2p");
/// assert_eq!(url_slug("https://dev.to/"), "post");
/// ```
pub fn url_slug(raw: &str) -> String {
    let Ok(url) = Url::parse(raw) else {
        return DEFAULT_SLUG.to_string();
    };

    let segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|s| {
            let escaped = s.replace('+', "%2B").replace('&', "%26");
            url::form_urlencoded::parse(format!("x={}", escaped).as_bytes())
                .next()
                .map(|(_, v)| v.into_owned())
                .unwrap_or_else(|| s.to_string())
        });

    let slug: String = segment
        .unwrap_or_default()
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();

    if slug.is_empty() || slug == "." || slug == ".." {
        DEFAULT_SLUG.to_string()
    } else {
        slug
    }
}
