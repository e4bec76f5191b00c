// ABOUTME: Session id extraction from a launch URL.
// ABOUTME: Checks the query string first, then a `sid` parameter carried in the fragment.

use url::Url;

/// Extract a non-empty `sid` from a full or relative launch URL.
///
/// Accepts things like `https://app.example.com/?sid=abc`, `#/chat?sid=abc`,
/// `https://app.example.com/#sid=abc` or just `?sid=abc`.
pub fn sid_from_url(raw: &str) -> Option<String> {
    let url = parse_lenient(raw.trim())?;

    let from_query = url
        .query_pairs()
        .find(|(k, _)| k == "sid")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty());
    if from_query.is_some() {
        return from_query;
    }

    url.fragment().and_then(sid_from_fragment)
}

/// Parse the fragment of a hash-routed URL: `/route?sid=..` or `sid=..`.
fn sid_from_fragment(fragment: &str) -> Option<String> {
    if !fragment.contains("sid=") {
        return None;
    }
    let stripped = fragment.strip_prefix('/').unwrap_or(fragment);
    let params = match stripped.split('?').nth(1) {
        Some(query) if !query.is_empty() => query,
        _ => stripped,
    };
    url::form_urlencoded::parse(params.as_bytes())
        .find(|(k, _)| k == "sid")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

fn parse_lenient(raw: &str) -> Option<Url> {
    if raw.is_empty() {
        return None;
    }
    match Url::parse(raw) {
        Ok(url) => Some(url),
        Err(_) => Url::parse("http://localhost/").ok()?.join(raw).ok(),
    }
}
