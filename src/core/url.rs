// Endpoint and query-string manipulation shared by requests and pagination.
// Helpers accept both absolute URLs and origin-relative endpoints.
use std::collections::BTreeMap;
use url::Url;
use url::form_urlencoded;

pub fn force_slash_prefix(text: &str) -> String {
    if text.is_empty() || text.starts_with('/') {
        return text.to_string();
    }
    format!("/{text}")
}

pub fn params_of(url: &str) -> BTreeMap<String, String> {
    let (_, query, _) = split_url(url);
    query
        .map(|query| form_urlencoded::parse(query.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

pub fn remove_params(url: &str, names: &[&str]) -> String {
    let (base, query, fragment) = split_url(url);
    let mut out = base.to_string();
    if let Some(query) = query {
        let kept: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .filter(|(key, _)| !names.contains(&key.as_str()))
            .collect();
        if !kept.is_empty() {
            out.push('?');
            out.push_str(&encode_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str()))));
        }
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

/// Appends `params` to `url`. Parameters already present in the URL win
/// over the appended ones, and the merged query is sorted by key.
pub fn append_params(url: &str, params: &BTreeMap<String, String>) -> String {
    if params.is_empty() {
        return url.to_string();
    }
    let Some((path, query)) = url.split_once('?') else {
        return format!(
            "{url}?{}",
            encode_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        );
    };
    let mut merged = params.clone();
    for (key, value) in form_urlencoded::parse(query.as_bytes()).into_owned() {
        merged.insert(key, value);
    }
    format!(
        "{path}?{}",
        encode_pairs(merged.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    )
}

/// Reduces a page URL returned by the server to an endpoint usable with a
/// new request: scheme, host and the API version prefix are dropped.
pub fn graph_endpoint(page_url: &str, api_version: Option<&str>) -> String {
    let (path, query) = match Url::parse(page_url) {
        Ok(url) if url.has_host() => (url.path().to_string(), url.query().map(str::to_string)),
        _ => {
            let (base, query, _) = split_url(page_url);
            (base.to_string(), query.map(str::to_string))
        }
    };
    let path = force_slash_prefix(&path);
    let stripped = strip_version(&path, api_version);
    let mut endpoint = force_slash_prefix(stripped);
    if endpoint.is_empty() {
        endpoint.push('/');
    }
    if let Some(query) = query.filter(|query| !query.is_empty()) {
        endpoint.push('?');
        endpoint.push_str(&query);
    }
    endpoint
}

fn strip_version<'a>(path: &'a str, api_version: Option<&str>) -> &'a str {
    if let Some(version) = api_version {
        let version = force_slash_prefix(version.trim_end_matches('/'));
        if !version.is_empty() {
            if path == version {
                return "";
            }
            if let Some(rest) = path.strip_prefix(version.as_str()) {
                if rest.starts_with('/') {
                    return rest;
                }
            }
        }
    }
    let trimmed = path.trim_start_matches('/');
    let (first, rest) = trimmed.split_once('/').unwrap_or((trimmed, ""));
    let mut chars = first.chars();
    let is_version = chars.next() == Some('v') && chars.next().is_some_and(|c| c.is_ascii_digit());
    if is_version {
        // `rest` has lost its leading slash; callers re-add it.
        return rest;
    }
    path
}

fn split_url(url: &str) -> (&str, Option<&str>, Option<&str>) {
    let (rest, fragment) = match url.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (url, None),
    };
    match rest.split_once('?') {
        Some((base, query)) => (base, Some(query), fragment),
        None => (rest, None, fragment),
    }
}

fn encode_pairs<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}
