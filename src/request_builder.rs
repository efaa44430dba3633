// Request building from declarative descriptions

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use reqwest::Url;

use crate::error::{DispatchError, Result};
use crate::models::request::RequestDescription;
use crate::transport::TransportRequest;

// Placeholders are `:name` opening a path segment, or `{name}` anywhere
static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(^|/):([A-Za-z_][A-Za-z0-9_]*)|\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap()
});

// `scheme://` at the start of an absolute URL
static SCHEME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://").unwrap());

/// Names of every placeholder in a URL template, in order of appearance
pub fn placeholders(template: &str) -> Vec<String> {
    let (_, path) = split_origin(template);
    PLACEHOLDER_PATTERN
        .captures_iter(path)
        .filter_map(|caps| placeholder_name(&caps).map(str::to_string))
        .collect()
}

/// Resolve every placeholder of `description`'s URL template
///
/// Bound values are percent-encoded as a single path segment.
pub fn resolve_path(description: &RequestDescription) -> Result<String> {
    let (origin, path) = split_origin(&description.url);

    let mut missing = None;
    let resolved = PLACEHOLDER_PATTERN.replace_all(path, |caps: &Captures| {
        let name = placeholder_name(caps).unwrap_or_default();
        let lead = caps.get(1).map_or("", |m| m.as_str());
        match description.path_variables.get(name) {
            Some(value) => format!("{}{}", lead, urlencoding::encode(&value.to_string())),
            None => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    if let Some(name) = missing {
        return Err(DispatchError::MissingPathVariable(name));
    }

    Ok(format!("{}{}", origin, resolved))
}

/// Build a transport-ready request
///
/// Relative URLs are joined onto `base_url`; absolute URLs are used as-is.
/// Query, body, headers and timeout are passed through unchanged.
pub fn build(description: &RequestDescription, base_url: &Url) -> Result<TransportRequest> {
    let path = resolve_path(description)?;

    let url = if is_absolute(&path) {
        Url::parse(&path)
    } else {
        base_url.join(&path)
    }
    .map_err(|e| DispatchError::InvalidUrl(format!("{}: {}", path, e)))?;

    Ok(TransportRequest {
        method: description.method,
        url,
        query: description.query.clone(),
        headers: description.headers.clone(),
        body: description.body.clone(),
        timeout: description.timeout,
    })
}

fn placeholder_name<'a>(caps: &Captures<'a>) -> Option<&'a str> {
    caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str())
}

fn is_absolute(url: &str) -> bool {
    SCHEME_PATTERN.is_match(url)
}

/// Split `scheme://authority` off an absolute URL so ports and userinfo are not
/// mistaken for placeholders
fn split_origin(url: &str) -> (&str, &str) {
    match SCHEME_PATTERN.find(url) {
        Some(scheme) => {
            let authority_start = scheme.end();
            let path_start = url[authority_start..]
                .find('/')
                .map(|i| authority_start + i)
                .unwrap_or(url.len());
            url.split_at(path_start)
        }
        None => ("", url),
    }
}
