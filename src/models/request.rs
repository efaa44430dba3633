// Declarative request descriptions

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP method of a described request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            other => Err(format!("unsupported method: {}", other)),
        }
    }
}

/// Value bound to a URL template placeholder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathValue {
    Str(String),
    Int(i64),
    Float(f64),
}

impl fmt::Display for PathValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathValue::Str(s) => f.write_str(s),
            PathValue::Int(n) => write!(f, "{}", n),
            PathValue::Float(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for PathValue {
    fn from(value: &str) -> Self {
        PathValue::Str(value.to_string())
    }
}

impl From<String> for PathValue {
    fn from(value: String) -> Self {
        PathValue::Str(value)
    }
}

impl From<i64> for PathValue {
    fn from(value: i64) -> Self {
        PathValue::Int(value)
    }
}

impl From<i32> for PathValue {
    fn from(value: i32) -> Self {
        PathValue::Int(value as i64)
    }
}

impl From<u32> for PathValue {
    fn from(value: u32) -> Self {
        PathValue::Int(value as i64)
    }
}

impl From<f64> for PathValue {
    fn from(value: f64) -> Self {
        PathValue::Float(value)
    }
}

/// Per-call behaviour flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFlags {
    /// Send without a bearer credential
    #[serde(default)]
    pub ignore_auth: bool,

    /// Reject with the server message and skip UI error surfacing
    #[serde(default, alias = "silentError")]
    pub silent_on_error: bool,

    /// Reject with the server message for the caller to handle explicitly
    #[serde(default, alias = "throwError")]
    pub throw_on_error: bool,
}

impl RequestFlags {
    /// Merge flags echoed back by the server into the call's own flags
    pub fn merged(self, silent_on_error: bool, throw_on_error: bool) -> Self {
        Self {
            ignore_auth: self.ignore_auth,
            silent_on_error: self.silent_on_error || silent_on_error,
            throw_on_error: self.throw_on_error || throw_on_error,
        }
    }
}

/// Immutable description of one outbound call
///
/// Built once per call through the consuming builder methods and handed to
/// [`crate::Dispatcher::dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescription {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) path_variables: BTreeMap<String, PathValue>,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) body: Option<Value>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) flags: RequestFlags,
}

impl RequestDescription {
    /// Start a description for `url`, which may contain `:name` or `{name}` placeholders
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            path_variables: BTreeMap::new(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
            timeout: None,
            flags: RequestFlags::default(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::Patch, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    /// Bind a placeholder in the URL template
    pub fn path_var(mut self, name: impl Into<String>, value: impl Into<PathValue>) -> Self {
        self.path_variables.insert(name.into(), value.into());
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Attach a JSON body
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn ignore_auth(mut self) -> Self {
        self.flags.ignore_auth = true;
        self
    }

    pub fn silent_error(mut self) -> Self {
        self.flags.silent_on_error = true;
        self
    }

    pub fn throw_error(mut self) -> Self {
        self.flags.throw_on_error = true;
        self
    }

    pub fn with_flags(mut self, flags: RequestFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn flags(&self) -> RequestFlags {
        self.flags
    }
}
