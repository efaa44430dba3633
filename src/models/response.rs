// Normalized call outcome and the server envelope it is derived from

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Server status code for a successful call
pub const CODE_OK: i64 = 200;

/// Server status code reporting an expired session
pub const CODE_UNAUTHORIZED: i64 = 401;

/// Envelope every response body is expected to carry
///
/// The status that drives the pipeline is `code`, not the HTTP status.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub code: i64,

    #[serde(default)]
    pub data: Value,

    #[serde(default)]
    pub message: String,

    /// Flags echoed back by the server
    #[serde(default)]
    pub silent_error: bool,

    #[serde(default)]
    pub throw_error: bool,
}

impl Envelope {
    /// Validate a raw body into an envelope
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

/// Discriminated result of a dispatch
///
/// `Success` always carries `data`; `Failure` always carries a code and message.
#[derive(Debug, Clone, PartialEq)]
pub enum Response<T> {
    Success {
        data: T,
        error_code: Option<String>,
        error_message: Option<String>,
    },
    Failure {
        error_code: i64,
        error_message: String,
        data: Option<T>,
    },
}

impl<T> Response<T> {
    pub fn ok(data: T) -> Self {
        Response::Success {
            data,
            error_code: None,
            error_message: None,
        }
    }

    pub fn failure(error_code: i64, error_message: impl Into<String>) -> Self {
        Response::Failure {
            error_code,
            error_message: error_message.into(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Response::Success { data, .. } => Some(data),
            Response::Failure { data, .. } => data.as_ref(),
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Response::Success { data, .. } => Some(data),
            Response::Failure { data, .. } => data,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Response<U> {
        match self {
            Response::Success {
                data,
                error_code,
                error_message,
            } => Response::Success {
                data: f(data),
                error_code,
                error_message,
            },
            Response::Failure {
                error_code,
                error_message,
                data,
            } => Response::Failure {
                error_code,
                error_message,
                data: data.map(f),
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResponseOut<'a, T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseIn<T> {
    success: bool,
    data: Option<T>,
    error_code: Option<Value>,
    error_message: Option<String>,
}

impl<T: Serialize> Serialize for Response<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let out = match self {
            Response::Success {
                data,
                error_code,
                error_message,
            } => ResponseOut {
                success: true,
                data: Some(data),
                error_code: error_code.clone().map(Value::String),
                error_message: error_message.as_deref(),
            },
            Response::Failure {
                error_code,
                error_message,
                data,
            } => ResponseOut {
                success: false,
                data: data.as_ref(),
                error_code: Some(Value::from(*error_code)),
                error_message: Some(error_message.as_str()),
            },
        };
        out.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Response<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let wire = ResponseIn::<T>::deserialize(deserializer)?;
        if wire.success {
            let data = wire
                .data
                .ok_or_else(|| D::Error::missing_field("data"))?;
            Ok(Response::Success {
                data,
                error_code: wire.error_code.map(|v| match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                }),
                error_message: wire.error_message,
            })
        } else {
            let error_code = wire
                .error_code
                .and_then(|v| v.as_i64())
                .ok_or_else(|| D::Error::missing_field("errorCode"))?;
            let error_message = wire
                .error_message
                .ok_or_else(|| D::Error::missing_field("errorMessage"))?;
            Ok(Response::Failure {
                error_code,
                error_message,
                data: wire.data,
            })
        }
    }
}
