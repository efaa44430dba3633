// Interception pipeline
// Every outbound call passes a pre-send stage (credential injection) and a
// post-receive stage (envelope status interpretation, refresh, classification)

use reqwest::Url;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::auth::SessionManager;
use crate::error::{DispatchError, ErrorDetail, ErrorSurface, Result};
use crate::hooks::ErrorNotifier;
use crate::models::request::{RequestDescription, RequestFlags};
use crate::models::response::{Envelope, Response, CODE_OK, CODE_UNAUTHORIZED};
use crate::request_builder;
use crate::transport::{RawResponse, Transport, TransportRequest};

/// Request dispatcher wrapping a [`Transport`] with session handling
pub struct Dispatcher {
    base_url: Url,
    transport: Arc<dyn Transport>,
    session: Arc<SessionManager>,
    notifier: Arc<dyn ErrorNotifier>,
}

impl Dispatcher {
    pub fn new(
        base_url: Url,
        transport: Arc<dyn Transport>,
        session: Arc<SessionManager>,
        notifier: Arc<dyn ErrorNotifier>,
    ) -> Self {
        Self {
            base_url,
            transport,
            session,
            notifier,
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Send a described request and resolve it
    ///
    /// `Ok` is always `Response::Success`. Every other outcome is an `Err`;
    /// [`DispatchError::redirected`] reports whether a login redirect superseded it.
    pub async fn dispatch<T: DeserializeOwned>(
        &self,
        description: &RequestDescription,
    ) -> Result<Response<T>> {
        let request_id = uuid::Uuid::new_v4().to_string()[..8].to_string();
        let request = request_builder::build(description, &self.base_url)?;

        tracing::debug!(
            request_id = %request_id,
            method = %request.method,
            url = %request.url,
            "Dispatching request"
        );

        let request = self.before_send(request, description.flags())?;

        let raw = match self.transport.send(request).await {
            Ok(raw) => raw,
            Err(e) => {
                let err = DispatchError::Network(e.to_string());
                tracing::warn!(request_id = %request_id, error = %err, "Transport failure");
                self.notifier.notify(&err);
                return Err(err);
            }
        };

        let result = self.after_receive(raw, description.flags()).await;
        if let Err(ref e) = result {
            tracing::debug!(
                request_id = %request_id,
                code = e.error_code(),
                redirected = e.redirected(),
                "Request rejected: {}",
                e
            );
        }
        result
    }

    /// Like [`Dispatcher::dispatch`], folding every rejection into `Response::Failure`
    pub async fn settle<T: DeserializeOwned>(&self, description: &RequestDescription) -> Response<T> {
        match self.dispatch(description).await {
            Ok(response) => response,
            Err(e) => e.into_response(),
        }
    }

    fn before_send(&self, request: TransportRequest, flags: RequestFlags) -> Result<TransportRequest> {
        if flags.ignore_auth {
            return Ok(request);
        }

        match self.session.access_token()? {
            Some(token) => Ok(request.with_bearer(&token)),
            None => {
                tracing::warn!(url = %request.url, "No access token for authenticated request");
                self.session.redirect_to_login();
                Err(DispatchError::NoCredential)
            }
        }
    }

    async fn after_receive<T: DeserializeOwned>(
        &self,
        raw: RawResponse,
        flags: RequestFlags,
    ) -> Result<Response<T>> {
        let envelope = match Envelope::parse(&raw.body) {
            Ok(envelope) => envelope,
            Err(e) => {
                let err = DispatchError::InvalidEnvelope(format!("HTTP {}: {}", raw.status, e));
                self.notifier.notify(&err);
                return Err(err);
            }
        };

        match envelope.code {
            CODE_OK => serde_json::from_value(envelope.data)
                .map(Response::ok)
                .map_err(|e| DispatchError::InvalidEnvelope(format!("data: {}", e))),

            CODE_UNAUTHORIZED => {
                tracing::info!("Session expired, refreshing credentials");
                self.session.refresh().await?;
                // The failed call is not replayed; callers reissue it with the new token
                Err(DispatchError::SessionExpired)
            }

            code => {
                let flags = flags.merged(envelope.silent_error, envelope.throw_error);
                let err = classify(code, envelope.message, envelope.data, flags);
                if let DispatchError::Application {
                    surface: ErrorSurface::Default,
                    ..
                } = err
                {
                    self.notifier.notify(&err);
                }
                Err(err)
            }
        }
    }
}

/// Application error for a non-200/401 status, shaped by the call's flags
fn classify(
    code: i64,
    message: String,
    data: serde_json::Value,
    flags: RequestFlags,
) -> DispatchError {
    let (detail, surface) = if flags.silent_on_error {
        (ErrorDetail::Message(message.clone()), ErrorSurface::Silent)
    } else if flags.throw_on_error {
        (ErrorDetail::Message(message.clone()), ErrorSurface::Explicit)
    } else {
        (ErrorDetail::Data(data), ErrorSurface::Default)
    };

    DispatchError::Application {
        code,
        message,
        detail,
        surface,
    }
}
