use reqwest::{multipart::Form, Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    auth::session::SessionHandle,
    config::Config,
    errors::{AppError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Credential {
    Attach,
    Anonymous,
}

/// Request layer in front of the remote authority.
///
/// Attaches the current bearer token, performs exactly one attempt, and turns
/// every non-success response into an [`AppError`]. A 401 on a call that
/// carried a token signs the session out.
#[derive(Clone)]
pub struct ResourceGateway {
    client: Client,
    base_url: String,
    session: SessionHandle,
}

impl ResourceGateway {
    pub fn new(config: &Config, session: SessionHandle) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .send(Method::GET, path, Credential::Attach, |req| req)
            .await?;
        decode(response).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send(Method::POST, path, Credential::Attach, |req| req.json(body))
            .await?;
        decode(response).await
    }

    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send(Method::PATCH, path, Credential::Attach, |req| req.json(body))
            .await?;
        decode(response).await
    }

    pub async fn post_multipart<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T> {
        let response = self
            .send(Method::POST, path, Credential::Attach, |req| req.multipart(form))
            .await?;
        decode(response).await
    }

    pub async fn post_empty(&self, path: &str) -> Result<()> {
        self.send(Method::POST, path, Credential::Attach, |req| req)
            .await
            .map(drop)
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(Method::DELETE, path, Credential::Attach, |req| req)
            .await
            .map(drop)
    }

    /// Returns the raw response so the caller can stream the body.
    pub async fn get_stream(&self, path: &str) -> Result<Response> {
        self.send(Method::GET, path, Credential::Attach, |req| req)
            .await
    }

    pub(crate) async fn post_json_anonymous<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send(Method::POST, path, Credential::Anonymous, |req| req.json(body))
            .await?;
        decode(response).await
    }

    pub(crate) async fn post_empty_anonymous<B>(&self, path: &str, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        self.send(Method::POST, path, Credential::Anonymous, |req| req.json(body))
            .await
            .map(drop)
    }

    async fn send<F>(
        &self,
        method: Method,
        path: &str,
        credential: Credential,
        build: F,
    ) -> Result<Response>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let url = format!("{}{}", self.base_url, path);
        let token = match credential {
            Credential::Attach => self.session.token(),
            Credential::Anonymous => None,
        };

        let mut request = self.client.request(method.clone(), &url);
        if let Some(token) = &token {
            request = request.bearer_auth(token);
        }

        let response = build(request).send().await.map_err(|e| {
            tracing::warn!(%method, path, error = %e, "Request did not reach the server");
            AppError::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(%method, path, status = status.as_u16(), "Request succeeded");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = extract_detail(&body);
        tracing::debug!(%method, path, status = status.as_u16(), ?detail, "Request rejected");

        if status == StatusCode::UNAUTHORIZED {
            if let Some(token) = &token {
                self.session.invalidate_if_current(token);
            }
        }

        Err(AppError::from_status(status, detail))
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Pulls a human-readable message out of an error body.
///
/// `message`, `detail` and `error` fields win; field-level validation maps
/// become `field: message` pairs; anything else is returned as sent.
pub fn extract_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let value = match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(_) => return Some(body.to_string()),
    };

    match value {
        Value::Object(map) => {
            for key in ["message", "detail", "error"] {
                if let Some(Value::String(message)) = map.get(key) {
                    return Some(message.clone());
                }
            }

            let fields: Vec<String> = map
                .iter()
                .filter_map(|(field, value)| {
                    flatten_messages(value).map(|message| format!("{}: {}", field, message))
                })
                .collect();

            if fields.is_empty() {
                Some(body.to_string())
            } else {
                Some(fields.join("; "))
            }
        }
        other => flatten_messages(&other).or_else(|| Some(body.to_string())),
    }
}

fn flatten_messages(value: &Value) -> Option<String> {
    match value {
        Value::String(message) if !message.is_empty() => Some(message.clone()),
        Value::Array(items) => {
            let messages: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join(" "))
            }
        }
        _ => None,
    }
}
