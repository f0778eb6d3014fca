//! HTTP client for the API Gateway REST API surface.
//!
//! Requests go out unsigned; the endpoint has to accept them as sent
//! (a local emulator, or a signing proxy in front of the real service).

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use super::{DefinitionStore, ImportRequest, ImportResult, ReplaceRequest, RestApi};
use crate::error::RemoteError;

/// Code for failures that never produced an HTTP response.
pub const REQUEST_ERROR_CODE: &str = "RequestError";
/// Code for a 2xx response whose body could not be understood.
pub const INVALID_RESPONSE_CODE: &str = "InvalidResponse";

const ERROR_TYPE_HEADER: &str = "x-amzn-errortype";

#[derive(Debug, Default, Deserialize)]
struct RestApiBody {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type", default)]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(alias = "Message", default)]
    message: Option<String>,
}

impl ErrorBody {
    fn code(&self) -> Option<String> {
        let non_empty = |c: &&str| !c.is_empty();
        self.error_type
            .as_deref()
            .map(|t| t.rsplit('#').next().unwrap_or(t))
            .filter(non_empty)
            .or(self.code.as_deref().filter(non_empty))
            .map(str::to_string)
    }
}

/// Client for interacting with the REST API store over HTTP.
#[derive(Clone)]
pub struct ApiGatewayClient {
    http: Client,
    endpoint: Url,
}

impl ApiGatewayClient {
    pub fn new(endpoint: Url) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(http: Client, endpoint: Url) -> Self {
        Self { http, endpoint }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// `{endpoint}/restapis[/{id}]`, with the id percent-encoded.
    fn rest_api_url(&self, rest_api_id: Option<&str>) -> Result<Url, RemoteError> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                RemoteError::new(
                    REQUEST_ERROR_CODE,
                    format!("endpoint {} cannot carry a path", self.endpoint),
                )
            })?;
            segments.pop_if_empty().push("restapis");
            if let Some(id) = rest_api_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::new(REQUEST_ERROR_CODE, e.to_string()))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }

    async fn send_definition(&self, request: RequestBuilder) -> Result<ImportResult, RemoteError> {
        let body = parse_rest_api(self.send(request).await?).await?;
        Ok(ImportResult {
            id: body.id,
            warnings: body.warnings,
        })
    }
}

fn fail_on_warnings_param(url: &mut Url, fail_on_warnings: Option<bool>) {
    if let Some(fail) = fail_on_warnings {
        url.query_pairs_mut()
            .append_pair("failonwarnings", if fail { "true" } else { "false" });
    }
}

async fn parse_rest_api(response: Response) -> Result<RestApiBody, RemoteError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| RemoteError::new(REQUEST_ERROR_CODE, e.to_string()))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| RemoteError::new(INVALID_RESPONSE_CODE, format!("bad RestApi body: {e}")))
}

/// Only used when neither header nor body names the error. A bare 404 is a
/// route miss, not proof that the REST API is gone.
fn code_for_status(status: StatusCode) -> String {
    match status {
        StatusCode::TOO_MANY_REQUESTS => "TooManyRequestsException".to_string(),
        StatusCode::SERVICE_UNAVAILABLE => "ServiceUnavailableException".to_string(),
        other => format!("HttpError{}", other.as_u16()),
    }
}

/// Build a [`RemoteError`] from a non-2xx response.
async fn error_from_response(response: Response) -> RemoteError {
    let status = response.status();
    let header_code = response
        .headers()
        .get(ERROR_TYPE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(':').next().unwrap_or(v).trim().to_string())
        .filter(|c| !c.is_empty());

    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();

    let code = header_code
        .or_else(|| body.code())
        .unwrap_or_else(|| code_for_status(status));
    let message = body.message.unwrap_or(text);

    debug!(status = status.as_u16(), code = %code, "Store returned error");
    RemoteError::new(code, message)
}

#[async_trait]
impl DefinitionStore for ApiGatewayClient {
    async fn import(&self, req: ImportRequest) -> Result<ImportResult, RemoteError> {
        let mut url = self.rest_api_url(None)?;
        url.query_pairs_mut().append_pair("mode", "import");
        fail_on_warnings_param(&mut url, req.fail_on_warnings);

        debug!(url = %url, bytes = req.body.len(), "Importing REST API");
        let request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(req.body);
        self.send_definition(request).await
    }

    async fn replace(&self, req: ReplaceRequest) -> Result<ImportResult, RemoteError> {
        let mut url = self.rest_api_url(Some(&req.rest_api_id))?;
        url.query_pairs_mut().append_pair("mode", req.mode.as_str());
        fail_on_warnings_param(&mut url, req.fail_on_warnings);

        debug!(url = %url, bytes = req.body.len(), "Replacing REST API definition");
        let request = self
            .http
            .put(url)
            .header(CONTENT_TYPE, "application/json")
            .body(req.body);
        self.send_definition(request).await
    }

    async fn fetch(&self, rest_api_id: &str) -> Result<RestApi, RemoteError> {
        let url = self.rest_api_url(Some(rest_api_id))?;
        debug!(url = %url, "Fetching REST API");

        let response = self.send(self.http.get(url)).await?;
        // A 2xx is enough to know the REST API exists.
        let body = match parse_rest_api(response).await {
            Ok(body) => body,
            Err(e) => {
                debug!("Ignoring unreadable RestApi body: {}", e);
                RestApiBody::default()
            }
        };
        Ok(RestApi {
            id: if body.id.is_empty() {
                rest_api_id.to_string()
            } else {
                body.id
            },
            name: body.name,
        })
    }

    async fn delete(&self, rest_api_id: &str) -> Result<(), RemoteError> {
        let url = self.rest_api_url(Some(rest_api_id))?;
        debug!(url = %url, "Deleting REST API");

        self.send(self.http.delete(url)).await?;
        Ok(())
    }
}
