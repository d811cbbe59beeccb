//! HTTP client for the Kong Admin API.

use async_trait::async_trait;
use kongverge_engine::client::{ClientError, Page, ResourceClient, Result};
use kongverge_engine::{Resource, ResourceKind};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{AdminConfig, AdminConfigError};

/// Error `name` the Admin API reports for unique-key collisions.
const UNIQUE_VIOLATION: &str = "unique constraint violation";

/// Admin API client. Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct KongAdminClient {
    http: reqwest::Client,
    base: Url,
    basic_auth: Option<(String, Option<String>)>,
}

#[derive(Deserialize)]
struct ListResponse<R> {
    data: Vec<R>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl KongAdminClient {
    pub fn new(config: &AdminConfig) -> std::result::Result<Self, AdminConfigError> {
        let base = Url::parse(&config.admin_uri).map_err(|e| AdminConfigError::InvalidUri {
            uri: config.admin_uri.clone(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(AdminConfigError::InvalidUri {
                uri: config.admin_uri.clone(),
                reason: "expected an http or https url".to_string(),
            });
        }

        let mut headers = HeaderMap::new();
        for (name, value) in [
            ("apikey", &config.api_key),
            ("kong-admin-token", &config.admin_token),
        ] {
            if let Some(value) = value {
                let mut value = HeaderValue::from_str(value)
                    .map_err(|_| AdminConfigError::InvalidHeader { name })?;
                value.set_sensitive(true);
                headers.insert(HeaderName::from_static(name), value);
            }
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(config.tls_skip_verify)
            .build()?;

        let basic_auth = config
            .username
            .as_ref()
            .map(|user| (user.clone(), config.password.clone()));

        Ok(Self {
            http,
            base,
            basic_auth,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Build `{base}/{segments...}`, percent-encoding each segment.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Config(format!("{} cannot be a base url", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.basic_auth {
            Some((user, password)) => builder.basic_auth(user, password.as_ref()),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        builder
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: &B,
    ) -> Result<Response> {
        debug!("{} {}", method, url);
        self.send(self.request(method, url).json(body)).await
    }

    async fn get(&self, url: Url) -> Result<Response> {
        debug!("GET {}", url);
        self.send(self.request(Method::GET, url)).await
    }

    /// GET a single entity; 404 is `None`.
    async fn get_entity<R: DeserializeOwned>(&self, kind: ResourceKind, key: &str) -> Result<Option<R>> {
        let response = self.get(self.url(&[kind.collection(), key])?).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode(check(response, key).await?).await.map(Some)
    }
}

/// Turn an error response into a [`ClientError`].
async fn check(response: Response, target: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let message = body.message.unwrap_or(text);

    if status == StatusCode::CONFLICT || body.name.as_deref() == Some(UNIQUE_VIOLATION) {
        return Err(ClientError::Conflict(message));
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ClientError::NotFound(target.to_string()));
    }
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

#[async_trait]
impl<R: Resource> ResourceClient<R> for KongAdminClient {
    async fn create(&self, request: &R::Request) -> Result<R> {
        let url = self.url(&[R::KIND.collection()])?;
        let response = self.send_json(Method::POST, url, request).await?;
        decode(check(response, R::KIND.collection()).await?).await
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<R>> {
        self.get_entity(R::KIND, id).await
    }

    async fn get_by_unique_key(&self, key: &str) -> Result<Option<R>> {
        self.get_entity(R::KIND, key).await
    }

    async fn list_page(&self, size: usize, offset: Option<&str>) -> Result<Page<R>> {
        let mut url = self.url(&[R::KIND.collection()])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("size", &size.to_string());
            if let Some(offset) = offset {
                query.append_pair("offset", offset);
            }
        }
        let response = self.get(url).await?;
        let page: ListResponse<R> = decode(check(response, R::KIND.collection()).await?).await?;
        Ok(Page {
            data: page.data,
            offset: page.offset.filter(|o| !o.is_empty()),
        })
    }

    async fn update_by_id(&self, id: &str, request: &R::Request) -> Result<R> {
        let url = self.url(&[R::KIND.collection(), id])?;
        let response = self.send_json(Method::PATCH, url, request).await?;
        decode(check(response, id).await?).await
    }

    async fn delete_by_id(&self, id: &str) -> Result<()> {
        let url = self.url(&[R::KIND.collection(), id])?;
        debug!("DELETE {}", url);
        let response = self.send(self.request(Method::DELETE, url)).await?;
        check(response, id).await.map(|_| ())
    }
}
