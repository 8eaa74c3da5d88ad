//! `reqwest`-backed resource client for the AutoDrive REST API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use autodrive_core::codec::{decode_list, decode_record, encode_record};
use autodrive_core::{
    Catalog, EntityId, EntityRecord, ResourceClient, ResourceDescriptor, TransportError,
};

use super::ClientProvider;
use crate::config::ConsoleConfig;
use crate::error::{ClientError, RegistryError};

/// Header carrying a fresh UUID on every outgoing request.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Connection to one backend: a shared `reqwest::Client` plus the catalog of
/// resource kinds it serves.
#[derive(Debug, Clone)]
pub struct HttpApi {
    http: reqwest::Client,
    base: Url,
    catalog: Arc<Catalog>,
}

impl HttpApi {
    /// Builds the HTTP client from `config`.
    ///
    /// The base URL gets a trailing slash if it lacks one, so resource paths
    /// are appended to it rather than replacing its last segment.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidBaseUrl`] if the base URL does not parse
    /// or is not `http(s)`, and [`ClientError::Build`] if the TLS backend
    /// cannot be initialised.
    pub fn new(config: &ConsoleConfig, catalog: Arc<Catalog>) -> Result<Self, ClientError> {
        let base = parse_base_url(&config.api_base_url)?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            base,
            catalog,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Typed client for `/{resource}`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownResource`] for kinds outside the catalog.
    pub fn resource(&self, resource: &str) -> Result<HttpResourceClient, RegistryError> {
        let descriptor = self
            .catalog
            .get(resource)
            .ok_or_else(|| RegistryError::UnknownResource(resource.to_string()))?;
        let collection_url = format!("{}{}", self.base, descriptor.name());
        Ok(HttpResourceClient {
            http: self.http.clone(),
            collection_url,
            descriptor,
        })
    }
}

impl ClientProvider for HttpApi {
    fn client(&self, resource: &str) -> Result<Arc<dyn ResourceClient>, RegistryError> {
        Ok(Arc::new(self.resource(resource)?))
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let invalid = |reason: String| ClientError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };
    let mut base = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", base.scheme())));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.set_query(None);
    base.set_fragment(None);
    Ok(base)
}

/// Resource client for one kind, e.g. everything under `/vendas`.
#[derive(Debug, Clone)]
pub struct HttpResourceClient {
    http: reqwest::Client,
    collection_url: String,
    descriptor: Arc<ResourceDescriptor>,
}

impl HttpResourceClient {
    /// URL of the collection, e.g. `http://localhost:8080/vendas`.
    #[must_use]
    pub fn collection_url(&self) -> &str {
        &self.collection_url
    }

    fn record_url(&self, id: EntityId) -> String {
        format!("{}/{id}", self.collection_url)
    }

    /// Sends one request and returns the body of a 2xx response.
    async fn execute(
        &self,
        method: Method,
        url: String,
        body: Option<Value>,
    ) -> Result<String, TransportError> {
        let request_id = Uuid::new_v4();
        debug!(%method, %url, %request_id, "sending request");

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(REQUEST_ID_HEADER, request_id.to_string());
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            warn!(%method, %url, %request_id, error = %e, "request did not complete");
            TransportError::Network(e.to_string())
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if !status.is_success() {
            warn!(%method, %url, %request_id, status = status.as_u16(), "backend rejected request");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        debug!(%method, %url, %request_id, status = status.as_u16(), "request succeeded");
        Ok(text)
    }

    fn parse(&self, text: &str) -> Result<Value, TransportError> {
        if text.trim().is_empty() {
            return Err(TransportError::Decode(format!(
                "empty response body from {}",
                self.collection_url
            )));
        }
        serde_json::from_str(text).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ResourceClient for HttpResourceClient {
    fn descriptor(&self) -> &Arc<ResourceDescriptor> {
        &self.descriptor
    }

    async fn list(&self) -> Result<Vec<EntityRecord>, TransportError> {
        let text = self
            .execute(Method::GET, self.collection_url.clone(), None)
            .await?;
        decode_list(&self.descriptor, self.parse(&text)?)
    }

    async fn get(&self, id: EntityId) -> Result<EntityRecord, TransportError> {
        let text = self.execute(Method::GET, self.record_url(id), None).await?;
        decode_record(&self.descriptor, self.parse(&text)?)
    }

    async fn create(&self, record: &EntityRecord) -> Result<EntityRecord, TransportError> {
        let body = encode_record(&self.descriptor, &record.without_id());
        let text = self
            .execute(Method::POST, self.collection_url.clone(), Some(body))
            .await?;
        decode_record(&self.descriptor, self.parse(&text)?)
    }

    async fn update(
        &self,
        id: EntityId,
        record: &EntityRecord,
    ) -> Result<EntityRecord, TransportError> {
        let body = encode_record(&self.descriptor, &record.with_id(id));
        let text = self
            .execute(Method::PUT, self.record_url(id), Some(body))
            .await?;
        decode_record(&self.descriptor, self.parse(&text)?)
    }

    async fn delete(&self, id: EntityId) -> Result<(), TransportError> {
        self.execute(Method::DELETE, self.record_url(id), None)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base: &str) -> Result<HttpApi, ClientError> {
        let config = ConsoleConfig {
            api_base_url: base.to_string(),
            ..ConsoleConfig::default()
        };
        HttpApi::new(&config, Arc::new(Catalog::autodrive().unwrap()))
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let api = api("http://localhost:8080/api").unwrap();
        assert_eq!(api.base_url().as_str(), "http://localhost:8080/api/");
    }

    #[test]
    fn collection_and_record_urls() {
        let api = api("http://localhost:8080/").unwrap();
        let sales = api.resource("vendas").unwrap();
        assert_eq!(sales.collection_url(), "http://localhost:8080/vendas");
        assert_eq!(sales.record_url(EntityId(3)), "http://localhost:8080/vendas/3");
    }

    #[test]
    fn rejects_bad_base_urls() {
        assert!(matches!(
            api("not a url").unwrap_err(),
            ClientError::InvalidBaseUrl { .. }
        ));
        assert!(matches!(
            api("ftp://files.example/").unwrap_err(),
            ClientError::InvalidBaseUrl { .. }
        ));
    }

    #[test]
    fn unknown_resource_is_a_registry_error() {
        let api = api("http://localhost:8080/").unwrap();
        assert_eq!(
            api.client("clientes").err(),
            Some(RegistryError::UnknownResource("clientes".to_string()))
        );
    }

    #[test]
    fn empty_body_is_a_decode_error() {
        let api = api("http://localhost:8080/").unwrap();
        let sales = api.resource("vendas").unwrap();
        assert!(matches!(sales.parse("  "), Err(TransportError::Decode(_))));
        assert!(matches!(sales.parse("<html>"), Err(TransportError::Decode(_))));
    }
}
