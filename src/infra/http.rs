//! HTTP adapters for event delivery and index fetch.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};

use crate::application::ports::{
    BeaconTransport, EventTransport, FetchError, IndexFetcher, TransportError,
};
use crate::domain::events::TrackingEvent;
use crate::domain::search::SearchDocument;

use super::error::InfraError;

/// Shared HTTP client with the crate's user agent.
pub fn build_client() -> Result<Client, InfraError> {
    Client::builder()
        .user_agent(concat!("brezza/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(InfraError::http)
}

/// Posts tracking events as JSON to the tracking endpoint. Any 2xx response
/// counts as delivered; the body is ignored.
pub struct HttpEventTransport {
    client: Client,
    endpoint: Url,
}

impl HttpEventTransport {
    pub fn new(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl EventTransport for HttpEventTransport {
    async fn deliver(&self, event: &TrackingEvent) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(event)
            .send()
            .await
            .map_err(|error| TransportError::Connection(error.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(TransportError::Status {
                status: response.status().as_u16(),
            })
        }
    }
}

/// Unload-safe analog of `navigator.sendBeacon`: the request is detached
/// onto the runtime and its outcome is never observed.
pub struct HttpBeaconTransport {
    client: Client,
    endpoint: Url,
}

impl HttpBeaconTransport {
    pub fn new(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

impl BeaconTransport for HttpBeaconTransport {
    fn send(&self, payload: Bytes) {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        tokio::spawn(async move {
            let _ = client
                .post(endpoint)
                .header(CONTENT_TYPE, "application/json")
                .body(payload)
                .send()
                .await;
        });
    }
}

/// Fetches the search index asset: a flat JSON array of documents.
pub struct HttpIndexFetcher {
    client: Client,
    url: Url,
}

impl HttpIndexFetcher {
    pub fn new(client: Client, url: Url) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl IndexFetcher for HttpIndexFetcher {
    async fn fetch(&self) -> Result<Vec<SearchDocument>, FetchError> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|error| FetchError::Fetch(error.to_string()))?;
        if !response.status().is_success() {
            return Err(FetchError::Fetch(format!(
                "unexpected status {}",
                response.status()
            )));
        }
        response
            .json::<Vec<SearchDocument>>()
            .await
            .map_err(|error| FetchError::Decode(error.to_string()))
    }
}
