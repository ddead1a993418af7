//! Remote API collaborator: listing pages, per-item detail payloads and an HTTP implementation.

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::LabError;

use super::cancel::CancelToken;

/// Base URL of the public PokeAPI.
pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";

/// Lightweight reference to one item in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemRef {
    pub name: String,
    pub url: String,
}

/// One page of the listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListingPage {
    /// Total number of items across all pages.
    pub count: usize,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub results: Vec<ItemRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct NamedResource {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Sprites {
    #[serde(default)]
    pub front_default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TypeSlot {
    #[serde(rename = "type")]
    pub kind: NamedResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatEntry {
    pub base_stat: i64,
    pub stat: NamedResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AbilitySlot {
    pub ability: NamedResource,
}

/// Detail payload for a single item, reduced to the fields rows are built from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DetailPayload {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub sprites: Sprites,
    #[serde(default)]
    pub types: Vec<TypeSlot>,
    #[serde(default)]
    pub stats: Vec<StatEntry>,
    #[serde(default)]
    pub abilities: Vec<AbilitySlot>,
}

/// Failure of a single transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The call was abandoned because the cancel token fired.
    Cancelled,
    /// The call failed; `status` is set when the server answered.
    Failed { status: Option<u16>, message: String },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Cancelled => f.write_str("cancelled"),
            TransportError::Failed { message, .. } => f.write_str(message),
        }
    }
}

impl std::error::Error for TransportError {}

impl TransportError {
    /// Convert a failure into the crate error. Returns `None` for cancellation.
    pub fn into_lab_error(self) -> Option<LabError> {
        match self {
            TransportError::Cancelled => None,
            TransportError::Failed { status, message } => Some(LabError::Fetch { status, message }),
        }
    }
}

/// Source of listing pages and detail payloads.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Human-readable description of the remote, used in observer events.
    fn describe(&self) -> String;

    /// Fetch the listing page starting at `offset`.
    async fn fetch_listing(&self, offset: usize, limit: usize) -> Result<ListingPage, TransportError>;

    /// Fetch the detail payload for `item`, giving up early if `cancel` fires.
    async fn fetch_detail(&self, item: &ItemRef, cancel: &CancelToken) -> Result<DetailPayload, TransportError>;
}

/// [`Transport`] over HTTP using `reqwest`.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Use a preconfigured client (timeouts, proxies, ...).
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn listing_url(&self, offset: usize, limit: usize) -> String {
        format!("{}/pokemon?offset={offset}&limit={limit}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T, TransportError> {
        let response = self
            .client
            .get(url)
            .header("Cache-Control", "no-store")
            .send()
            .await
            .map_err(|e| TransportError::Failed {
                status: e.status().map(|s| s.as_u16()),
                message: format!("{what} fetch failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Failed {
                status: Some(status.as_u16()),
                message: format!("{what} fetch failed: {}", status.as_u16()),
            });
        }

        response.json::<T>().await.map_err(|e| TransportError::Failed {
            status: Some(status.as_u16()),
            message: format!("{what} response invalid: {e}"),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn describe(&self) -> String {
        self.base_url.clone()
    }

    async fn fetch_listing(&self, offset: usize, limit: usize) -> Result<ListingPage, TransportError> {
        let url = self.listing_url(offset, limit);
        self.get_json(&url, "List").await
    }

    async fn fetch_detail(&self, item: &ItemRef, cancel: &CancelToken) -> Result<DetailPayload, TransportError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            res = self.get_json(&item.url, "Pokemon") => res,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DetailPayload, HttpTransport, ListingPage, TransportError};
    use crate::error::LabError;

    #[test]
    fn listing_url_uses_offset_and_limit() {
        let t = HttpTransport::new("https://example.test/api/v2/");
        assert_eq!(
            t.listing_url(200, 100),
            "https://example.test/api/v2/pokemon?offset=200&limit=100"
        );
    }

    #[test]
    fn decodes_listing_and_detail_payloads() {
        let page: ListingPage = serde_json::from_str(
            r#"{"count":1302,"next":"https://pokeapi.co/api/v2/pokemon?offset=2&limit=2","previous":null,
               "results":[{"name":"bulbasaur","url":"https://pokeapi.co/api/v2/pokemon/1/"},
                          {"name":"ivysaur","url":"https://pokeapi.co/api/v2/pokemon/2/"}]}"#,
        )
        .unwrap();
        assert_eq!(page.count, 1302);
        assert_eq!(page.results[1].name, "ivysaur");

        let detail: DetailPayload = serde_json::from_str(
            r#"{"id":1,"name":"bulbasaur","height":7,
               "sprites":{"front_default":null,"back_default":null},
               "types":[{"slot":1,"type":{"name":"grass","url":""}}],
               "stats":[{"base_stat":45,"effort":0,"stat":{"name":"hp","url":""}}],
               "abilities":[{"ability":{"name":"overgrow","url":""},"is_hidden":false,"slot":1}]}"#,
        )
        .unwrap();
        assert_eq!(detail.sprites.front_default, None);
        assert_eq!(detail.types[0].kind.name, "grass");
        assert_eq!(detail.stats[0].base_stat, 45);
    }

    #[test]
    fn cancellation_is_not_a_lab_error() {
        assert!(TransportError::Cancelled.into_lab_error().is_none());
        let err = TransportError::Failed {
            status: Some(500),
            message: "List fetch failed: 500".to_string(),
        }
        .into_lab_error();
        assert!(matches!(err, Some(LabError::Fetch { status: Some(500), .. })));
    }
}
