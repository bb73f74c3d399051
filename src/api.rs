// Catalog client: a small blocking HTTP client for the public fake store
// API the game takes its categories and products from.

use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://fakestoreapi.com";

/// One product as returned by the catalog. Extra fields such as `rating`
/// are ignored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Product {
    pub id: u64,
    pub title: String,
    pub price: f64,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
}

/// Where the game gets its choices from.
pub trait Catalog {
    fn categories(&self) -> Result<Vec<String>>;
    fn products_in_category(&self, category: &str) -> Result<Vec<Product>>;
}

/// Blocking client holding a reqwest client and the catalog's base URL.
#[derive(Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: Url,
}

impl CatalogClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid catalog URL: {}", base_url))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(CatalogClient { client, base_url })
    }

    /// `{base}/products/{segments...}`, with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Catalog URL cannot take a path: {}", self.base_url))?
            .pop_if_empty()
            .push("products")
            .extend(segments);
        Ok(url)
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T> {
        debug!(%url, "catalog request");
        let res = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Failed to send {} request", what))?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_default();
            bail!("{} request failed: {} - {}", what, status, txt);
        }
        res.json()
            .with_context(|| format!("Parsing {} response json", what))
    }
}

impl Catalog for CatalogClient {
    fn categories(&self) -> Result<Vec<String>> {
        let url = self.endpoint(&["categories"])?;
        self.get_json(url, "categories")
    }

    fn products_in_category(&self, category: &str) -> Result<Vec<Product>> {
        let url = self.endpoint(&["category", category])?;
        self.get_json(url, "products")
    }
}
