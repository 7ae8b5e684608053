//! Company name to exchange symbol, memoized.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use lru::LruCache;
use reqwest::{header, Client};
use serde::Deserialize;
use url::Url;

const HOME: &str = "https://www.nseindia.com";
const AUTOCOMPLETE: &str = "https://www.nseindia.com/api/search/autocomplete";
pub const CACHE_CAPACITY: usize = 256;

#[async_trait]
pub trait SymbolLookup: Send + Sync {
    /// `Ok(None)` is a definitive "no such company"; `Err` is a transport
    /// failure worth asking again later.
    async fn lookup(&self, company: &str) -> Result<Option<String>>;
}

#[derive(Debug, Deserialize)]
struct AutocompleteResponse {
    #[serde(default)]
    symbols: Vec<AutocompleteSymbol>,
}

#[derive(Debug, Deserialize)]
struct AutocompleteSymbol {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    symbol_info: String,
}

fn pick_symbol(company: &str, resp: AutocompleteResponse) -> Option<String> {
    let needle = company.to_lowercase();
    resp.symbols
        .into_iter()
        .find(|s| s.symbol_info.to_lowercase().contains(&needle))
        .map(|s| s.symbol)
        .filter(|s| !s.is_empty())
}

/// Exchange autocomplete API. The site only answers once the homepage has
/// set its cookies, so the client keeps a cookie store.
pub struct NseSymbolLookup {
    http: Client,
}

impl NseSymbolLookup {
    pub fn new(user_agent: &str) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::REFERER, header::HeaderValue::from_static(HOME));
        let http = Client::builder()
            .cookie_store(true)
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl SymbolLookup for NseSymbolLookup {
    async fn lookup(&self, company: &str) -> Result<Option<String>> {
        self.http.get(HOME).send().await.context("prime cookies")?;
        let url = Url::parse_with_params(AUTOCOMPLETE, &[("q", company)])?;
        let resp = self.http.get(url).send().await.context("autocomplete request")?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let body: AutocompleteResponse = resp.json().await.context("decode autocomplete")?;
        Ok(pick_symbol(company, body))
    }
}

/// Bounded LRU in front of a lookup, keyed by trimmed lowercase name.
/// Answers (including "not found") are kept; errors are not.
pub struct SymbolCache<L> {
    inner: L,
    cache: Mutex<LruCache<String, Option<String>>>,
}

impl<L: SymbolLookup> SymbolCache<L> {
    pub fn new(inner: L, capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self { inner, cache: Mutex::new(LruCache::new(cap)) }
    }

    fn cached(&self, key: &str) -> Option<Option<String>> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.get(key).cloned()
    }

    pub async fn resolve(&self, company: &str) -> Option<String> {
        let key = company.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        if let Some(hit) = self.cached(&key) {
            return hit;
        }
        match self.inner.lookup(company.trim()).await {
            Ok(answer) => {
                self.cache.lock().unwrap_or_else(|e| e.into_inner()).put(key, answer.clone());
                answer
            }
            Err(e) => {
                tracing::warn!(company = %company, error = %format!("{e:#}"), "symbol lookup failed");
                None
            }
        }
    }
}
