//! Provider credentials, loaded at most once per process.
//!
//! [`SecretCache`] memoizes a [`SecretSource`] with "init once, never
//! invalidate" semantics. Concurrent first callers share a single load; a
//! failed load is not cached, so the next caller tries again.

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tokio::sync::OnceCell;

use crate::error::{ErrorReport, ErrorType};
use crate::runtime::{Runtime, optional_var};

pub const LLM_KEY_VAR: &str = "OPENAI_API_KEY";
pub const QUOTES_KEY_VAR: &str = "QUOTES_API_KEY";
pub const IMAGES_KEY_VAR: &str = "UNSPLASH_ACCESS_KEY";

/// API keys for the three providers. Any of them may be absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderKeys {
    pub llm: Option<String>,
    pub quotes: Option<String>,
    pub images: Option<String>,
}

impl fmt::Debug for ProviderKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderKeys")
            .field("llm", &mask(self.llm.as_deref()))
            .field("quotes", &mask(self.quotes.as_deref()))
            .field("images", &mask(self.images.as_deref()))
            .finish()
    }
}

/// Shows the first and last four characters of a key, like `sk-p*********3xYz`.
fn mask(key: Option<&str>) -> String {
    match key {
        None => "<unset>".to_string(),
        Some(k) if k.chars().count() <= 12 => "*********".to_string(),
        Some(k) => {
            let head: String = k.chars().take(4).collect();
            let tail: String = k.chars().skip(k.chars().count() - 4).collect();
            format!("{}*********{}", head, tail)
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecretSource: Send + Sync {
    async fn load(&self) -> Result<ProviderKeys>;
}

/// Reads provider keys from environment variables.
pub struct EnvSecretSource<R: Runtime> {
    runtime: R,
}

impl<R: Runtime> EnvSecretSource<R> {
    pub fn new(runtime: R) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl<R: Runtime> SecretSource for EnvSecretSource<R> {
    async fn load(&self) -> Result<ProviderKeys> {
        Ok(ProviderKeys {
            llm: optional_var(&self.runtime, LLM_KEY_VAR),
            quotes: optional_var(&self.runtime, QUOTES_KEY_VAR),
            images: optional_var(&self.runtime, IMAGES_KEY_VAR),
        })
    }
}

/// Lazily-initialized, single-flight key cache.
#[derive(Default)]
pub struct SecretCache {
    keys: OnceCell<ProviderKeys>,
}

impl SecretCache {
    pub const fn new() -> Self {
        Self {
            keys: OnceCell::const_new(),
        }
    }

    /// Returns the cached keys, loading them from `source` on first use.
    pub async fn get_or_load(&self, source: &dyn SecretSource) -> Result<&ProviderKeys, ErrorReport> {
        self.keys
            .get_or_try_init(|| async {
                debug!("Loading provider keys...");
                let keys = source.load().await.map_err(|e| {
                    ErrorReport::new(ErrorType::ConfigurationError, "Failed to load provider keys")
                        .with_message(format!("{:#}", e))
                })?;
                info!("Loaded provider keys: {:?}", keys);
                Ok::<_, ErrorReport>(keys)
            })
            .await
    }

    pub fn is_loaded(&self) -> bool {
        self.keys.initialized()
    }
}

static PROCESS_CACHE: OnceLock<Arc<SecretCache>> = OnceLock::new();

/// The process-wide cache shared by every handler.
pub fn process_cache() -> Arc<SecretCache> {
    PROCESS_CACHE
        .get_or_init(|| Arc::new(SecretCache::new()))
        .clone()
}

/// A cache paired with the source that fills it; what adapters hold.
#[derive(Clone)]
pub struct Credentials {
    cache: Arc<SecretCache>,
    source: Arc<dyn SecretSource>,
}

impl Credentials {
    pub fn new(cache: Arc<SecretCache>, source: Arc<dyn SecretSource>) -> Self {
        Self { cache, source }
    }

    /// Credentials backed by a fixed set of keys.
    pub fn fixed(keys: ProviderKeys) -> Self {
        Self::new(Arc::new(SecretCache::new()), Arc::new(FixedSource(keys)))
    }

    pub async fn keys(&self) -> Result<&ProviderKeys, ErrorReport> {
        self.cache.get_or_load(self.source.as_ref()).await
    }
}

struct FixedSource(ProviderKeys);

#[async_trait]
impl SecretSource for FixedSource {
    async fn load(&self) -> Result<ProviderKeys> {
        Ok(self.0.clone())
    }
}
