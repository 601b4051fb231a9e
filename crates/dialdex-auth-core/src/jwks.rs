//! JWKS retrieval and signing-key caching

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::DecodingKey;
use moka::future::Cache;
use serde::Deserialize;

use crate::{AuthError, OidcConfig};

/// Cache slot for tokens that carry no kid header: the first RS256 key from
/// the most recent fetch is mirrored under this slot.
const DEFAULT_KEY_SLOT: &str = "";

/// Single entry key for the kid index cache
const KID_INDEX_KEY: &str = "kids";

/// JWKS (JSON Web Key Set) document as published by the realm
#[derive(Debug, Clone, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

/// Individual JWK
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    #[serde(default)]
    pub kid: String,
    pub kty: String,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(rename = "use", default)]
    pub use_: Option<String>,
    pub n: String,
    pub e: String,
}

impl Jwk {
    fn is_rs256(&self) -> bool {
        self.alg.as_deref() == Some("RS256")
    }
}

/// Signing-key store with kid-keyed caching
///
/// Security properties:
/// - Caches decoding keys per kid so verification normally never touches the
///   network.
/// - Keeps a short-lived index of published kids; an unknown kid inside that
///   window is rejected without a re-fetch, so attacker-chosen kids cannot
///   flood the provider.
/// - After the index expires, one lazy re-fetch picks up rotated keys.
#[derive(Clone)]
pub struct KeyStore {
    config: OidcConfig,
    http_client: reqwest::Client,
    /// kid -> decoding key (plus the default slot for unkeyed tokens)
    key_cache: Cache<String, Arc<DecodingKey>>,
    /// Published kids from the most recent fetch; its TTL is the
    /// negative-cache window for unknown kids
    kid_index: Cache<String, Arc<Vec<String>>>,
}

impl KeyStore {
    /// Create a new key store with a tuned HTTP client
    ///
    /// The client fails fast: 5s connect timeout, 10s request timeout, and a
    /// small connection pool since the provider is a single host.
    pub fn new(config: OidcConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(2)
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self::with_client(config, http_client)
    }

    /// Create a key store with a custom HTTP client
    pub fn with_client(config: OidcConfig, http_client: reqwest::Client) -> Self {
        let key_ttl = config.jwks_cache_ttl;
        let negative_ttl = config.jwks_negative_ttl;

        Self {
            config,
            http_client,
            key_cache: Cache::builder()
                .time_to_live(key_ttl)
                .max_capacity(100)
                .build(),
            kid_index: Cache::builder()
                .time_to_live(negative_ttl)
                .max_capacity(1)
                .build(),
        }
    }

    /// Fetch and cache the key set once, gating startup readiness
    ///
    /// Call this before binding the listener; any error here means the
    /// process cannot verify a single token and must not serve.
    pub async fn prefetch(&self) -> Result<(), AuthError> {
        self.refresh().await
    }

    /// Resolve the decoding key for a token header
    pub(crate) async fn decoding_key(&self, kid: Option<&str>) -> Result<Arc<DecodingKey>, AuthError> {
        let slot = kid.unwrap_or(DEFAULT_KEY_SLOT);

        if let Some(key) = self.key_cache.get(slot).await {
            return Ok(key);
        }

        // Unknown kid inside a fresh index: reject without touching the
        // provider. Tokens without a kid always go through refresh when the
        // default slot has expired.
        if let Some(k) = kid {
            if let Some(known) = self.kid_index.get(KID_INDEX_KEY).await {
                if !known.iter().any(|id| id == k) {
                    tracing::debug!(kid = %k, "unknown key id rejected without refetch");
                    return Err(AuthError::UnknownKeyId(k.to_string()));
                }
            }
        }

        self.refresh().await?;

        match self.key_cache.get(slot).await {
            Some(key) => Ok(key),
            None => match kid {
                Some(k) => {
                    tracing::debug!(kid = %k, "key id not present after refresh");
                    Err(AuthError::UnknownKeyId(k.to_string()))
                }
                None => Err(AuthError::NoMatchingKey),
            },
        }
    }

    /// Fetch the JWKS and repopulate both caches
    async fn refresh(&self) -> Result<(), AuthError> {
        let jwks = self.fetch_jwks().await?;

        if jwks.keys.is_empty() {
            return Err(AuthError::KeySetEmpty);
        }

        let mut kids = Vec::new();
        let mut default_filled = false;

        for jwk in jwks.keys.iter().filter(|k| k.is_rs256()) {
            let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e).map_err(|e| {
                tracing::error!(kid = %jwk.kid, "failed to decode key components: {}", e);
                AuthError::MalformedKeyEncoding(e.to_string())
            })?;
            let key = Arc::new(key);

            kids.push(jwk.kid.clone());
            self.key_cache.insert(jwk.kid.clone(), key.clone()).await;

            if !default_filled {
                self.key_cache
                    .insert(DEFAULT_KEY_SLOT.to_string(), key)
                    .await;
                default_filled = true;
            }
        }

        if kids.is_empty() {
            return Err(AuthError::NoMatchingKey);
        }

        tracing::debug!(count = kids.len(), "signing keys refreshed");

        self.kid_index
            .insert(KID_INDEX_KEY.to_string(), Arc::new(kids))
            .await;

        Ok(())
    }

    /// Fetch the JWKS document from the provider
    async fn fetch_jwks(&self) -> Result<Jwks, AuthError> {
        let url = self.config.jwks_url();
        tracing::debug!("fetching JWKS from {}", url);

        let response = self
            .http_client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("failed to fetch JWKS: {}", e);
                AuthError::KeyFetchFailed(e.to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!("JWKS fetch returned status {}", response.status());
            return Err(AuthError::KeyFetchFailed(format!(
                "status {}",
                response.status()
            )));
        }

        response.json::<Jwks>().await.map_err(|e| {
            tracing::error!("failed to parse JWKS: {}", e);
            AuthError::KeyFetchFailed(format!("parse: {e}"))
        })
    }

    /// Drop all cached keys, forcing a fetch on the next verification
    pub async fn invalidate(&self) {
        self.key_cache.invalidate_all();
        self.kid_index.invalidate_all();
    }
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("jwks_url", &self.config.jwks_url())
            .finish_non_exhaustive()
    }
}
