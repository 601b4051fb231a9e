//! Integration tests for signing-key retrieval and token verification

mod common;

use std::time::Duration;

use common::{test_config, ProviderMock, TestClaims, TestKeyPair};
use dialdex_auth_core::{AuthError, KeyStore, TokenVerifier};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn verifier_for(provider: &ProviderMock) -> TokenVerifier {
    let config = test_config(&provider.url());
    let keys = KeyStore::new(config.clone());
    TokenVerifier::new(config, keys)
}

#[tokio::test]
async fn test_verify_valid_token() {
    let provider = ProviderMock::start().await;
    let verifier = verifier_for(&provider);

    let keypair = TestKeyPair::load();
    let config = test_config(&provider.url());
    let claims = TestClaims::valid(&config.issuer());
    let token = keypair.sign(&claims);

    let verified = verifier.verify(&token).await.expect("token should verify");
    assert_eq!(verified.sub, claims.sub);
    assert_eq!(verified.email.as_deref(), Some("alice@example.com"));
    assert_eq!(verified.preferred_username.as_deref(), Some("alice"));
    assert_eq!(verified.display_identity(), "alice");
    assert!(!verified.is_expired());
}

#[tokio::test]
async fn test_verify_valid_token_without_kid() {
    let provider = ProviderMock::start().await;
    let verifier = verifier_for(&provider);

    let keypair = TestKeyPair::load();
    let config = test_config(&provider.url());
    let token = keypair.sign_without_kid(&TestClaims::valid(&config.issuer()));

    // The first published RS256 key doubles as the key for unkeyed tokens
    let verified = verifier.verify(&token).await.expect("token should verify");
    assert_eq!(verified.preferred_username.as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_verify_expired_token() {
    let provider = ProviderMock::start().await;
    let verifier = verifier_for(&provider);

    let keypair = TestKeyPair::load();
    let config = test_config(&provider.url());
    let token = keypair.sign(&TestClaims::expired(&config.issuer()));

    let result = verifier.verify(&token).await;
    assert!(matches!(result, Err(AuthError::ExpiredToken)));
}

#[tokio::test]
async fn test_verify_wrong_issuer() {
    let provider = ProviderMock::start().await;
    let verifier = verifier_for(&provider);

    let keypair = TestKeyPair::load();
    let token = keypair.sign(&TestClaims::valid(
        "https://rogue.example.com/auth/realms/internal",
    ));

    let result = verifier.verify(&token).await;
    assert!(matches!(result, Err(AuthError::InvalidIssuer)));
}

#[tokio::test]
async fn test_verify_tampered_signature() {
    let provider = ProviderMock::start().await;
    let verifier = verifier_for(&provider);

    let keypair = TestKeyPair::load();
    let config = test_config(&provider.url());
    let issuer = config.issuer();

    // Splice the signature of one token onto the body of another
    let token_a = keypair.sign(&TestClaims::valid(&issuer));
    let token_b = keypair.sign(&TestClaims::valid(&issuer).with_sub("someone-else"));

    let body_a = token_a.rsplit_once('.').map(|(body, _)| body).expect("jwt");
    let sig_b = token_b.rsplit_once('.').map(|(_, sig)| sig).expect("jwt");
    let forged = format!("{body_a}.{sig_b}");

    let result = verifier.verify(&forged).await;
    assert!(matches!(result, Err(AuthError::InvalidSignature)));
}

#[tokio::test]
async fn test_verify_rejects_hs256_before_key_fetch() {
    // Bare server: any JWKS request would 404 into KeyFetchFailed, so the
    // UnexpectedAlgorithm result proves the algorithm gate fires first.
    let provider = ProviderMock::start_bare().await;
    let verifier = verifier_for(&provider);

    let config = test_config(&provider.url());
    let token = TestKeyPair::sign_hs256(&TestClaims::valid(&config.issuer()));

    let result = verifier.verify(&token).await;
    assert!(matches!(result, Err(AuthError::UnexpectedAlgorithm(alg)) if alg == "HS256"));
}

#[tokio::test]
async fn test_verify_garbage_token() {
    let provider = ProviderMock::start_bare().await;
    let verifier = verifier_for(&provider);

    let result = verifier.verify("not-a-jwt").await;
    assert!(matches!(result, Err(AuthError::MalformedToken)));
}

#[tokio::test]
async fn test_keys_cached_across_verifications() {
    let provider = ProviderMock::start_bare().await;
    let guard = provider.expect_jwks_calls(1).await;

    let verifier = verifier_for(&provider);
    verifier
        .key_store()
        .prefetch()
        .await
        .expect("prefetch should succeed");

    let keypair = TestKeyPair::load();
    let config = test_config(&provider.url());

    for _ in 0..3 {
        let token = keypair.sign(&TestClaims::valid(&config.issuer()));
        verifier.verify(&token).await.expect("token should verify");
    }

    drop(guard);
}

#[tokio::test]
async fn test_unknown_kid_rejected_without_refetch() {
    let provider = ProviderMock::start_bare().await;
    let guard = provider.expect_jwks_calls(1).await;

    let verifier = verifier_for(&provider);
    verifier
        .key_store()
        .prefetch()
        .await
        .expect("prefetch should succeed");

    let keypair = TestKeyPair::load();
    let config = test_config(&provider.url());
    let token = keypair.sign_with_kid(&TestClaims::valid(&config.issuer()), "rogue-kid");

    // The kid index is fresh, so the rogue kid never reaches the provider
    let result = verifier.verify(&token).await;
    assert!(matches!(result, Err(AuthError::UnknownKeyId(kid)) if kid == "rogue-kid"));

    drop(guard);
}

#[tokio::test]
async fn test_rotated_key_found_after_negative_window() {
    let provider = ProviderMock::start_bare().await;

    let old_jwks = serde_json::json!({
        "keys": [{
            "kid": "retired-key",
            "kty": "RSA",
            "alg": "RS256",
            "use": "sig",
            "n": common::jwks_mock::TEST_RSA_N,
            "e": common::jwks_mock::TEST_RSA_E
        }]
    });
    let new_jwks = serde_json::json!({ "keys": [common::jwks_mock::default_jwk()] });

    // First fetch sees only the retired key; every fetch after that sees the
    // rotated set.
    Mock::given(method("GET"))
        .and(path(common::jwks_mock::jwks_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(old_jwks))
        .up_to_n_times(1)
        .mount(provider.server())
        .await;
    Mock::given(method("GET"))
        .and(path(common::jwks_mock::jwks_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(new_jwks))
        .mount(provider.server())
        .await;

    let config = test_config(&provider.url()).with_jwks_negative_ttl(Duration::from_millis(200));
    let keys = KeyStore::new(config.clone());
    let verifier = TokenVerifier::new(config.clone(), keys);

    verifier
        .key_store()
        .prefetch()
        .await
        .expect("prefetch should succeed");

    let keypair = TestKeyPair::load();
    let token = keypair.sign(&TestClaims::valid(&config.issuer()));

    // Inside the negative window the new kid is still unknown
    let result = verifier.verify(&token).await;
    assert!(matches!(result, Err(AuthError::UnknownKeyId(_))));

    tokio::time::sleep(Duration::from_millis(300)).await;

    // Window expired: one lazy refetch picks up the rotated key
    let verified = verifier.verify(&token).await.expect("token should verify");
    assert_eq!(verified.preferred_username.as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_expired_key_cache_triggers_refetch() {
    let provider = ProviderMock::start_bare().await;
    let guard = provider.expect_jwks_calls(2).await;

    let config = test_config(&provider.url()).with_jwks_cache_ttl(Duration::from_millis(50));
    let keys = KeyStore::new(config.clone());
    let verifier = TokenVerifier::new(config.clone(), keys);

    verifier
        .key_store()
        .prefetch()
        .await
        .expect("prefetch should succeed");

    tokio::time::sleep(Duration::from_millis(80)).await;

    let keypair = TestKeyPair::load();
    let token = keypair.sign(&TestClaims::valid(&config.issuer()));
    verifier.verify(&token).await.expect("token should verify");

    drop(guard);
}

#[tokio::test]
async fn test_invalidate_drops_cached_keys() {
    let provider = ProviderMock::start_bare().await;
    let guard = provider.expect_jwks_calls(2).await;

    let verifier = verifier_for(&provider);
    verifier
        .key_store()
        .prefetch()
        .await
        .expect("prefetch should succeed");

    verifier.key_store().invalidate().await;

    let keypair = TestKeyPair::load();
    let config = test_config(&provider.url());
    let token = keypair.sign(&TestClaims::valid(&config.issuer()));
    verifier.verify(&token).await.expect("token should verify");

    drop(guard);
}

#[tokio::test]
async fn test_prefetch_fails_on_server_error() {
    let provider = ProviderMock::start_bare().await;
    provider.with_jwks_error(500).await;

    let keys = KeyStore::new(test_config(&provider.url()));
    let result = keys.prefetch().await;
    assert!(matches!(result, Err(AuthError::KeyFetchFailed(_))));
}

#[tokio::test]
async fn test_prefetch_fails_on_empty_key_set() {
    let provider = ProviderMock::start_bare().await;
    provider.with_custom_jwks(vec![]).await;

    let keys = KeyStore::new(test_config(&provider.url()));
    let result = keys.prefetch().await;
    assert!(matches!(result, Err(AuthError::KeySetEmpty)));
}

#[tokio::test]
async fn test_prefetch_fails_without_rs256_key() {
    let provider = ProviderMock::start_bare().await;
    provider
        .with_custom_jwks(vec![serde_json::json!({
            "kid": "ec-key",
            "kty": "EC",
            "alg": "ES256",
            "use": "sig",
            "n": "",
            "e": ""
        })])
        .await;

    let keys = KeyStore::new(test_config(&provider.url()));
    let result = keys.prefetch().await;
    assert!(matches!(result, Err(AuthError::NoMatchingKey)));
}

#[tokio::test]
async fn test_prefetch_fails_on_malformed_key_components() {
    let provider = ProviderMock::start_bare().await;
    provider
        .with_custom_jwks(vec![serde_json::json!({
            "kid": "broken-key",
            "kty": "RSA",
            "alg": "RS256",
            "use": "sig",
            "n": "!!!not-base64url!!!",
            "e": "AQAB"
        })])
        .await;

    let keys = KeyStore::new(test_config(&provider.url()));
    let result = keys.prefetch().await;
    assert!(matches!(result, Err(AuthError::MalformedKeyEncoding(_))));
}
