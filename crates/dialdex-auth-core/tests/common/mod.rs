//! Common test utilities for dialdex-auth-core integration tests

pub mod jwks_mock;

#[allow(unused_imports)]
pub use jwks_mock::{ProviderMock, TestClaims, TestKeyPair};

use dialdex_auth_core::OidcConfig;

/// Build an OidcConfig pointing at a mock provider
pub fn test_config(provider_base: &str) -> OidcConfig {
    OidcConfig::try_new(
        provider_base,
        jwks_mock::TEST_REALM,
        jwks_mock::TEST_CLIENT_ID,
        jwks_mock::TEST_CLIENT_SECRET,
        "http://localhost:3000",
        "0123456789abcdef0123456789abcdef",
    )
    .expect("valid test config")
}
