//! Session middleware configuration.
//!
//! Sessions live in process memory (`MemoryStore`); a restart signs everyone
//! out and drops their cart snapshots, which the next cart fetch rebuilds.
//! The cookie is signed with a key derived from `STOREFRONT_SESSION_SECRET`.

use secrecy::ExposeSecret;
use sha2::{Digest, Sha512};
use tower_sessions::cookie::Key;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "agromat_session";

/// Session inactivity expiry in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Derive the 64-byte cookie signing key from the session secret.
fn signing_key(config: &StorefrontConfig) -> Result<Key, tower_sessions::cookie::KeyError> {
    let digest = Sha512::digest(config.session_secret.expose_secret().as_bytes());
    Key::try_from(digest.as_slice())
}

/// Create the session layer with an in-memory store.
///
/// # Errors
///
/// Returns an error if the signing key cannot be built.
pub fn create_session_layer(
    config: &StorefrontConfig,
) -> Result<SessionManagerLayer<MemoryStore, tower_sessions::service::SignedCookie>, tower_sessions::cookie::KeyError>
{
    let key = signing_key(config)?;

    Ok(SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_https())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(key))
}
