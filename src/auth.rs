//! Admin session handling. Successful login sets a cookie holding an
//! HMAC-SHA256 tag over a fixed session label, keyed by the configured
//! secret. Verification recomputes the tag; there is no server-side session
//! state.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::AdminConfig;

type HmacSha256 = Hmac<Sha256>;

pub const ADMIN_COOKIE: &str = "biocat_admin";

const SESSION_LABEL: &[u8] = b"admin";

/// The cookie value for an authenticated admin session.
pub fn sign_session(secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(SESSION_LABEL);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a presented cookie value.
pub fn verify_session(secret: &str, token: &str) -> bool {
    let Ok(raw) = hex::decode(token) else {
        return false;
    };
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(SESSION_LABEL);
    mac.verify_slice(&raw).is_ok()
}

pub fn verify_credentials(admin: &AdminConfig, username: &str, password: &str) -> bool {
    admin.username == username && admin.password == password
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_session_verifies() {
        let token = sign_session("test-secret");
        assert!(verify_session("test-secret", &token));
    }

    #[test]
    fn wrong_secret_fails() {
        let token = sign_session("test-secret");
        assert!(!verify_session("other-secret", &token));
    }

    #[test]
    fn tampered_token_fails() {
        let mut token = sign_session("test-secret");
        let flipped = if token.ends_with('0') { '1' } else { '0' };
        token.pop();
        token.push(flipped);
        assert!(!verify_session("test-secret", &token));
        assert!(!verify_session("test-secret", "not-hex!"));
    }

    #[test]
    fn credential_check() {
        let admin = AdminConfig {
            username: "admin".into(),
            password: "pw".into(),
        };
        assert!(verify_credentials(&admin, "admin", "pw"));
        assert!(!verify_credentials(&admin, "admin", "wrong"));
        assert!(!verify_credentials(&admin, "root", "pw"));
    }
}
