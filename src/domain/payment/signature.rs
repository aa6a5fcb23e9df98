//! Gateway webhook signature verification.
//!
//! The gateway signs `timestamp + callback_url + raw_body` with RSA-SHA256
//! and sends the standard-base64 signature in `X-Signature`.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use jsonwebtoken::{crypto, Algorithm, DecodingKey};

use super::WebhookError;

const PEM_HEADER: &str = "-----BEGIN PUBLIC KEY-----";
const PEM_FOOTER: &str = "-----END PUBLIC KEY-----";

/// Verifier for gateway webhook signatures.
#[derive(Clone)]
pub struct WebhookSignatureVerifier {
    key: DecodingKey,
    callback_url: String,
}

impl std::fmt::Debug for WebhookSignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSignatureVerifier")
            .field("callback_url", &self.callback_url)
            .finish_non_exhaustive()
    }
}

impl WebhookSignatureVerifier {
    /// Creates a verifier from the gateway's public key (full PEM or the bare
    /// base64 body) and the exact callback URL registered with the gateway.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::InvalidKey` if the key cannot be parsed.
    pub fn new(public_key: &str, callback_url: impl Into<String>) -> Result<Self, WebhookError> {
        let pem = normalize_public_key(public_key);
        let key = DecodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| WebhookError::InvalidKey(e.to_string()))?;
        Ok(Self {
            key,
            callback_url: callback_url.into(),
        })
    }

    /// Verifies `signature` over the delivery.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::InvalidSignature` for undecodable or
    /// non-matching signatures.
    pub fn verify(&self, timestamp: &str, body: &[u8], signature: &str) -> Result<(), WebhookError> {
        let raw = STANDARD
            .decode(signature.trim())
            .or_else(|_| URL_SAFE_NO_PAD.decode(signature.trim().trim_end_matches('=')))
            .map_err(|_| WebhookError::InvalidSignature)?;
        let signature = URL_SAFE_NO_PAD.encode(raw);

        let message = self.signed_message(timestamp, body);
        match crypto::verify(&signature, &message, &self.key, Algorithm::RS256) {
            Ok(true) => Ok(()),
            _ => Err(WebhookError::InvalidSignature),
        }
    }

    fn signed_message(&self, timestamp: &str, body: &[u8]) -> Vec<u8> {
        let mut message =
            Vec::with_capacity(timestamp.len() + self.callback_url.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(self.callback_url.as_bytes());
        message.extend_from_slice(body);
        message
    }
}

/// Wraps a bare base64 key body in PEM armor. Escaped newlines from
/// single-line environment values are unescaped.
fn normalize_public_key(key: &str) -> String {
    let key = key.trim().replace("\\n", "\n");
    if key.contains("-----BEGIN") {
        return key;
    }

    let body: String = key.chars().filter(|c| !c.is_whitespace()).collect();
    let mut pem = String::with_capacity(body.len() + 80);
    pem.push_str(PEM_HEADER);
    pem.push('\n');
    for chunk in body.as_bytes().chunks(64) {
        pem.push_str(&String::from_utf8_lossy(chunk));
        pem.push('\n');
    }
    pem.push_str(PEM_FOOTER);
    pem
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::EncodingKey;

    const PRIVATE_KEY: &str = include_str!("../../../tests/fixtures/gateway_test_private.pem");
    const PUBLIC_KEY: &str = include_str!("../../../tests/fixtures/gateway_test_public.pem");
    const CALLBACK: &str = "https://lms.example.com/webhook/payment";

    fn sign(timestamp: &str, body: &[u8]) -> String {
        let mut message = Vec::new();
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(CALLBACK.as_bytes());
        message.extend_from_slice(body);
        let key = EncodingKey::from_rsa_pem(PRIVATE_KEY.as_bytes()).unwrap();
        let url_safe = crypto::sign(&message, &key, Algorithm::RS256).unwrap();
        STANDARD.encode(URL_SAFE_NO_PAD.decode(url_safe).unwrap())
    }

    fn bare_key_body() -> String {
        PUBLIC_KEY
            .lines()
            .filter(|line| !line.starts_with("-----"))
            .collect()
    }

    #[test]
    fn valid_signature_verifies() {
        let verifier = WebhookSignatureVerifier::new(PUBLIC_KEY, CALLBACK).unwrap();
        let body = br#"{"id":"pay_1","status":"success"}"#;
        let signature = sign("1700000000", body);
        assert!(verifier.verify("1700000000", body, &signature).is_ok());
    }

    #[test]
    fn bare_key_body_is_accepted() {
        let verifier = WebhookSignatureVerifier::new(&bare_key_body(), CALLBACK).unwrap();
        let body = b"{}";
        let signature = sign("1", body);
        assert!(verifier.verify("1", body, &signature).is_ok());
    }

    #[test]
    fn tampered_body_fails() {
        let verifier = WebhookSignatureVerifier::new(PUBLIC_KEY, CALLBACK).unwrap();
        let signature = sign("1700000000", br#"{"id":"pay_1","status":"failed"}"#);
        let result = verifier.verify("1700000000", br#"{"id":"pay_1","status":"success"}"#, &signature);
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn different_timestamp_fails() {
        let verifier = WebhookSignatureVerifier::new(PUBLIC_KEY, CALLBACK).unwrap();
        let body = b"{}";
        let signature = sign("1700000000", body);
        assert!(verifier.verify("1700000001", body, &signature).is_err());
    }

    #[test]
    fn different_callback_url_fails() {
        let verifier =
            WebhookSignatureVerifier::new(PUBLIC_KEY, "https://other.example.com/webhook/payment")
                .unwrap();
        let body = b"{}";
        let signature = sign("1", body);
        assert!(verifier.verify("1", body, &signature).is_err());
    }

    #[test]
    fn garbage_signature_fails() {
        let verifier = WebhookSignatureVerifier::new(PUBLIC_KEY, CALLBACK).unwrap();
        assert!(matches!(
            verifier.verify("1", b"{}", "%%%not-base64%%%"),
            Err(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn invalid_key_is_rejected() {
        assert!(matches!(
            WebhookSignatureVerifier::new("not a key", CALLBACK),
            Err(WebhookError::InvalidKey(_))
        ));
    }
}
