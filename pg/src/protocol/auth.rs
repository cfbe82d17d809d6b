//! SCRAM-SHA-256 client (RFC 5802 / RFC 7677).
//!
//! The exchange is three messages: client-first (our nonce), server-first
//! (combined nonce, salt, iteration count), client-final (proof). The
//! server's final message carries a signature we verify, so a
//! man-in-the-middle without the password cannot fake either side.
//!
//! Channel binding is not negotiated (`n,,` / `c=biws`): this client never
//! runs over TLS.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use rand::Rng as _;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 18;

/// Client side of one SCRAM-SHA-256 exchange.
///
/// State carried between steps: the client nonce, the client-first-bare
/// string, and after `process_server_first` the salted password and the
/// full auth message needed to check the server signature.
pub struct ScramClient {
    password: String,
    client_first_bare: String,
    client_nonce: String,
    salted_password: Option<[u8; 32]>,
    auth_message: Option<String>,
}

impl std::fmt::Debug for ScramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScramClient")
            .field("client_nonce", &self.client_nonce)
            .finish_non_exhaustive()
    }
}

impl ScramClient {
    pub fn new(user: &str, password: &str) -> Self {
        let raw: [u8; NONCE_LEN] = rand::rng().random();
        Self::with_nonce(user, password, &BASE64.encode(raw))
    }

    /// Fixed-nonce constructor, used by tests to replay known vectors.
    fn with_nonce(user: &str, password: &str, nonce: &str) -> Self {
        Self {
            password: password.to_string(),
            client_first_bare: format!("n={},r={}", user, nonce),
            client_nonce: nonce.to_string(),
            salted_password: None,
            auth_message: None,
        }
    }

    /// The SASLInitialResponse payload: `n,,` gs2 header plus
    /// client-first-bare.
    pub fn client_first_message(&self) -> Vec<u8> {
        format!("n,,{}", self.client_first_bare).into_bytes()
    }

    /// Consume the server-first message and produce the client-final
    /// payload carrying the proof.
    pub fn process_server_first(&mut self, data: &[u8]) -> Result<Vec<u8>, String> {
        let server_first = std::str::from_utf8(data)
            .map_err(|_| "server-first message is not UTF-8".to_string())?
            .to_string();

        let mut server_nonce = None;
        let mut salt = None;
        let mut iterations = None;
        for attr in server_first.split(',') {
            match attr.split_once('=') {
                Some(("r", v)) => server_nonce = Some(v.to_string()),
                Some(("s", v)) => {
                    salt = Some(
                        BASE64
                            .decode(v)
                            .map_err(|_| "invalid base64 salt".to_string())?,
                    );
                }
                Some(("i", v)) => {
                    iterations = Some(
                        v.parse::<u32>()
                            .map_err(|_| "invalid iteration count".to_string())?,
                    );
                }
                _ => {}
            }
        }
        let server_nonce = server_nonce.ok_or("server-first missing nonce")?;
        let salt = salt.ok_or("server-first missing salt")?;
        let iterations = iterations.ok_or("server-first missing iteration count")?;

        if !server_nonce.starts_with(&self.client_nonce) {
            return Err("server nonce does not extend client nonce".to_string());
        }

        let mut salted = [0u8; 32];
        pbkdf2::pbkdf2_hmac::<Sha256>(self.password.as_bytes(), &salt, iterations, &mut salted);

        let client_key = hmac_sha256(&salted, b"Client Key");
        let stored_key: [u8; 32] = Sha256::digest(client_key).into();

        let without_proof = format!("c=biws,r={}", server_nonce);
        let auth_message = format!(
            "{},{},{}",
            self.client_first_bare, server_first, without_proof
        );
        let client_signature = hmac_sha256(&stored_key, auth_message.as_bytes());

        let mut proof = client_key;
        for (p, s) in proof.iter_mut().zip(client_signature) {
            *p ^= s;
        }

        self.salted_password = Some(salted);
        self.auth_message = Some(auth_message);

        Ok(format!("{},p={}", without_proof, BASE64.encode(proof)).into_bytes())
    }

    /// Check the server's `v=` signature from the final SASL message.
    pub fn verify_server_final(&self, data: &[u8]) -> Result<(), String> {
        let server_final =
            std::str::from_utf8(data).map_err(|_| "server-final message is not UTF-8".to_string())?;

        if let Some(err) = server_final.strip_prefix("e=") {
            return Err(format!("server rejected authentication: {}", err));
        }
        let verifier = server_final
            .strip_prefix("v=")
            .ok_or("server-final missing verifier")?;
        let verifier = BASE64
            .decode(verifier)
            .map_err(|_| "invalid base64 verifier".to_string())?;

        let salted = self
            .salted_password
            .ok_or("server-final received before server-first")?;
        let auth_message = self
            .auth_message
            .as_ref()
            .ok_or("server-final received before server-first")?;

        let server_key = hmac_sha256(&salted, b"Server Key");
        let expected = hmac_sha256(&server_key, auth_message.as_bytes());
        if expected[..] != verifier[..] {
            return Err("server signature mismatch".to_string());
        }
        Ok(())
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}
