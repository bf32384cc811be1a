//! Sealed-box encryption for Actions secrets
//!
//! GitHub mandates that secret values are encrypted against the
//! repository's public key with libsodium's anonymous sealed-box
//! construction before upload. The plaintext never goes on the wire.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use crypto_box::aead::OsRng;
use crypto_box::PublicKey;

use crate::error::{DeployError, DeployResult};

/// Seal `plaintext` against the repository public key.
///
/// `public_key_b64` is the base64 key returned by the public-key
/// endpoint; the result is the base64 `encrypted_value` the secrets
/// endpoint expects.
pub fn seal_secret(public_key_b64: &str, plaintext: &str) -> DeployResult<String> {
    let key_bytes = BASE64
        .decode(public_key_b64)
        .map_err(|e| DeployError::provider(0, format!("invalid repository public key: {e}")))?;
    let key_bytes: [u8; 32] = key_bytes
        .try_into()
        .map_err(|_| DeployError::provider(0, "repository public key is not 32 bytes"))?;
    let public_key = PublicKey::from(key_bytes);

    let sealed = public_key
        .seal(&mut OsRng, plaintext.as_bytes())
        .map_err(|_| DeployError::provider(0, "sealed-box encryption failed"))?;

    Ok(BASE64.encode(sealed))
}
