//! Signature algorithms used by the storefront.
//!
//! Three schemes live here:
//!
//! * **User tokens**: `Authorization: Bearer {user_id}.{timestamp}.{base64_signature}`
//!   where the signature is `HMAC-SHA256("{user_id}.{timestamp}", secret)`.
//!
//! * **WeChat Pay v2** (`sign_type=HMAC-SHA256`): parameters sorted by key,
//!   empty values and `sign` dropped, joined as `k=v&...&key={api_key}`,
//!   HMAC-SHA256 keyed with the API key, upper-case hex.
//!
//! * **Alipay RSA2**: parameters sorted by key, `sign`, `sign_type` and empty
//!   values dropped, joined as `k=v&...`, RSASSA-PKCS1-v1_5 with SHA-256,
//!   standard base64.

use std::collections::BTreeMap;

use rsa::RsaPublicKey;
use rsa::pkcs1::{DecodeRsaPublicKey, EncodeRsaPublicKey};
use rsa::pkcs8::DecodePublicKey;

/// Prefix of the `Authorization` header value.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Errors produced by signature operations.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid token format")]
    InvalidFormat,
    #[error("invalid base64 encoding")]
    InvalidBase64,
    #[error("invalid hex encoding")]
    InvalidHex,
    #[error("missing sign field")]
    MissingSign,
    #[error("invalid signature")]
    SignatureMismatch,
    #[error("signature expired")]
    Expired,
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

impl From<ring::error::Unspecified> for SignatureError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> ring::hmac::Tag {
    ring::hmac::sign(&ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key), data)
}

// ---------------------------------------------------------------------------
// User tokens
// ---------------------------------------------------------------------------

/// Issue a user token stamped with the current time.
pub fn sign_user_token(user_id: i64, key: &[u8]) -> String {
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    sign_user_token_at(user_id, now, key)
}

/// Issue a user token stamped with `timestamp`.
pub fn sign_user_token_at(user_id: i64, timestamp: i64, key: &[u8]) -> String {
    let data = format!("{user_id}.{timestamp}");
    let tag = hmac_sha256(key, data.as_bytes());
    format!(
        "{data}.{}",
        fast32::base64::RFC4648_NOPAD.encode(tag.as_ref())
    )
}

/// Verify a user token and return the user id it was issued for.
///
/// Tokens older than `ttl_secs` are rejected.
pub fn verify_user_token(token: &str, key: &[u8], ttl_secs: i64) -> Result<i64, SignatureError> {
    let mut parts = token.splitn(3, '.');
    let (Some(user_part), Some(ts_part), Some(sig_part)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return Err(SignatureError::InvalidFormat);
    };
    let user_id: i64 = user_part
        .parse()
        .map_err(|_| SignatureError::InvalidFormat)?;
    let timestamp: i64 = ts_part.parse().map_err(|_| SignatureError::InvalidFormat)?;
    let signature = fast32::base64::RFC4648_NOPAD
        .decode_str(sig_part)
        .map_err(|_| SignatureError::InvalidBase64)?;

    let data = format!("{user_id}.{timestamp}");
    ring::hmac::verify(
        &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key),
        data.as_bytes(),
        &signature,
    )?;

    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    if now - timestamp > ttl_secs {
        return Err(SignatureError::Expired);
    }
    Ok(user_id)
}

// ---------------------------------------------------------------------------
// WeChat Pay v2
// ---------------------------------------------------------------------------

/// Compute the WeChat Pay HMAC-SHA256 `sign` for a parameter set.
pub fn wechat_sign(params: &BTreeMap<String, String>, api_key: &str) -> String {
    let tag = hmac_sha256(
        api_key.as_bytes(),
        wechat_sign_content(params, api_key).as_bytes(),
    );
    hex::encode_upper(tag.as_ref())
}

/// Verify the `sign` field of a WeChat Pay parameter set.
pub fn wechat_verify(
    params: &BTreeMap<String, String>,
    api_key: &str,
) -> Result<(), SignatureError> {
    let sign = params.get("sign").ok_or(SignatureError::MissingSign)?;
    let expected = hex::decode(sign).map_err(|_| SignatureError::InvalidHex)?;
    ring::hmac::verify(
        &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, api_key.as_bytes()),
        wechat_sign_content(params, api_key).as_bytes(),
        &expected,
    )?;
    Ok(())
}

fn wechat_sign_content(params: &BTreeMap<String, String>, api_key: &str) -> String {
    let mut content = join_sorted(params, &["sign"]);
    if !content.is_empty() {
        content.push('&');
    }
    content.push_str("key=");
    content.push_str(api_key);
    content
}

// ---------------------------------------------------------------------------
// Alipay RSA2
// ---------------------------------------------------------------------------

/// The string Alipay signs for a parameter set.
pub fn alipay_sign_content(params: &BTreeMap<String, String>) -> String {
    join_sorted(params, &["sign", "sign_type"])
}

/// Sign a parameter set with a PKCS#8 DER RSA private key.
pub fn alipay_sign(
    params: &BTreeMap<String, String>,
    private_key_pkcs8: &[u8],
) -> Result<String, SignatureError> {
    let key_pair = ring::signature::RsaKeyPair::from_pkcs8(private_key_pkcs8)
        .map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
    let rng = ring::rand::SystemRandom::new();
    let mut signature = vec![0u8; key_pair.public().modulus_len()];
    key_pair.sign(
        &ring::signature::RSA_PKCS1_SHA256,
        &rng,
        alipay_sign_content(params).as_bytes(),
        &mut signature,
    )?;
    Ok(fast32::base64::RFC4648.encode(&signature))
}

/// Verify the `sign` field of an Alipay parameter set.
///
/// `public_key_der` may be either a SubjectPublicKeyInfo (the format Alipay
/// publishes) or a bare PKCS#1 `RSAPublicKey`.
pub fn alipay_verify(
    params: &BTreeMap<String, String>,
    public_key_der: &[u8],
) -> Result<(), SignatureError> {
    let sign = params.get("sign").ok_or(SignatureError::MissingSign)?;
    let signature = fast32::base64::RFC4648
        .decode_str(sign)
        .map_err(|_| SignatureError::InvalidBase64)?;
    let rsa_key = rsa_public_key_pkcs1(public_key_der)?;
    ring::signature::UnparsedPublicKey::new(&ring::signature::RSA_PKCS1_2048_8192_SHA256, &rsa_key)
        .verify(alipay_sign_content(params).as_bytes(), &signature)?;
    Ok(())
}

/// Decode a padded standard base64 key as found in configuration files.
pub fn decode_base64_key(encoded: &str) -> Result<Vec<u8>, SignatureError> {
    let compact: String = encoded.split_whitespace().collect();
    fast32::base64::RFC4648
        .decode_str(&compact)
        .map_err(|_| SignatureError::InvalidBase64)
}

/// Check that a PKCS#8 DER blob is a usable RSA private key.
pub fn check_rsa_private_key(private_key_pkcs8: &[u8]) -> Result<(), SignatureError> {
    ring::signature::RsaKeyPair::from_pkcs8(private_key_pkcs8)
        .map(|_| ())
        .map_err(|e| SignatureError::InvalidKey(e.to_string()))
}

/// Check that a DER blob is an RSA public key in SPKI or PKCS#1 form.
pub fn check_rsa_public_key(public_key_der: &[u8]) -> Result<(), SignatureError> {
    rsa_public_key_pkcs1(public_key_der).map(|_| ())
}

/// Re-encode an SPKI or PKCS#1 RSA public key as the PKCS#1 `RSAPublicKey`
/// that `ring` verifies with.
fn rsa_public_key_pkcs1(der: &[u8]) -> Result<Vec<u8>, SignatureError> {
    let key = RsaPublicKey::from_public_key_der(der)
        .or_else(|_| RsaPublicKey::from_pkcs1_der(der))
        .map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
    let pkcs1 = key
        .to_pkcs1_der()
        .map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
    Ok(pkcs1.as_bytes().to_vec())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn join_sorted(params: &BTreeMap<String, String>, excluded: &[&str]) -> String {
    params
        .iter()
        .filter(|(k, v)| !v.is_empty() && !excluded.contains(&k.as_str()))
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}
