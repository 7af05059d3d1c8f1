//! Body signatures for the evtix service and gateway APIs.
//!
//! Both the identity backend (service API) and the payment provider (gateway
//! callbacks) authenticate their requests with an HMAC-SHA256 over the raw
//! JSON body. The header carries the signing time and the MAC:
//!
//! ```text
//! Evtix-Signature: {unix_timestamp}.{base64_signature}
//! ```
//!
//! The signed message is `"{timestamp}.{json_body}"`. Each surface has its own
//! secret; a payload signed for one is rejected by the other.

/// Header name for the HMAC signature.
pub const SIGNATURE_HEADER: &str = "Evtix-Signature";

/// Header name for admin API authentication (plaintext secret).
pub const ADMIN_AUTH_HEADER: &str = "Evtix-Admin-Authorization";

/// Maximum allowed age of a signature (in seconds).
pub const MAX_SIGNATURE_AGE: i64 = 5 * 60;

/// How far in the future a signature timestamp may be before it is refused.
pub const MAX_CLOCK_SKEW: i64 = 60;

/// Marker trait for types that can travel as a signed body.
pub trait Signature: for<'de> serde::Deserialize<'de> + serde::Serialize {}

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid header format")]
    InvalidFormat,
    #[error("invalid base64 encoding")]
    InvalidBase64,
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid signature")]
    SignatureMismatch,
    #[error("signature expired")]
    Expired,
    #[error("signature timestamp is in the future")]
    FromTheFuture,
}

impl From<ring::error::Unspecified> for SignatureError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

/// A signed body: typed payload, signing time, the exact JSON that was
/// signed, and the raw MAC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedObject<T: Signature> {
    pub body: T,
    pub timestamp: i64,
    pub json: String,
    pub signature: Box<[u8]>,
}

impl<T: Signature> SignedObject<T> {
    /// Sign `body` with `key` at the current time.
    pub fn new(body: T, key: &[u8]) -> Result<Self, serde_json::Error> {
        Self::sign_at(body, key, time::OffsetDateTime::now_utc().unix_timestamp())
    }

    /// Sign `body` with `key` as if it were signed at `timestamp`.
    pub fn sign_at(body: T, key: &[u8], timestamp: i64) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(&body)?;
        let signature = mac(key, timestamp, &json);
        Ok(Self {
            body,
            timestamp,
            json,
            signature,
        })
    }

    /// Rebuild a [`SignedObject`] from a raw header value and the request body.
    ///
    /// Only parses; call [`verify`](Self::verify) to authenticate.
    pub fn from_header_and_body(
        header_value: &str,
        body_json: String,
    ) -> Result<Self, SignatureError> {
        let (timestamp, signature) = parse_signature_header(header_value)?;
        let body: T = serde_json::from_str(&body_json)?;
        Ok(Self {
            body,
            timestamp,
            json: body_json,
            signature,
        })
    }

    /// Check the MAC and the timestamp window, returning the authenticated
    /// payload.
    pub fn verify(self, key: &[u8]) -> Result<T, SignatureError> {
        let data = format!("{}.{}", self.timestamp, self.json);
        ring::hmac::verify(
            &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key),
            data.as_bytes(),
            self.signature.as_ref(),
        )?;
        check_timestamp(self.timestamp)?;
        Ok(self.body)
    }

    /// Full header value (`{timestamp}.{b64}`).
    pub fn to_header(&self) -> String {
        format_signature_header(self.timestamp, &self.signature)
    }
}

fn mac(key: &[u8], timestamp: i64, json: &str) -> Box<[u8]> {
    let data = format!("{timestamp}.{json}");
    let tag = ring::hmac::sign(
        &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key),
        data.as_bytes(),
    );
    tag.as_ref().to_owned().into_boxed_slice()
}

/// Split a `{timestamp}.{base64}` header value into its parts.
pub fn parse_signature_header(value: &str) -> Result<(i64, Box<[u8]>), SignatureError> {
    let (timestamp, encoded) = value.split_once('.').ok_or(SignatureError::InvalidFormat)?;
    let timestamp: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| SignatureError::InvalidFormat)?;
    let signature_bytes = fast32::base64::RFC4648_NOPAD
        .decode_str(encoded.trim())
        .map_err(|_| SignatureError::InvalidBase64)?
        .into_boxed_slice();
    Ok((timestamp, signature_bytes))
}

pub fn format_signature_header(timestamp: i64, signature: &[u8]) -> String {
    format!(
        "{}.{}",
        timestamp,
        fast32::base64::RFC4648_NOPAD.encode(signature)
    )
}

/// Reject timestamps older than [`MAX_SIGNATURE_AGE`] or further ahead than
/// [`MAX_CLOCK_SKEW`].
pub fn check_timestamp(timestamp: i64) -> Result<(), SignatureError> {
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    if now - timestamp > MAX_SIGNATURE_AGE {
        return Err(SignatureError::Expired);
    }
    if timestamp - now > MAX_CLOCK_SKEW {
        return Err(SignatureError::FromTheFuture);
    }
    Ok(())
}
