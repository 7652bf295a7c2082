//! Request body representations and the JSON body codec.

use bytes::Bytes;

use crate::{Form, Params, Result};

/// Content type for request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json`).
    Json,
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    FormUrlEncoded,
    /// UTF-8 plain text content type (`text/plain; charset=utf-8`).
    PlainText,
    /// Binary content type (`application/octet-stream`).
    OctetStream,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
            Self::PlainText => "text/plain; charset=utf-8",
            Self::OctetStream => "application/octet-stream",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single body representation held by a request descriptor.
///
/// Setting a body of one kind replaces a body of any other kind.
#[derive(Debug, Clone)]
pub enum Body {
    /// Plain text.
    Text(String),
    /// Already serialized JSON.
    Json(Bytes),
    /// URL-encoded form fields.
    Form(Params),
    /// `multipart/form-data` parts.
    Multipart(Form),
    /// Raw bytes with an optional content type.
    Bytes {
        /// Payload.
        data: Bytes,
        /// Content type, `application/octet-stream` when absent.
        content_type: Option<String>,
    },
}

impl Body {
    /// The `Content-Type` header value matching this body.
    #[must_use]
    pub fn content_type(&self) -> String {
        match self {
            Self::Text(_) => ContentType::PlainText.to_string(),
            Self::Json(_) => ContentType::Json.to_string(),
            Self::Form(_) => ContentType::FormUrlEncoded.to_string(),
            Self::Multipart(form) => form.content_type(),
            Self::Bytes { content_type, .. } => content_type
                .clone()
                .unwrap_or_else(|| ContentType::OctetStream.to_string()),
        }
    }

    /// Serialize into the bytes sent on the wire.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Text(text) => Bytes::from(text),
            Self::Json(data) | Self::Bytes { data, .. } => data,
            Self::Form(params) => Bytes::from(params.encode()),
            Self::Multipart(form) => form.into_body().1,
        }
    }
}

/// Serialize a value to JSON bytes.
///
/// # Errors
///
/// Returns [`Error::Encoding`](crate::Error::Encoding) if the value holds a
/// non-finite float, or an error if JSON serialization fails.
///
/// # Example
///
/// ```
/// use courier_core::to_json;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct User { name: String }
///
/// let user = User { name: "Alice".to_string() };
/// let bytes = to_json(&user).expect("serialize");
/// assert_eq!(bytes.as_ref(), br#"{"name":"Alice"}"#);
/// ```
pub fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    crate::finite::ensure_finite(value)?;
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Into::into)
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// # Errors
///
/// Returns an error if JSON deserialization fails, with the error message
/// including the path to the problematic field (e.g., "user.address.city").
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        crate::Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })
}
