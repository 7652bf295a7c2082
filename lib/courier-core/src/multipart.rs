//! `multipart/form-data` encoding and parsing.
//!
//! # Example
//!
//! ```
//! use courier_core::{Form, Part};
//!
//! let form = Form::with_boundary("b")
//!     .part(Part::new("name", "John Doe"))
//!     .part(Part::file("avatar", "photo.jpg", vec![0xFF, 0xD8]));
//!
//! let (content_type, body) = form.into_body();
//! let parsed = Form::parse(&content_type, &body).expect("well-formed body");
//! assert_eq!(parsed.parts()[1].filename(), Some("photo.jpg"));
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Error, Result};

/// A single part in a multipart form.
///
/// The part is written with a `Content-Disposition: form-data` header carrying
/// its name (and file name for files), plus an optional `Content-Type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl Part {
    /// Create a part without content type.
    #[must_use]
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            data: data.into(),
        }
    }

    /// Create a part holding a JSON-serialized value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized.
    pub fn json<T: serde::Serialize + ?Sized>(name: impl Into<String>, value: &T) -> Result<Self> {
        Ok(Self::new(name, crate::to_json(value)?))
    }

    /// Create a file part.
    ///
    /// The content type is guessed from the file extension, falling back to
    /// `application/octet-stream`.
    #[must_use]
    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let filename = filename.into();
        let content_type = guess_content_type(&filename);
        Self {
            name: name.into(),
            filename: Some(filename),
            content_type: Some(content_type.to_string()),
            data: data.into(),
        }
    }

    /// Set the content type for this part.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Get the part name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the filename, if set.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Get the content type, if set.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Get the part data.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    fn write_to(&self, buf: &mut BytesMut) {
        buf.put_slice(b"Content-Disposition: form-data; name=\"");
        buf.put_slice(escape_quoted(&self.name).as_bytes());
        buf.put_slice(b"\"");
        if let Some(filename) = &self.filename {
            buf.put_slice(b"; filename=\"");
            buf.put_slice(escape_quoted(filename).as_bytes());
            buf.put_slice(b"\"");
        }
        buf.put_slice(b"\r\n");

        if let Some(content_type) = &self.content_type {
            buf.put_slice(b"Content-Type: ");
            buf.put_slice(content_type.as_bytes());
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"\r\n");
        buf.put_slice(&self.data);
    }
}

/// Guess the content type from a filename extension.
fn guess_content_type(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "zip" => "application/zip",
        "gz" | "gzip" => "application/gzip",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

/// A multipart form containing multiple parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    parts: Vec<Part>,
    boundary: String,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// Create a new empty form with a generated boundary.
    #[must_use]
    pub fn new() -> Self {
        Self::with_boundary(generate_boundary())
    }

    /// Create a new form with a custom boundary.
    ///
    /// The boundary should be a unique string that doesn't appear in any part data.
    #[must_use]
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            parts: Vec::new(),
            boundary: boundary.into(),
        }
    }

    /// Add a part to the form.
    #[must_use]
    pub fn part(mut self, part: Part) -> Self {
        self.push(part);
        self
    }

    /// Add a part in place.
    pub fn push(&mut self, part: Part) {
        self.parts.push(part);
    }

    /// Get the boundary string.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Get the parts in this form.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// `multipart/form-data; boundary=<boundary>`
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Convert the form into `(content type, body)`.
    #[must_use]
    pub fn into_body(self) -> (String, Bytes) {
        let content_type = self.content_type();
        let body = self.encode();
        (content_type, body)
    }

    fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();

        for part in &self.parts {
            buf.put_slice(b"--");
            buf.put_slice(self.boundary.as_bytes());
            buf.put_slice(b"\r\n");
            part.write_to(&mut buf);
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--\r\n");

        buf.freeze()
    }

    /// Parse a body produced for the given `multipart/form-data` content type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] when the content type has no boundary or
    /// the body is not delimited by it.
    pub fn parse(content_type: &str, body: &[u8]) -> Result<Self> {
        let boundary = content_type
            .split(';')
            .map(str::trim)
            .find_map(|param| param.strip_prefix("boundary="))
            .map(|boundary| boundary.trim_matches('"'))
            .filter(|boundary| !boundary.is_empty())
            .ok_or_else(|| Error::invalid_request("multipart content type without boundary"))?;
        let malformed = || Error::invalid_request("malformed multipart body");

        // Every delimiter, the first one included, is preceded by CRLF.
        let delimiter = format!("\r\n--{boundary}");
        let mut buffer = Vec::with_capacity(body.len() + 2);
        buffer.extend_from_slice(b"\r\n");
        buffer.extend_from_slice(body);

        let mut form = Self::with_boundary(boundary);
        let mut rest = buffer.as_slice();
        loop {
            let start = find(rest, delimiter.as_bytes()).ok_or_else(malformed)?;
            rest = rest
                .get(start + delimiter.len()..)
                .ok_or_else(malformed)?;
            if rest.starts_with(b"--") {
                return Ok(form);
            }
            rest = rest.strip_prefix(b"\r\n").ok_or_else(malformed)?;

            let header_end = find(rest, b"\r\n\r\n").ok_or_else(malformed)?;
            let (head, tail) = rest.split_at(header_end);
            let content = tail.get(4..).ok_or_else(malformed)?;
            let data_end = find(content, delimiter.as_bytes()).ok_or_else(malformed)?;
            let (data, next) = content.split_at(data_end);

            let head = std::str::from_utf8(head).map_err(|_| malformed())?;
            form.push(parse_part(head, data));
            rest = next;
        }
    }
}

fn parse_part(head: &str, data: &[u8]) -> Part {
    let mut part = Part::new(String::new(), Bytes::copy_from_slice(data));
    for line in head.split("\r\n") {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        if name.eq_ignore_ascii_case("content-disposition") {
            for (key, param) in disposition_params(value) {
                match key.as_str() {
                    "name" => part.name = param,
                    "filename" => part.filename = Some(param),
                    _ => {}
                }
            }
        } else if name.eq_ignore_ascii_case("content-type") {
            part.content_type = Some(value.trim().to_string());
        }
    }
    part
}

/// Parameters of a `Content-Disposition` value, keys lowercased, quoted values unescaped.
fn disposition_params(value: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = value.chars().peekable();

    // Skip the disposition type.
    chars.by_ref().take_while(|&c| c != ';').for_each(drop);

    while chars.peek().is_some() {
        let key: String = chars.by_ref().take_while(|&c| c != '=').collect();
        let key = key.trim().to_ascii_lowercase();

        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let param = if chars.next_if_eq(&'"').is_some() {
            let mut quoted = String::new();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => quoted.extend(chars.next()),
                    '"' => break,
                    c => quoted.push(c),
                }
            }
            chars.by_ref().take_while(|&c| c != ';').for_each(drop);
            quoted
        } else {
            let raw: String = chars.by_ref().take_while(|&c| c != ';').collect();
            raw.trim().to_string()
        };

        if !key.is_empty() {
            params.push((key, param));
        }
    }

    params
}

fn escape_quoted(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Generate a boundary string.
fn generate_boundary() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    format!("----CourierBoundary{timestamp:x}")
}
