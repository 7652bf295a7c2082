//! HTTP request building.
//!
//! A [`RequestBuilder`] accumulates everything a call needs: method, path,
//! headers, query parameters and exactly one body. Setters never fail: the
//! first invalid input is recorded and returned by [`RequestBuilder::finalize`],
//! which produces the immutable [`Request`] handed to the transport.
//!
//! # Example
//!
//! ```
//! use courier_core::{Method, RequestBuilder};
//!
//! let request = RequestBuilder::new(Method::Get, "https://api.example.com/v1")
//!     .path("/users/%s/repos")
//!     .template_params(["octo cat"])
//!     .query_param("per_page", &50)
//!     .query_param("q", "rust lang")
//!     .accept("application/json")
//!     .finalize()
//!     .expect("valid request");
//!
//! assert_eq!(
//!     request.url().as_str(),
//!     "https://api.example.com/v1/users/octo%20cat/repos?per_page=50&q=rust%20lang"
//! );
//! assert_eq!(request.header("accept"), Some("application/json"));
//! ```

use std::collections::HashMap;

use bytes::Bytes;
use serde_json::Value;

use crate::{
    ArraySerializationOption, Body, Error, Form, Method, Params, Part, Result, encode_component,
    fill_template, merge_path,
};

/// A finalized HTTP request: method, URL, headers and optional body.
///
/// Cloning is cheap; every retry attempt runs on its own clone.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: url::Url,
    headers: HashMap<String, String>,
    body: Option<Bytes>,
}

impl Request {
    /// Creates a request without headers or body.
    #[must_use]
    pub fn new(method: Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: HashMap::new(),
            body: None,
        }
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Mutable access to the URL.
    #[must_use]
    pub fn url_mut(&mut self) -> &mut url::Url {
        &mut self.url
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Mutable access to headers.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.headers
    }

    /// Single header value by name, ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Set a header, replacing any header of the same name regardless of case.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
    }

    /// Append one encoded `key=value` pair to the query string.
    pub fn append_query(&mut self, key: &str, value: &str) {
        let pair = format!("{}={}", encode_component(key), encode_component(value));
        let query = match self.url.query() {
            Some(existing) if !existing.is_empty() => format!("{existing}&{pair}"),
            _ => pair,
        };
        self.url.set_query(Some(&query));
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Consume into (method, url, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (Method, url::Url, HashMap<String, String>, Option<Bytes>) {
        (self.method, self.url, self.headers, self.body)
    }
}

pub(crate) fn find_header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Accumulates one call's request state.
#[derive(Debug)]
#[must_use]
pub struct RequestBuilder {
    method: Method,
    base_url: String,
    path: String,
    headers: Vec<(String, String)>,
    default_headers: Vec<(String, String)>,
    query: Params,
    array_option: ArraySerializationOption,
    body: Option<Body>,
    error: Option<Error>,
}

impl RequestBuilder {
    /// Creates a builder for `method` against `base_url`.
    ///
    /// The URL is parsed by [`RequestBuilder::finalize`].
    pub fn new(method: Method, base_url: impl Into<String>) -> Self {
        Self {
            method,
            base_url: base_url.into(),
            path: String::new(),
            headers: Vec::new(),
            default_headers: Vec::new(),
            query: Params::new(),
            array_option: ArraySerializationOption::default(),
            body: None,
            error: None,
        }
    }

    /// Current HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Set the method from its name, ignoring ASCII case.
    pub fn method_name(mut self, name: &str) -> Self {
        match name.parse() {
            Ok(method) => self.method = method,
            Err(err) => self.fail(err),
        }
        self
    }

    /// Replace the path.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Join a fragment onto the path without doubling the separator.
    pub fn append_path(mut self, path: &str) -> Self {
        self.path = merge_path(&self.path, path);
        self
    }

    /// Fill `%s` placeholders of the path, in order, with escaped values.
    ///
    /// Without placeholders each value is appended as its own segment.
    pub fn template_params<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match fill_template(&self.path, values) {
            Ok(path) => self.path = path,
            Err(err) => self.fail(err),
        }
        self
    }

    /// Set a header; a later call with the same name, in any case, wins.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        upsert(&mut self.headers, name.into(), value.into());
        self
    }

    /// Set a header used only if no explicit header of that name is set.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        upsert(&mut self.default_headers, name.into(), value.into());
        self
    }

    /// Set the `Accept` header.
    pub fn accept(self, value: impl Into<String>) -> Self {
        self.header("Accept", value)
    }

    /// Set the `Content-Type` header, overriding the body's own.
    pub fn content_type(self, value: impl Into<String>) -> Self {
        self.header("Content-Type", value)
    }

    /// Set the option used to flatten arrays in query and form values.
    pub fn array_serialization(mut self, option: ArraySerializationOption) -> Self {
        self.array_option = option;
        self
    }

    /// Add a query parameter, flattening structured values.
    pub fn query_param<T>(self, key: &str, value: &T) -> Self
    where
        T: serde::Serialize + ?Sized,
    {
        let option = self.array_option;
        self.query_param_with(key, value, option)
    }

    /// Add a query parameter with an explicit array serialization option.
    pub fn query_param_with<T>(mut self, key: &str, value: &T, option: ArraySerializationOption) -> Self
    where
        T: serde::Serialize + ?Sized,
    {
        if let Err(err) = self.query.add(key, value, option) {
            self.fail(err);
        }
        self
    }

    /// Use a plain text body.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.body = Some(Body::Text(text.into()));
        self
    }

    /// Use a JSON body.
    pub fn json<T>(mut self, value: &T) -> Self
    where
        T: serde::Serialize + ?Sized,
    {
        match crate::to_json(value) {
            Ok(json) => self.body = Some(Body::Json(json)),
            Err(err) => self.fail(err),
        }
        self
    }

    /// Add a URL-encoded form field.
    pub fn form_param<T>(self, key: &str, value: &T) -> Self
    where
        T: serde::Serialize + ?Sized,
    {
        let option = self.array_option;
        self.form_param_with(key, value, option)
    }

    /// Add a URL-encoded form field with an explicit array serialization option.
    pub fn form_param_with<T>(mut self, key: &str, value: &T, option: ArraySerializationOption) -> Self
    where
        T: serde::Serialize + ?Sized,
    {
        self.with_form(|params| params.add(key, value, option));
        self
    }

    /// Add every field of a serializable value as URL-encoded form fields.
    pub fn form<T>(self, value: &T) -> Self
    where
        T: serde::Serialize + ?Sized,
    {
        self.form_param("", value)
    }

    /// Add multipart fields for a value.
    ///
    /// Strings are written verbatim; objects and arrays are flattened into one
    /// part per leaf (`key[field]`, `key[0]`); other leaves are written as JSON.
    pub fn multipart_param<T>(mut self, key: &str, value: &T) -> Self
    where
        T: serde::Serialize + ?Sized,
    {
        let value = crate::finite::ensure_finite(value)
            .and_then(|()| serde_json::to_value(value).map_err(Error::from));
        match value {
            Ok(value) => self.with_multipart(|form| push_parts(form, key, &value)),
            Err(err) => self.fail(err),
        }
        self
    }

    /// Add a file part; the content type is guessed from the file name.
    pub fn multipart_file(
        self,
        key: &str,
        filename: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        self.multipart_part(Part::file(key, filename, data))
    }

    /// Add a prepared part, e.g. with an explicit content type.
    pub fn multipart_part(mut self, part: Part) -> Self {
        self.with_multipart(|form| {
            form.push(part);
            Ok(())
        });
        self
    }

    /// Use a raw byte body.
    pub fn stream(mut self, data: impl Into<Bytes>) -> Self {
        self.body = Some(Body::Bytes {
            data: data.into(),
            content_type: None,
        });
        self
    }

    /// Produce the request.
    ///
    /// Explicit headers win over default headers; the body's content type is
    /// added unless `Content-Type` was set explicitly.
    ///
    /// # Errors
    ///
    /// Returns the first error recorded by a setter, or [`Error::InvalidUrl`]
    /// if the base URL does not parse.
    pub fn finalize(self) -> Result<Request> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let mut url = url::Url::parse(&self.base_url)?;
        if !self.path.is_empty() {
            let path = merge_path(url.path(), &self.path);
            url.set_path(&path);
        }
        if !self.query.is_empty() {
            let encoded = self.query.encode();
            let query = match url.query() {
                Some(existing) if !existing.is_empty() => format!("{existing}&{encoded}"),
                _ => encoded,
            };
            url.set_query(Some(&query));
        }

        let mut request = Request::new(self.method, url);
        for (name, value) in self.headers {
            request.headers.insert(name, value);
        }
        for (name, value) in self.default_headers {
            if request.header(&name).is_none() {
                request.headers.insert(name, value);
            }
        }
        if let Some(body) = self.body {
            if request.header("Content-Type").is_none() {
                request
                    .headers
                    .insert("Content-Type".to_string(), body.content_type());
            }
            request.body = Some(body.into_bytes());
        }

        Ok(request)
    }

    /// Keep the first error only.
    fn fail(&mut self, err: Error) {
        self.error.get_or_insert(err);
    }

    fn with_form(&mut self, fill: impl FnOnce(&mut Params) -> Result<()>) {
        let mut params = match self.body.take() {
            Some(Body::Form(params)) => params,
            _ => Params::new(),
        };
        let result = fill(&mut params);
        self.body = Some(Body::Form(params));
        if let Err(err) = result {
            self.fail(err);
        }
    }

    fn with_multipart(&mut self, fill: impl FnOnce(&mut Form) -> Result<()>) {
        let mut form = match self.body.take() {
            Some(Body::Multipart(form)) => form,
            _ => Form::new(),
        };
        let result = fill(&mut form);
        self.body = Some(Body::Multipart(form));
        if let Err(err) = result {
            self.fail(err);
        }
    }
}

fn upsert(headers: &mut Vec<(String, String)>, name: String, value: String) {
    match headers.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(&name)) {
        Some(entry) => *entry = (name, value),
        None => headers.push((name, value)),
    }
}

fn push_parts(form: &mut Form, key: &str, value: &Value) -> Result<()> {
    match value {
        Value::Null => {}
        Value::String(text) => form.push(Part::new(key, text.clone())),
        Value::Bool(_) | Value::Number(_) => form.push(Part::json(key, value)?),
        Value::Object(fields) => {
            for (name, field) in fields {
                push_parts(form, &format!("{key}[{name}]"), field)?;
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                push_parts(form, &format!("{key}[{index}]"), item)?;
            }
        }
    }
    Ok(())
}
