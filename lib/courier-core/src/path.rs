//! Path merging and `%s` template substitution.
//!
//! Paths are joined with [`merge_path`], which never produces a doubled `/`
//! at the join point and never drops the single separator either side brings.
//!
//! ```
//! use courier_core::merge_path;
//!
//! assert_eq!(merge_path("https://api.example.com/", "/users"), "https://api.example.com/users");
//! assert_eq!(merge_path("users", "42"), "users/42");
//! ```

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::{Error, Result};

/// Placeholder filled positionally by [`fill_template`].
pub const PLACEHOLDER: &str = "%s";

/// Characters escaped inside a single path segment.
///
/// Unreserved characters and the sub-delimiters that are legal in a segment
/// (`$ & + = : @`) are kept; `/`, `;`, `,` and `?` are escaped.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'=')
    .remove(b':')
    .remove(b'@');

/// Join two path fragments with exactly one `/` between them.
///
/// An empty fragment yields the other one unchanged.
#[must_use]
pub fn merge_path(left: &str, right: &str) -> String {
    if left.is_empty() {
        return right.to_string();
    }
    if right.is_empty() {
        return left.to_string();
    }

    match (left.ends_with('/'), right.strip_prefix('/')) {
        (true, Some(rest)) => format!("{left}{rest}"),
        (false, None) => format!("{left}/{right}"),
        _ => format!("{left}{right}"),
    }
}

/// Percent-escape a value so it can be used as a single path segment.
#[must_use]
pub fn escape_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// Substitute template values into a path.
///
/// Every `%s` placeholder is replaced, in order, by the next escaped value.
/// A path without placeholders gets each escaped value appended as an extra
/// segment instead.
///
/// # Errors
///
/// Returns [`Error::InvalidRequest`] when the number of values does not match
/// the number of placeholders.
pub fn fill_template<I, S>(path: &str, values: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let values: Vec<String> = values
        .into_iter()
        .map(|value| escape_segment(value.as_ref()))
        .collect();

    if !path.contains(PLACEHOLDER) {
        return Ok(values
            .iter()
            .fold(path.to_string(), |acc, segment| merge_path(&acc, segment)));
    }

    let placeholders = path.matches(PLACEHOLDER).count();
    if placeholders != values.len() {
        return Err(Error::invalid_request(format!(
            "path template `{path}` expects {placeholders} value(s), got {}",
            values.len()
        )));
    }

    let mut filled = String::with_capacity(path.len());
    let mut values = values.iter();
    for (index, piece) in path.split(PLACEHOLDER).enumerate() {
        if index > 0
            && let Some(value) = values.next()
        {
            filled.push_str(value);
        }
        filled.push_str(piece);
    }

    Ok(filled)
}
