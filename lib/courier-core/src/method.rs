//! Request methods a call can use.

use std::fmt;
use std::str::FromStr;

/// HTTP request method.
///
/// Names parse case-insensitively, so `"patch"` and `"PATCH"` are the same
/// method. `TRACE` and `CONNECT` are not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
    /// `PATCH`
    Patch,
    /// `HEAD`
    Head,
    /// `OPTIONS`
    Options,
}

impl Method {
    /// Every supported method.
    pub const ALL: [Self; 7] = [
        Self::Get,
        Self::Post,
        Self::Put,
        Self::Delete,
        Self::Patch,
        Self::Head,
        Self::Options,
    ];

    /// Upper-case name as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// No side effect on the server is expected.
    #[must_use]
    pub const fn is_safe(self) -> bool {
        matches!(self, Self::Get | Self::Head | Self::Options)
    }

    /// Repeating the request has the same effect as sending it once.
    #[must_use]
    pub const fn is_idempotent(self) -> bool {
        self.is_safe() || matches!(self, Self::Put | Self::Delete)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = crate::Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let trimmed = name.trim();
        Self::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| crate::Error::InvalidMethod(name.to_string()))
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        Self::from_bytes(method.as_str().as_bytes()).unwrap_or_default()
    }
}

impl TryFrom<http::Method> for Method {
    type Error = crate::Error;

    fn try_from(method: http::Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    #[test]
    fn names_round_trip() {
        for method in Method::ALL {
            check!(method.to_string().parse::<Method>().ok() == Some(method));
        }
        check!(Method::Options.to_string() == "OPTIONS");
    }

    #[test]
    fn parsing_ignores_case_and_padding() {
        check!("patch".parse::<Method>().ok() == Some(Method::Patch));
        check!(" get ".parse::<Method>().ok() == Some(Method::Get));
    }

    #[test]
    fn unknown_names_are_rejected() {
        let_assert!(Err(crate::Error::InvalidMethod(name)) = "FETCH".parse::<Method>());
        check!(name == "FETCH");
    }

    #[test]
    fn predicates() {
        let idempotent: Vec<_> = Method::ALL.into_iter().filter(|m| m.is_idempotent()).collect();
        check!(idempotent == [Method::Get, Method::Put, Method::Delete, Method::Head, Method::Options]);
        check!(!Method::Post.is_safe());
        check!(!Method::Put.is_safe());
    }

    #[test]
    fn http_conversions() {
        for method in Method::ALL {
            check!(Method::try_from(http::Method::from(method)).ok() == Some(method));
        }
        check!(Method::try_from(http::Method::TRACE).is_err());
    }
}
