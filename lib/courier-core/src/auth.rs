//! Authentication requirements as a boolean expression over named credentials.
//!
//! An [`AuthExpression`] names which credential schemes a call needs. Resolving
//! it against a [`CredentialRegistry`] yields the interceptors that sign the
//! request, or a diagnostic explaining why no combination could be satisfied.
//!
//! ```
//! use courier_core::{AuthExpression, CredentialRegistry};
//!
//! let expression = AuthExpression::or([
//!     AuthExpression::single("api_key"),
//!     AuthExpression::single("oauth"),
//! ]);
//!
//! let err = expression.resolve(&CredentialRegistry::new()).err().expect("nothing registered");
//! assert_eq!(err.to_string(), "  api_key is undefined!\n  oauth is undefined!");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::{Error, Interceptor, Result};

/// A named credential scheme able to sign requests.
pub trait CredentialProvider: Send + Sync {
    /// Whether the credential holds a usable value.
    fn is_valid(&self) -> bool;

    /// Why the credential is unusable, e.g. `"api_key value is empty!"`.
    fn error_message(&self) -> String;

    /// The interceptor applying this credential to a request.
    fn authenticator(&self) -> Arc<dyn Interceptor>;
}

/// Credential providers by scheme name.
#[derive(Clone, Default)]
pub struct CredentialRegistry {
    providers: HashMap<String, Arc<dyn CredentialProvider>>,
}

impl CredentialRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` under `name`, returning the one it replaces.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        provider: Arc<dyn CredentialProvider>,
    ) -> Option<Arc<dyn CredentialProvider>> {
        self.providers.insert(name.into(), provider)
    }

    /// Builder form of [`CredentialRegistry::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, provider: Arc<dyn CredentialProvider>) -> Self {
        self.insert(name, provider);
        self
    }

    /// Provider registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn CredentialProvider>> {
        self.providers.get(name)
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for CredentialRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.providers.keys().collect();
        names.sort();
        f.debug_struct("CredentialRegistry")
            .field("names", &names)
            .finish()
    }
}

/// Which credentials a call requires.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AuthExpression {
    /// The credential registered under this name.
    Single(String),
    /// Every child must be satisfied.
    And(Vec<AuthExpression>),
    /// The first satisfied child wins.
    Or(Vec<AuthExpression>),
}

impl AuthExpression {
    /// Require the credential named `key`.
    #[must_use]
    pub fn single(key: impl Into<String>) -> Self {
        Self::Single(key.into())
    }

    /// Require every expression of `children`.
    #[must_use]
    pub fn and(children: impl IntoIterator<Item = Self>) -> Self {
        Self::And(children.into_iter().collect())
    }

    /// Require at least one expression of `children`, tried in order.
    #[must_use]
    pub fn or(children: impl IntoIterator<Item = Self>) -> Self {
        Self::Or(children.into_iter().collect())
    }

    /// Credential names mentioned in the expression, left to right.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys = Vec::new();
        self.collect_keys(&mut keys);
        keys
    }

    fn collect_keys<'a>(&'a self, keys: &mut Vec<&'a str>) {
        match self {
            Self::Single(key) => keys.push(key),
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.collect_keys(keys);
                }
            }
        }
    }

    /// Evaluate against `registry`.
    ///
    /// On success returns the authenticators of every satisfied credential,
    /// in expression order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`] carrying the evaluation diagnostic.
    pub fn resolve(&self, registry: &CredentialRegistry) -> Result<Vec<Arc<dyn Interceptor>>> {
        self.evaluate(registry).map_err(Error::Authentication)
    }

    fn evaluate(
        &self,
        registry: &CredentialRegistry,
    ) -> std::result::Result<Vec<Arc<dyn Interceptor>>, String> {
        match self {
            Self::Single(key) => match registry.get(key) {
                None => Err(format!("{key} is undefined!")),
                Some(provider) if !provider.is_valid() => Err(provider.error_message()),
                Some(provider) => Ok(vec![provider.authenticator()]),
            },
            Self::And(children) => {
                let mut authenticators = Vec::new();
                let mut failures = Vec::new();
                for child in children {
                    match child.evaluate(registry) {
                        Ok(found) => authenticators.extend(found),
                        Err(message) => failures.push(message),
                    }
                }
                if failures.is_empty() {
                    return Ok(authenticators);
                }
                failures.retain(|message| !message.trim().is_empty());
                if failures.is_empty() {
                    Err(format!(
                        "Expected {}. Got invalid credentials.",
                        self.keys().join(" and ")
                    ))
                } else {
                    Err(aggregate(&failures))
                }
            }
            Self::Or(children) if children.is_empty() => Ok(Vec::new()),
            Self::Or(children) => {
                let mut failures = Vec::new();
                for child in children {
                    match child.evaluate(registry) {
                        Ok(found) => return Ok(found),
                        Err(message) => failures.push(message),
                    }
                }
                failures.retain(|message| !message.trim().is_empty());
                if failures.is_empty() {
                    Err(format!(
                        "Expected either {}. Got neither.",
                        self.keys().join(" or ")
                    ))
                } else {
                    Err(aggregate(&failures))
                }
            }
        }
    }
}

impl fmt::Display for AuthExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (children, operator) = match self {
            Self::Single(key) => return f.write_str(key),
            Self::And(children) => (children, " and "),
            Self::Or(children) => (children, " or "),
        };
        f.write_str("(")?;
        for (index, child) in children.iter().enumerate() {
            if index > 0 {
                f.write_str(operator)?;
            }
            write!(f, "{child}")?;
        }
        f.write_str(")")
    }
}

/// One message per child, every line indented by two spaces.
fn aggregate(messages: &[String]) -> String {
    messages
        .iter()
        .flat_map(|message| message.lines())
        .map(|line| format!("  {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
