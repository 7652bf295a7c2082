//! Flattening of structured values into query and form key/value pairs.
//!
//! Any [`serde::Serialize`] value is viewed as a JSON value and flattened
//! recursively: objects produce `parent[child]` keys, arrays produce indexed or
//! repeated keys depending on the [`ArraySerializationOption`], and scalars are
//! the leaves that end up in a [`Params`] collection.
//!
//! # Example
//!
//! ```
//! use courier_core::{ArraySerializationOption, Params};
//!
//! let mut params = Params::new();
//! params
//!     .add("tags", &["a", "b"], ArraySerializationOption::Csv)
//!     .expect("serializable");
//!
//! assert_eq!(params.encode(), "tags=a%2Cb");
//! ```

use std::fmt;

use serde_json::Value;
use url::form_urlencoded;

use crate::Result;

/// How repeated values of one key are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArraySerializationOption {
    /// `key[0]=a&key[1]=b`
    #[default]
    Indexed,
    /// `key[]=a&key[]=b`
    UnIndexed,
    /// `key=a&key=b`
    Plain,
    /// `key=a,b`
    Csv,
    /// `key=a\tb`
    Tsv,
    /// `key=a|b`
    Psv,
}

impl ArraySerializationOption {
    /// Separator used to join values of one key, for the joining options.
    #[must_use]
    pub const fn separator(self) -> Option<char> {
        match self {
            Self::Csv => Some(','),
            Self::Tsv => Some('\t'),
            Self::Psv => Some('|'),
            Self::Indexed | Self::UnIndexed | Self::Plain => None,
        }
    }

    /// Build the key of one array element.
    ///
    /// | option | no index | index `i` |
    /// |--------|----------|-----------|
    /// | `UnIndexed` | `key[]` | `key[i]` |
    /// | any other | `key` | `key[i]` |
    #[must_use]
    pub fn prepare_key(self, key: &str, index: Option<usize>) -> String {
        match (self, index) {
            (_, Some(index)) => format!("{key}[{index}]"),
            (Self::UnIndexed, None) => format!("{key}[]"),
            (_, None) => key.to_string(),
        }
    }

    /// Index handed to [`Self::prepare_key`] for a scalar array element.
    const fn scalar_index(self, index: usize) -> Option<usize> {
        match self {
            Self::Indexed => Some(index),
            _ => None,
        }
    }
}

/// Multi-valued, ordered key/value collection for query strings and form bodies.
///
/// Keys keep the order of their first insertion and values keep their
/// insertion order within a key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, Vec<String>)>,
}

impl Params {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one scalar value.
    ///
    /// With [`ArraySerializationOption::Csv`], [`ArraySerializationOption::Tsv`] and
    /// [`ArraySerializationOption::Psv`] the value is joined onto the existing value
    /// of the key; every other option adds a new value.
    pub fn append(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        option: ArraySerializationOption,
    ) {
        let key = key.into();
        let value = value.into();

        let Some(values) = self.values_mut(&key) else {
            self.entries.push((key, vec![value]));
            return;
        };

        match (option.separator(), values.last_mut()) {
            (Some(separator), Some(joined)) => {
                joined.push(separator);
                joined.push_str(&value);
            }
            _ => values.push(value),
        }
    }

    /// Flatten a serializable value under `key`.
    ///
    /// An empty `key` puts the fields of an object at the top level.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented as JSON
    /// (e.g. a map with non-string keys, or a non-finite float).
    pub fn add<T>(&mut self, key: &str, value: &T, option: ArraySerializationOption) -> Result<()>
    where
        T: serde::Serialize + ?Sized,
    {
        crate::finite::ensure_finite(value)?;
        let value = serde_json::to_value(value)?;
        self.add_value(key, &value, option);
        Ok(())
    }

    /// Flatten an already converted JSON value under `key`.
    pub fn add_value(&mut self, key: &str, value: &Value, option: ArraySerializationOption) {
        match value {
            Value::Null => {}
            Value::Bool(flag) => self.append(key, flag.to_string(), option),
            Value::Number(number) => self.append(key, number.to_string(), option),
            Value::String(text) => self.append(key, text.as_str(), option),
            Value::Object(fields) => {
                for (name, field) in fields {
                    let child = if key.is_empty() {
                        name.clone()
                    } else {
                        format!("{key}[{name}]")
                    };
                    self.add_value(&child, field, option);
                }
            }
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    let index = if is_structured(item) {
                        Some(index)
                    } else {
                        option.scalar_index(index)
                    };
                    self.add_value(&option.prepare_key(key, index), item, option);
                }
            }
        }
    }

    /// Values recorded for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, values)| values.as_slice())
    }

    /// Returns `true` if no pair has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of key/value pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, values)| values.len()).sum()
    }

    /// Iterate over the flat key/value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|(key, values)| {
            values
                .iter()
                .map(move |value| (key.as_str(), value.as_str()))
        })
    }

    /// Encode as `application/x-www-form-urlencoded`, spaces written as `%20`.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.iter() {
            serializer.append_pair(key, value);
        }
        space_as_percent(&serializer.finish())
    }

    fn values_mut(&mut self, key: &str) -> Option<&mut Vec<String>> {
        self.entries
            .iter_mut()
            .find(|(name, _)| name == key)
            .map(|(_, values)| values)
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Form-encode a single component, spaces written as `%20`.
#[must_use]
pub fn encode_component(value: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(value.as_bytes()).collect();
    space_as_percent(&encoded)
}

/// A literal `+` is always escaped as `%2B` by the form encoder, so every `+`
/// left in the output stands for a space.
fn space_as_percent(encoded: &str) -> String {
    encoded.replace('+', "%20")
}

const fn is_structured(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use assert2::check;

    use super::*;

    #[test]
    fn prepare_key_truth_table() {
        use ArraySerializationOption::{Csv, Indexed, Plain, Psv, Tsv, UnIndexed};

        check!(Indexed.prepare_key("k", None) == "k");
        check!(Indexed.prepare_key("k", Some(2)) == "k[2]");
        check!(UnIndexed.prepare_key("k", None) == "k[]");
        check!(UnIndexed.prepare_key("k", Some(2)) == "k[2]");
        check!(Plain.prepare_key("k", None) == "k");
        check!(Plain.prepare_key("k", Some(2)) == "k[2]");
        for option in [Csv, Tsv, Psv] {
            check!(option.prepare_key("k", None) == "k");
            check!(option.prepare_key("k", Some(0)) == "k[0]");
        }
    }

    #[test]
    fn csv_append_joins_values() {
        let mut params = Params::new();
        params.append("k", "v1", ArraySerializationOption::Csv);
        params.append("k", "v2", ArraySerializationOption::Csv);

        assert_eq!(params.get("k"), Some(["v1,v2".to_string()].as_slice()));
    }

    #[test]
    fn indexed_append_keeps_values() {
        let mut params = Params::new();
        params.append("k", "v1", ArraySerializationOption::Indexed);
        params.append("k", "v2", ArraySerializationOption::Indexed);

        assert_eq!(
            params.get("k"),
            Some(["v1".to_string(), "v2".to_string()].as_slice())
        );
    }

    #[test]
    fn tsv_and_psv_separators() {
        let mut params = Params::new();
        params
            .add("t", &["a", "b"], ArraySerializationOption::Tsv)
            .expect("serializable");
        params
            .add("p", &["a", "b", "c"], ArraySerializationOption::Psv)
            .expect("serializable");

        assert_eq!(params.get("t"), Some(["a\tb".to_string()].as_slice()));
        assert_eq!(params.get("p"), Some(["a|b|c".to_string()].as_slice()));
    }

    #[test]
    fn scalar_arrays_per_option() {
        let values = [1, 2];
        let encode = |option| {
            let mut params = Params::new();
            params.add("ids", &values, option).expect("serializable");
            params.encode()
        };

        check!(encode(ArraySerializationOption::Indexed) == "ids%5B0%5D=1&ids%5B1%5D=2");
        check!(encode(ArraySerializationOption::UnIndexed) == "ids%5B%5D=1&ids%5B%5D=2");
        check!(encode(ArraySerializationOption::Plain) == "ids=1&ids=2");
        check!(encode(ArraySerializationOption::Csv) == "ids=1%2C2");
    }

    #[test]
    fn nested_struct_flattening() {
        #[derive(serde::Serialize)]
        struct Address {
            city: String,
            zip: Option<String>,
        }

        #[derive(serde::Serialize)]
        struct Person {
            address: Address,
            name: String,
            tags: Vec<String>,
        }

        let person = Person {
            name: "Ada".to_string(),
            address: Address {
                city: "London".to_string(),
                zip: None,
            },
            tags: vec!["math".to_string(), "code".to_string()],
        };

        let mut params = Params::new();
        params
            .add("person", &person, ArraySerializationOption::UnIndexed)
            .expect("serializable");

        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(
            pairs,
            vec![
                ("person[address][city]", "London"),
                ("person[name]", "Ada"),
                ("person[tags][]", "math"),
                ("person[tags][]", "code"),
            ]
        );
    }

    #[test]
    fn array_of_objects_is_always_indexed() {
        let items = serde_json::json!([{ "id": 1 }, { "id": 2 }]);

        let mut params = Params::new();
        params.add_value("items", &items, ArraySerializationOption::Plain);

        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("items[0][id]", "1"), ("items[1][id]", "2")]);
    }

    #[test]
    fn empty_key_flattens_at_top_level() {
        let mut fields = BTreeMap::new();
        fields.insert("grant_type", "client_credentials");
        fields.insert("scope", "read write");

        let mut params = Params::new();
        params
            .add("", &fields, ArraySerializationOption::Indexed)
            .expect("serializable");

        insta::assert_snapshot!(params.encode(), @"grant_type=client_credentials&scope=read%20write");
    }

    #[test]
    fn encode_keeps_plus_distinct_from_space() {
        let mut params = Params::new();
        params.append("q", "a+b c", ArraySerializationOption::Indexed);

        assert_eq!(params.encode(), "q=a%2Bb%20c");
        assert_eq!(encode_component("x y+z"), "x%20y%2Bz");
    }

    #[test]
    fn nulls_are_skipped() {
        let mut params = Params::new();
        params
            .add("missing", &Option::<u32>::None, ArraySerializationOption::Indexed)
            .expect("serializable");

        assert!(params.is_empty());
        assert_eq!(params.len(), 0);
    }

    #[test]
    fn non_string_map_keys_are_rejected() {
        let mut map = BTreeMap::new();
        map.insert((1, 2), "pair");

        let mut params = Params::new();
        let err = params
            .add("m", &map, ArraySerializationOption::Indexed)
            .expect_err("tuple keys cannot be encoded");

        assert!(err.is_encoding());
    }

    #[test]
    fn non_finite_floats_are_rejected_not_dropped() {
        let mut params = Params::new();
        params
            .add("page", &2, ArraySerializationOption::Indexed)
            .expect("finite");

        let err = params
            .add("ratios", &[0.5, f64::NAN], ArraySerializationOption::Csv)
            .expect_err("NaN");

        assert!(matches!(err, crate::Error::Encoding(_)));
        assert_eq!(params.encode(), "page=2");
    }
}
