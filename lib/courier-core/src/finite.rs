//! Rejection of non-finite floats before JSON encoding.
//!
//! `serde_json` writes `NaN` and infinities as `null`, which would silently
//! turn such a value into a JSON `null` body or drop it from a query string.
//! [`ensure_finite`] walks a value with a serializer that produces nothing and
//! fails on the first non-finite float.

use std::fmt;

use serde::ser::{self, Serialize};

use crate::{Error, Result};

/// Fail with [`Error::Encoding`] if `value` contains a non-finite float.
///
/// Other serialization failures are left to the actual encoder.
pub(crate) fn ensure_finite<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    match value.serialize(Finite) {
        Err(NotFinite::Float(number)) => {
            Err(Error::encoding(format!("{number} is not a finite number")))
        }
        Ok(()) | Err(NotFinite::Other) => Ok(()),
    }
}

#[derive(Debug)]
enum NotFinite {
    Float(f64),
    Other,
}

impl fmt::Display for NotFinite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(number) => write!(f, "{number} is not a finite number"),
            Self::Other => f.write_str("serialization failed"),
        }
    }
}

impl std::error::Error for NotFinite {}

impl ser::Error for NotFinite {
    fn custom<T: fmt::Display>(_msg: T) -> Self {
        Self::Other
    }
}

#[derive(Clone, Copy)]
struct Finite;

type Walk = std::result::Result<(), NotFinite>;

fn check(number: f64) -> Walk {
    if number.is_finite() {
        Ok(())
    } else {
        Err(NotFinite::Float(number))
    }
}

impl ser::Serializer for Finite {
    type Ok = ();
    type Error = NotFinite;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_bool(self, _: bool) -> Walk {
        Ok(())
    }

    fn serialize_i8(self, _: i8) -> Walk {
        Ok(())
    }

    fn serialize_i16(self, _: i16) -> Walk {
        Ok(())
    }

    fn serialize_i32(self, _: i32) -> Walk {
        Ok(())
    }

    fn serialize_i64(self, _: i64) -> Walk {
        Ok(())
    }

    fn serialize_i128(self, _: i128) -> Walk {
        Ok(())
    }

    fn serialize_u8(self, _: u8) -> Walk {
        Ok(())
    }

    fn serialize_u16(self, _: u16) -> Walk {
        Ok(())
    }

    fn serialize_u32(self, _: u32) -> Walk {
        Ok(())
    }

    fn serialize_u64(self, _: u64) -> Walk {
        Ok(())
    }

    fn serialize_u128(self, _: u128) -> Walk {
        Ok(())
    }

    fn serialize_f32(self, v: f32) -> Walk {
        check(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Walk {
        check(v)
    }

    fn serialize_char(self, _: char) -> Walk {
        Ok(())
    }

    fn serialize_str(self, _: &str) -> Walk {
        Ok(())
    }

    fn serialize_bytes(self, _: &[u8]) -> Walk {
        Ok(())
    }

    fn serialize_none(self) -> Walk {
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Walk {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Walk {
        Ok(())
    }

    fn serialize_unit_struct(self, _: &'static str) -> Walk {
        Ok(())
    }

    fn serialize_unit_variant(self, _: &'static str, _: u32, _: &'static str) -> Walk {
        Ok(())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(self, _: &'static str, value: &T) -> Walk {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        value: &T,
    ) -> Walk {
        value.serialize(self)
    }

    fn serialize_seq(self, _: Option<usize>) -> std::result::Result<Self, NotFinite> {
        Ok(self)
    }

    fn serialize_tuple(self, _: usize) -> std::result::Result<Self, NotFinite> {
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> std::result::Result<Self, NotFinite> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> std::result::Result<Self, NotFinite> {
        Ok(self)
    }

    fn serialize_map(self, _: Option<usize>) -> std::result::Result<Self, NotFinite> {
        Ok(self)
    }

    fn serialize_struct(self, _: &'static str, _: usize) -> std::result::Result<Self, NotFinite> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> std::result::Result<Self, NotFinite> {
        Ok(self)
    }
}

impl ser::SerializeSeq for Finite {
    type Ok = ();
    type Error = NotFinite;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Walk {
        value.serialize(*self)
    }

    fn end(self) -> Walk {
        Ok(())
    }
}

impl ser::SerializeTuple for Finite {
    type Ok = ();
    type Error = NotFinite;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Walk {
        value.serialize(*self)
    }

    fn end(self) -> Walk {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for Finite {
    type Ok = ();
    type Error = NotFinite;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Walk {
        value.serialize(*self)
    }

    fn end(self) -> Walk {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for Finite {
    type Ok = ();
    type Error = NotFinite;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Walk {
        value.serialize(*self)
    }

    fn end(self) -> Walk {
        Ok(())
    }
}

impl ser::SerializeMap for Finite {
    type Ok = ();
    type Error = NotFinite;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Walk {
        key.serialize(*self)
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Walk {
        value.serialize(*self)
    }

    fn end(self) -> Walk {
        Ok(())
    }
}

impl ser::SerializeStruct for Finite {
    type Ok = ();
    type Error = NotFinite;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, _: &'static str, value: &T) -> Walk {
        value.serialize(*self)
    }

    fn end(self) -> Walk {
        Ok(())
    }
}

impl ser::SerializeStructVariant for Finite {
    type Ok = ();
    type Error = NotFinite;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, _: &'static str, value: &T) -> Walk {
        value.serialize(*self)
    }

    fn end(self) -> Walk {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use assert2::{check, let_assert};

    use super::*;

    #[derive(serde::Serialize)]
    struct Reading {
        sensor: &'static str,
        values: Vec<f32>,
        extra: Option<f64>,
    }

    #[test]
    fn finite_values_pass() {
        let reading = Reading {
            sensor: "t1",
            values: vec![1.5, -0.25],
            extra: Some(0.0),
        };
        check!(ensure_finite(&reading).is_ok());
        check!(ensure_finite(&"text").is_ok());
        check!(ensure_finite(&[1_u64, 2, 3]).is_ok());
    }

    #[test]
    fn nested_non_finite_values_fail() {
        let reading = Reading {
            sensor: "t1",
            values: vec![1.0, f32::NEG_INFINITY],
            extra: None,
        };
        let_assert!(Err(Error::Encoding(message)) = ensure_finite(&reading));
        check!(message == "-inf is not a finite number");

        let mut map = BTreeMap::new();
        map.insert("ratio", f64::NAN);
        let_assert!(Err(Error::Encoding(message)) = ensure_finite(&map));
        check!(message == "NaN is not a finite number");
    }

    #[test]
    fn top_level_infinity_fails() {
        let_assert!(Err(err) = ensure_finite(&f64::INFINITY));
        check!(err.is_encoding());
        check!(err.to_string().contains("inf is not a finite number"));
    }
}
