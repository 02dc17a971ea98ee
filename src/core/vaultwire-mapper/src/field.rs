//! Conversions between single Rust field types and wire values.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Number, Value};

use crate::{time, FieldKind, MapperError};

/// A Rust type that can appear as a record field.
pub trait WireField: Sized {
    /// Wire shape of the type.
    fn kind() -> FieldKind;

    /// Converts the value to its wire form; `None` omits the field.
    fn to_wire(&self) -> Option<Value>;

    /// Converts a wire value back into the Rust type.
    fn from_wire(value: &Value) -> Result<Self, MapperError>;

    /// Whether a wire value stands for "no value" when the type is wrapped in
    /// an `Option`.
    fn is_blank(value: &Value) -> bool {
        value.is_null()
    }
}

impl WireField for String {
    fn kind() -> FieldKind {
        FieldKind::Text
    }

    fn to_wire(&self) -> Option<Value> {
        Some(Value::String(self.clone()))
    }

    fn from_wire(value: &Value) -> Result<Self, MapperError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Err(MapperError::mismatch(Self::kind(), other)),
        }
    }
}

impl WireField for bool {
    fn kind() -> FieldKind {
        FieldKind::Boolean
    }

    fn to_wire(&self) -> Option<Value> {
        Some(Value::Bool(*self))
    }

    fn from_wire(value: &Value) -> Result<Self, MapperError> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(MapperError::mismatch(Self::kind(), other)),
        }
    }
}

impl WireField for f64 {
    fn kind() -> FieldKind {
        FieldKind::Float
    }

    fn to_wire(&self) -> Option<Value> {
        Number::from_f64(*self).map(Value::Number)
    }

    fn from_wire(value: &Value) -> Result<Self, MapperError> {
        value
            .as_f64()
            .ok_or_else(|| MapperError::mismatch(Self::kind(), value))
    }
}

/// Reads an integer from a wire number, narrowing integral floats.
fn integral(value: &Value) -> Option<i128> {
    let Value::Number(number) = value else {
        return None;
    };
    if let Some(i) = number.as_i64() {
        return Some(i128::from(i));
    }
    if let Some(u) = number.as_u64() {
        return Some(i128::from(u));
    }
    let f = number.as_f64()?;
    // 2^64 bounds every integer field we decode into.
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 18_446_744_073_709_551_616.0 {
        Some(f as i128)
    } else {
        None
    }
}

macro_rules! integer_field {
    ($($ty:ty),*) => {
        $(
            impl WireField for $ty {
                fn kind() -> FieldKind {
                    FieldKind::Integer
                }

                fn to_wire(&self) -> Option<Value> {
                    Some(Value::from(*self))
                }

                fn from_wire(value: &Value) -> Result<Self, MapperError> {
                    integral(value)
                        .and_then(|i| <$ty>::try_from(i).ok())
                        .ok_or_else(|| {
                            MapperError::mismatch(concat!("integer (", stringify!($ty), ")"), value)
                        })
                }
            }
        )*
    };
}

integer_field!(i32, i64, u32, u64);

impl WireField for DateTime<Utc> {
    fn kind() -> FieldKind {
        FieldKind::Timestamp
    }

    fn to_wire(&self) -> Option<Value> {
        Some(Value::String(time::format(self)))
    }

    fn from_wire(value: &Value) -> Result<Self, MapperError> {
        time::parse_value(value)
    }

    fn is_blank(value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl WireField for Map<String, Value> {
    fn kind() -> FieldKind {
        FieldKind::Mapping
    }

    fn to_wire(&self) -> Option<Value> {
        Some(Value::Object(self.clone()))
    }

    fn from_wire(value: &Value) -> Result<Self, MapperError> {
        match value {
            Value::Object(map) => Ok(map.clone()),
            other => Err(MapperError::mismatch(Self::kind(), other)),
        }
    }
}

impl<T: WireField> WireField for Option<T> {
    fn kind() -> FieldKind {
        T::kind()
    }

    fn to_wire(&self) -> Option<Value> {
        self.as_ref().and_then(T::to_wire)
    }

    fn from_wire(value: &Value) -> Result<Self, MapperError> {
        if T::is_blank(value) {
            return Ok(None);
        }
        T::from_wire(value).map(Some)
    }
}

impl<T: WireField> WireField for Vec<T> {
    fn kind() -> FieldKind {
        FieldKind::List(Box::new(T::kind()))
    }

    fn to_wire(&self) -> Option<Value> {
        Some(Value::Array(
            self.iter()
                .map(|item| item.to_wire().unwrap_or(Value::Null))
                .collect(),
        ))
    }

    fn from_wire(value: &Value) -> Result<Self, MapperError> {
        match value {
            Value::Array(items) => items.iter().map(T::from_wire).collect(),
            other => Err(MapperError::mismatch(Self::kind(), other)),
        }
    }
}

impl<T: WireField> WireField for BTreeMap<String, T> {
    fn kind() -> FieldKind {
        FieldKind::Map(Box::new(T::kind()))
    }

    fn to_wire(&self) -> Option<Value> {
        Some(Value::Object(
            self.iter()
                .filter_map(|(key, item)| item.to_wire().map(|v| (key.clone(), v)))
                .collect(),
        ))
    }

    fn from_wire(value: &Value) -> Result<Self, MapperError> {
        match value {
            Value::Object(entries) => entries
                .iter()
                .map(|(key, item)| T::from_wire(item).map(|v| (key.clone(), v)))
                .collect(),
            other => Err(MapperError::mismatch(Self::kind(), other)),
        }
    }
}
