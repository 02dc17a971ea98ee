//! Static record schemas and the [`Record`] trait.
//!
//! A schema is a table of `(field name, wire name, kind)` entries describing
//! how a typed record maps onto a wire mapping. Schemas are normally produced
//! by the [`record!`](crate::record) macro together with the struct itself.

use std::fmt;

use serde_json::Value;

use crate::MapperError;

/// Wire name that marks a field as ignored.
pub const IGNORED: &str = "-";

/// Shape of a field as seen on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// UTF-8 string.
    Text,
    /// Integer number (wire floats are narrowed when integral).
    Integer,
    /// Floating point number.
    Float,
    /// Boolean flag.
    Boolean,
    /// RFC3339 timestamp with nanosecond precision.
    Timestamp,
    /// Untyped mapping passed through as-is.
    Mapping,
    /// Ordered sequence of values of one kind.
    List(Box<FieldKind>),
    /// Mapping from string keys to values of one kind.
    Map(Box<FieldKind>),
    /// Nested record.
    Record(&'static Schema),
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Text => write!(f, "string"),
            FieldKind::Integer => write!(f, "integer"),
            FieldKind::Float => write!(f, "float"),
            FieldKind::Boolean => write!(f, "boolean"),
            FieldKind::Timestamp => write!(f, "timestamp"),
            FieldKind::Mapping => write!(f, "mapping"),
            FieldKind::List(inner) => write!(f, "sequence of {}", inner),
            FieldKind::Map(inner) => write!(f, "mapping of {}", inner),
            FieldKind::Record(schema) => write!(f, "record {}", schema.name),
        }
    }
}

/// One entry of a record schema.
#[derive(Clone, Copy)]
pub struct FieldSpec {
    /// Rust field name.
    pub name: &'static str,
    /// Wire name; empty or [`IGNORED`] leaves the field out of the mapping.
    pub wire: &'static str,
    /// Kind resolver for the field's type.
    pub kind: fn() -> FieldKind,
}

impl FieldSpec {
    /// Whether the field takes part in encoding and decoding.
    pub fn is_mapped(&self) -> bool {
        !self.wire.is_empty() && self.wire != IGNORED
    }

    /// Wire shape of the field.
    pub fn kind(&self) -> FieldKind {
        (self.kind)()
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("wire", &self.wire)
            .finish()
    }
}

/// Schema of a record type: its name and ordered field table.
#[derive(Debug)]
pub struct Schema {
    /// Record type name, used in error messages.
    pub name: &'static str,
    /// Fields in declaration order.
    pub fields: &'static [FieldSpec],
}

impl Schema {
    /// Looks up a field by its wire name.
    pub fn by_wire(&self, wire: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|spec| spec.is_mapped() && spec.wire == wire)
    }

    /// Iterates over the fields that take part in the mapping.
    pub fn mapped(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|spec| spec.is_mapped())
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || self.name == other.name
    }
}

/// A typed record that can be converted to and from a wire mapping.
///
/// Implementations are generated by [`record!`](crate::record); the generic
/// [`encode`](crate::encode) and [`decode`](crate::decode) routines drive them
/// through the schema table.
pub trait Record: Default {
    /// Static schema of the record.
    fn schema() -> &'static Schema;

    /// Wire value of the named field, `None` when the field is absent
    /// (an unset optional) and must be omitted.
    fn field(&self, name: &str) -> Option<Value>;

    /// Assigns the named field from a wire value.
    fn set_field(&mut self, name: &str, value: &Value) -> Result<(), MapperError>;
}

/// Declares a record struct together with its schema and [`Record`] impl.
///
/// Each field is written as `name: Type => "wire_name"`. A wire name of `""`
/// or `"-"` keeps the field on the struct but out of the mapping.
///
/// ```
/// vaultwire_mapper::record! {
///     /// Example record.
///     #[derive(Debug, Default, Clone, PartialEq)]
///     pub struct Login {
///         /// Account name.
///         pub username: String => "username",
///         /// Kept locally only.
///         pub note: String => "-",
///     }
/// }
///
/// let login = Login { username: "root".into(), note: "local".into() };
/// let mapping = vaultwire_mapper::encode(&login);
/// assert_eq!(mapping.len(), 1);
/// assert_eq!(mapping["username"], "root");
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty => $wire:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::Record for $name {
            fn schema() -> &'static $crate::Schema {
                static SCHEMA: $crate::Schema = $crate::Schema {
                    name: stringify!($name),
                    fields: &[
                        $(
                            $crate::FieldSpec {
                                name: stringify!($field),
                                wire: $wire,
                                kind: <$ty as $crate::WireField>::kind,
                            },
                        )*
                    ],
                };
                &SCHEMA
            }

            fn field(&self, name: &str) -> ::std::option::Option<$crate::Value> {
                $(
                    if name == stringify!($field) {
                        return $crate::WireField::to_wire(&self.$field);
                    }
                )*
                ::std::option::Option::None
            }

            fn set_field(
                &mut self,
                name: &str,
                value: &$crate::Value,
            ) -> ::std::result::Result<(), $crate::MapperError> {
                $(
                    if name == stringify!($field) {
                        self.$field = <$ty as $crate::WireField>::from_wire(value)?;
                        return ::std::result::Result::Ok(());
                    }
                )*
                ::std::result::Result::Ok(())
            }
        }

        impl $crate::WireField for $name {
            fn kind() -> $crate::FieldKind {
                $crate::FieldKind::Record(<$name as $crate::Record>::schema())
            }

            fn to_wire(&self) -> ::std::option::Option<$crate::Value> {
                ::std::option::Option::Some($crate::Value::Object($crate::encode(self)))
            }

            fn from_wire(
                value: &$crate::Value,
            ) -> ::std::result::Result<Self, $crate::MapperError> {
                $crate::decode_value(value)
            }
        }
    };
}
