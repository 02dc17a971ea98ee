//! # Vaultwire Mapper
//!
//! Schema-driven conversion between typed records and the untyped payloads
//! exchanged with the secrets server.
//!
//! ## Features
//!
//! - Declarative records with per-field wire names ([`record!`])
//! - Lossless encode/decode including nested records and timestamps
//! - Integral float narrowing for integer fields
//! - Text rendering of list responses, optionally path-qualified
//! - Duration string parsing for engine configuration values

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod duration;
pub mod error;
pub mod field;
pub mod schema;
pub mod slice;
pub mod time;

pub use codec::{decode, decode_value, encode, encode_opt};
pub use duration::parse_duration;
pub use error::MapperError;
pub use field::WireField;
pub use schema::{FieldKind, FieldSpec, Record, Schema, IGNORED};
pub use slice::{to_strings, to_strings_with_path_prefix, to_strings_with_prefix};

pub use serde_json::{Map, Value};

/// Generic wire mapping: ordered string keys to wire values.
pub type Mapping = Map<String, Value>;
