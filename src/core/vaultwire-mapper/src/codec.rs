//! Generic encode/decode driven by record schemas.

use serde_json::{Map, Value};

use crate::{MapperError, Record};

/// Converts a record into a wire mapping keyed by wire names.
///
/// Fields with an empty or ignored wire name are skipped, as are optional
/// fields that hold no value. Nested records become nested mappings.
pub fn encode<R: Record>(record: &R) -> Map<String, Value> {
    let mut mapping = Map::new();
    for spec in R::schema().mapped() {
        if let Some(value) = record.field(spec.name) {
            mapping.insert(spec.wire.to_string(), value);
        }
    }
    mapping
}

/// Like [`encode`], but a missing record yields an empty mapping.
pub fn encode_opt<R: Record>(record: Option<&R>) -> Map<String, Value> {
    record.map(encode).unwrap_or_default()
}

/// Builds a record from a wire mapping.
///
/// Keys are matched case-sensitively against wire names. Unknown keys are
/// ignored, and absent or `null` keys leave the field at its default value.
/// The first field that cannot be converted aborts decoding with
/// [`MapperError::Decode`].
pub fn decode<R: Record>(mapping: &Map<String, Value>) -> Result<R, MapperError> {
    let schema = R::schema();
    let mut record = R::default();

    for spec in schema.mapped() {
        let value = match mapping.get(spec.wire) {
            None | Some(Value::Null) => continue,
            Some(value) => value,
        };
        record
            .set_field(spec.name, value)
            .map_err(|source| MapperError::Decode {
                record: schema.name,
                field: spec.wire,
                source: Box::new(source),
            })?;
    }

    Ok(record)
}

/// Builds a record from any wire value; `null` yields the default record.
pub fn decode_value<R: Record>(value: &Value) -> Result<R, MapperError> {
    match value {
        Value::Object(mapping) => decode(mapping),
        Value::Null => Ok(R::default()),
        other => Err(MapperError::mismatch(
            format!("record {}", R::schema().name),
            other,
        )),
    }
}
