use serde::{de, Deserialize, Deserializer};

/// The API encodes int64 fields as JSON strings; plain numbers are accepted too.
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrInt {
    String(String),
    Int(i64),
}

/// Deserializes an optional string (or number) into an `Option<i64>`.
pub(crate) fn deserialize_optional_string_to_i64<'de, D>(
    deserializer: D,
) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<StringOrInt>::deserialize(deserializer)? {
        None => Ok(None),
        Some(StringOrInt::Int(value)) => Ok(Some(value)),
        Some(StringOrInt::String(value)) => value.parse().map(Some).map_err(de::Error::custom),
    }
}
