// Custom deserialization helpers for the raw config structs.

use serde::{Deserialize, Deserializer};

/// Keeps an explicit `null` apart from an absent key.
///
/// Paired with `#[serde(default)]`: a missing key stays `None`, `key: null`
/// becomes `Some(None)` and a value becomes `Some(Some(value))`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Option::<T>::deserialize(deserializer).map(Some)
}
