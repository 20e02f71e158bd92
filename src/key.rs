//! Canonical key derivation
//!
//! Every per-key structure in this crate (generation counters, in-flight
//! tokens, store entries, armed revalidations) is indexed by a stable string
//! identity derived from an arbitrary structured key. Two keys with equal
//! canonical identity name the same logical resource.

use std::fmt;

use serde::Serialize;

use crate::error::KeyError;

/// Stable string identity derived from a structured cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reduce an arbitrary serializable key to its canonical identity.
///
/// Bare strings canonicalize to themselves; any other structure
/// canonicalizes to its compact JSON rendering, so two structurally equal
/// keys always produce the same identity. Fails before any side effect when
/// the key cannot be serialized or when the rendering has no usable
/// identity (`null`, which also covers non-finite floats, or an empty
/// string).
///
/// # Arguments
/// * `key` - The structured key identifying a logical resource
///
/// # Returns
/// * `Ok(CanonicalKey)` - The stable identity
/// * `Err(KeyError)` - If no stable identity can be produced
pub fn canonicalize<K>(key: &K) -> Result<CanonicalKey, KeyError>
where
    K: Serialize + ?Sized,
{
    let rendered = match serde_json::to_value(key)? {
        serde_json::Value::Null => return Err(KeyError::Unrepresentable),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    };

    if rendered.is_empty() {
        return Err(KeyError::Unrepresentable);
    }

    Ok(CanonicalKey(rendered))
}
