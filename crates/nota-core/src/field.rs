//! Three-state field model for partial mutations.
//!
//! Every entity field distinguishes "not part of this operation" (`Unset`)
//! from "explicitly NULL" (`Null`) from "a value" (`Value`). The distinction
//! is what makes partial UPDATE/DELETE construction safe: an `Unset` field
//! can never reach a bound SQL parameter because the bind layer only accepts
//! the other two states.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A field that is either absent from the operation, explicitly NULL, or a
/// value.
///
/// `Default` is [`FieldState::Unset`], so `..Default::default()` struct
/// updates produce entities that touch nothing.
///
/// In serde terms: a missing key deserializes to `Unset` (via
/// `#[serde(default)]` on the field), JSON `null` to `Null`, and anything
/// else to `Value`. Pair with `skip_serializing_if = "FieldState::is_unset"`
/// so `Unset` fields never appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldState<T> {
    /// Field is not part of this operation.
    Unset,
    /// Field is explicitly NULL.
    Null,
    /// Field carries a value.
    Value(T),
}

// Manual impl: the derive would demand `T: Default`, but `Unset` needs no
// value of `T` at all.
impl<T> Default for FieldState<T> {
    fn default() -> Self {
        FieldState::Unset
    }
}

impl<T> FieldState<T> {
    /// True if the field is not part of the operation.
    pub const fn is_unset(&self) -> bool {
        matches!(self, FieldState::Unset)
    }

    /// True if the field is explicitly NULL.
    pub const fn is_null(&self) -> bool {
        matches!(self, FieldState::Null)
    }

    /// True if the field carries a value.
    pub const fn is_value(&self) -> bool {
        matches!(self, FieldState::Value(_))
    }

    /// Borrow the inner value, if any.
    pub const fn value(&self) -> Option<&T> {
        match self {
            FieldState::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Consume the field, yielding the inner value if any.
    pub fn into_value(self) -> Option<T> {
        match self {
            FieldState::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Consume the field, yielding the inner value or a default.
    pub fn unwrap_or(self, default: T) -> T {
        match self {
            FieldState::Value(v) => v,
            _ => default,
        }
    }

    /// Map the inner value, preserving `Unset`/`Null`.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> FieldState<U> {
        match self {
            FieldState::Unset => FieldState::Unset,
            FieldState::Null => FieldState::Null,
            FieldState::Value(v) => FieldState::Value(f(v)),
        }
    }

    /// Borrowing variant of [`FieldState::map`].
    pub fn as_ref(&self) -> FieldState<&T> {
        match self {
            FieldState::Unset => FieldState::Unset,
            FieldState::Null => FieldState::Null,
            FieldState::Value(v) => FieldState::Value(v),
        }
    }

    /// Replace the field with `Unset`, returning the previous state.
    pub fn take(&mut self) -> FieldState<T> {
        std::mem::replace(self, FieldState::Unset)
    }
}

impl<T> From<T> for FieldState<T> {
    fn from(value: T) -> Self {
        FieldState::Value(value)
    }
}

/// `None` maps to `Null`, not `Unset`: an explicit `Option` in caller code
/// is an explicit statement about the column.
impl<T> From<Option<T>> for FieldState<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => FieldState::Value(v),
            None => FieldState::Null,
        }
    }
}

impl<T: Serialize> Serialize for FieldState<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            // Unset is normally skipped via skip_serializing_if; if forced
            // onto the wire it degrades to null.
            FieldState::Unset | FieldState::Null => serializer.serialize_none(),
            FieldState::Value(v) => serializer.serialize_some(v),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldState<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(Option::<T>::deserialize(deserializer)?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Probe {
        #[serde(default, skip_serializing_if = "FieldState::is_unset")]
        age: FieldState<i64>,
        #[serde(default, skip_serializing_if = "FieldState::is_unset")]
        name: FieldState<String>,
    }

    #[test]
    fn test_default_is_unset() {
        assert_eq!(FieldState::<i64>::default(), FieldState::Unset);
    }

    #[test]
    fn test_three_states_are_distinct() {
        let unset = FieldState::<i64>::Unset;
        let null = FieldState::<i64>::Null;
        let value = FieldState::Value(0);
        assert_ne!(unset, null);
        assert_ne!(null, value);
        assert_ne!(unset, value);
    }

    #[test]
    fn test_value_accessors() {
        let v = FieldState::Value(7);
        assert!(v.is_value());
        assert_eq!(v.value(), Some(&7));
        assert_eq!(v.into_value(), Some(7));
        assert_eq!(FieldState::<i64>::Null.into_value(), None);
        assert_eq!(FieldState::<i64>::Unset.value(), None);
    }

    #[test]
    fn test_map_preserves_tags() {
        assert_eq!(
            FieldState::Value(2).map(|n| n * 2),
            FieldState::Value(4)
        );
        assert_eq!(FieldState::<i64>::Null.map(|n| n * 2), FieldState::Null);
        assert_eq!(FieldState::<i64>::Unset.map(|n| n * 2), FieldState::Unset);
    }

    #[test]
    fn test_take_leaves_unset() {
        let mut f = FieldState::Value("x".to_string());
        assert_eq!(f.take(), FieldState::Value("x".to_string()));
        assert!(f.is_unset());
    }

    #[test]
    fn test_from_option() {
        assert_eq!(FieldState::from(Some(1)), FieldState::Value(1));
        assert_eq!(FieldState::<i64>::from(None), FieldState::Null);
    }

    #[test]
    fn test_serde_unset_is_omitted() {
        let probe = Probe {
            age: FieldState::Unset,
            name: FieldState::Value("paul".to_string()),
        };
        let json = serde_json::to_string(&probe).unwrap();
        assert_eq!(json, r#"{"name":"paul"}"#);
    }

    #[test]
    fn test_serde_null_is_emitted() {
        let probe = Probe {
            age: FieldState::Null,
            name: FieldState::Unset,
        };
        let json = serde_json::to_string(&probe).unwrap();
        assert_eq!(json, r#"{"age":null}"#);
    }

    #[test]
    fn test_serde_round_trip_preserves_distinction() {
        let probe = Probe {
            age: FieldState::Null,
            name: FieldState::Value("paul".to_string()),
        };
        let json = serde_json::to_string(&probe).unwrap();
        let back: Probe = serde_json::from_str(&json).unwrap();
        assert_eq!(back, probe);

        // Missing key comes back as Unset, not Null.
        let back: Probe = serde_json::from_str(r#"{"name":"paul"}"#).unwrap();
        assert!(back.age.is_unset());
        assert_eq!(back.name, FieldState::Value("paul".to_string()));
    }
}
