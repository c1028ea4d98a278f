//! Partial states and partial state sets
//!
//! A [`PartialState`] is the per-partial parameter record the renderer
//! consumes. On the wire it is a flat mapping:
//!
//! ```yaml
//! partial_state:
//!   partial_index: 1
//!   frequency: 440.0
//!   amplitude: 0.5
//!   phase: null
//!   labels: ["harmonic 0"]
//! ```
//!
//! A missing key means "not specified", which is different from `0.0`.
//! A `null` parameter is an explicit "no value" marker.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::params::ParamKind;

/// Value held by a present parameter slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Value(f64),
    /// Key present, no value (serialized as `null`)
    Unset,
}

impl ParamValue {
    pub fn as_f64(self) -> Option<f64> {
        match self {
            ParamValue::Value(v) => Some(v),
            ParamValue::Unset => None,
        }
    }
}

const PARTIAL_INDEX_KEY: &str = "partial_index";
const LABELS_KEY: &str = "labels";

/// One partial: numeric parameters, bookkeeping, and pass-through properties
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialState {
    /// Position-derived index, unique within the owning set
    pub partial_index: Option<usize>,
    /// Descriptive only
    pub labels: Vec<String>,
    params: [Option<ParamValue>; 6],
    /// Non-parameter properties carried through verbatim (scale notes)
    pub extra: Map<String, Value>,
}

impl PartialState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter for a numeric value
    pub fn with(mut self, kind: ParamKind, value: f64) -> Self {
        self.set(kind, value);
        self
    }

    pub fn set(&mut self, kind: ParamKind, value: f64) {
        self.params[kind as usize] = Some(ParamValue::Value(value));
    }

    /// Present the key with an explicit "no value" marker
    pub fn set_unset(&mut self, kind: ParamKind) {
        self.params[kind as usize] = Some(ParamValue::Unset);
    }

    /// Numeric value, if present and not the unset marker
    pub fn get(&self, kind: ParamKind) -> Option<f64> {
        self.slot(kind).and_then(ParamValue::as_f64)
    }

    /// Raw slot: `None` when the key is absent
    pub fn slot(&self, kind: ParamKind) -> Option<ParamValue> {
        self.params[kind as usize]
    }

    pub fn contains(&self, kind: ParamKind) -> bool {
        self.params[kind as usize].is_some()
    }

    /// Present numeric values in canonical kind order
    pub fn values(&self) -> impl Iterator<Item = (ParamKind, f64)> + '_ {
        ParamKind::ALL
            .into_iter()
            .filter_map(move |kind| self.get(kind).map(|v| (kind, v)))
    }

    fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        if let Some(index) = self.partial_index {
            map.insert(PARTIAL_INDEX_KEY.to_string(), Value::from(index));
        }
        for kind in ParamKind::ALL {
            match self.slot(kind) {
                Some(ParamValue::Value(v)) => {
                    map.insert(kind.name().to_string(), Value::from(v));
                }
                Some(ParamValue::Unset) => {
                    map.insert(kind.name().to_string(), Value::Null);
                }
                None => {}
            }
        }
        for (key, value) in &self.extra {
            map.insert(key.clone(), value.clone());
        }
        map.insert(
            LABELS_KEY.to_string(),
            Value::Array(self.labels.iter().cloned().map(Value::String).collect()),
        );
        map
    }

    fn from_map(map: Map<String, Value>) -> Result<Self, String> {
        let mut state = PartialState::new();
        for (key, value) in map {
            if key == PARTIAL_INDEX_KEY {
                let index = value
                    .as_u64()
                    .ok_or_else(|| format!("partial_index must be a non-negative integer, got {}", value))?;
                state.partial_index = Some(index as usize);
            } else if key == LABELS_KEY {
                state.labels = serde_json::from_value(value)
                    .map_err(|e| format!("labels must be a list of strings: {}", e))?;
            } else if let Some(kind) = ParamKind::from_name(&key) {
                match value {
                    Value::Null => state.set_unset(kind),
                    Value::Number(n) => {
                        let v = n
                            .as_f64()
                            .ok_or_else(|| format!("{} is not representable as f64", key))?;
                        state.set(kind, v);
                    }
                    other => return Err(format!("{} must be numeric, got {}", key, other)),
                }
            } else {
                state.extra.insert(key, value);
            }
        }
        Ok(state)
    }
}

impl Serialize for PartialState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PartialState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        PartialState::from_map(map).map_err(serde::de::Error::custom)
    }
}

/// Ordered collection of partial states plus shared metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialStateSet {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub layer: String,
    #[serde(default, with = "wrapped_states")]
    pub partial_states: Vec<PartialState>,
}

impl PartialStateSet {
    /// `namespace/name`, used in logs and error context
    pub fn id(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    pub fn len(&self) -> usize {
        self.partial_states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partial_states.is_empty()
    }
}

/// `partial_states` entries are wrapped as `- partial_state: {...}` on the wire
mod wrapped_states {
    use super::PartialState;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize)]
    struct EntryRef<'a> {
        partial_state: &'a PartialState,
    }

    #[derive(Deserialize)]
    struct Entry {
        partial_state: PartialState,
    }

    pub fn serialize<S: Serializer>(states: &[PartialState], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(states.iter().map(|partial_state| EntryRef { partial_state }))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<PartialState>, D::Error> {
        let entries = Vec::<Entry>::deserialize(deserializer)?;
        Ok(entries.into_iter().map(|e| e.partial_state).collect())
    }
}
