//! Scale expansion
//!
//! Each note becomes one partial state, in declared order, with a 0-based
//! `partial_index`. The note identifier goes into the labels; the six
//! parameter keys are range-checked; any other property is carried through
//! verbatim.

use hzl_common::definitions::{Note, NOTE_ID_KEY};
use hzl_common::{Error, ParamKind, PartialState, PartialStateSet, Result, ResultExt, ScaleDefinition};
use serde_json::Value;
use tracing::{debug, info};

use crate::derived_name;

/// Keys a note may not declare, since the expander owns them
const RESERVED_KEYS: [&str; 2] = ["labels", "partial_index"];

/// Expand a scale definition into a partial state set
pub fn expand(def: &ScaleDefinition) -> Result<PartialStateSet> {
    expand_inner(def).with_context(|| format!("scale '{}'", def.id()))
}

fn expand_inner(def: &ScaleDefinition) -> Result<PartialStateSet> {
    if def.notes.is_empty() {
        return Err(Error::Config(
            "scale must contain a 'notes' list with at least one note".to_string(),
        ));
    }

    info!("Expanding scale {} ({} notes)", def.id(), def.notes.len());

    let partial_states = def
        .notes
        .iter()
        .enumerate()
        .map(|(position, note)| note_to_partial(position, note))
        .collect::<Result<Vec<_>>>()?;

    Ok(PartialStateSet {
        name: derived_name(&def.name),
        namespace: derived_name(&def.namespace),
        labels: def.labels.clone(),
        layer: def.layer.clone(),
        partial_states,
    })
}

fn note_to_partial(position: usize, note: &Note) -> Result<PartialState> {
    let label = match note.get(NOTE_ID_KEY) {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Null) | None => {
            return Err(Error::Config(format!(
                "note #{} has no '{}' key for identification",
                position, NOTE_ID_KEY
            )))
        }
        Some(other) => other.to_string(),
    };

    let mut state = PartialState::new();
    for (key, value) in note {
        if key == NOTE_ID_KEY {
            continue;
        }
        if RESERVED_KEYS.contains(&key.as_str()) {
            return Err(Error::Config(format!("'{}' may not be declared on a note", key)))
                .with_context(|| format!("note '{}'", label));
        }
        match ParamKind::from_name(key) {
            Some(kind) => match value {
                Value::Null => state.set_unset(kind),
                Value::Number(n) => {
                    let v = n
                        .as_f64()
                        .ok_or_else(|| Error::Config(format!("{} is not representable as a float", key)))
                        .and_then(|v| kind.validate(v).map(|()| v))
                        .with_context(|| format!("note '{}'", label))?;
                    state.set(kind, v);
                }
                other => {
                    return Err(Error::Config(format!("{} must be numeric, got {}", key, other)))
                        .with_context(|| format!("note '{}'", label))
                }
            },
            None => {
                state.extra.insert(key.clone(), value.clone());
            }
        }
    }

    state.partial_index = Some(position);
    state.labels = vec![label];
    debug!("note {}: {:?}", position, state);
    Ok(state)
}
