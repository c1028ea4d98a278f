//! Harmonic series expansion
//!
//! Produces one partial state per harmonic, indices `1..=number_of_harmonics`.
//! Each of the six parameter kinds is either a constant (same value for every
//! harmonic), an expression in `harmonic_index` (frequency additionally scaled
//! by `base_frequency`), or omitted.

use hzl_common::definitions::ParamSource;
use hzl_common::{Error, HarmonicSeriesDefinition, ParamKind, PartialState, PartialStateSet, Result, ResultExt};
use tracing::{debug, info};

use crate::expression::{expression_error, Expression};
use crate::derived_name;

/// Per-kind value generator, prepared before any harmonic is evaluated
enum Generator {
    Constant(f64),
    Expression(Expression),
}

/// Expand a harmonic series definition into a partial state set
pub fn expand(def: &HarmonicSeriesDefinition) -> Result<PartialStateSet> {
    expand_inner(def).with_context(|| format!("harmonic_series '{}'", def.id()))
}

fn expand_inner(def: &HarmonicSeriesDefinition) -> Result<PartialStateSet> {
    let count = match def.number_of_harmonics {
        Some(n) if n > 0 => n,
        Some(_) => {
            return Err(Error::Config(
                "number_of_harmonics must be a positive integer".to_string(),
            ))
        }
        None => {
            return Err(Error::Config(
                "number_of_harmonics must be provided as an integer".to_string(),
            ))
        }
    };

    // Resolve every kind up front so conflicting declarations fail before
    // any expression is evaluated
    let mut sources = Vec::with_capacity(ParamKind::ALL.len());
    for kind in ParamKind::ALL {
        if let Some(source) = def.source(kind)? {
            sources.push((kind, source));
        }
    }

    let mut generators = Vec::with_capacity(sources.len());
    for (kind, source) in sources {
        let generator = match source {
            ParamSource::Constant(value) => Generator::Constant(value),
            ParamSource::Expression(text) => Generator::Expression(
                Expression::parse(text)
                    .map_err(|e| expression_error(text, 1, e.to_string()))
                    .context(format!("{}_expression", kind))?,
            ),
        };
        generators.push((kind, generator));
    }

    info!(
        "Expanding harmonic series {} ({} harmonics, {} parameters)",
        def.id(),
        count,
        generators.len()
    );

    let mut partial_states = Vec::with_capacity(count as usize);
    for harmonic_index in 1..=count {
        let mut state = PartialState::new();
        for (kind, generator) in &generators {
            let value = match generator {
                Generator::Constant(value) => *value,
                Generator::Expression(expr) => {
                    let raw = expr
                        .evaluate(harmonic_index)
                        .with_context(|| format!("{}_expression", kind))?;
                    if *kind == ParamKind::Frequency {
                        raw * def.base_frequency
                    } else {
                        raw
                    }
                }
            };
            kind.validate(value)
                .with_context(|| format!("harmonic {}", harmonic_index))?;
            state.set(*kind, value);
        }
        state.partial_index = Some(harmonic_index as usize);
        // Display label is 0-based while partial_index is 1-based
        state.labels = vec![format!("harmonic {}", harmonic_index - 1)];
        debug!("harmonic {}: {:?}", harmonic_index, state);
        partial_states.push(state);
    }

    Ok(PartialStateSet {
        name: derived_name(&def.name),
        namespace: derived_name(&def.namespace),
        labels: def.labels.clone(),
        layer: def.layer.clone(),
        partial_states,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(count: u32) -> HarmonicSeriesDefinition {
        HarmonicSeriesDefinition {
            name: "saw".to_string(),
            namespace: "timbres".to_string(),
            layer: "default".to_string(),
            labels: vec!["bright".to_string()],
            number_of_harmonics: Some(count),
            ..Default::default()
        }
    }

    #[test]
    fn test_indices_and_labels() {
        let set = expand(&series(4)).unwrap();

        assert_eq!(set.len(), 4);
        let indices: Vec<Option<usize>> = set.partial_states.iter().map(|s| s.partial_index).collect();
        assert_eq!(indices, vec![Some(1), Some(2), Some(3), Some(4)]);
        assert_eq!(set.partial_states[0].labels, vec!["harmonic 0"]);
        assert_eq!(set.partial_states[3].labels, vec!["harmonic 3"]);
    }

    #[test]
    fn test_metadata_derivation() {
        let set = expand(&series(1)).unwrap();
        assert_eq!(set.name, "saw_derived");
        assert_eq!(set.namespace, "timbres_derived");
        assert_eq!(set.layer, "default");
        assert_eq!(set.labels, vec!["bright"]);
    }

    #[test]
    fn test_constants_repeat() {
        let mut def = series(5);
        def.set_constant(ParamKind::Amplitude, 0.3);
        def.set_constant(ParamKind::Azimuth, -0.5);

        let set = expand(&def).unwrap();
        for state in &set.partial_states {
            assert_eq!(state.get(ParamKind::Amplitude), Some(0.3));
            assert_eq!(state.get(ParamKind::Azimuth), Some(-0.5));
            assert!(!state.contains(ParamKind::Frequency));
            assert!(!state.contains(ParamKind::Phase));
        }
    }

    #[test]
    fn test_constant_frequency_ignores_base() {
        let mut def = series(2);
        def.base_frequency = 100.0;
        def.set_constant(ParamKind::Frequency, 440.0);

        let set = expand(&def).unwrap();
        assert_eq!(set.partial_states[1].get(ParamKind::Frequency), Some(440.0));
    }

    #[test]
    fn test_frequency_expression_scaled_by_base() {
        let mut def = series(3);
        def.base_frequency = 110.0;
        def.set_expression(ParamKind::Frequency, "harmonic_index");
        def.set_expression(ParamKind::Amplitude, "1 / harmonic_index");

        let set = expand(&def).unwrap();
        let freqs: Vec<f64> = set.partial_states.iter().filter_map(|s| s.get(ParamKind::Frequency)).collect();
        assert_eq!(freqs, vec![110.0, 220.0, 330.0]);
        assert_eq!(set.partial_states[1].get(ParamKind::Amplitude), Some(0.5));
    }

    #[test]
    fn test_both_forms_fail_for_every_kind() {
        for kind in ParamKind::ALL {
            let mut def = series(2);
            def.set_constant(kind, 0.0);
            // Would fail to evaluate; the configuration check must come first
            def.set_expression(kind, "1 / 0");
            let err = expand(&def).unwrap_err();
            assert!(matches!(err.root(), Error::Config(_)), "{}: {}", kind, err);
        }
    }

    #[test]
    fn test_conflict_detected_before_evaluation() {
        let mut def = series(2);
        def.set_expression(ParamKind::Frequency, "undefined_name");
        def.set_constant(ParamKind::Distance, 1.0);
        def.set_expression(ParamKind::Distance, "harmonic_index");

        let err = expand(&def).unwrap_err();
        assert!(matches!(err.root(), Error::Config(_)), "{}", err);
    }

    #[test]
    fn test_number_of_harmonics_required() {
        let mut def = series(1);
        def.number_of_harmonics = None;
        assert!(matches!(expand(&def).unwrap_err().root(), Error::Config(_)));

        def.number_of_harmonics = Some(0);
        assert!(matches!(expand(&def).unwrap_err().root(), Error::Config(_)));
    }

    #[test]
    fn test_out_of_range_value_fails() {
        let mut def = series(10);
        def.base_frequency = 3000.0;
        def.set_expression(ParamKind::Frequency, "harmonic_index");

        let err = expand(&def).unwrap_err();
        match err.root() {
            Error::OutOfRange { name, value, .. } => {
                assert_eq!(name, "frequency");
                assert_eq!(*value, 21000.0);
            }
            other => panic!("expected OutOfRange, got {:?}", other),
        }
        assert!(err.to_string().contains("harmonic 7"), "{}", err);
    }

    #[test]
    fn test_out_of_range_constant_fails() {
        let mut def = series(1);
        def.set_constant(ParamKind::Amplitude, 1.5);
        assert!(matches!(expand(&def).unwrap_err().root(), Error::OutOfRange { .. }));
    }

    #[test]
    fn test_expression_failure_reports_index() {
        // 0.25, 1.0, then division by zero at the third harmonic
        let mut def = series(4);
        def.set_expression(ParamKind::Amplitude, "1 / (harmonic_index - 3)^2");

        let err = expand(&def).unwrap_err();
        match err.root() {
            Error::Expression { harmonic_index, cause, .. } => {
                assert_eq!(*harmonic_index, 3);
                assert_eq!(cause, "division by zero");
            }
            other => panic!("expected Expression error, got {:?}", other),
        }
        assert!(err.to_string().contains("amplitude_expression"), "{}", err);
    }

    #[test]
    fn test_overflowing_literal_is_expression_error() {
        let mut def = series(2);
        def.set_expression(ParamKind::Distance, "1e999");

        let err = expand(&def).unwrap_err();
        assert!(matches!(err.root(), Error::Expression { .. }), "{:?}", err);
        assert!(err.to_string().contains("distance_expression"), "{}", err);
    }
}
