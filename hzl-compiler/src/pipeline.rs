//! Compilation entry point
//!
//! Dispatches a parsed document to the right expander. Virtual sets pull
//! their transformation and sources through a [`Loader`]; a source can be
//! any compilable document, so virtual sets nest.

use hzl_common::{
    DefinitionRef, Document, Error, PartialStateSet, Result, ResultExt, TransformationDefinition,
    VirtualPartialStateSetDefinition,
};
use tracing::{debug, info};

use crate::loader::Loader;
use crate::transform::{check_arity, transform};
use crate::{harmonic_series, scale};

/// Compile one document into a partial state set
pub fn compile(document: &Document, loader: &dyn Loader) -> Result<PartialStateSet> {
    info!("Compiling {}", document.kind_name());
    match document {
        Document::HarmonicSeries(def) => harmonic_series::expand(def),
        Document::Scale(def) => scale::expand(def),
        Document::VirtualPartialStateSet(def) => {
            let mut stack = Vec::new();
            if let (Some(namespace), Some(name)) = (&def.namespace, &def.name) {
                stack.push(DefinitionRef::new(namespace.as_str(), name.as_str()));
            }
            compile_virtual(def, loader, &mut stack)
        }
        Document::Transformation(def) => Err(Error::Config(format!(
            "transformation '{}/{}' is applied by a virtual_partial_state_set, not compiled directly",
            def.namespace, def.name
        ))),
        Document::PartialStateSet(set) => Err(Error::Config(format!(
            "partial_state_set '{}' is already compiled",
            set.id()
        ))),
    }
}

/// `stack` holds the virtual set references currently being compiled
fn compile_virtual(
    def: &VirtualPartialStateSetDefinition,
    loader: &dyn Loader,
    stack: &mut Vec<DefinitionRef>,
) -> Result<PartialStateSet> {
    let sources: Vec<&DefinitionRef> = def.sources().collect();
    check_arity(sources.len()).with_context(|| format!("virtual_partial_state_set '{}'", def.id()))?;

    let transformation = load_transformation(&def.transformation, loader)
        .with_context(|| format!("virtual_partial_state_set '{}'", def.id()))?;

    let mut sets = Vec::with_capacity(sources.len());
    for reference in sources {
        let set = resolve_source(reference, loader, stack)
            .with_context(|| format!("source '{}'", reference))
            .with_context(|| format!("virtual_partial_state_set '{}'", def.id()))?;
        sets.push(set);
    }

    transform(&transformation, &sets).with_context(|| format!("virtual_partial_state_set '{}'", def.id()))
}

fn load_transformation(reference: &DefinitionRef, loader: &dyn Loader) -> Result<TransformationDefinition> {
    match loader.load(reference).with_context(|| format!("transformation '{}'", reference))? {
        Document::Transformation(def) => Ok(def),
        other => Err(Error::Config(format!(
            "'{}' is a {}, expected partial_state_set_transformation",
            reference,
            other.kind_name()
        ))),
    }
}

/// Load a source reference and compile it down to a partial state set
fn resolve_source(
    reference: &DefinitionRef,
    loader: &dyn Loader,
    stack: &mut Vec<DefinitionRef>,
) -> Result<PartialStateSet> {
    if stack.contains(reference) {
        let chain: Vec<String> = stack
            .iter()
            .chain(std::iter::once(reference))
            .map(ToString::to_string)
            .collect();
        return Err(Error::Config(format!("reference cycle: {}", chain.join(" -> "))));
    }

    let document = loader.load(reference)?;
    debug!("Resolved {} as {}", reference, document.kind_name());
    match document {
        // Range-checked by the transformation before use
        Document::PartialStateSet(set) => Ok(set),
        Document::HarmonicSeries(def) => harmonic_series::expand(&def),
        Document::Scale(def) => scale::expand(&def),
        Document::VirtualPartialStateSet(def) => {
            stack.push(reference.clone());
            let result = compile_virtual(&def, loader, stack);
            stack.pop();
            result
        }
        Document::Transformation(_) => Err(Error::Config(format!(
            "'{}' is a transformation and cannot be used as a source",
            reference
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryLoader;
    use hzl_common::{HarmonicSeriesDefinition, ParamKind, PartialState};

    fn product() -> Document {
        Document::Transformation(TransformationDefinition::single_step(
            "product",
            "transformations",
            "Flattened Cartesian Product",
        ))
    }

    fn stored_set(name: &str, freqs: &[f64]) -> Document {
        Document::PartialStateSet(PartialStateSet {
            name: name.to_string(),
            namespace: "sets".to_string(),
            partial_states: freqs
                .iter()
                .map(|&f| PartialState::new().with(ParamKind::Frequency, f))
                .collect(),
            ..Default::default()
        })
    }

    fn virtual_set(sources: &[(&str, &str)]) -> VirtualPartialStateSetDefinition {
        VirtualPartialStateSetDefinition::new(
            DefinitionRef::new("transformations", "product"),
            sources.iter().map(|(ns, name)| DefinitionRef::new(*ns, *name)).collect(),
        )
    }

    #[test]
    fn test_virtual_over_stored_sets() {
        let loader = MemoryLoader::new()
            .with("transformations", "product", product())
            .with("sets", "a", stored_set("a", &[1.0, 2.0]))
            .with("sets", "b", stored_set("b", &[3.0]));

        let doc = Document::VirtualPartialStateSet(virtual_set(&[("sets", "a"), ("sets", "b")]));
        let out = compile(&doc, &loader).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.name, "a_x_b");
    }

    #[test]
    fn test_virtual_expands_series_on_the_fly() {
        let mut series = HarmonicSeriesDefinition {
            name: "saw".to_string(),
            namespace: "timbres".to_string(),
            number_of_harmonics: Some(3),
            ..Default::default()
        };
        series.set_expression(ParamKind::Amplitude, "1 / harmonic_index");
        let loader = MemoryLoader::new()
            .with("transformations", "product", product())
            .with("timbres", "saw", Document::HarmonicSeries(series))
            .with("sets", "root", stored_set("root", &[220.0]));

        let doc = Document::VirtualPartialStateSet(virtual_set(&[("sets", "root"), ("timbres", "saw")]));
        let out = compile(&doc, &loader).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out.partial_states[2].get(ParamKind::Frequency), Some(220.0));
        assert!((out.partial_states[2].get(ParamKind::Amplitude).unwrap() - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(out.name, "root_x_saw_derived");
    }

    #[test]
    fn test_nested_virtual_sets() {
        let inner = virtual_set(&[("sets", "a"), ("sets", "b")]);
        let loader = MemoryLoader::new()
            .with("transformations", "product", product())
            .with("sets", "a", stored_set("a", &[1.0, 2.0]))
            .with("sets", "b", stored_set("b", &[3.0, 4.0]))
            .with("virtual", "inner", Document::VirtualPartialStateSet(inner));

        let doc = Document::VirtualPartialStateSet(virtual_set(&[("virtual", "inner"), ("sets", "a")]));
        let out = compile(&doc, &loader).unwrap();
        assert_eq!(out.len(), 8);
    }

    #[test]
    fn test_reference_cycle_fails() {
        let mut looping = virtual_set(&[("virtual", "loop"), ("sets", "a")]);
        looping.namespace = Some("virtual".to_string());
        looping.name = Some("loop".to_string());
        let loader = MemoryLoader::new()
            .with("transformations", "product", product())
            .with("sets", "a", stored_set("a", &[1.0]))
            .with("virtual", "loop", Document::VirtualPartialStateSet(looping.clone()));

        let err = compile(&Document::VirtualPartialStateSet(looping), &loader).unwrap_err();
        match err.root() {
            Error::Config(msg) => assert!(msg.contains("cycle"), "{}", msg),
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_arity_checked_before_loading() {
        // Nothing resolvable: arity must fail first
        let loader = MemoryLoader::new();
        let doc = Document::VirtualPartialStateSet(virtual_set(&[("sets", "a")]));
        assert!(matches!(compile(&doc, &loader).unwrap_err().root(), Error::Config(_)));
    }

    #[test]
    fn test_missing_source_is_not_found() {
        let loader = MemoryLoader::new()
            .with("transformations", "product", product())
            .with("sets", "a", stored_set("a", &[1.0]));
        let doc = Document::VirtualPartialStateSet(virtual_set(&[("sets", "a"), ("sets", "missing")]));

        let err = compile(&doc, &loader).unwrap_err();
        assert!(matches!(err.root(), Error::NotFound(_)));
        assert!(err.to_string().contains("sets/missing"), "{}", err);
    }

    #[test]
    fn test_wrong_document_kind_for_transformation() {
        let loader = MemoryLoader::new()
            .with("transformations", "product", stored_set("oops", &[1.0]))
            .with("sets", "a", stored_set("a", &[1.0]));
        let doc = Document::VirtualPartialStateSet(virtual_set(&[("sets", "a"), ("sets", "a")]));
        assert!(matches!(compile(&doc, &loader).unwrap_err().root(), Error::Config(_)));
    }

    #[test]
    fn test_compiled_set_is_not_an_input() {
        let loader = MemoryLoader::new();
        assert!(matches!(compile(&stored_set("a", &[1.0]), &loader), Err(Error::Config(_))));
        assert!(matches!(compile(&product(), &loader), Err(Error::Config(_))));
    }
}
