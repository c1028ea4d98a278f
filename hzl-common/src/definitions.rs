//! Definition records consumed by the compiler
//!
//! These are the already-parsed forms of the source documents. Each document
//! on disk has exactly one top-level key naming its kind, modelled by
//! [`Document`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::params::ParamKind;
use crate::partials::PartialStateSet;
use crate::{Error, Result};

/// Namespace + name pair resolved externally by a loader
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DefinitionRef {
    pub namespace: String,
    pub name: String,
}

impl DefinitionRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for DefinitionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Where one harmonic series parameter gets its per-harmonic values
#[derive(Debug, Clone, PartialEq)]
pub enum ParamSource<'a> {
    Constant(f64),
    /// Expression in `harmonic_index`
    Expression(&'a str),
}

fn default_base_frequency() -> f64 {
    1.0
}

/// Harmonic series: one partial per harmonic, values constant or expression-derived
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarmonicSeriesDefinition {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub layer: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default = "default_base_frequency")]
    pub base_frequency: f64,
    /// Required; must be positive
    #[serde(default)]
    pub number_of_harmonics: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amplitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amplitude_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azimuth: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azimuth_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_expression: Option<String>,
}

impl Default for HarmonicSeriesDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            namespace: String::new(),
            layer: String::new(),
            labels: Vec::new(),
            base_frequency: default_base_frequency(),
            number_of_harmonics: None,
            frequency: None,
            frequency_expression: None,
            amplitude: None,
            amplitude_expression: None,
            phase: None,
            phase_expression: None,
            azimuth: None,
            azimuth_expression: None,
            elevation: None,
            elevation_expression: None,
            distance: None,
            distance_expression: None,
        }
    }
}

impl HarmonicSeriesDefinition {
    pub fn id(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    fn declarations(&self, kind: ParamKind) -> (Option<f64>, Option<&str>) {
        let (constant, expression) = match kind {
            ParamKind::Frequency => (self.frequency, &self.frequency_expression),
            ParamKind::Amplitude => (self.amplitude, &self.amplitude_expression),
            ParamKind::Phase => (self.phase, &self.phase_expression),
            ParamKind::Azimuth => (self.azimuth, &self.azimuth_expression),
            ParamKind::Elevation => (self.elevation, &self.elevation_expression),
            ParamKind::Distance => (self.distance, &self.distance_expression),
        };
        (constant, expression.as_deref())
    }

    /// Declared source for `kind`; declaring both forms is a configuration error
    pub fn source(&self, kind: ParamKind) -> Result<Option<ParamSource<'_>>> {
        match self.declarations(kind) {
            (Some(_), Some(_)) => Err(Error::Config(format!(
                "Both {0} and {0}_expression are provided; only one is allowed",
                kind
            ))),
            (Some(value), None) => Ok(Some(ParamSource::Constant(value))),
            (None, Some(expr)) => Ok(Some(ParamSource::Expression(expr))),
            (None, None) => Ok(None),
        }
    }

    /// Set a constant for `kind` (test and embedding convenience)
    pub fn set_constant(&mut self, kind: ParamKind, value: f64) {
        let slot = match kind {
            ParamKind::Frequency => &mut self.frequency,
            ParamKind::Amplitude => &mut self.amplitude,
            ParamKind::Phase => &mut self.phase,
            ParamKind::Azimuth => &mut self.azimuth,
            ParamKind::Elevation => &mut self.elevation,
            ParamKind::Distance => &mut self.distance,
        };
        *slot = Some(value);
    }

    /// Set an expression for `kind` (test and embedding convenience)
    pub fn set_expression(&mut self, kind: ParamKind, expression: impl Into<String>) {
        let slot = match kind {
            ParamKind::Frequency => &mut self.frequency_expression,
            ParamKind::Amplitude => &mut self.amplitude_expression,
            ParamKind::Phase => &mut self.phase_expression,
            ParamKind::Azimuth => &mut self.azimuth_expression,
            ParamKind::Elevation => &mut self.elevation_expression,
            ParamKind::Distance => &mut self.distance_expression,
        };
        *slot = Some(expression.into());
    }
}

/// Key that identifies a note; feeds the output labels only
pub const NOTE_ID_KEY: &str = "note";

/// One scale note: arbitrary named properties, `note` required
pub type Note = Map<String, Value>;

/// Explicit ordered list of notes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaleDefinition {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub layer: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl ScaleDefinition {
    pub fn id(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// Transformations this compiler knows how to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformationKind {
    FlattenedCartesianProduct,
}

impl TransformationKind {
    pub fn from_declared(name: &str) -> Option<Self> {
        match name {
            "Flattened Cartesian Product" => Some(TransformationKind::FlattenedCartesianProduct),
            _ => None,
        }
    }
}

/// One named step of a transformation definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformationStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformationEntry {
    pub transformation: TransformationStep,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformationDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub transformations: Vec<TransformationEntry>,
}

impl TransformationDefinition {
    /// Definition with a single step of the given declared type
    pub fn single_step(name: impl Into<String>, namespace: impl Into<String>, kind: &str) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            labels: Vec::new(),
            transformations: vec![TransformationEntry {
                transformation: TransformationStep {
                    name: None,
                    kind: Some(kind.to_string()),
                },
            }],
        }
    }

    /// Only the first step's declared type is consulted
    pub fn kind(&self) -> Result<TransformationKind> {
        let declared = self
            .transformations
            .first()
            .and_then(|entry| entry.transformation.kind.as_deref());
        match declared {
            Some(name) => TransformationKind::from_declared(name)
                .ok_or_else(|| Error::UnsupportedTransformation(name.to_string())),
            None => Err(Error::UnsupportedTransformation(format!(
                "transformation '{}/{}' declares no type",
                self.namespace, self.name
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialStateSetRefEntry {
    pub partial_state_set: DefinitionRef,
}

/// A set derived by transforming two existing sets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualPartialStateSetDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub transformation: DefinitionRef,
    #[serde(default)]
    pub partial_state_sets: Vec<PartialStateSetRefEntry>,
}

impl VirtualPartialStateSetDefinition {
    pub fn new(transformation: DefinitionRef, sources: Vec<DefinitionRef>) -> Self {
        Self {
            name: None,
            namespace: None,
            transformation,
            partial_state_sets: sources
                .into_iter()
                .map(|partial_state_set| PartialStateSetRefEntry { partial_state_set })
                .collect(),
        }
    }

    pub fn sources(&self) -> impl Iterator<Item = &DefinitionRef> {
        self.partial_state_sets.iter().map(|e| &e.partial_state_set)
    }

    pub fn id(&self) -> String {
        match (&self.namespace, &self.name) {
            (Some(ns), Some(name)) => format!("{}/{}", ns, name),
            (None, Some(name)) => name.clone(),
            _ => format!("virtual set via {}", self.transformation),
        }
    }
}

/// Any document a loader can hand back, keyed by its top-level tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DocumentFile", into = "DocumentFile")]
pub enum Document {
    HarmonicSeries(HarmonicSeriesDefinition),
    Scale(ScaleDefinition),
    Transformation(TransformationDefinition),
    VirtualPartialStateSet(VirtualPartialStateSetDefinition),
    PartialStateSet(PartialStateSet),
}

impl Document {
    /// Top-level key this document is stored under
    pub fn kind_name(&self) -> &'static str {
        match self {
            Document::HarmonicSeries(_) => "harmonic_series",
            Document::Scale(_) => "scale",
            Document::Transformation(_) => "partial_state_set_transformation",
            Document::VirtualPartialStateSet(_) => "virtual_partial_state_set",
            Document::PartialStateSet(_) => "partial_state_set",
        }
    }
}

/// On-disk layout: a mapping with exactly one recognized top-level key
///
/// Spelled out as a struct rather than an externally tagged enum so that
/// every serde format reads it as a plain mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DocumentFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    harmonic_series: Option<HarmonicSeriesDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scale: Option<ScaleDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    partial_state_set_transformation: Option<TransformationDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    virtual_partial_state_set: Option<VirtualPartialStateSetDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    partial_state_set: Option<PartialStateSet>,
}

impl TryFrom<DocumentFile> for Document {
    type Error = String;

    fn try_from(file: DocumentFile) -> std::result::Result<Self, Self::Error> {
        let mut found: Vec<Document> = Vec::with_capacity(1);
        found.extend(file.harmonic_series.map(Document::HarmonicSeries));
        found.extend(file.scale.map(Document::Scale));
        found.extend(file.partial_state_set_transformation.map(Document::Transformation));
        found.extend(file.virtual_partial_state_set.map(Document::VirtualPartialStateSet));
        found.extend(file.partial_state_set.map(Document::PartialStateSet));

        match found.len() {
            1 => Ok(found.remove(0)),
            0 => Err("document has no recognized top-level key (expected one of harmonic_series, \
                      scale, partial_state_set_transformation, virtual_partial_state_set, \
                      partial_state_set)"
                .to_string()),
            _ => Err(format!(
                "document has several top-level kinds: {}",
                found.iter().map(Document::kind_name).collect::<Vec<_>>().join(", ")
            )),
        }
    }
}

impl From<Document> for DocumentFile {
    fn from(doc: Document) -> Self {
        let mut file = DocumentFile::default();
        match doc {
            Document::HarmonicSeries(d) => file.harmonic_series = Some(d),
            Document::Scale(d) => file.scale = Some(d),
            Document::Transformation(d) => file.partial_state_set_transformation = Some(d),
            Document::VirtualPartialStateSet(d) => file.virtual_partial_state_set = Some(d),
            Document::PartialStateSet(d) => file.partial_state_set = Some(d),
        }
        file
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_rejects_both_forms() {
        for kind in ParamKind::ALL {
            let mut def = HarmonicSeriesDefinition::default();
            def.set_constant(kind, 0.5);
            def.set_expression(kind, "harmonic_index");
            match def.source(kind) {
                Err(Error::Config(msg)) => assert!(msg.contains(kind.name())),
                other => panic!("{}: expected Config error, got {:?}", kind, other),
            }
        }
    }

    #[test]
    fn test_source_forms() {
        let mut def = HarmonicSeriesDefinition::default();
        def.set_constant(ParamKind::Amplitude, 0.25);
        def.set_expression(ParamKind::Frequency, "harmonic_index * 2");

        assert_eq!(def.source(ParamKind::Amplitude).unwrap(), Some(ParamSource::Constant(0.25)));
        assert_eq!(
            def.source(ParamKind::Frequency).unwrap(),
            Some(ParamSource::Expression("harmonic_index * 2"))
        );
        assert_eq!(def.source(ParamKind::Phase).unwrap(), None);
    }

    #[test]
    fn test_base_frequency_defaults_to_one() {
        let def: HarmonicSeriesDefinition = serde_json::from_value(json!({
            "name": "h", "namespace": "ns", "number_of_harmonics": 4
        }))
        .unwrap();
        assert_eq!(def.base_frequency, 1.0);
        assert_eq!(def.number_of_harmonics, Some(4));
    }

    #[test]
    fn test_transformation_kind() {
        let def = TransformationDefinition::single_step("t", "ns", "Flattened Cartesian Product");
        assert_eq!(def.kind().unwrap(), TransformationKind::FlattenedCartesianProduct);

        let def = TransformationDefinition::single_step("t", "ns", "Interleave");
        assert!(matches!(def.kind(), Err(Error::UnsupportedTransformation(n)) if n == "Interleave"));

        let empty = TransformationDefinition::default();
        assert!(matches!(empty.kind(), Err(Error::UnsupportedTransformation(_))));
    }

    #[test]
    fn test_document_tagging() {
        let doc: Document = serde_json::from_value(json!({
            "partial_state_set_transformation": {
                "name": "product",
                "namespace": "transforms",
                "transformations": [{"transformation": {"name": "step1", "type": "Flattened Cartesian Product"}}]
            }
        }))
        .unwrap();
        assert_eq!(doc.kind_name(), "partial_state_set_transformation");
        match doc {
            Document::Transformation(t) => assert_eq!(t.transformations.len(), 1),
            other => panic!("unexpected document {:?}", other),
        }
    }

    #[test]
    fn test_document_requires_exactly_one_kind() {
        let none: std::result::Result<Document, _> = serde_json::from_value(json!({"language": "hzl"}));
        assert!(none.is_err());

        let both: std::result::Result<Document, _> = serde_json::from_value(json!({
            "scale": {"name": "s", "namespace": "ns"},
            "partial_state_set": {"name": "p", "namespace": "ns"}
        }));
        let err = both.unwrap_err().to_string();
        assert!(err.contains("several top-level kinds"), "{}", err);
    }

    #[test]
    fn test_virtual_sources_unwrap_entries() {
        let def: VirtualPartialStateSetDefinition = serde_json::from_value(json!({
            "transformation": {"namespace": "t", "name": "product"},
            "partial_state_sets": [
                {"partial_state_set": {"namespace": "a", "name": "A"}},
                {"partial_state_set": {"namespace": "b", "name": "B"}}
            ]
        }))
        .unwrap();
        let names: Vec<String> = def.sources().map(|r| r.to_string()).collect();
        assert_eq!(names, ["a/A", "b/B"]);
    }
}
