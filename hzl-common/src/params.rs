//! Partial parameter kinds and their fixed validation ranges
//!
//! Single source of truth for the six numeric parameters a partial state can
//! carry. Range checks and pairwise merge rules are table-driven off
//! [`ParamKind`], so adding a kind is a compile error everywhere it matters.

use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::fmt;

use crate::partials::PartialState;
use crate::{Error, Result};

/// The closed set of numeric partial parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParamKind {
    /// Hz
    Frequency,
    /// Unitless gain
    Amplitude,
    /// Radians
    Phase,
    /// Radians, horizontal placement
    Azimuth,
    /// Radians, vertical placement
    Elevation,
    Distance,
}

/// How two present values of the same kind combine in a pairwise merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeRule {
    /// a × b
    Product,
    /// (a + b) / 2
    Mean,
}

/// What a pairwise merge emits when neither side carries the kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsentPolicy {
    /// Leave the key out of the merged state
    Omit,
    /// Emit the key with an explicit "no value" marker
    ///
    /// The renderer reads an unset phase as "natural phase", so phase keeps
    /// its key even when neither side specifies it.
    Unset,
}

/// Static description of one parameter kind
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub kind: ParamKind,
    pub low: f64,
    pub high: f64,
    pub merge: MergeRule,
    pub absent: AbsentPolicy,
}

/// Indexed by `ParamKind as usize`
const PARAM_TABLE: [ParamSpec; 6] = [
    ParamSpec {
        kind: ParamKind::Frequency,
        low: 0.0,
        high: 20000.0,
        merge: MergeRule::Product,
        absent: AbsentPolicy::Omit,
    },
    ParamSpec {
        kind: ParamKind::Amplitude,
        low: 0.0,
        high: 1.0,
        merge: MergeRule::Product,
        absent: AbsentPolicy::Omit,
    },
    ParamSpec {
        kind: ParamKind::Phase,
        low: -TAU,
        high: TAU,
        merge: MergeRule::Mean,
        absent: AbsentPolicy::Unset,
    },
    ParamSpec {
        kind: ParamKind::Azimuth,
        low: -PI,
        high: PI,
        merge: MergeRule::Mean,
        absent: AbsentPolicy::Omit,
    },
    ParamSpec {
        kind: ParamKind::Elevation,
        low: -FRAC_PI_2,
        high: FRAC_PI_2,
        merge: MergeRule::Mean,
        absent: AbsentPolicy::Omit,
    },
    ParamSpec {
        kind: ParamKind::Distance,
        low: -1000.0,
        high: 1000.0,
        merge: MergeRule::Mean,
        absent: AbsentPolicy::Omit,
    },
];

impl ParamKind {
    /// All kinds, in canonical output order
    pub const ALL: [ParamKind; 6] = [
        ParamKind::Frequency,
        ParamKind::Amplitude,
        ParamKind::Phase,
        ParamKind::Azimuth,
        ParamKind::Elevation,
        ParamKind::Distance,
    ];

    /// Definition key for this kind (also the partial state key)
    pub fn name(self) -> &'static str {
        match self {
            ParamKind::Frequency => "frequency",
            ParamKind::Amplitude => "amplitude",
            ParamKind::Phase => "phase",
            ParamKind::Azimuth => "azimuth",
            ParamKind::Elevation => "elevation",
            ParamKind::Distance => "distance",
        }
    }

    /// Look up a kind by its key; unrecognized names yield `None`
    pub fn from_name(name: &str) -> Option<Self> {
        ParamKind::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn spec(self) -> &'static ParamSpec {
        &PARAM_TABLE[self as usize]
    }

    /// Inclusive allowed range
    pub fn range(self) -> (f64, f64) {
        let spec = self.spec();
        (spec.low, spec.high)
    }

    pub fn merge_rule(self) -> MergeRule {
        self.spec().merge
    }

    pub fn absent_policy(self) -> AbsentPolicy {
        self.spec().absent
    }

    /// Check `value` against this kind's range; never clamps
    pub fn validate(self, value: f64) -> Result<()> {
        let (low, high) = self.range();
        // NaN fails both comparisons and is rejected here too
        if low <= value && value <= high {
            Ok(())
        } else {
            Err(Error::OutOfRange {
                name: self.name().to_string(),
                value,
                low,
                high,
            })
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl MergeRule {
    pub fn combine(self, a: f64, b: f64) -> f64 {
        match self {
            MergeRule::Product => a * b,
            MergeRule::Mean => (a + b) / 2.0,
        }
    }
}

/// Validate a named value; names outside the six kinds always pass
pub fn validate_property(name: &str, value: f64) -> Result<()> {
    match ParamKind::from_name(name) {
        Some(kind) => kind.validate(value),
        None => Ok(()),
    }
}

/// Validate every present parameter of a partial state, stopping at the first failure
pub fn validate_partial(partial: &PartialState) -> Result<()> {
    for (kind, value) in partial.values() {
        kind.validate(value)?;
    }
    Ok(())
}
