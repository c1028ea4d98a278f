//! Virtual partial state set transformations
//!
//! A transformation combines already-compiled source sets into a new one.
//! Only the flattened Cartesian product exists today: every partial of set A
//! paired with every partial of set B, each pair merged per parameter kind
//! according to the merge-rule and absent-policy table on [`ParamKind`].

use hzl_common::params::{validate_partial, AbsentPolicy};
use hzl_common::{
    Error, ParamKind, PartialState, PartialStateSet, Result, ResultExt, TransformationDefinition,
    TransformationKind,
};
use tracing::{debug, info, warn};

/// Number of sources every supported transformation consumes
pub const SOURCE_COUNT: usize = 2;

/// Fail unless exactly [`SOURCE_COUNT`] sources were supplied
pub fn check_arity(count: usize) -> Result<()> {
    if count == SOURCE_COUNT {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "transformation requires exactly {} source partial state sets, got {}",
            SOURCE_COUNT, count
        )))
    }
}

/// Apply `transformation` to the ordered source sets
///
/// Arity is checked before the transformation type, so a wrong source count
/// is reported even for an unsupported type.
pub fn transform(
    transformation: &TransformationDefinition,
    sources: &[PartialStateSet],
) -> Result<PartialStateSet> {
    check_arity(sources.len())?;
    match transformation.kind()? {
        TransformationKind::FlattenedCartesianProduct => {
            flattened_cartesian_product(transformation, &sources[0], &sources[1])
        }
    }
}

/// Pair every partial of `a` with every partial of `b`, A outer, B inner
pub fn flattened_cartesian_product(
    transformation: &TransformationDefinition,
    a: &PartialStateSet,
    b: &PartialStateSet,
) -> Result<PartialStateSet> {
    for source in [a, b] {
        if source.is_empty() {
            warn!("Source {} has no partial states; product will be empty", source.id());
        }
        for (position, state) in source.partial_states.iter().enumerate() {
            validate_partial(state)
                .with_context(|| format!("partial state #{} of '{}'", position, source.id()))?;
        }
    }

    info!(
        "Flattened Cartesian product {} x {} ({} x {} partials)",
        a.id(),
        b.id(),
        a.len(),
        b.len()
    );

    let mut partial_states = Vec::with_capacity(a.len() * b.len());
    for (i, pa) in a.partial_states.iter().enumerate() {
        for (j, pb) in b.partial_states.iter().enumerate() {
            let mut merged = merge_pair(pa, pb);
            // Output must satisfy the same ranges as any input
            validate_partial(&merged).with_context(|| format!("pair (a#{}, b#{})", i, j))?;
            merged.partial_index = Some(partial_states.len());
            debug!("pair {}: {:?}", partial_states.len(), merged);
            partial_states.push(merged);
        }
    }

    Ok(PartialStateSet {
        name: format!("{}_x_{}", a.name, b.name),
        namespace: format!("{}_x_{}", a.namespace, b.namespace),
        labels: union_labels([&a.labels, &b.labels, &transformation.labels]),
        layer: a.layer.clone(),
        partial_states,
    })
}

/// Merge one A partial with one B partial
///
/// Both present: combine per the kind's merge rule. One present: take it.
/// Neither: omit, or emit the unset marker for kinds that keep their key.
/// An unset marker on either side counts as absent.
pub fn merge_pair(a: &PartialState, b: &PartialState) -> PartialState {
    let mut out = PartialState::new();
    for kind in ParamKind::ALL {
        match (a.get(kind), b.get(kind)) {
            (Some(va), Some(vb)) => out.set(kind, kind.merge_rule().combine(va, vb)),
            (Some(v), None) | (None, Some(v)) => out.set(kind, v),
            (None, None) => {
                if kind.absent_policy() == AbsentPolicy::Unset {
                    out.set_unset(kind);
                }
            }
        }
    }
    out.labels = union_labels([&a.labels, &b.labels]);
    out
}

/// Ordered union: first occurrence wins, duplicates dropped
fn union_labels<'a, const N: usize>(groups: [&'a Vec<String>; N]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for label in groups.into_iter().flatten() {
        if !out.contains(label) {
            out.push(label.clone());
        }
    }
    out
}
