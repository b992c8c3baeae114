//! Rule engine - narrows a candidate set with an ordered rule chain

use std::cmp::Ordering;

use crate::error::{Result, SelectError};
use crate::types::{CandidateSet, StreamDescriptor, StreamKind};

use super::rules::{Extreme, ResolutionPolicy, RuleChain, SelectionRule};

/// Whether rule evaluation should stop before the next rule.
///
/// A single remaining candidate is final: later rules are not evaluated.
pub(crate) fn is_settled(candidates: &[StreamDescriptor]) -> bool {
    candidates.len() == 1
}

/// Run a rule chain over a candidate set.
///
/// A lone candidate is returned unchanged without evaluating any rule.
/// Foreign-audio rules need transcripts and are only valid through the
/// subtitle evaluator.
pub fn select(candidates: CandidateSet, chain: &RuleChain) -> Result<CandidateSet> {
    if is_settled(&candidates) {
        tracing::debug!(
            "One {} stream in source, selecting by default",
            chain.kind
        );
        return Ok(candidates);
    }

    let mut selected = candidates;
    for rule in &chain.rules {
        if is_settled(&selected) {
            break;
        }
        selected = apply_rule(chain.kind, rule, selected)?;
    }
    Ok(selected)
}

/// Apply one non-transcript rule to the current set
pub fn apply_rule(
    kind: StreamKind,
    rule: &SelectionRule,
    candidates: CandidateSet,
) -> Result<CandidateSet> {
    let before = candidates.len();
    let selected = match rule {
        SelectionRule::Resolution(ResolutionPolicy::Extreme(extreme)) => {
            keep_extreme(candidates, *extreme, |s| s.width)
        }
        SelectionRule::Resolution(ResolutionPolicy::Exact(width)) => {
            keep_exact_width(candidates, *width)
        }
        SelectionRule::Duration(extreme) => {
            keep_extreme(candidates, *extreme, |s| s.duration_value())
        }
        SelectionRule::Language(allowed) => candidates
            .into_iter()
            .filter(|s| {
                s.language
                    .as_ref()
                    .is_some_and(|lang| allowed.iter().any(|a| a == lang))
            })
            .collect(),
        // Reserved for video: not a filter
        SelectionRule::Codec(_) if kind == StreamKind::Video => candidates,
        SelectionRule::Codec(allowed) => candidates
            .into_iter()
            .filter(|s| allowed.iter().any(|a| a == &s.codec_name))
            .collect(),
        SelectionRule::ForeignAudio => {
            return Err(SelectError::invalid_rule(
                kind.as_str(),
                "foreign-audio rule outside a subtitle rule-set",
            ));
        }
    };

    tracing::debug!(
        "{} rule {}: {} -> {} candidate(s)",
        kind,
        rule,
        before,
        selected.len()
    );
    Ok(selected)
}

/// Keep every candidate whose value equals the extreme of the current set.
///
/// Candidates without a value, or with an incomparable one, sort after all
/// defined values, so they are never the extreme. If no candidate has a value the set is returned
/// unchanged.
fn keep_extreme<T, F>(candidates: CandidateSet, extreme: Extreme, value: F) -> CandidateSet
where
    T: PartialOrd + Copy,
    F: Fn(&StreamDescriptor) -> Option<T>,
{
    let target = candidates
        .iter()
        .filter_map(&value)
        // NaN compares with nothing and could never be matched
        .filter(|v| v.partial_cmp(v).is_some())
        .fold(None, |best: Option<T>, v| match best {
            None => Some(v),
            Some(b) => {
                let better = match (extreme, v.partial_cmp(&b)) {
                    (Extreme::Max, Some(Ordering::Greater)) => true,
                    (Extreme::Min, Some(Ordering::Less)) => true,
                    _ => false,
                };
                Some(if better { v } else { b })
            }
        });

    let Some(target) = target else {
        tracing::debug!("No comparison data, keeping all {} candidate(s)", candidates.len());
        return candidates;
    };

    candidates
        .into_iter()
        .filter(|s| value(s).is_some_and(|v| v.partial_cmp(&target) == Some(Ordering::Equal)))
        .collect()
}

/// Keep candidates with exactly this width. Without any width data the set
/// is kept as-is.
fn keep_exact_width(candidates: CandidateSet, width: u32) -> CandidateSet {
    if candidates.iter().all(|s| s.width.is_none()) {
        tracing::debug!("No width data, keeping all {} candidate(s)", candidates.len());
        return candidates;
    }
    candidates
        .into_iter()
        .filter(|s| s.width == Some(width))
        .collect()
}
