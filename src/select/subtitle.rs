//! Subtitle rule-set evaluator
//!
//! Each rule-set picks one subtitle role. Rule-sets run in order against a
//! working pool; whatever a rule-set picks is removed from the pool before
//! the next one runs, so no stream is picked twice.
//!
//! Extraction failures inside the foreign-audio heuristic do not stop the
//! evaluation; the last one is handed back with the picks.

use crate::error::{Result, SelectError};
use crate::tools::MediaTools;
use crate::types::CandidateSet;

use super::engine::{apply_rule, is_settled};
use super::foreign::ForeignAudioHeuristic;
use super::rules::{RuleChain, RuleSet, SelectionRule};

/// Accumulated subtitle picks
#[derive(Debug, Default)]
pub struct SubtitleSelection {
    pub selected: CandidateSet,
    /// Last transcript extraction failure seen by any rule-set
    pub last_failure: Option<SelectError>,
}

/// Run every rule-set over the subtitle candidates and accumulate the picks
pub async fn select_subtitles<T: MediaTools>(
    candidates: CandidateSet,
    rule_sets: &[RuleSet],
    heuristic: &ForeignAudioHeuristic<'_, T>,
) -> Result<SubtitleSelection> {
    let mut pool = candidates;
    let mut result = SubtitleSelection::default();

    for rule_set in rule_sets {
        if pool.is_empty() {
            tracing::debug!("Subtitle pool exhausted before rule-set '{}'", rule_set.name);
            break;
        }

        let picked =
            select_rule_set(pool.clone(), &rule_set.chain, heuristic, &mut result.last_failure)
                .await?;
        tracing::info!(
            "Subtitle rule-set '{}' selected {:?}",
            rule_set.name,
            picked.iter().map(|s| s.index).collect::<Vec<_>>()
        );

        pool.retain(|s| !picked.iter().any(|p| p.index == s.index));
        result.selected.extend(picked);
    }

    Ok(result)
}

/// Rule engine pass for one subtitle chain, with foreign-audio rules routed
/// to the heuristic
async fn select_rule_set<T: MediaTools>(
    candidates: CandidateSet,
    chain: &RuleChain,
    heuristic: &ForeignAudioHeuristic<'_, T>,
    last_failure: &mut Option<SelectError>,
) -> Result<CandidateSet> {
    if is_settled(&candidates) {
        return Ok(candidates);
    }

    let mut selected = candidates;
    for rule in &chain.rules {
        if is_settled(&selected) {
            break;
        }
        selected = match rule {
            SelectionRule::ForeignAudio => {
                let pick = heuristic.select(selected).await;
                if pick.last_failure.is_some() {
                    *last_failure = pick.last_failure;
                }
                pick.selected
            }
            other => apply_rule(chain.kind, other, selected)?,
        };
    }
    Ok(selected)
}
