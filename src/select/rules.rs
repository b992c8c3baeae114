//! Selection rule definitions

use std::fmt;

use crate::types::StreamKind;

/// Which end of a numeric range a rule keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    Min,
    Max,
}

impl Extreme {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "min" => Some(Extreme::Min),
            "max" => Some(Extreme::Max),
            _ => None,
        }
    }
}

/// Resolution rule policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPolicy {
    Extreme(Extreme),
    /// Keep streams whose width equals the value
    Exact(u32),
}

/// One step of a rule chain
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionRule {
    Resolution(ResolutionPolicy),
    Duration(Extreme),
    /// Allowed language tags, exact match
    Language(Vec<String>),
    /// Allowed codec names; a pass-through for video
    Codec(Vec<String>),
    /// Sparse-caption detection (subtitle rule-sets only)
    ForeignAudio,
}

impl SelectionRule {
    pub fn name(&self) -> &'static str {
        match self {
            SelectionRule::Resolution(_) => "resolution",
            SelectionRule::Duration(_) => "duration",
            SelectionRule::Language(_) => "language",
            SelectionRule::Codec(_) => "codec",
            SelectionRule::ForeignAudio => "foreign",
        }
    }
}

impl fmt::Display for SelectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionRule::Resolution(ResolutionPolicy::Extreme(e)) => {
                write!(f, "resolution={:?}", e)
            }
            SelectionRule::Resolution(ResolutionPolicy::Exact(w)) => write!(f, "resolution={}", w),
            SelectionRule::Duration(e) => write!(f, "duration={:?}", e),
            SelectionRule::Language(tags) => write!(f, "language={:?}", tags),
            SelectionRule::Codec(codecs) => write!(f, "codec={:?}", codecs),
            SelectionRule::ForeignAudio => f.write_str("foreign"),
        }
    }
}

/// Ordered rules for one media kind
#[derive(Debug, Clone, PartialEq)]
pub struct RuleChain {
    pub kind: StreamKind,
    pub rules: Vec<SelectionRule>,
}

impl RuleChain {
    pub fn new(kind: StreamKind, rules: Vec<SelectionRule>) -> Self {
        Self { kind, rules }
    }

    /// A chain with no rules keeps every candidate
    pub fn empty(kind: StreamKind) -> Self {
        Self::new(kind, Vec::new())
    }

    pub fn has_foreign_audio(&self) -> bool {
        self.rules.contains(&SelectionRule::ForeignAudio)
    }
}

/// One subtitle role: a named chain run against the shrinking pool
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    pub name: String,
    pub chain: RuleChain,
}

impl RuleSet {
    pub fn new(name: impl Into<String>, rules: Vec<SelectionRule>) -> Self {
        Self {
            name: name.into(),
            chain: RuleChain::new(StreamKind::Subtitle, rules),
        }
    }
}
