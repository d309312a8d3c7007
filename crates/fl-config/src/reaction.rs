//! Activation reaction parsed from `reaction:` / `ai-reaction:`.

use anyhow::{Result, bail};
use serde_yaml::Value;

/// Reaction added to the triggering item by the activation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AiReaction {
    ThumbsUp,
    ThumbsDown,
    Laugh,
    Confused,
    Heart,
    Hooray,
    Rocket,
    #[default]
    Eyes,
    None,
}

impl AiReaction {
    /// GitHub API content string for the reaction.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThumbsUp => "+1",
            Self::ThumbsDown => "-1",
            Self::Laugh => "laugh",
            Self::Confused => "confused",
            Self::Heart => "heart",
            Self::Hooray => "hooray",
            Self::Rocket => "rocket",
            Self::Eyes => "eyes",
            Self::None => "none",
        }
    }
}

/// Parse a reaction value. Accepts the eight GitHub reaction names,
/// the integers `1` / `-1` (YAML turns unquoted `+1` into an integer),
/// and `none`.
pub fn parse_reaction(value: &Value) -> Result<AiReaction> {
    if let Some(i) = value.as_i64() {
        return match i {
            1 => Ok(AiReaction::ThumbsUp),
            -1 => Ok(AiReaction::ThumbsDown),
            other => bail!("invalid reaction {other}: only 1 and -1 are numeric reactions"),
        };
    }
    let Some(s) = value.as_str() else {
        bail!("reaction must be a string or 1/-1, got {:?}", value);
    };
    match s {
        "+1" => Ok(AiReaction::ThumbsUp),
        "-1" => Ok(AiReaction::ThumbsDown),
        "laugh" => Ok(AiReaction::Laugh),
        "confused" => Ok(AiReaction::Confused),
        "heart" => Ok(AiReaction::Heart),
        "hooray" => Ok(AiReaction::Hooray),
        "rocket" => Ok(AiReaction::Rocket),
        "eyes" => Ok(AiReaction::Eyes),
        "none" => Ok(AiReaction::None),
        other => bail!(
            "invalid reaction '{other}'. Valid values: +1, -1, laugh, confused, heart, hooray, rocket, eyes, none"
        ),
    }
}
