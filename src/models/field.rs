use serde::{Deserialize, Serialize};

/// A named estimation dimension.
///
/// The set is closed: these five dimensions are estimated together in a
/// session, and each maps to one column of the feature store. The string
/// forms are the display names used on the wire and in vote payloads.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EstimationField {
    #[serde(rename = "Business Value")]
    BusinessValue,
    #[serde(rename = "Time Complexity")]
    TimeComplexity,
    #[serde(rename = "OE/RR Value")]
    OeRrValue,
    #[serde(rename = "Job Size")]
    JobSize,
    #[serde(rename = "Story Points")]
    StoryPoints,
}

impl EstimationField {
    /// Every field, in display order. Reveal computes a consensus entry for
    /// each of these whether or not anyone voted on it.
    pub const ALL: [EstimationField; 5] = [
        Self::BusinessValue,
        Self::TimeComplexity,
        Self::OeRrValue,
        Self::JobSize,
        Self::StoryPoints,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BusinessValue => "Business Value",
            Self::TimeComplexity => "Time Complexity",
            Self::OeRrValue => "OE/RR Value",
            Self::JobSize => "Job Size",
            Self::StoryPoints => "Story Points",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Business Value" => Some(Self::BusinessValue),
            "Time Complexity" => Some(Self::TimeComplexity),
            "OE/RR Value" => Some(Self::OeRrValue),
            "Job Size" => Some(Self::JobSize),
            "Story Points" => Some(Self::StoryPoints),
            _ => None,
        }
    }

    /// The feature-store column this field commits into.
    pub fn column(&self) -> &'static str {
        match self {
            Self::BusinessValue => "business_value",
            Self::TimeComplexity => "time_complexity",
            Self::OeRrValue => "oe_rr_value",
            Self::JobSize => "job_size",
            Self::StoryPoints => "story_points",
        }
    }
}
