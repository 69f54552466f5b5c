use serde::Serialize;

use crate::registry::SourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FallbackReason {
    Timeout,
}

impl FallbackReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "TIMEOUT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForwardCause {
    Update,
    Selection,
    Echo,
    Fallback,
}

/// Side effects requested by the arbiter, executed in order by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum ArbiterAction {
    Forward {
        source: String,
        value: f32,
        cause: ForwardCause,
    },
    Fallback {
        previous: String,
        reason: FallbackReason,
    },
    /// The unit switched between its own sensor (`true`) and a remote one.
    InternalSensing(bool),
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub id: String,
    pub kind: SourceKind,
    pub value: Option<f32>,
    #[serde(rename = "ageMs")]
    pub age_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArbiterStatus {
    #[serde(rename = "activeSource")]
    pub active_source: String,
    #[serde(rename = "activeValue")]
    pub active_value: Option<f32>,
    #[serde(rename = "usingInternal")]
    pub using_internal: bool,
    #[serde(rename = "timedOut")]
    pub timed_out: bool,
    #[serde(rename = "timeoutMs")]
    pub timeout_ms: u64,
    #[serde(rename = "timeoutRemainingMs")]
    pub timeout_remaining_ms: Option<u64>,
    #[serde(rename = "echoMs")]
    pub echo_ms: u64,
    pub sources: Vec<SourceStatus>,
}
