use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuoteRequestStatus {
    Draft,
    Waiting,
    InProgress,
    Ready,
    Canceled,
}

impl QuoteRequestStatus {
    pub const ALL: [Self; 5] =
        [Self::Draft, Self::Waiting, Self::InProgress, Self::Ready, Self::Canceled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Waiting => "waiting",
            Self::InProgress => "in-progress",
            Self::Ready => "ready",
            Self::Canceled => "canceled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "waiting" => Some(Self::Waiting),
            "in-progress" | "in_progress" => Some(Self::InProgress),
            "ready" => Some(Self::Ready),
            "canceled" => Some(Self::Canceled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

impl fmt::Display for QuoteRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
