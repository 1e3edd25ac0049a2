use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scheduling priority a task is submitted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Priority {
    Background = 0,
    Low = 1,
    Default = 2,
    Ui = 3,
    High = 4,
    Highest = 5,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Default
    }
}

impl Priority {
    pub const COUNT: usize = 6;

    pub const ALL: [Priority; Priority::COUNT] = [
        Priority::Background,
        Priority::Low,
        Priority::Default,
        Priority::Ui,
        Priority::High,
        Priority::Highest,
    ];

    /// Weight class backing this priority, `None` for the UI-confined context.
    pub fn weight_class(self) -> Option<WeightClass> {
        match self {
            Priority::Background => Some(WeightClass::Background),
            Priority::Low => Some(WeightClass::Utility),
            Priority::Default => Some(WeightClass::Default),
            Priority::High => Some(WeightClass::UserInteractive),
            Priority::Highest => Some(WeightClass::UserInitiated),
            Priority::Ui => None,
        }
    }

    pub fn is_ui(self) -> bool {
        self == Priority::Ui
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Background => "background",
            Priority::Low => "low",
            Priority::Default => "default",
            Priority::Ui => "ui",
            Priority::High => "high",
            Priority::Highest => "highest",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::unsupported_priority(s))
    }
}

/// Concurrency class of the execution mechanism behind a weighted priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WeightClass {
    Background,
    Utility,
    Default,
    UserInitiated,
    UserInteractive,
}

impl WeightClass {
    pub fn label(self) -> &'static str {
        match self {
            WeightClass::Background => "background",
            WeightClass::Utility => "utility",
            WeightClass::Default => "default",
            WeightClass::UserInitiated => "user-initiated",
            WeightClass::UserInteractive => "user-interactive",
        }
    }

    /// Number of workers a concurrent context of this class gets out of `max`.
    pub fn concurrency(self, max: usize) -> usize {
        let scaled = match self {
            WeightClass::Background => max / 4,
            WeightClass::Utility => max / 2,
            _ => max,
        };
        scaled.max(1)
    }

    /// Nice value applied to worker threads; only ever lowers OS priority.
    pub fn nice(self) -> i32 {
        match self {
            WeightClass::Background => 10,
            WeightClass::Utility => 5,
            _ => 0,
        }
    }
}

impl fmt::Display for WeightClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
