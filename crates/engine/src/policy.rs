//! Engine configuration.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stockledger_core::LedgerError;

/// How the engines treat a stock-relevant line whose description matches no
/// catalog item.
///
/// `ReserveUntracked` is the legacy behavior and the default: the line is
/// reserved in full with no stock effect and a warning is logged. `Reject`
/// turns the same situation into a validation error, so bad catalog data
/// surfaces at confirm or receive time instead of silently bypassing stock
/// tracking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedLinePolicy {
    #[default]
    ReserveUntracked,
    Reject,
}

impl FromStr for UnmatchedLinePolicy {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reserve_untracked" => Ok(Self::ReserveUntracked),
            "reject" => Ok(Self::Reject),
            other => Err(LedgerError::validation(format!(
                "unknown unmatched-line policy '{other}'"
            ))),
        }
    }
}

/// Tunable behavior shared by the reservation and receiving engines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationPolicy {
    pub unmatched_line: UnmatchedLinePolicy,
}

impl ReservationPolicy {
    pub const UNMATCHED_LINE_ENV: &str = "STOCKLEDGER_UNMATCHED_LINE";

    /// Read policy overrides from the environment. Unset or unparseable
    /// values fall back to the defaults rather than failing startup.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut policy = Self::default();
        if let Some(raw) = lookup(Self::UNMATCHED_LINE_ENV) {
            match raw.parse() {
                Ok(value) => policy.unmatched_line = value,
                Err(_) => {
                    tracing::warn!("ignoring invalid {}={raw}", Self::UNMATCHED_LINE_ENV);
                }
            }
        }
        policy
    }
}
