//! Bridge amount policy.
//!
//! Configured as a string: `"50%"` bridges half of each detected increase,
//! `"0.25"` bridges a fixed 0.25 ether. Either way the result is clamped to
//! the increase itself.

use std::str::FromStr;

use alloy::primitives::utils::{format_ether, parse_ether};
use alloy::primitives::U256;
use thiserror::Error;

/// Millionths of a percent; 100% == 100_000_000.
const PERCENT_SCALE: u64 = 100_000_000;

/// Digits allowed after the decimal point of a percentage.
const PERCENT_DECIMALS: usize = 6;

/// Invalid amount or percentage string.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("invalid ether amount '{0}'")]
    InvalidAmount(String),

    #[error("invalid percentage '{0}'")]
    InvalidPercentage(String),
}

/// How much of a detected increase to bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgePolicy {
    /// Fixed amount in wei.
    Fixed(U256),
    /// Share of the increase, in millionths of a percent.
    Percentage(u64),
}

impl BridgePolicy {
    /// Policy that bridges the whole increase.
    pub const ALL: BridgePolicy = BridgePolicy::Percentage(PERCENT_SCALE);

    /// Amount to bridge for an increase of `delta` wei. Never exceeds `delta`.
    pub fn amount_for(&self, delta: U256) -> U256 {
        let raw = match *self {
            BridgePolicy::Fixed(amount) => amount,
            BridgePolicy::Percentage(micros) if micros >= PERCENT_SCALE => delta,
            BridgePolicy::Percentage(micros) => {
                let scale = U256::from(PERCENT_SCALE);
                let share = U256::from(micros);
                match delta.checked_mul(share) {
                    Some(product) => product / scale,
                    None => (delta / scale).saturating_mul(share),
                }
            }
        };
        raw.min(delta)
    }
}

impl Default for BridgePolicy {
    fn default() -> Self {
        Self::ALL
    }
}

impl FromStr for BridgePolicy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.strip_suffix('%') {
            Some(pct) => parse_percentage(pct.trim())
                .map(BridgePolicy::Percentage)
                .ok_or_else(|| PolicyError::InvalidPercentage(s.to_string())),
            None => parse_ether_amount(s).map(BridgePolicy::Fixed),
        }
    }
}

impl std::fmt::Display for BridgePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgePolicy::Fixed(amount) => write!(f, "{} ether", format_ether(*amount)),
            BridgePolicy::Percentage(micros) => {
                let whole = micros / 1_000_000;
                let frac = micros % 1_000_000;
                if frac == 0 {
                    write!(f, "{}%", whole)
                } else {
                    let frac = format!("{:06}", frac);
                    write!(f, "{}.{}%", whole, frac.trim_end_matches('0'))
                }
            }
        }
    }
}

/// Parse a non-negative decimal ether amount into wei.
pub fn parse_ether_amount(s: &str) -> Result<U256, PolicyError> {
    let s = s.trim();
    if s.is_empty() || s.starts_with('-') || s.starts_with('+') {
        return Err(PolicyError::InvalidAmount(s.to_string()));
    }
    parse_ether(s).map_err(|_| PolicyError::InvalidAmount(s.to_string()))
}

fn parse_percentage(s: &str) -> Option<u64> {
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if frac.len() > PERCENT_DECIMALS {
        return None;
    }

    let whole: u64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let frac: u64 = if frac.is_empty() {
        0
    } else {
        format!("{:0<width$}", frac, width = PERCENT_DECIMALS).parse().ok()?
    };

    whole.checked_mul(1_000_000)?.checked_add(frac)
}
