#![forbid(unsafe_code)]
#![deny(
    warnings,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::result_large_err
)]

//! Ember schedule — deterministic emission-rate computation for reward
//! distribution programs.
//!
//! Turns a set of per-asset distribution totals plus a duration into
//! per-second emission rates by unbounded-precision integer floor division,
//! and width-checks every rate against the fixed bit width the downstream
//! configurator reserves for its rate field. All arithmetic is integer and
//! deterministic; identical inputs yield bit-identical schedules.

use primitive_types::U256;
use thiserror::Error;

/// Address-like identifier for assets and accounts.
pub type Address = [u8; 20];

/// Rate field width of the observed downstream configurator interface.
/// Every operation takes the width as a parameter; this is the default.
pub const RATE_WIDTH_BITS: u32 = 88;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("emission target list is empty")]
    EmptyTargets,

    #[error("distribution duration must be positive")]
    ZeroDuration,

    #[error("declared program total {declared} != sum of target amounts {actual}")]
    InvalidProgramSum { declared: U256, actual: U256 },

    #[error("value {value} exceeds {width_bits}-bit capacity")]
    Overflow { value: U256, width_bits: u32 },
}

/// One asset's declared share of a distribution program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmissionTarget {
    pub asset: Address,
    pub total_amount: U256,
}

/// Derived per-asset emission entry. Immutable once built; `rate_per_second`
/// is already checked against the program's rate width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub asset: Address,
    pub rate_per_second: U256,
    pub end_timestamp: u64,
}

/// A fully-assembled reward program, built once per run and consumed by the
/// external configurator call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewardProgram {
    pub reward_asset: Address,
    pub reward_oracle: Address,
    pub payer: Address,
    pub transfer_authority: Address,
    pub entries: Vec<ScheduleEntry>,
    pub distribution_end: u64,
}

impl RewardProgram {
    /// Combined per-second emission rate across all entries.
    pub fn total_rate(&self) -> Result<U256, ScheduleError> {
        let mut total = U256::zero();
        for entry in &self.entries {
            total = total
                .checked_add(entry.rate_per_second)
                .ok_or(ScheduleError::Overflow {
                    value: entry.rate_per_second,
                    width_bits: 256,
                })?;
        }
        Ok(total)
    }
}

#[inline]
fn width_max(width_bits: u32) -> U256 {
    if width_bits >= 256 {
        U256::MAX
    } else {
        (U256::one() << width_bits) - 1
    }
}

/// Checked narrowing to a `width_bits`-wide unsigned field. Identity for
/// in-range values; `Overflow` otherwise.
pub fn to_fixed_width(value: U256, width_bits: u32) -> Result<U256, ScheduleError> {
    if value > width_max(width_bits) {
        return Err(ScheduleError::Overflow { value, width_bits });
    }
    Ok(value)
}

/// Build the per-asset emission schedule for one program.
///
/// Sums the declared target amounts and requires exact equality with
/// `program_total` (a mis-declared total is a logic error, not a rounding
/// concern). Each rate is `total_amount / duration_secs` by integer floor
/// division; the at-most `duration_secs - 1` units lost per target are the
/// intended under-delivery. Entries come out in input order, and a zero
/// `total_amount` yields a legal zero-rate entry — the configurator may
/// need an explicit entry to override a previous program.
pub fn build_schedule(
    targets: &[EmissionTarget],
    duration_secs: u64,
    distribution_end: u64,
    program_total: U256,
    rate_width_bits: u32,
) -> Result<Vec<ScheduleEntry>, ScheduleError> {
    if targets.is_empty() {
        return Err(ScheduleError::EmptyTargets);
    }
    if duration_secs == 0 {
        return Err(ScheduleError::ZeroDuration);
    }
    let mut actual = U256::zero();
    for target in targets {
        actual = actual
            .checked_add(target.total_amount)
            .ok_or(ScheduleError::Overflow {
                value: target.total_amount,
                width_bits: 256,
            })?;
    }
    if actual != program_total {
        return Err(ScheduleError::InvalidProgramSum {
            declared: program_total,
            actual,
        });
    }
    let duration = U256::from(duration_secs);
    let mut entries = Vec::with_capacity(targets.len());
    for target in targets {
        let rate = to_fixed_width(target.total_amount / duration, rate_width_bits)?;
        entries.push(ScheduleEntry {
            asset: target.asset,
            rate_per_second: rate,
            end_timestamp: distribution_end,
        });
    }
    Ok(entries)
}

/// Reward amount a rate accrues over `elapsed_secs`.
pub fn expected_accrued(rate_per_second: U256, elapsed_secs: u64) -> Result<U256, ScheduleError> {
    rate_per_second
        .checked_mul(U256::from(elapsed_secs))
        .ok_or(ScheduleError::Overflow {
            value: rate_per_second,
            width_bits: 256,
        })
}
