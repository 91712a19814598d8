//! Group and bot limit configuration with admin input validation.

use crate::config::{
    BOT_BURNOUT_LIMIT_MAX, BOT_BURNOUT_LIMIT_MIN, BOT_COOLDOWN_MINUTES_MAX,
    BOT_COOLDOWN_MINUTES_MIN, BURNOUT_LIMIT_MAX, BURNOUT_LIMIT_MIN, COOLDOWN_MINUTES_MAX,
    COOLDOWN_MINUTES_MIN,
};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use thiserror::Error;

/// Errors raised when admin-provided limits are out of range
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    /// Burnout limit or cooldown outside the accepted ranges
    #[error(
        "Invalid value.\n\nThe valid X value is from {} to {}, and the valid Y value is from {} to {}",
        .burnout.start(), .burnout.end(), .cooldown.start(), .cooldown.end()
    )]
    OutOfRange {
        /// Accepted burnout limits
        burnout: RangeInclusive<u32>,
        /// Accepted cooldown windows
        cooldown: RangeInclusive<u32>,
    },
}

/// User-facing limiter configuration of a chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GroupSetup {
    /// Inline messages accepted per window
    #[serde(default)]
    pub burnout_limit: u32,
    /// Window length in minutes
    #[serde(default)]
    pub cooldown_minutes: u32,
}

impl GroupSetup {
    /// Accepted burnout limits for `/setup`
    pub const BURNOUT_RANGE: RangeInclusive<u32> = BURNOUT_LIMIT_MIN..=BURNOUT_LIMIT_MAX;
    /// Accepted cooldown windows for `/setup`
    pub const COOLDOWN_RANGE: RangeInclusive<u32> = COOLDOWN_MINUTES_MIN..=COOLDOWN_MINUTES_MAX;

    /// Validate admin input and build a setup from it.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::OutOfRange`] if either value is outside its range.
    pub fn validated(burnout_limit: u32, cooldown_minutes: u32) -> Result<Self, SetupError> {
        if Self::BURNOUT_RANGE.contains(&burnout_limit)
            && Self::COOLDOWN_RANGE.contains(&cooldown_minutes)
        {
            Ok(Self {
                burnout_limit,
                cooldown_minutes,
            })
        } else {
            Err(Self::out_of_range())
        }
    }

    /// The range error with this setup's bounds.
    #[must_use]
    pub const fn out_of_range() -> SetupError {
        SetupError::OutOfRange {
            burnout: Self::BURNOUT_RANGE,
            cooldown: Self::COOLDOWN_RANGE,
        }
    }

    /// Whether the record was stored without any configuration.
    #[must_use]
    pub const fn is_unset(&self) -> bool {
        self.burnout_limit == 0 && self.cooldown_minutes == 0
    }
}

/// Independent limit attached to one inline bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotLimit {
    /// Messages accepted through the bot per window
    pub burnout_limit: u32,
    /// Window length in minutes
    pub cooldown_minutes: u32,
}

/// Outcome of validating a `/botlimit` request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotLimitChange {
    /// Create or update the limit
    Set(BotLimit),
    /// Drop the limit (`0,0`)
    Remove,
}

impl BotLimit {
    /// Accepted burnout limits for `/botlimit`
    pub const BURNOUT_RANGE: RangeInclusive<u32> = BOT_BURNOUT_LIMIT_MIN..=BOT_BURNOUT_LIMIT_MAX;
    /// Accepted cooldown windows for `/botlimit`
    pub const COOLDOWN_RANGE: RangeInclusive<u32> =
        BOT_COOLDOWN_MINUTES_MIN..=BOT_COOLDOWN_MINUTES_MAX;

    /// Validate admin input. `0,0` requests removal of the limit.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::OutOfRange`] if the values are neither `0,0` nor in range.
    pub fn validated(burnout_limit: u32, cooldown_minutes: u32) -> Result<BotLimitChange, SetupError> {
        if burnout_limit == 0 && cooldown_minutes == 0 {
            return Ok(BotLimitChange::Remove);
        }
        if Self::BURNOUT_RANGE.contains(&burnout_limit)
            && Self::COOLDOWN_RANGE.contains(&cooldown_minutes)
        {
            Ok(BotLimitChange::Set(Self {
                burnout_limit,
                cooldown_minutes,
            }))
        } else {
            Err(Self::out_of_range())
        }
    }

    /// The range error with the bot limit bounds.
    #[must_use]
    pub const fn out_of_range() -> SetupError {
        SetupError::OutOfRange {
            burnout: Self::BURNOUT_RANGE,
            cooldown: Self::COOLDOWN_RANGE,
        }
    }
}
