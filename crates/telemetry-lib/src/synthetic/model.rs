//! Calendar-driven cost model
//!
//! Pure functions: every random input arrives through [`Draws`], so the
//! model can be evaluated with chosen noise and spike values.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const WEEKDAY_MULTIPLIER: f64 = 1.5;
pub const WEEKEND_MULTIPLIER: f64 = 0.3;

/// First day of month that counts as month end
pub const MONTH_END_DAY: u32 = 25;
pub const MONTH_END_MULTIPLIER: f64 = 1.8;

pub const HOLIDAY_MONTHS: [u32; 3] = [10, 11, 12];
pub const HOLIDAY_MULTIPLIER: f64 = 1.4;

pub const SPIKE_PROBABILITY: f64 = 0.05;
pub const SPIKE_MIN: f64 = 3.0;
pub const SPIKE_MAX: f64 = 10.0;

/// Tier lower bounds on usage percent
pub const UNDERUTILIZED_FROM: f64 = 20.0;
pub const OPTIMIZED_FROM: f64 = 50.0;
pub const OVERUTILIZED_FROM: f64 = 80.0;

/// Calendar attributes of one day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFields {
    /// Monday = 0
    pub day_of_week: u32,
    pub day_of_month: u32,
    pub month: u32,
    pub is_weekend: bool,
}

impl From<NaiveDate> for CalendarFields {
    fn from(date: NaiveDate) -> Self {
        let day_of_week = date.weekday().num_days_from_monday();
        Self {
            day_of_week,
            day_of_month: date.day(),
            month: date.month(),
            is_weekend: day_of_week >= 5,
        }
    }
}

/// Random inputs for one (resource, day) evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Draws {
    /// Gaussian noise, applied as `× (1 + noise)`
    pub noise: f64,
    /// Spike multiplier, when one fired
    pub spike: Option<f64>,
}

impl Draws {
    pub const NONE: Draws = Draws {
        noise: 0.0,
        spike: None,
    };
}

/// Apply the multipliers to `base_cost` in order: weekday, month end,
/// holiday season, noise, spike. The result may be negative.
pub fn scaled_cost(base_cost: f64, calendar: &CalendarFields, draws: &Draws) -> f64 {
    let mut cost = base_cost;

    cost *= if calendar.is_weekend {
        WEEKEND_MULTIPLIER
    } else {
        WEEKDAY_MULTIPLIER
    };
    if calendar.day_of_month >= MONTH_END_DAY {
        cost *= MONTH_END_MULTIPLIER;
    }
    if HOLIDAY_MONTHS.contains(&calendar.month) {
        cost *= HOLIDAY_MULTIPLIER;
    }
    cost *= 1.0 + draws.noise;
    if let Some(spike) = draws.spike {
        cost *= spike;
    }

    cost
}

/// `100 × scaled / base`, clamped to `[0, 100]`
pub fn usage_percent(scaled_cost: f64, base_cost: f64) -> f64 {
    (scaled_cost / base_cost * 100.0).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UtilizationTier {
    Idle,
    Underutilized,
    Optimized,
    Overutilized,
}

impl UtilizationTier {
    /// Contiguous thresholds: `< 20`, `[20, 50)`, `[50, 80)`, `>= 80`
    pub fn classify(usage_percent: f64) -> Self {
        if usage_percent < UNDERUTILIZED_FROM {
            UtilizationTier::Idle
        } else if usage_percent < OPTIMIZED_FROM {
            UtilizationTier::Underutilized
        } else if usage_percent < OVERUTILIZED_FROM {
            UtilizationTier::Optimized
        } else {
            UtilizationTier::Overutilized
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UtilizationTier::Idle => "idle",
            UtilizationTier::Underutilized => "underutilized",
            UtilizationTier::Optimized => "optimized",
            UtilizationTier::Overutilized => "overutilized",
        }
    }
}

impl fmt::Display for UtilizationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
