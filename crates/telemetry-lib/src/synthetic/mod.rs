//! Synthetic cost and utilization data
//!
//! Produces a seed-deterministic dataset shaped like the live tables, so
//! downstream analysis can run without a metered account. All randomness
//! comes from one seeded stream owned by the caller and consumed
//! sequentially: resource by resource, day by day.

mod catalog;
mod model;

pub use catalog::{ResourceCategory, CATEGORIES, ENVIRONMENTS, REGIONS};
pub use model::{
    scaled_cost, usage_percent, CalendarFields, Draws, UtilizationTier, HOLIDAY_MONTHS,
    HOLIDAY_MULTIPLIER, MONTH_END_DAY, MONTH_END_MULTIPLIER, SPIKE_MAX, SPIKE_MIN,
    SPIKE_PROBABILITY, WEEKDAY_MULTIPLIER, WEEKEND_MULTIPLIER,
};

use crate::error::{CollectionError, CollectionResult};
use crate::models::SyntheticRecord;
use chrono::{Days, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Seeded generator of [`SyntheticRecord`] tables
#[derive(Debug, Clone)]
pub struct SyntheticDataGenerator {
    seed: u64,
    end_date: Option<NaiveDate>,
}

impl SyntheticDataGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            end_date: None,
        }
    }

    /// Pin the day after the last generated day. Defaults to today.
    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generate `num_resources × num_days` records, resource-major.
    pub fn generate_synthetic_training_data(
        &self,
        num_days: u32,
        num_resources: u32,
    ) -> CollectionResult<Vec<SyntheticRecord>> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.generate_with_rng(&mut rng, num_days, num_resources)
    }

    /// Generate from a caller-supplied stream
    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        num_days: u32,
        num_resources: u32,
    ) -> CollectionResult<Vec<SyntheticRecord>> {
        if num_days == 0 {
            return Err(CollectionError::invalid_config("num_days", "must be positive"));
        }
        if num_resources == 0 {
            return Err(CollectionError::invalid_config(
                "num_resources",
                "must be positive",
            ));
        }

        let dates = self.dates(num_days)?;
        let noise = CATEGORIES
            .iter()
            .map(|c| Normal::new(0.0, c.variability))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CollectionError::invalid_config("variability", e))?;

        let mut records = Vec::with_capacity(dates.len() * num_resources as usize);

        for index in 0..num_resources {
            let category_index = rng.gen_range(0..CATEGORIES.len());
            let category = &CATEGORIES[category_index];
            let resource_id = category.resource_id(index);

            for date in &dates {
                let calendar = CalendarFields::from(*date);
                let draws = Draws {
                    noise: noise[category_index].sample(rng),
                    spike: (rng.gen::<f64>() < SPIKE_PROBABILITY)
                        .then(|| rng.gen_range(SPIKE_MIN..=SPIKE_MAX)),
                };
                let region = REGIONS[rng.gen_range(0..REGIONS.len())];
                let environment = ENVIRONMENTS[rng.gen_range(0..ENVIRONMENTS.len())];

                records.push(build_record(
                    *date,
                    &resource_id,
                    category,
                    &calendar,
                    &draws,
                    region,
                    environment,
                ));
            }
        }

        debug!(
            seed = self.seed,
            records = records.len(),
            "Generated synthetic records"
        );
        Ok(records)
    }

    /// `num_days` consecutive days ending the day before `end_date`
    fn dates(&self, num_days: u32) -> CollectionResult<Vec<NaiveDate>> {
        let end_date = self.end_date.unwrap_or_else(|| Utc::now().date_naive());
        let start = end_date
            .checked_sub_days(Days::new(u64::from(num_days)))
            .ok_or_else(|| {
                CollectionError::invalid_config("num_days", format!("{num_days} days is out of range"))
            })?;

        Ok(start.iter_days().take(num_days as usize).collect())
    }
}

/// Evaluate one (resource, day) record from its draws
pub fn build_record(
    date: NaiveDate,
    resource_id: &str,
    category: &ResourceCategory,
    calendar: &CalendarFields,
    draws: &Draws,
    region: &str,
    environment: &str,
) -> SyntheticRecord {
    let scaled = scaled_cost(category.base_cost, calendar, draws);
    let usage = usage_percent(scaled, category.base_cost);
    let tier = UtilizationTier::classify(usage);

    SyntheticRecord {
        date,
        resource_id: resource_id.to_string(),
        resource_type: category.label.to_string(),
        cost: scaled.max(0.0),
        usage_percent: usage,
        day_of_week: calendar.day_of_week,
        day_of_month: calendar.day_of_month,
        month: calendar.month,
        is_weekend: calendar.is_weekend,
        is_idle: tier == UtilizationTier::Idle,
        is_underutilized: tier == UtilizationTier::Underutilized,
        is_optimized: tier == UtilizationTier::Optimized,
        is_overutilized: tier == UtilizationTier::Overutilized,
        region: region.to_string(),
        environment: environment.to_string(),
    }
}

/// Aggregate view of a generated dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSummary {
    pub records: usize,
    pub resources: usize,
    pub days: usize,
    pub total_cost: f64,
    pub idle: usize,
    pub underutilized: usize,
    pub optimized: usize,
    pub overutilized: usize,
    pub regions: usize,
    pub environments: usize,
}

impl SyntheticSummary {
    pub fn from_records(records: &[SyntheticRecord]) -> Self {
        let resources: HashSet<&str> = records.iter().map(|r| r.resource_id.as_str()).collect();
        let days: HashSet<NaiveDate> = records.iter().map(|r| r.date).collect();
        let regions: HashSet<&str> = records.iter().map(|r| r.region.as_str()).collect();
        let environments: HashSet<&str> = records.iter().map(|r| r.environment.as_str()).collect();

        Self {
            records: records.len(),
            resources: resources.len(),
            days: days.len(),
            total_cost: records.iter().map(|r| r.cost).sum(),
            idle: records.iter().filter(|r| r.is_idle).count(),
            underutilized: records.iter().filter(|r| r.is_underutilized).count(),
            optimized: records.iter().filter(|r| r.is_optimized).count(),
            overutilized: records.iter().filter(|r| r.is_overutilized).count(),
            regions: regions.len(),
            environments: environments.len(),
        }
    }
}
