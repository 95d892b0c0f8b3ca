//! Daily cost ledger collection
//!
//! Issues a daily, service x usage-type grouped cost-and-usage query and
//! flattens the nested day -> group response into one [`CostRecord`] per
//! `(date, service, usage_type)`.

use super::{async_trait, Collected, TableCollector};
use crate::error::{CollectionError, CollectionResult};
use crate::models::{CostRecord, TableName};
use crate::provider::raw::{Group, ResultByTime};
use crate::provider::{CostQuery, Granularity, ProviderGateway};
use chrono::{DateTime, Days, NaiveDate, Utc};
use tracing::{debug, info};

/// Window for a quick look at recent spend
pub const QUICK_CHECK_DAYS: u32 = 30;

/// Window for pulling training data
pub const TRAINING_PULL_DAYS: u32 = 60;

const UNBLENDED_COST: &str = "UnblendedCost";
const USAGE_QUANTITY: &str = "UsageQuantity";
const NORMALIZED_USAGE: &str = "NormalizedUsageAmount";

/// Half-open day range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CostWindow {
    /// The `days_back` days before `today`, ending at `today`
    pub fn trailing(days_back: u32, today: NaiveDate) -> CollectionResult<Self> {
        if days_back == 0 {
            return Err(CollectionError::invalid_config(
                "days_back",
                "must be a positive number of days",
            ));
        }

        let start = today
            .checked_sub_days(Days::new(u64::from(days_back)))
            .ok_or_else(|| {
                CollectionError::invalid_config("days_back", format!("{days_back} days is out of range"))
            })?;

        Ok(Self { start, end: today })
    }

    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// Collects the flat cost ledger for a trailing window
#[derive(Debug, Clone)]
pub struct CostAggregator {
    days_back: u32,
}

impl CostAggregator {
    /// Rejects a window that is empty or reaches before the calendar's start
    pub fn new(days_back: u32) -> CollectionResult<Self> {
        CostWindow::trailing(days_back, Utc::now().date_naive())?;
        Ok(Self { days_back })
    }

    pub fn days_back(&self) -> u32 {
        self.days_back
    }

    fn query(window: &CostWindow, next_page_token: Option<String>) -> CostQuery {
        CostQuery {
            start: window.start,
            end: window.end,
            granularity: Granularity::Daily,
            metrics: vec![
                UNBLENDED_COST.to_string(),
                USAGE_QUANTITY.to_string(),
                NORMALIZED_USAGE.to_string(),
            ],
            group_by: vec!["SERVICE".to_string(), "USAGE_TYPE".to_string()],
            next_page_token,
        }
    }
}

/// Parse one metric amount from a group
fn metric_amount(group: &Group, metric: &str) -> Result<f64, String> {
    let value = group
        .metrics
        .get(metric)
        .ok_or_else(|| format!("group {:?} is missing {metric}", group.keys))?;

    value
        .amount
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid {metric} amount {:?}: {e}", value.amount))
}

/// Flatten one day of grouped results, keeping provider group order
pub fn flatten_day(result: &ResultByTime) -> Result<Vec<CostRecord>, String> {
    let date = result.time_period.start;

    result
        .groups
        .iter()
        .map(|group| {
            let (service, usage_type) = match group.keys.as_slice() {
                [service, usage_type, ..] => (service.clone(), usage_type.clone()),
                keys => return Err(format!("expected service and usage type keys, got {keys:?}")),
            };

            Ok(CostRecord {
                date,
                service,
                usage_type,
                cost: metric_amount(group, UNBLENDED_COST)?,
                usage_quantity: metric_amount(group, USAGE_QUANTITY)?,
                normalized_usage: metric_amount(group, NORMALIZED_USAGE)?,
            })
        })
        .collect()
}

#[async_trait]
impl TableCollector for CostAggregator {
    type Row = CostRecord;

    fn table(&self) -> TableName {
        TableName::Costs
    }

    async fn collect(
        &self,
        gateway: &dyn ProviderGateway,
        now: DateTime<Utc>,
    ) -> CollectionResult<Collected<CostRecord>> {
        let window = CostWindow::trailing(self.days_back, now.date_naive())?;
        let mut collected = Collected::new();
        let mut next_page_token = None;

        loop {
            let page = gateway
                .cost_and_usage(&Self::query(&window, next_page_token))
                .await
                .map_err(|e| CollectionError::source_unavailable(TableName::Costs, e))?;

            for result in &page.results_by_time {
                let records = flatten_day(result)
                    .map_err(|e| CollectionError::source_unavailable(TableName::Costs, e))?;
                collected.rows.extend(records);
            }

            match page.next_page_token {
                Some(token) => {
                    debug!(token = %token, "Following cost-and-usage page");
                    next_page_token = Some(token);
                }
                None => break,
            }
        }

        info!(
            count = collected.len(),
            start = %window.start,
            end = %window.end,
            "Collected cost records"
        );
        Ok(collected)
    }
}
