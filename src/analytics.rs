//! Owner dashboard analytics.
//!
//! No view or inquiry tracking exists yet, so apart from the listing count the
//! figures are generated samples and the report says so with `sample: true`.

use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};
use rand::Rng;
use serde::Serialize;

use crate::structs::OwnerHostelStat;

const MONTHS_SHOWN: u32 = 6;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MonthlyViews {
    pub month: String,
    pub views: u32,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct HostelPerformance {
    pub id: String,
    pub name: String,
    pub location: String,
    pub views: u32,
    pub inquiries: u32,
    pub created_at: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AnalyticsReport {
    pub total_hostels: usize,
    pub views_by_month: Vec<MonthlyViews>,
    pub hostel_performance: Vec<HostelPerformance>,
    pub top_performing_location: Option<String>,
    pub conversion_rate: f64,
    pub sample: bool,
}

/// Month labels for the six months ending with `today`'s month, oldest first.
fn recent_months(today: NaiveDate) -> Vec<String> {
    let first_of_month = today.with_day(1).unwrap_or(today);
    (0..MONTHS_SHOWN)
        .rev()
        .map(|back| {
            first_of_month
                .checked_sub_months(Months::new(back))
                .unwrap_or(first_of_month)
                .format("%b")
                .to_string()
        })
        .collect()
}

pub fn sample_report<R: Rng>(
    rng: &mut R,
    hostels: &[OwnerHostelStat],
    today: NaiveDate,
) -> AnalyticsReport {
    let views_by_month = recent_months(today)
        .into_iter()
        .map(|month| MonthlyViews {
            month,
            views: rng.gen_range(0..100),
        })
        .collect();

    let hostel_performance: Vec<HostelPerformance> = hostels
        .iter()
        .map(|h| HostelPerformance {
            id: h.id.clone(),
            name: h.name.clone(),
            location: h.location.clone(),
            views: rng.gen_range(0..1000),
            inquiries: rng.gen_range(0..50),
            created_at: h.created_at.clone(),
        })
        .collect();

    let mut views_by_location: BTreeMap<&str, u32> = BTreeMap::new();
    for perf in &hostel_performance {
        *views_by_location.entry(perf.location.as_str()).or_default() += perf.views;
    }
    let top_performing_location = views_by_location
        .into_iter()
        .max_by_key(|(_, views)| *views)
        .map(|(location, _)| location.to_string());

    AnalyticsReport {
        total_hostels: hostels.len(),
        views_by_month,
        top_performing_location,
        hostel_performance,
        conversion_rate: rng.gen_range(0.0..10.0),
        sample: true,
    }
}
