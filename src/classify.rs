//! Lifecycle classification of carrier results.
//!
//! The carrier's status vocabulary is wider than the five report categories,
//! so a category is picked by keyword containment on the resolved status
//! label. Rules are tried in order and the first one that applies wins.

use crate::courier::fedex::status_label;
use crate::shipment::{CarrierEvent, Lifecycle};
use crate::util::{days_between, working_days};
use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::debug;

/// How status keywords are compared against the carrier label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    #[default]
    CaseSensitive,
    CaseInsensitive,
}

impl MatchPolicy {
    pub fn contains(self, label: &str, keyword: &str) -> bool {
        match self {
            MatchPolicy::CaseSensitive => label.contains(keyword),
            MatchPolicy::CaseInsensitive => label
                .to_lowercase()
                .contains(&keyword.to_lowercase()),
        }
    }
}

/// Language of the narrative column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
}

/// Canonical dates of one shipment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShipmentDates {
    pub label: Option<NaiveDateTime>,
    pub ship: Option<NaiveDateTime>,
    pub delivery: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metrics {
    pub days_since_ship: i64,
    pub working_days: i64,
    pub label_age: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: Lifecycle,
    pub metrics: Metrics,
    /// Value of the "Days After Label" column.
    pub label_text: String,
    pub narrative: String,
}

struct Rule {
    category: Lifecycle,
    keywords: &'static [&'static str],
    applies: fn(&ShipmentDates) -> bool,
    metrics: fn(&ShipmentDates, NaiveDateTime) -> Metrics,
}

const RULES: [Rule; 4] = [
    Rule {
        category: Lifecycle::Delivered,
        keywords: &["Delivered"],
        applies: has_ship_and_delivery,
        metrics: delivered_metrics,
    },
    Rule {
        category: Lifecycle::LabelCreated,
        keywords: &["Label", "Created"],
        applies: always,
        metrics: label_metrics,
    },
    Rule {
        category: Lifecycle::InTransit,
        keywords: &["Transit"],
        applies: always,
        metrics: moving_metrics,
    },
    Rule {
        category: Lifecycle::Exception,
        keywords: &["Exception", "Delay"],
        applies: always,
        metrics: moving_metrics,
    },
];

fn always(_: &ShipmentDates) -> bool {
    true
}

fn has_ship_and_delivery(dates: &ShipmentDates) -> bool {
    dates.ship.is_some() && dates.delivery.is_some()
}

fn age(now: NaiveDateTime, since: Option<NaiveDateTime>) -> i64 {
    since.map_or(0, |since| days_between(now, since))
}

fn delivered_metrics(dates: &ShipmentDates, _now: NaiveDateTime) -> Metrics {
    let (Some(ship), Some(delivery)) = (dates.ship, dates.delivery) else {
        return Metrics::default();
    };
    Metrics {
        days_since_ship: days_between(delivery, ship),
        working_days: working_days(Some(ship), Some(delivery)),
        label_age: age(delivery, dates.label),
    }
}

fn label_metrics(dates: &ShipmentDates, now: NaiveDateTime) -> Metrics {
    Metrics {
        days_since_ship: 0,
        working_days: 0,
        label_age: age(now, dates.label),
    }
}

fn moving_metrics(dates: &ShipmentDates, now: NaiveDateTime) -> Metrics {
    Metrics {
        days_since_ship: age(now, dates.ship),
        working_days: working_days(dates.ship, Some(now)),
        label_age: age(now, dates.label),
    }
}

/// Resolve the status label shown in the report: the known FedEx code label,
/// else the carrier's description, else the raw code.
pub fn resolve_status(event: &CarrierEvent) -> String {
    if let Some(label) = status_label(&event.status_code) {
        return label.to_string();
    }
    if !event.status_description.is_empty() {
        return event.status_description.clone();
    }
    event.status_code.clone()
}

/// Classify a shipment. Never fails: anything unmatched is `Unknown`.
pub fn classify(
    status: &str,
    dates: &ShipmentDates,
    now: NaiveDateTime,
    policy: MatchPolicy,
    locale: Locale,
) -> Classification {
    let rule = RULES.iter().find(|rule| {
        rule.keywords
            .iter()
            .any(|keyword| policy.contains(status, keyword))
            && (rule.applies)(dates)
    });

    let (category, metrics) = match rule {
        Some(rule) => (rule.category, (rule.metrics)(dates, now)),
        None => (Lifecycle::Unknown, Metrics::default()),
    };

    debug!(status, category = %category, ?metrics, "Shipment classified");

    Classification {
        category,
        metrics,
        label_text: label_text(category, &metrics),
        narrative: narrative(category, &metrics, locale),
    }
}

fn label_text(category: Lifecycle, metrics: &Metrics) -> String {
    match category {
        Lifecycle::Delivered => format!("DELIVERED in {} days", metrics.label_age),
        _ => metrics.label_age.to_string(),
    }
}

fn narrative(category: Lifecycle, metrics: &Metrics, locale: Locale) -> String {
    match (locale, category) {
        (Locale::En, Lifecycle::Delivered) => format!("Delivered in {} days", metrics.label_age),
        (Locale::En, Lifecycle::LabelCreated) => format!("Pending - {} days", metrics.label_age),
        (Locale::En, Lifecycle::InTransit) => {
            format!("In transit - {} days", metrics.days_since_ship)
        }
        (Locale::En, Lifecycle::Exception) => "EXCEPTION - REVIEW".to_string(),
        (Locale::En, Lifecycle::Unknown) => "Verify manually".to_string(),
        (Locale::Es, Lifecycle::Delivered) => format!("Entregado en {} dias", metrics.label_age),
        (Locale::Es, Lifecycle::LabelCreated) => {
            format!("Pendiente - {} dias", metrics.label_age)
        }
        (Locale::Es, Lifecycle::InTransit) => {
            format!("En transito - {} dias", metrics.days_since_ship)
        }
        (Locale::Es, Lifecycle::Exception) => "EXCEPCION - REVISAR".to_string(),
        (Locale::Es, Lifecycle::Unknown) => "Verificar".to_string(),
    }
}
