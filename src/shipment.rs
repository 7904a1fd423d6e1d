use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fmt;

/// One accepted input row: a normalized tracking number and its client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingQuery {
    pub tracking_number: String,
    pub client: String,
}

/// Client labels keyed by tracking number.
///
/// A tracking number seen twice keeps the label from its last row.
#[derive(Debug, Default, Clone)]
pub struct ClientLookup {
    clients: HashMap<String, String>,
}

impl ClientLookup {
    pub fn from_queries(queries: &[TrackingQuery]) -> Self {
        let mut lookup = Self::default();
        for query in queries {
            lookup.insert(&query.tracking_number, &query.client);
        }
        lookup
    }

    pub fn insert(&mut self, tracking_number: &str, client: &str) {
        self.clients
            .insert(tracking_number.to_string(), client.to_string());
    }

    /// Client label for a tracking number, or an empty string if unknown.
    pub fn client_for(&self, tracking_number: &str) -> &str {
        self.clients
            .get(tracking_number)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }
}

/// Type tag of a carrier date stamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateKind {
    Ship,
    ActualPickup,
    ActualDelivery,
    Other(String),
}

impl From<&str> for DateKind {
    fn from(tag: &str) -> Self {
        match tag {
            "SHIP" => DateKind::Ship,
            "ACTUAL_PICKUP" => DateKind::ActualPickup,
            "ACTUAL_DELIVERY" => DateKind::ActualDelivery,
            other => DateKind::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateStamp {
    pub kind: DateKind,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanEvent {
    pub description: String,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Origin {
    pub city: String,
    pub state: String,
    pub country: String,
}

/// One tracking result as reported by the carrier. A multi-piece shipment
/// yields several of these under the same tracking number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarrierEvent {
    pub tracking_number: String,
    pub status_code: String,
    pub status_description: String,
    pub dates: Vec<DateStamp>,
    pub scan_events: Vec<ScanEvent>,
    pub origin: Origin,
}

impl CarrierEvent {
    /// Raw value of the last stamp with this tag. Empty values count as absent.
    pub fn date(&self, kind: &DateKind) -> Option<&str> {
        self.dates
            .iter()
            .rev()
            .find(|stamp| &stamp.kind == kind)
            .map(|stamp| stamp.value.as_str())
            .filter(|value| !value.is_empty())
    }

    /// Ship date, falling back to the actual pickup date.
    pub fn ship_date(&self) -> Option<&str> {
        self.date(&DateKind::Ship)
            .or_else(|| self.date(&DateKind::ActualPickup))
    }

    pub fn delivery_date(&self) -> Option<&str> {
        self.date(&DateKind::ActualDelivery)
    }

    /// Date of the first scan announcing that shipment information was sent
    /// to the carrier, which is when the label was created.
    pub fn label_date(&self) -> Option<&str> {
        self.scan_events
            .iter()
            .find(|event| {
                event
                    .description
                    .to_lowercase()
                    .contains("information sent")
            })
            .and_then(|event| event.date.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Delivered,
    LabelCreated,
    InTransit,
    Exception,
    Unknown,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Delivered => write!(f, "DELIVERED"),
            Lifecycle::LabelCreated => write!(f, "LABEL_CREATED"),
            Lifecycle::InTransit => write!(f, "IN_TRANSIT"),
            Lifecycle::Exception => write!(f, "EXCEPTION"),
            Lifecycle::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// A fully classified report row. Derived on every run, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRecord {
    pub client: String,
    pub tracking_number: String,
    pub status: String,
    pub category: Lifecycle,
    pub label_date: Option<NaiveDateTime>,
    pub ship_date: Option<NaiveDateTime>,
    pub delivery_date: Option<NaiveDateTime>,
    pub days_since_ship: i64,
    pub working_days: i64,
    pub label_age: i64,
    pub label_text: String,
    pub narrative: String,
    pub origin: Origin,
}
