use crate::classify::{ShipmentDates, classify, resolve_status};
use crate::config::ReportConfig;
use crate::courier::fedex::{MAX_TRACKING_NUMBERS_PER_REQUEST, TrackResponse, TrackResult};
use crate::courier::{CourierClient, Session};
use crate::error::{ReportError, Result};
use crate::shipment::{
    CarrierEvent, ClassifiedRecord, ClientLookup, DateKind, DateStamp, Origin, ScanEvent,
    TrackingQuery,
};
use crate::util::parse_date;
use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

/// Flatten a FedEx track response into one event per track result, in
/// response order.
pub fn flatten_response(response: &TrackResponse) -> Vec<CarrierEvent> {
    response
        .results()
        .iter()
        .flat_map(|group| {
            group
                .track_results
                .iter()
                .map(|detail| to_event(&group.tracking_number, detail))
        })
        .collect()
}

fn to_event(tracking_number: &str, detail: &TrackResult) -> CarrierEvent {
    let (status_code, status_description) = detail
        .latest_status_detail
        .as_ref()
        .map(|status| {
            (
                status.code.clone().unwrap_or_default(),
                status.description.clone().unwrap_or_default(),
            )
        })
        .unwrap_or_default();

    let dates = detail
        .date_and_times
        .iter()
        .filter_map(|entry| {
            Some(DateStamp {
                kind: DateKind::from(entry.kind.as_deref()?),
                value: entry.date_time.clone().unwrap_or_default(),
            })
        })
        .collect();

    let scan_events = detail
        .scan_events
        .iter()
        .map(|scan| ScanEvent {
            description: scan.event_description.clone().unwrap_or_default(),
            date: scan.date.clone(),
        })
        .collect();

    let origin = detail
        .origin_location
        .as_ref()
        .and_then(|location| location.location_contact_and_address.as_ref())
        .and_then(|contact| contact.address.as_ref())
        .map(|address| Origin {
            city: address.city.clone().unwrap_or_default(),
            state: address.state_or_province_code.clone().unwrap_or_default(),
            country: address.country_code.clone().unwrap_or_default(),
        })
        .unwrap_or_default();

    CarrierEvent {
        tracking_number: tracking_number.to_string(),
        status_code,
        status_description,
        dates,
        scan_events,
        origin,
    }
}

/// Track every number in sequential batches and concatenate the results.
///
/// A batch that fails is logged and dropped; the rest still report. The
/// session is refreshed only when it has expired.
pub fn fetch_events(
    courier: &dyn CourierClient,
    session: &mut Session,
    tracking_numbers: &[String],
    batch_size: usize,
) -> Result<Vec<CarrierEvent>> {
    let batch_size = batch_size.clamp(1, MAX_TRACKING_NUMBERS_PER_REQUEST);
    let mut events = Vec::new();

    for (index, batch) in tracking_numbers.chunks(batch_size).enumerate() {
        if session.is_expired() {
            debug!(batch = index, "Carrier session expired, re-authenticating");
            *session = authenticate(courier)?;
        }

        debug!(batch = index, size = batch.len(), "Dispatching track batch");

        match courier.track_batch(session, batch) {
            Ok(response) => events.extend(flatten_response(&response)),
            Err(err) => {
                warn!(
                    error = %err,
                    batch = index,
                    size = batch.len(),
                    "Track batch failed, omitting its results"
                );
            }
        }
    }

    Ok(events)
}

fn authenticate(courier: &dyn CourierClient) -> Result<Session> {
    courier
        .authenticate()
        .map_err(|err| ReportError::AuthenticationFailure(format!("{err:#}")))
}

/// Classify events and join them against the client lookup.
pub fn classify_events(
    events: &[CarrierEvent],
    clients: &ClientLookup,
    config: &ReportConfig,
    now: NaiveDateTime,
) -> Vec<ClassifiedRecord> {
    events
        .iter()
        .map(|event| {
            let status = resolve_status(event);
            let dates = ShipmentDates {
                label: parse_date(event.label_date()),
                ship: parse_date(event.ship_date()),
                delivery: parse_date(event.delivery_date()),
            };
            let classification = classify(&status, &dates, now, config.status_match, config.locale);

            ClassifiedRecord {
                client: clients.client_for(&event.tracking_number).to_string(),
                tracking_number: event.tracking_number.clone(),
                status,
                category: classification.category,
                label_date: dates.label,
                ship_date: dates.ship,
                delivery_date: dates.delivery,
                days_since_ship: classification.metrics.days_since_ship,
                working_days: classification.metrics.working_days,
                label_age: classification.metrics.label_age,
                label_text: classification.label_text,
                narrative: classification.narrative,
                origin: event.origin.clone(),
            }
        })
        .collect()
}

/// Run the whole tracking pass for a set of queries.
///
/// Fails with `NoValidTrackingNumbers` before touching the carrier when there
/// is nothing to track.
pub fn aggregate(
    courier: &dyn CourierClient,
    queries: &[TrackingQuery],
    config: &ReportConfig,
    now: NaiveDateTime,
) -> Result<Vec<ClassifiedRecord>> {
    if queries.is_empty() {
        return Err(ReportError::NoValidTrackingNumbers);
    }

    let clients = ClientLookup::from_queries(queries);
    let tracking_numbers: Vec<String> = queries
        .iter()
        .map(|query| query.tracking_number.clone())
        .collect();

    info!(
        queries = queries.len(),
        distinct = clients.len(),
        "Tracking shipments"
    );

    let mut session = authenticate(courier)?;
    let events = fetch_events(courier, &mut session, &tracking_numbers, config.batch_size)?;
    let records = classify_events(&events, &clients, config, now);

    info!(
        requested = tracking_numbers.len(),
        records = records.len(),
        "Tracking pass complete"
    );

    Ok(records)
}
