use super::{CourierClient, Session};
use crate::config::FedexConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use ureq::Agent;

/// FedEx refuses track requests carrying more tracking numbers than this.
pub const MAX_TRACKING_NUMBERS_PER_REQUEST: usize = 30;

const TOKEN_PATH: &str = "/oauth/token";
const TRACK_PATH: &str = "/track/v1/trackingnumbers";
const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

pub struct FedexClient {
    base_url: String,
    client_id: String,
    client_secret: String,
    locale: String,
    auth_agent: Agent,
    track_agent: Agent,
}

impl FedexClient {
    pub fn new(config: &FedexConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone().unwrap_or_default(),
            client_secret: config.client_secret.clone().unwrap_or_default(),
            locale: config.locale.clone(),
            auth_agent: agent_with_timeout(config.auth_timeout_seconds),
            track_agent: agent_with_timeout(config.track_timeout_seconds),
        }
    }
}

fn agent_with_timeout(seconds: u64) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(seconds)))
        .build()
        .into()
}

/// Human label for a FedEx latest-status code, if it is one we know.
pub fn status_label(code: &str) -> Option<&'static str> {
    match code {
        "DL" => Some("Delivered"),
        "IT" => Some("In Transit"),
        "PU" => Some("Picked Up"),
        "OD" => Some("Out for Delivery"),
        "DE" => Some("Delivery Exception"),
        "SE" => Some("Shipment Exception"),
        "CD" => Some("Clearance Delay"),
        "OC" => Some("Label Created"),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl CourierClient for FedexClient {
    fn authenticate(&self) -> Result<Session> {
        debug!("Fetching new FedEx OAuth token");

        let url = format!("{}{TOKEN_PATH}", self.base_url);
        let response = self
            .auth_agent
            .post(&url)
            .send_form([
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .context("FedEx OAuth token request failed")?;

        let token: TokenResponse = response
            .into_body()
            .read_json()
            .context("Failed to parse FedEx token response")?;

        let expires_in = token.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS);
        debug!(expires_in_secs = expires_in, "FedEx OAuth token acquired");

        Ok(Session::new(token.access_token, Duration::from_secs(expires_in)))
    }

    fn track_batch(&self, session: &Session, tracking_numbers: &[String]) -> Result<TrackResponse> {
        let tracking_info: Vec<_> = tracking_numbers
            .iter()
            .take(MAX_TRACKING_NUMBERS_PER_REQUEST)
            .map(|tn| json!({ "trackingNumberInfo": { "trackingNumber": tn } }))
            .collect();

        let request_body = json!({
            "includeDetailedScans": true,
            "trackingInfo": tracking_info,
        });

        let url = format!("{}{TRACK_PATH}", self.base_url);
        let response = self
            .track_agent
            .post(&url)
            .header("Authorization", &format!("Bearer {}", session.access_token()))
            .header("X-locale", &self.locale)
            .send_json(&request_body)
            .context("FedEx track request failed")?;

        let body: TrackResponse = response
            .into_body()
            .read_json()
            .context("Failed to parse FedEx track response")?;

        debug!(
            requested = tracking_info.len(),
            returned = body.results().len(),
            "FedEx track response received"
        );

        Ok(body)
    }
}

// Wire shapes of the FedEx Track API response:
// output.completeTrackResults[].trackResults[]

#[derive(Debug, Default, Deserialize)]
pub struct TrackResponse {
    #[serde(default)]
    pub output: Option<TrackOutput>,
}

impl TrackResponse {
    pub fn results(&self) -> &[CompleteTrackResult] {
        self.output
            .as_ref()
            .map(|output| output.complete_track_results.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackOutput {
    #[serde(default)]
    pub complete_track_results: Vec<CompleteTrackResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTrackResult {
    #[serde(default)]
    pub tracking_number: String,
    #[serde(default)]
    pub track_results: Vec<TrackResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackResult {
    #[serde(default)]
    pub latest_status_detail: Option<StatusDetail>,
    #[serde(default)]
    pub date_and_times: Vec<DateAndTime>,
    #[serde(default)]
    pub scan_events: Vec<WireScanEvent>,
    #[serde(default)]
    pub origin_location: Option<OriginLocation>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateAndTime {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub date_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireScanEvent {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub event_description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginLocation {
    #[serde(default)]
    pub location_contact_and_address: Option<ContactAndAddress>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContactAndAddress {
    #[serde(default)]
    pub address: Option<Address>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state_or_province_code: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
}
