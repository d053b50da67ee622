use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Deserialize;

use crate::provider::{Config, Credentials, Error, RealtimeSnapshot, RouteProvider, TrackPoint};
use crate::shared::geo::Coordinate;

pub const PROVIDER_NAME: &str = "andaman";

/// Andaman Tracking talks GET with query parameters and two raw custom
/// headers (`Authorization` and `Token`, no scheme prefix). Day windows are
/// epoch milliseconds in fleet-local time.
#[derive(Debug, Clone)]
pub struct AndamanProvider {
    client: reqwest::Client,
    route_url: String,
    realtime_url: String,
    utc_offset: FixedOffset,
}

impl AndamanProvider {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            route_url: config.andaman_route_url.clone(),
            realtime_url: config.andaman_realtime_url.clone(),
            utc_offset: config.utc_offset,
        }
    }

    fn day_window_millis(&self, date: NaiveDate) -> (i64, i64) {
        let midnight = NaiveDateTime::new(date, NaiveTime::MIN);
        let start =
            midnight.and_utc().timestamp_millis() - i64::from(self.utc_offset.local_minus_utc()) * 1000;
        // 00:00:00 through 23:59:59 of the same local day
        (start, start + 86_399_000)
    }
}

impl RouteProvider for AndamanProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn fetch_route(
        &self,
        device_id: i64,
        date: NaiveDate,
        credentials: &Credentials,
    ) -> Result<Vec<TrackPoint>, Error> {
        let (start, end) = self.day_window_millis(date);
        let mut request = self
            .client
            .get(&self.route_url)
            .query(&[
                ("deviceId", device_id.to_string()),
                ("start", start.to_string()),
                ("end", end.to_string()),
            ])
            .header("Authorization", &credentials.authorization);
        if let Some(token) = &credentials.token {
            request = request.header("Token", token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                message: body,
            });
        }
        parse_route_body(&body)
    }

    async fn fetch_realtime(
        &self,
        device_id: i64,
        credentials: &Credentials,
    ) -> Result<RealtimeSnapshot, Error> {
        let mut request = self
            .client
            .get(&self.realtime_url)
            .header("Authorization", &credentials.authorization);
        if let Some(token) = &credentials.token {
            request = request.header("Token", token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                message: body,
            });
        }
        parse_realtime_body(&body, device_id)
    }
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    #[serde(default)]
    list: Vec<RoutePoint>,
}

#[derive(Debug, Deserialize)]
struct RoutePoint {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    speed: f64,
    event_stamp: DateTime<Utc>,
    #[serde(default)]
    direction: Option<f64>,
    #[serde(default)]
    ignition: Option<u8>,
    #[serde(default)]
    satellites: Option<u32>,
    #[serde(default)]
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RealtimeVehicle {
    device_id: i64,
    #[serde(default)]
    name: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    speed: f64,
    #[serde(default)]
    online: Option<u8>,
    event_stamp: DateTime<Utc>,
    #[serde(default)]
    ignition: Option<u8>,
    #[serde(default)]
    address: Option<String>,
}

fn parse_route_body(body: &str) -> Result<Vec<TrackPoint>, Error> {
    let response: RouteResponse = serde_json::from_str(body)?;
    Ok(response.list.into_iter().map(to_track_point).collect())
}

fn to_track_point(value: RoutePoint) -> TrackPoint {
    TrackPoint {
        recorded_at: value.event_stamp,
        latitude: value.latitude,
        longitude: value.longitude,
        speed_kph: value.speed,
        heading_deg: value.direction,
        ignition_on: value.ignition.map(|flag| flag != 0),
        satellite_count: value.satellites,
        address_hint: value.address.filter(|address| !address.is_empty()),
    }
}

fn parse_realtime_body(body: &str, device_id: i64) -> Result<RealtimeSnapshot, Error> {
    let vehicles: Vec<RealtimeVehicle> = serde_json::from_str(body)?;
    let vehicle = vehicles
        .into_iter()
        .find(|vehicle| vehicle.device_id == device_id)
        .ok_or(Error::MissingDevice(device_id))?;
    Ok(RealtimeSnapshot {
        device_id: vehicle.device_id,
        name: vehicle.name,
        coordinate: Coordinate {
            latitude: vehicle.latitude,
            longitude: vehicle.longitude,
        },
        speed_kph: vehicle.speed,
        ignition_on: vehicle.ignition.map(|flag| flag != 0),
        online: vehicle.online.map(|flag| flag != 0).unwrap_or(false),
        recorded_at: vehicle.event_stamp,
        address: vehicle.address.filter(|address| !address.is_empty()),
    })
}
