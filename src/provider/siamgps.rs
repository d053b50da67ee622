use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::provider::{Config, Credentials, Error, RealtimeSnapshot, RouteProvider, TrackPoint};
use crate::shared::geo::Coordinate;

pub const PROVIDER_NAME: &str = "siamgps";

/// Siam GPS Track wants POST with a bearer-prefixed `Authorization` and a
/// JSON body of `vehicleId`/`startDate`/`endDate` in vendor-local ISO-8601.
/// Calls go through the pass-through relay, never straight to the vendor.
///
/// Quirks owned here: GeoJSON-style coordinate pairs in `[longitude,
/// latitude]` order, `vehicleStatus == "RUNNING"` standing in for ignition,
/// `gpsFix` standing in for satellite count, and field names that drift
/// between API versions (`sGeo`/`sGeO`, `location`/`localtion`).
#[derive(Debug, Clone)]
pub struct SiamGpsProvider {
    client: reqwest::Client,
    route_url: String,
    realtime_url: String,
    utc_offset: FixedOffset,
}

impl SiamGpsProvider {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            route_url: config.siamgps_route_url.clone(),
            realtime_url: config.siamgps_realtime_url.clone(),
            utc_offset: config.utc_offset,
        }
    }

    fn day_window_iso(&self, date: NaiveDate) -> (String, String) {
        let start = NaiveDateTime::new(date, NaiveTime::MIN);
        let end = start + chrono::Duration::milliseconds(86_399_999);
        (
            format_local(start, self.utc_offset),
            format_local(end, self.utc_offset),
        )
    }
}

fn format_local(naive: NaiveDateTime, offset: FixedOffset) -> String {
    DateTime::<FixedOffset>::from_naive_utc_and_offset(naive - offset, offset)
        .to_rfc3339_opts(SecondsFormat::Millis, false)
}

/// The vendor rejects raw tokens; everything must carry the scheme.
fn bearer(credentials: &Credentials) -> String {
    if credentials.authorization.starts_with("Bearer ") {
        credentials.authorization.clone()
    } else {
        format!("Bearer {}", credentials.authorization)
    }
}

#[derive(Debug, Serialize)]
struct RouteRequest<'a> {
    #[serde(rename = "vehicleId")]
    vehicle_id: i64,
    #[serde(rename = "startDate")]
    start_date: &'a str,
    #[serde(rename = "endDate")]
    end_date: &'a str,
}

impl RouteProvider for SiamGpsProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn fetch_route(
        &self,
        device_id: i64,
        date: NaiveDate,
        credentials: &Credentials,
    ) -> Result<Vec<TrackPoint>, Error> {
        let (start_date, end_date) = self.day_window_iso(date);
        let response = self
            .client
            .post(&self.route_url)
            .header("Authorization", bearer(credentials))
            .json(&RouteRequest {
                vehicle_id: device_id,
                start_date: &start_date,
                end_date: &end_date,
            })
            .send()
            .await?;

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
        let url = format!("{}/{}", self.realtime_url, device_id);
        let response = self
            .client
            .post(&url)
            .header("Authorization", bearer(credentials))
            .send()
            .await?;

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
    data: Vec<VendorPoint>,
}

#[derive(Debug, Deserialize)]
struct RealtimeResponse {
    #[serde(default)]
    data: Vec<VendorPoint>,
    #[serde(default, rename = "vehicleInfo")]
    vehicle_info: Option<VehicleInfo>,
}

#[derive(Debug, Deserialize)]
struct VehicleInfo {
    #[serde(default, rename = "_vehiPlateNo")]
    plate_no: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VendorPoint {
    // Older api versions misspell this field
    #[serde(default, alias = "localtion")]
    location: Option<GeoJsonPoint>,
    #[serde(default)]
    speed: f64,
    time: DateTime<Utc>,
    #[serde(default)]
    heading: Option<f64>,
    #[serde(default, rename = "vehicleStatus")]
    vehicle_status: Option<String>,
    #[serde(default, rename = "gpsFix")]
    gps_fix: Option<bool>,
    #[serde(default, rename = "geoLocation")]
    geo_location: Option<GeoLabel>,
}

#[derive(Debug, Deserialize)]
struct GeoJsonPoint {
    #[serde(default)]
    coordinates: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct GeoLabel {
    #[serde(default, rename = "sGeo", alias = "sGeO")]
    s_geo: Option<String>,
}

impl VendorPoint {
    /// Coordinates come in GeoJSON order: longitude first.
    fn latitude(&self) -> f64 {
        self.location
            .as_ref()
            .and_then(|point| point.coordinates.get(1))
            .copied()
            .unwrap_or(0.0)
    }

    fn longitude(&self) -> f64 {
        self.location
            .as_ref()
            .and_then(|point| point.coordinates.first())
            .copied()
            .unwrap_or(0.0)
    }

    fn ignition_on(&self) -> Option<bool> {
        self.vehicle_status
            .as_deref()
            .map(|status| status == "RUNNING")
    }

    fn satellite_count(&self) -> Option<u32> {
        Some(if self.gps_fix.unwrap_or(false) { 10 } else { 0 })
    }

    fn address(&self) -> Option<String> {
        self.geo_location
            .as_ref()
            .and_then(|label| label.s_geo.clone())
            .filter(|address| !address.is_empty())
    }
}

fn parse_route_body(body: &str) -> Result<Vec<TrackPoint>, Error> {
    let response: RouteResponse = serde_json::from_str(body)?;
    Ok(response.data.into_iter().map(to_track_point).collect())
}

fn to_track_point(value: VendorPoint) -> TrackPoint {
    TrackPoint {
        recorded_at: value.time,
        latitude: value.latitude(),
        longitude: value.longitude(),
        speed_kph: value.speed,
        heading_deg: value.heading,
        ignition_on: value.ignition_on(),
        satellite_count: value.satellite_count(),
        address_hint: value.address(),
    }
}

fn parse_realtime_body(body: &str, device_id: i64) -> Result<RealtimeSnapshot, Error> {
    let response: RealtimeResponse = serde_json::from_str(body)?;
    let point = response
        .data
        .into_iter()
        .next()
        .ok_or(Error::MissingDevice(device_id))?;
    Ok(RealtimeSnapshot {
        device_id,
        name: response
            .vehicle_info
            .and_then(|info| info.plate_no)
            .unwrap_or_default(),
        coordinate: Coordinate {
            latitude: point.latitude(),
            longitude: point.longitude(),
        },
        speed_kph: point.speed,
        ignition_on: point.ignition_on(),
        // Getting a data point back is the only liveness signal this api has
        online: true,
        recorded_at: point.time,
        address: point.address(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_route_test() {
        let body = r#"{
            "status": 200,
            "data": [
                {
                    "location": { "type": "Point", "coordinates": [100.00464, 7.70496] },
                    "speed": 0,
                    "time": "2025-01-15T01:10:00Z",
                    "heading": 90.0,
                    "vehicleStatus": "RUNNING",
                    "gpsFix": true,
                    "geoLocation": { "sGeO": "Tha Miram, Phatthalung" }
                },
                {
                    "location": { "type": "Point", "coordinates": [100.0051, 7.7052] },
                    "speed": 35.0,
                    "time": "2025-01-15T01:12:00Z",
                    "vehicleStatus": "STOP",
                    "gpsFix": false
                }
            ]
        }"#;
        let points = parse_route_body(body).unwrap();
        assert_eq!(points.len(), 2);
        // Reversed vendor order: latitude comes second on the wire
        assert_eq!(points[0].latitude, 7.70496);
        assert_eq!(points[0].longitude, 100.00464);
        assert_eq!(points[0].ignition_on, Some(true));
        assert_eq!(points[0].satellite_count, Some(10));
        assert_eq!(
            points[0].address_hint.as_deref(),
            Some("Tha Miram, Phatthalung")
        );
        assert_eq!(points[1].ignition_on, Some(false));
        assert_eq!(points[1].satellite_count, Some(0));
        assert_eq!(points[1].address_hint, None);
    }

    #[test]
    fn parse_route_missing_location_test() {
        let body = r#"{"data": [{"speed": 1.0, "time": "2025-01-15T01:10:00Z"}]}"#;
        let points = parse_route_body(body).unwrap();
        assert_eq!(points[0].latitude, 0.0);
        assert_eq!(points[0].longitude, 0.0);
    }

    #[test]
    fn parse_realtime_misspelled_location_test() {
        let body = r#"{
            "status": 200,
            "data": [
                {
                    "localtion": { "coordinates": [100.1, 7.8] },
                    "speed": 20.0,
                    "time": "2025-01-15T04:00:00Z",
                    "vehicleStatus": "RUNNING",
                    "geoLocation": { "sGeo": "Khuan Khanun" }
                }
            ],
            "vehicleInfo": { "_vehiPlateNo": "80-8844" }
        }"#;
        let snapshot = parse_realtime_body(body, 312767).unwrap();
        assert_eq!(snapshot.device_id, 312767);
        assert_eq!(snapshot.name, "80-8844");
        assert_eq!(snapshot.coordinate.latitude, 7.8);
        assert_eq!(snapshot.coordinate.longitude, 100.1);
        assert_eq!(snapshot.address.as_deref(), Some("Khuan Khanun"));
    }

    #[test]
    fn parse_realtime_empty_test() {
        let body = r#"{"status": 200, "data": []}"#;
        assert!(matches!(
            parse_realtime_body(body, 9),
            Err(Error::MissingDevice(9))
        ));
    }

    #[test]
    fn bearer_prefix_test() {
        let raw = Credentials {
            authorization: "abc123".to_string(),
            token: None,
        };
        assert_eq!(bearer(&raw), "Bearer abc123");

        let prefixed = Credentials {
            authorization: "Bearer abc123".to_string(),
            token: None,
        };
        assert_eq!(bearer(&prefixed), "Bearer abc123");
    }

    #[test]
    fn day_window_test() {
        let provider = SiamGpsProvider::new(reqwest::Client::new(), &Config::default());
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let (start, end) = provider.day_window_iso(date);
        assert_eq!(start, "2025-01-15T00:00:00.000+07:00");
        assert_eq!(end, "2025-01-15T23:59:59.999+07:00");
    }
}
