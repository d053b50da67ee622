use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::geo::Coordinate;

/// The canonical track point every vendor payload normalizes into.
/// Produced only by provider adapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub recorded_at: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub speed_kph: f64,
    pub heading_deg: Option<f64>,
    pub ignition_on: Option<bool>,
    pub satellite_count: Option<u32>,
    pub address_hint: Option<String>,
}

impl TrackPoint {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    pub fn is_stationary(&self) -> bool {
        self.speed_kph == 0.0
    }
}

/// Latest known position of a single vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeSnapshot {
    pub device_id: i64,
    pub name: String,
    pub coordinate: Coordinate,
    pub speed_kph: f64,
    pub ignition_on: Option<bool>,
    pub online: bool,
    pub recorded_at: DateTime<Utc>,
    pub address: Option<String>,
}
