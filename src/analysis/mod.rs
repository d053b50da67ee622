use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    provider::TrackPoint,
    shared::{
        geo::{Coordinate, Distance},
        time::format_duration,
    },
    sites::SiteIndex,
};

/// One labeled halt in a vehicle's day: a maximal run of zero-speed points,
/// possibly merged with neighbors that belong to the same visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopEvent {
    pub device_id: i64,
    pub vehicle_name: String,
    pub location: String,
    pub coordinate: Coordinate,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub distance_from_previous_km: Option<f64>,
}

impl StopEvent {
    pub fn duration_hhmm(&self) -> String {
        format_duration(self.duration_minutes)
    }
}

/// Walks the point sequence and emits one StopEvent per maximal zero-speed
/// run. Points are sorted by timestamp first; vendors do not guarantee
/// order. An empty input yields an empty result.
///
/// A stop's label falls back through: nearest known site within `radius`,
/// then the vendor's address hint, then a synthesized `point #N`.
pub fn detect_stops(
    points: &[TrackPoint],
    sites: &SiteIndex,
    radius: Distance,
    device_id: i64,
    vehicle_name: &str,
) -> Vec<StopEvent> {
    let mut ordered: Vec<&TrackPoint> = points.iter().collect();
    ordered.sort_by_key(|point| point.recorded_at);

    let mut stops = Vec::new();
    let mut current: Option<StopEvent> = None;

    for (index, point) in ordered.iter().copied().enumerate() {
        if point.is_stationary() {
            match &mut current {
                Some(stop) => stop.ended_at = point.recorded_at,
                None => {
                    current = Some(StopEvent {
                        device_id,
                        vehicle_name: vehicle_name.to_string(),
                        location: label_for(point, index, sites, radius),
                        coordinate: point.coordinate(),
                        started_at: point.recorded_at,
                        ended_at: point.recorded_at,
                        duration_minutes: 0,
                        distance_from_previous_km: None,
                    })
                }
            }
        } else if let Some(mut stop) = current.take() {
            close_stop(&mut stop);
            stops.push(stop);
        }
    }

    // A vehicle parked at end of day leaves the final stop open
    if let Some(mut stop) = current.take() {
        close_stop(&mut stop);
        stops.push(stop);
    }

    stops
}

fn label_for(point: &TrackPoint, index: usize, sites: &SiteIndex, radius: Distance) -> String {
    if let Some(site) = sites.nearest(&point.coordinate(), radius) {
        return site.name.clone();
    }
    if let Some(address) = &point.address_hint
        && !address.is_empty()
    {
        return address.clone();
    }
    format!("point #{}", index + 1)
}

fn close_stop(stop: &mut StopEvent) {
    let seconds = (stop.ended_at - stop.started_at).num_seconds();
    stop.duration_minutes = (seconds as f64 / 60.0).round() as i64;
}

/// Drops stops shorter than `min_duration_minutes`, then merges each stop
/// into the previous kept one when both belong to the same device and share
/// a label or sit within `radius` of each other. Merging extends the end
/// time, sums durations, and only upgrades the label when the incoming one
/// ranks strictly higher (known site beats vendor address beats `point #N`).
///
/// Applying this twice with the same parameters changes nothing.
pub fn coalesce(
    stops: Vec<StopEvent>,
    min_duration_minutes: i64,
    radius: Distance,
    sites: &SiteIndex,
) -> Vec<StopEvent> {
    let mut kept: Vec<StopEvent> = Vec::new();

    for mut stop in stops {
        if stop.duration_minutes < min_duration_minutes {
            continue;
        }

        if let Some(previous) = kept.last_mut()
            && should_merge(previous, &stop, radius)
        {
            previous.ended_at = stop.ended_at;
            previous.duration_minutes += stop.duration_minutes;
            if label_rank(&stop.location, sites) > label_rank(&previous.location, sites) {
                previous.location = stop.location;
            }
            continue;
        }

        stop.distance_from_previous_km = kept
            .last()
            .map(|previous| previous.coordinate.haversine_distance(&stop.coordinate).as_kilometers());
        kept.push(stop);
    }

    kept
}

fn should_merge(previous: &StopEvent, stop: &StopEvent, radius: Distance) -> bool {
    previous.device_id == stop.device_id
        && (previous.location == stop.location
            || previous.coordinate.haversine_distance(&stop.coordinate) <= radius)
}

fn label_rank(label: &str, sites: &SiteIndex) -> u8 {
    if sites.contains_name(label) {
        2
    } else if label.starts_with("point #") {
        0
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sites::{Site, SiteKind};

    fn index_with_office() -> SiteIndex {
        SiteIndex::from_sites(vec![Site {
            name: "Head office".to_string(),
            kind: SiteKind::Office,
            coordinate: Coordinate::from((7.70496, 100.00464)),
        }])
    }

    fn point(at: &str, speed: f64, lat: f64, lng: f64) -> TrackPoint {
        TrackPoint {
            recorded_at: at.parse().unwrap(),
            latitude: lat,
            longitude: lng,
            speed_kph: speed,
            heading_deg: None,
            ignition_on: None,
            satellite_count: None,
            address_hint: None,
        }
    }

    #[test]
    fn empty_input_test() {
        let sites = index_with_office();
        let stops = detect_stops(&[], &sites, Distance::from_meters(200.0), 1, "Truck");
        assert!(stops.is_empty());
    }

    #[test]
    fn label_rank_test() {
        let sites = index_with_office();
        assert_eq!(label_rank("Head office", &sites), 2);
        assert_eq!(label_rank("Khao Chaison Rd", &sites), 1);
        assert_eq!(label_rank("point #4", &sites), 0);
    }

    #[test]
    fn unsorted_input_test() {
        let sites = index_with_office();
        // Stop points arrive out of order; the run is still one stop
        let points = vec![
            point("2025-01-15T02:06:00Z", 0.0, 7.70496, 100.00464),
            point("2025-01-15T02:00:00Z", 0.0, 7.70496, 100.00464),
            point("2025-01-15T02:10:00Z", 40.0, 7.72, 100.01),
        ];
        let stops = detect_stops(&points, &sites, Distance::from_meters(200.0), 1, "Truck");
        assert_eq!(stops.len(), 1);
        assert_eq!(stops[0].duration_minutes, 6);
        assert!(stops[0].ended_at >= stops[0].started_at);
    }

    #[test]
    fn address_hint_fallback_test() {
        let sites = SiteIndex::new();
        let mut labeled = point("2025-01-15T02:00:00Z", 0.0, 7.9, 100.2);
        labeled.address_hint = Some("Khuan Khanun Rd".to_string());
        let points = vec![
            labeled,
            point("2025-01-15T02:05:00Z", 30.0, 7.91, 100.21),
            point("2025-01-15T02:10:00Z", 0.0, 7.95, 100.25),
        ];
        let stops = detect_stops(&points, &sites, Distance::from_meters(200.0), 1, "Truck");
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].location, "Khuan Khanun Rd");
        // No site, no hint: synthesized from the point's position in the run
        assert_eq!(stops[1].location, "point #3");
    }
}
