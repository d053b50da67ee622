use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::{FixedOffset, NaiveDate, Timelike, Utc};
use futures_util::future::join_all;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    cache::RouteCache,
    provider::{Config, Provider, RealtimeSnapshot, RouteProvider, TrackPoint},
    registry::{CredentialStore, VehicleRegistry},
    shared::time::{DateSpan, OfficeHours},
};

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("every provider fetch failed")]
    AllProvidersFailed,
}

/// Coordinates per-device route fetches: cache first, then the device's
/// provider, with per-device failures downgraded to empty slots so one dead
/// tracker never sinks the batch.
///
/// Collaborators are handed over up front and stay fixed for the
/// orchestrator's lifetime; the host builds a fresh one per batch when the
/// registry or credentials change.
pub struct Orchestrator<S> {
    registry: VehicleRegistry,
    credentials: S,
    cache: Option<RouteCache>,
    config: Config,
    client: reqwest::Client,
}

impl<S: CredentialStore> Orchestrator<S> {
    pub fn new(registry: VehicleRegistry, credentials: S) -> Self {
        Self {
            registry,
            credentials,
            cache: None,
            config: Config::default(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_cache(mut self, cache: RouteCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Attaches a durable cache at `path`. An unusable store degrades to
    /// always-fetch-fresh instead of failing the orchestrator.
    pub fn open_cache(mut self, path: impl AsRef<Path>) -> Self {
        match RouteCache::open(path) {
            Ok(cache) => self.cache = Some(cache),
            Err(err) => {
                warn!(error = %err, "route cache unavailable, fetching fresh");
                self.cache = None;
            }
        }
        self
    }

    /// Fetches one day of history for every device, concurrently. A device
    /// that fails resolves to None; the batch only errors when nothing at
    /// all could be fetched.
    pub async fn fetch_many(
        &self,
        device_ids: &[i64],
        date: NaiveDate,
        force_fresh: bool,
    ) -> Result<HashMap<i64, Option<Vec<TrackPoint>>>, self::Error> {
        let device_ids = unique_devices(device_ids)?;

        let fetches = device_ids
            .iter()
            .map(|&device_id| self.fetch_single(device_id, date, force_fresh));
        let results = join_all(fetches).await;

        let map: HashMap<i64, Option<Vec<TrackPoint>>> =
            device_ids.into_iter().zip(results).collect();
        if map.values().all(|points| points.is_none()) {
            return Err(Error::AllProvidersFailed);
        }
        Ok(map)
    }

    /// Latest position for every device. Never cached; partial failures
    /// yield None like `fetch_many`.
    pub async fn fetch_realtime_many(
        &self,
        device_ids: &[i64],
    ) -> Result<HashMap<i64, Option<RealtimeSnapshot>>, self::Error> {
        let device_ids = unique_devices(device_ids)?;

        let fetches = device_ids
            .iter()
            .map(|&device_id| self.fetch_realtime_single(device_id));
        let results = join_all(fetches).await;
        Ok(device_ids.into_iter().zip(results).collect())
    }

    /// Office-hours utilization per device per day, oldest day first.
    /// Days that cannot be fetched score zero for that device.
    pub async fn fetch_utilization(
        &self,
        device_ids: &[i64],
        office_hours: OfficeHours,
        span: DateSpan,
    ) -> Result<BTreeMap<NaiveDate, HashMap<i64, u32>>, self::Error> {
        let device_ids = unique_devices(device_ids)?;
        let today = Utc::now().with_timezone(&self.config.utc_offset).date_naive();

        let mut results = BTreeMap::new();
        for date in span.dates(today) {
            let fetches = device_ids
                .iter()
                .map(|&device_id| self.fetch_single(device_id, date, false));
            let per_device = join_all(fetches).await;

            let day: HashMap<i64, u32> = device_ids
                .iter()
                .zip(per_device)
                .map(|(&device_id, points)| {
                    let percent = points
                        .map(|points| {
                            utilization_percent(&points, office_hours, self.config.utc_offset)
                        })
                        .unwrap_or(0);
                    (device_id, percent)
                })
                .collect();
            results.insert(date, day);
        }
        Ok(results)
    }

    async fn fetch_single(
        &self,
        device_id: i64,
        date: NaiveDate,
        force_fresh: bool,
    ) -> Option<Vec<TrackPoint>> {
        if !force_fresh && let Some(points) = self.cached(device_id, date) {
            debug!(device_id, %date, "cache hit");
            return Some(points);
        }

        let provider = self.resolve_provider(device_id)?;
        let Some(credentials) = self.credentials.credentials(provider.name()) else {
            warn!(device_id, provider = provider.name(), "missing credentials");
            return None;
        };

        match provider.fetch_route(device_id, date, &credentials).await {
            Ok(mut points) => {
                // Vendors do not guarantee order; analysis relies on it
                points.sort_by_key(|point| point.recorded_at);
                self.store(device_id, date, &points);
                Some(points)
            }
            Err(err) => {
                warn!(device_id, %date, error = %err, "route fetch failed");
                None
            }
        }
    }

    async fn fetch_realtime_single(&self, device_id: i64) -> Option<RealtimeSnapshot> {
        let provider = self.resolve_provider(device_id)?;
        let Some(credentials) = self.credentials.credentials(provider.name()) else {
            warn!(device_id, provider = provider.name(), "missing credentials");
            return None;
        };

        match provider.fetch_realtime(device_id, &credentials).await {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                warn!(device_id, error = %err, "realtime fetch failed");
                None
            }
        }
    }

    fn resolve_provider(&self, device_id: i64) -> Option<Provider> {
        let Some(vehicle) = self.registry.by_device_id(device_id) else {
            warn!(device_id, "device not in vehicle registry");
            return None;
        };
        let resolved = Provider::resolve(&vehicle.provider, self.client.clone(), &self.config);
        if resolved.is_none() {
            warn!(device_id, provider = %vehicle.provider, "unknown provider");
        }
        resolved
    }

    fn cached(&self, device_id: i64, date: NaiveDate) -> Option<Vec<TrackPoint>> {
        let cache = self.cache.as_ref()?;
        match cache.get(device_id, date) {
            Ok(points) => points,
            Err(err) => {
                warn!(device_id, %date, error = %err, "cache read failed, fetching fresh");
                None
            }
        }
    }

    fn store(&self, device_id: i64, date: NaiveDate, points: &[TrackPoint]) {
        if let Some(cache) = &self.cache
            && let Err(err) = cache.put(device_id, date, points)
        {
            warn!(device_id, %date, error = %err, "cache write failed");
        }
    }
}

fn unique_devices(device_ids: &[i64]) -> Result<Vec<i64>, Error> {
    if device_ids.is_empty() {
        return Err(Error::InvalidRequest("no devices selected".to_string()));
    }
    let mut unique = device_ids.to_vec();
    unique.sort_unstable();
    unique.dedup();
    Ok(unique)
}

/// How much of the office-hours window a device spent moving, as a capped
/// percentage. The window length stands in for elapsed time so sparse GPS
/// sampling does not skew the ratio; a fixed lunch hour is deducted from
/// the denominator.
pub fn utilization_percent(
    points: &[TrackPoint],
    office_hours: OfficeHours,
    utc_offset: FixedOffset,
) -> u32 {
    let office_points: Vec<_> = points
        .iter()
        .filter(|point| {
            office_hours.contains_hour(point.recorded_at.with_timezone(&utc_offset).hour())
        })
        .collect();
    if office_points.is_empty() {
        return 0;
    }

    let effective = office_hours.effective_minutes() as f64;
    if effective == 0.0 {
        return 0;
    }

    let moving = office_points
        .iter()
        .filter(|point| point.speed_kph > 0.0)
        .count() as f64;
    let moving_ratio = moving / office_points.len() as f64;
    let moving_minutes = office_hours.theoretical_minutes() as f64 * moving_ratio;

    (moving_minutes / effective * 100.0).min(100.0).round() as u32
}
