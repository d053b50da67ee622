use chrono::NaiveDate;
use fleetpath::cache::RouteCache;
use fleetpath::fetch::{Error, Orchestrator};
use fleetpath::provider::{Config, Credentials, TrackPoint};
use fleetpath::registry::{MemoryCredentialStore, Vehicle, VehicleRegistry};

/// Nothing listens on the discard port, so every network call fails fast
/// with a transport error.
fn unreachable_config() -> Config {
    Config {
        andaman_route_url: "http://127.0.0.1:9/passroute".to_string(),
        andaman_realtime_url: "http://127.0.0.1:9/home".to_string(),
        siamgps_route_url: "http://127.0.0.1:9/siamgps/route-history".to_string(),
        siamgps_realtime_url: "http://127.0.0.1:9/siamgps/realtime".to_string(),
        ..Config::default()
    }
}

fn truck(device_id: i64, provider: &str) -> Vehicle {
    Vehicle {
        id: device_id * 100,
        gps_device_id: device_id,
        name: format!("Truck {device_id}"),
        provider: provider.to_string(),
        color: "#0ea5e9".to_string(),
    }
}

fn credentials() -> MemoryCredentialStore {
    let mut store = MemoryCredentialStore::new();
    store.insert(
        "andaman",
        Credentials {
            authorization: "auth".to_string(),
            token: Some("token".to_string()),
        },
    );
    store.insert(
        "siamgps",
        Credentials {
            authorization: "bearer-token".to_string(),
            token: None,
        },
    );
    store
}

fn sample_points() -> Vec<TrackPoint> {
    vec![TrackPoint {
        recorded_at: "2025-01-15T02:00:00Z".parse().unwrap(),
        latitude: 7.70496,
        longitude: 100.00464,
        speed_kph: 0.0,
        heading_deg: None,
        ignition_on: Some(false),
        satellite_count: Some(9),
        address_hint: None,
    }]
}

fn orchestrator_with_cached_devices(
    cached_devices: &[i64],
    registry: VehicleRegistry,
    date: NaiveDate,
) -> Orchestrator<MemoryCredentialStore> {
    let cache = RouteCache::in_memory().unwrap();
    for &device_id in cached_devices {
        cache.put(device_id, date, &sample_points()).unwrap();
    }
    Orchestrator::new(registry, credentials())
        .with_config(unreachable_config())
        .with_cache(cache)
}

#[tokio::test]
async fn partial_failure_test() {
    let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
    let registry = VehicleRegistry::from_vehicles(vec![
        truck(1, "andaman"),
        truck(2, "siamgps"),
        truck(3, "andaman"),
    ]);
    // Devices 1 and 2 have cached days; device 3 must hit the dead network
    let orchestrator = orchestrator_with_cached_devices(&[1, 2], registry, date);

    let results = orchestrator.fetch_many(&[1, 2, 3], date, false).await.unwrap();
    assert_eq!(results.len(), 3);
    assert!(results[&1].is_some());
    assert!(results[&2].is_some());
    assert!(results[&3].is_none());
}

#[tokio::test]
async fn all_failed_test() {
    let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
    let registry = VehicleRegistry::from_vehicles(vec![truck(1, "andaman")]);
    let orchestrator = orchestrator_with_cached_devices(&[], registry, date);

    let result = orchestrator.fetch_many(&[1], date, false).await;
    assert!(matches!(result, Err(Error::AllProvidersFailed)));
}

#[tokio::test]
async fn empty_devices_rejected_test() {
    let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
    let registry = VehicleRegistry::from_vehicles(vec![truck(1, "andaman")]);
    let orchestrator = orchestrator_with_cached_devices(&[1], registry, date);

    let result = orchestrator.fetch_many(&[], date, false).await;
    assert!(matches!(result, Err(Error::InvalidRequest(_))));
}

#[tokio::test]
async fn force_fresh_bypasses_cache_test() {
    let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
    let registry = VehicleRegistry::from_vehicles(vec![truck(1, "andaman")]);
    let orchestrator = orchestrator_with_cached_devices(&[1], registry, date);

    // Cached data would satisfy this, but forcing fresh hits the dead
    // network and the lone device comes back empty-handed
    let result = orchestrator.fetch_many(&[1], date, true).await;
    assert!(matches!(result, Err(Error::AllProvidersFailed)));
}

#[tokio::test]
async fn unknown_device_and_provider_test() {
    let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
    let registry = VehicleRegistry::from_vehicles(vec![truck(1, "andaman"), truck(2, "gpsgate")]);
    let orchestrator = orchestrator_with_cached_devices(&[1], registry, date);

    // Device 2 resolves to an unsupported provider, device 9 is unregistered
    let results = orchestrator.fetch_many(&[1, 2, 9], date, false).await.unwrap();
    assert!(results[&1].is_some());
    assert!(results[&2].is_none());
    assert!(results[&9].is_none());
}

#[tokio::test]
async fn duplicate_devices_collapse_test() {
    let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
    let registry = VehicleRegistry::from_vehicles(vec![truck(1, "andaman")]);
    let orchestrator = orchestrator_with_cached_devices(&[1], registry, date);

    let results = orchestrator.fetch_many(&[1, 1, 1], date, false).await.unwrap();
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn utilization_from_cache_test() {
    use fleetpath::shared::time::{DateSpan, OfficeHours};

    let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
    let registry = VehicleRegistry::from_vehicles(vec![truck(1, "andaman")]);
    let orchestrator = orchestrator_with_cached_devices(&[1], registry, date);

    let results = orchestrator
        .fetch_utilization(&[1], OfficeHours::new(8, 17), DateSpan::Range(date, date))
        .await
        .unwrap();
    // The cached day has a single parked point: zero utilization
    assert_eq!(results[&date][&1], 0);
}
