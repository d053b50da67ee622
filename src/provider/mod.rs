use chrono::{FixedOffset, NaiveDate};
use thiserror::Error;

pub mod andaman;
pub mod siamgps;

mod models;
pub use models::*;

pub use andaman::AndamanProvider;
pub use siamgps::SiamGpsProvider;

#[derive(Error, Debug)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected payload: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("device {0} missing from realtime feed")]
    MissingDevice(i64),
}

/// API tokens for one provider, read from the host's credential store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub authorization: String,
    pub token: Option<String>,
}

/// Endpoint configuration for the known vendors. The Siam GPS urls point at
/// the pass-through relay rather than the vendor itself, so the bearer token
/// never reaches a browser context.
#[derive(Debug, Clone)]
pub struct Config {
    pub andaman_route_url: String,
    pub andaman_realtime_url: String,
    pub siamgps_route_url: String,
    pub siamgps_realtime_url: String,
    /// The fleet's local utc offset, used to bound vendor day windows.
    pub utc_offset: FixedOffset,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            andaman_route_url: "https://apitracking.andamantracking.dev/web/v1/passroute".into(),
            andaman_realtime_url: "https://apitracking.andamantracking.dev/web/v1/home".into(),
            siamgps_route_url: "http://127.0.0.1:3000/siamgps/route-history".into(),
            siamgps_realtime_url: "http://127.0.0.1:3000/siamgps/realtime".into(),
            utc_offset: FixedOffset::east_opt(7 * 3600).expect("valid offset"),
        }
    }
}

/// The capability every vendor adapter implements. Each adapter owns its
/// vendor's wire quirks end to end; nothing vendor-specific leaks past it.
#[allow(async_fn_in_trait)]
pub trait RouteProvider {
    fn name(&self) -> &'static str;

    /// Fetches one local day of history, normalized to canonical points.
    /// Ordering is not guaranteed; the caller sorts.
    async fn fetch_route(
        &self,
        device_id: i64,
        date: NaiveDate,
        credentials: &Credentials,
    ) -> Result<Vec<TrackPoint>, Error>;

    /// Fetches the latest position of one device.
    async fn fetch_realtime(
        &self,
        device_id: i64,
        credentials: &Credentials,
    ) -> Result<RealtimeSnapshot, Error>;
}

/// Vendor dispatch, resolved from a vehicle's provider name.
#[derive(Debug, Clone)]
pub enum Provider {
    Andaman(AndamanProvider),
    SiamGps(SiamGpsProvider),
}

impl Provider {
    pub fn resolve(name: &str, client: reqwest::Client, config: &Config) -> Option<Self> {
        match name {
            andaman::PROVIDER_NAME => Some(Self::Andaman(AndamanProvider::new(client, config))),
            siamgps::PROVIDER_NAME => Some(Self::SiamGps(SiamGpsProvider::new(client, config))),
            _ => None,
        }
    }
}

impl RouteProvider for Provider {
    fn name(&self) -> &'static str {
        match self {
            Self::Andaman(provider) => provider.name(),
            Self::SiamGps(provider) => provider.name(),
        }
    }

    async fn fetch_route(
        &self,
        device_id: i64,
        date: NaiveDate,
        credentials: &Credentials,
    ) -> Result<Vec<TrackPoint>, Error> {
        match self {
            Self::Andaman(provider) => provider.fetch_route(device_id, date, credentials).await,
            Self::SiamGps(provider) => provider.fetch_route(device_id, date, credentials).await,
        }
    }

    async fn fetch_realtime(
        &self,
        device_id: i64,
        credentials: &Credentials,
    ) -> Result<RealtimeSnapshot, Error> {
        match self {
            Self::Andaman(provider) => provider.fetch_realtime(device_id, credentials).await,
            Self::SiamGps(provider) => provider.fetch_realtime(device_id, credentials).await,
        }
    }
}
