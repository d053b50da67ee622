//! Local-first engine for GPS fleet route history.
//!
//! Vendor payloads are normalized into canonical track points by one adapter
//! per provider, fetched concurrently per device with a durable per-day
//! cache in front, and turned into labeled, duration-annotated stop events.

pub mod analysis;
pub mod cache;
pub mod fetch;
pub mod provider;
pub mod registry;
pub mod shared;
pub mod sites;

pub mod prelude {
    pub use crate::analysis::{StopEvent, coalesce, detect_stops};
    pub use crate::cache::RouteCache;
    pub use crate::fetch::Orchestrator;
    pub use crate::provider::{Credentials, Provider, RouteProvider, TrackPoint};
    pub use crate::registry::{CredentialStore, MemoryCredentialStore, Vehicle, VehicleRegistry};
    pub use crate::shared::geo::{Coordinate, Distance};
    pub use crate::sites::{Site, SiteIndex, SiteKind};
}
