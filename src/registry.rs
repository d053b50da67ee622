use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::provider::Credentials;

/// One tracked vehicle as the host application knows it. The registry is
/// refreshed by the host before a batch and read-only inside one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: i64,
    pub gps_device_id: i64,
    pub name: String,
    pub provider: String,
    pub color: String,
}

#[derive(Debug, Default, Clone)]
pub struct VehicleRegistry {
    vehicles: Vec<Vehicle>,
    device_lookup: HashMap<i64, usize>,
}

impl VehicleRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn from_vehicles(vehicles: Vec<Vehicle>) -> Self {
        let mut device_lookup = HashMap::new();
        for (index, vehicle) in vehicles.iter().enumerate() {
            device_lookup.insert(vehicle.gps_device_id, index);
        }
        Self {
            vehicles,
            device_lookup,
        }
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    /// Get the vehicle a GPS device belongs to.
    /// If no vehicle is registered for the device None is returned.
    pub fn by_device_id(&self, device_id: i64) -> Option<&Vehicle> {
        let index = self.device_lookup.get(&device_id)?;
        Some(&self.vehicles[*index])
    }
}

/// Read-at-call-time source of provider API tokens. Replaces the ambient
/// credential globals of a browser session with an explicit collaborator
/// handed to the orchestrator at batch start.
pub trait CredentialStore {
    fn credentials(&self, provider: &str) -> Option<Credentials>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryCredentialStore {
    entries: HashMap<String, Credentials>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn insert(&mut self, provider: impl Into<String>, credentials: Credentials) {
        self.entries.insert(provider.into(), credentials);
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn credentials(&self, provider: &str) -> Option<Credentials> {
        self.entries.get(provider).cloned()
    }
}
