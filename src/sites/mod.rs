use std::{fs::File, io, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::geo::{Coordinate, Distance};

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Unknown site kind: {0}")]
    UnknownKind(String),
}

/// What a reference location is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteKind {
    Office,
    Pickup,
    Delivery,
    Service,
}

impl FromStr for SiteKind {
    type Err = self::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "office" => Ok(Self::Office),
            "pickup" => Ok(Self::Pickup),
            "delivery" => Ok(Self::Delivery),
            "service" => Ok(Self::Service),
            other => Err(Error::UnknownKind(other.to_string())),
        }
    }
}

/// A named reference location stops get labeled against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
    pub kind: SiteKind,
    pub coordinate: Coordinate,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SiteRecord {
    name: String,
    kind: String,
    latitude: f64,
    longitude: f64,
}

/// The session's set of known sites. Loaded once, read-only during analysis.
///
/// Lookups are a linear scan; the expected scale is tens of sites, so a
/// spatial index would buy nothing.
#[derive(Debug, Default, Clone)]
pub struct SiteIndex {
    sites: Vec<Site>,
}

impl SiteIndex {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn from_sites(sites: Vec<Site>) -> Self {
        Self { sites }
    }

    /// Loads sites from a csv file with `name,kind,latitude,longitude` columns.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, self::Error> {
        let file = File::open(path)?;
        Self::from_csv_reader(file)
    }

    pub fn from_csv_reader(reader: impl io::Read) -> Result<Self, self::Error> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut sites = Vec::new();
        for record in csv_reader.deserialize() {
            let record: SiteRecord = record?;
            sites.push(Site {
                name: record.name,
                kind: record.kind.parse()?,
                coordinate: Coordinate {
                    latitude: record.latitude,
                    longitude: record.longitude,
                },
            });
        }
        Ok(Self { sites })
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Whether any site carries this exact name.
    pub fn contains_name(&self, name: &str) -> bool {
        self.sites.iter().any(|site| site.name == name)
    }

    /// Returns the site closest to `point`, if any lies strictly within
    /// `max_radius`. Ties keep the first site encountered, so results are
    /// stable for a fixed site list. An empty index returns None.
    pub fn nearest(&self, point: &Coordinate, max_radius: Distance) -> Option<&Site> {
        let mut closest: Option<(&Site, Distance)> = None;
        for site in &self.sites {
            let distance = site.coordinate.haversine_distance(point);
            if distance >= max_radius {
                continue;
            }
            match closest {
                Some((_, best)) if distance >= best => {}
                _ => closest = Some((site, distance)),
            }
        }
        closest.map(|(site, _)| site)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn office() -> Site {
        Site {
            name: "Head office".to_string(),
            kind: SiteKind::Office,
            coordinate: Coordinate::from((7.70496, 100.00464)),
        }
    }

    fn farm() -> Site {
        Site {
            name: "Laong farm".to_string(),
            kind: SiteKind::Delivery,
            coordinate: Coordinate::from((7.729165, 99.956551)),
        }
    }

    #[test]
    fn nearest_within_radius_test() {
        let index = SiteIndex::from_sites(vec![office(), farm()]);
        // 50m north of the office
        let point = Coordinate::from((7.70541, 100.00464));
        let hit = index.nearest(&point, Distance::from_meters(200.0)).unwrap();
        assert_eq!(hit.name, "Head office");
    }

    #[test]
    fn nearest_outside_radius_test() {
        let index = SiteIndex::from_sites(vec![office(), farm()]);
        let point = Coordinate::from((8.5, 101.0));
        assert!(index.nearest(&point, Distance::from_meters(200.0)).is_none());
    }

    #[test]
    fn nearest_empty_index_test() {
        let index = SiteIndex::new();
        let point = Coordinate::from((7.70496, 100.00464));
        assert!(index.nearest(&point, Distance::from_meters(200.0)).is_none());
    }

    #[test]
    fn nearest_tie_break_test() {
        let twin = Site {
            name: "Twin".to_string(),
            ..office()
        };
        let index = SiteIndex::from_sites(vec![office(), twin]);
        let hit = index
            .nearest(&office().coordinate, Distance::from_meters(100.0))
            .unwrap();
        assert_eq!(hit.name, "Head office");
    }

    #[test]
    fn from_csv_test() {
        let data = "name,kind,latitude,longitude\n\
                    Head office,office,7.70496,100.00464\n\
                    Thip rice mill,pickup,7.830301,100.305199\n";
        let index = SiteIndex::from_csv_reader(data.as_bytes()).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.sites()[1].kind, SiteKind::Pickup);
    }

    #[test]
    fn from_csv_unknown_kind_test() {
        let data = "name,kind,latitude,longitude\nSomewhere,warehouse,1.0,2.0\n";
        let result = SiteIndex::from_csv_reader(data.as_bytes());
        assert!(matches!(result, Err(Error::UnknownKind(_))));
    }
}
