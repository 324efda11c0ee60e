use std::fmt;

use serde::{Deserialize, Serialize};

pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;
pub const MIN_LNG: f64 = -180.0;
pub const MAX_LNG: f64 = 180.0;

/// A WGS84 position in degrees. Only constructed through [`Coordinate::new`],
/// so every value in circulation is finite and in range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[f64; 2]", try_from = "[f64; 2]")]
pub struct Coordinate {
    lat: f64,
    lng: f64,
}

impl Coordinate {
    /// Returns `None` for NaN/infinite values or anything outside
    /// latitude [-90, 90] / longitude [-180, 180].
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        if is_valid(lat, lng) {
            Some(Self { lat, lng })
        } else {
            None
        }
    }

    #[must_use]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    #[must_use]
    pub fn lng(&self) -> f64 {
        self.lng
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(c: Coordinate) -> Self {
        [c.lat, c.lng]
    }
}

impl TryFrom<[f64; 2]> for Coordinate {
    type Error = String;

    fn try_from([lat, lng]: [f64; 2]) -> Result<Self, Self::Error> {
        Self::new(lat, lng).ok_or_else(|| format!("coordinate out of range: {lat},{lng}"))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.4}\u{00b0}{}, {:.4}\u{00b0}{}",
            self.lat.abs(),
            if self.lat >= 0.0 { "N" } else { "S" },
            self.lng.abs(),
            if self.lng >= 0.0 { "E" } else { "W" },
        )
    }
}

/// Latitude/longitude bounds check.
#[must_use]
pub fn is_valid(lat: f64, lng: f64) -> bool {
    (MIN_LAT..=MAX_LAT).contains(&lat) && (MIN_LNG..=MAX_LNG).contains(&lng)
}

/// Axis-aligned box around a set of coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Smallest box containing every coordinate, or `None` when empty.
    pub fn from_coordinates<I>(coords: I) -> Option<Self>
    where
        I: IntoIterator<Item = Coordinate>,
    {
        let mut iter = coords.into_iter();
        let first = iter.next()?;
        let mut bounds = Self {
            min_lat: first.lat,
            min_lng: first.lng,
            max_lat: first.lat,
            max_lng: first.lng,
        };
        for c in iter {
            if c.lat < bounds.min_lat {
                bounds.min_lat = c.lat;
            }
            if c.lat > bounds.max_lat {
                bounds.max_lat = c.lat;
            }
            if c.lng < bounds.min_lng {
                bounds.min_lng = c.lng;
            }
            if c.lng > bounds.max_lng {
                bounds.max_lng = c.lng;
            }
        }
        Some(bounds)
    }

    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}
