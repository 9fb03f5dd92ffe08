use geo::{Coord, Geometry, MapCoords, Point};
use serde::{Deserialize, Serialize};

use crate::error::{ImpactError, Result};
use crate::projection::{Crs, Transform};

/// Administrative region attributes shared by mines and localities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub department: Option<String>,
    pub province: Option<String>,
    pub district: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mine {
    pub id: String,
    pub location: Point<f64>,
    pub region: Region,
}

impl Mine {
    pub fn new(id: impl Into<String>, lon: f64, lat: f64) -> Self {
        Self {
            id: id.into(),
            location: Point::new(lon, lat),
            region: Region::default(),
        }
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Locality {
    pub name: Option<String>,
    pub population: u64,
    pub location: Point<f64>,
    pub region: Region,
}

impl Locality {
    pub fn new(name: impl Into<String>, population: u64, lon: f64, lat: f64) -> Self {
        Self {
            name: Some(name.into()),
            population,
            location: Point::new(lon, lat),
            region: Region::default(),
        }
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }
}

/// Influence area of one mine. A polygon once buffered, the bare mine point
/// when no buffering took place.
#[derive(Debug, Clone, PartialEq)]
pub struct MineBuffer {
    pub mine: Mine,
    pub geometry: Geometry<f64>,
}

/// One (mine, locality) pair from the spatial join.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    /// Position of the mine in the input layer.
    pub mine_index: usize,
    /// Position of the locality in the input layer.
    pub locality_index: usize,
    pub mine: Mine,
    pub locality: Locality,
}

/// A distinct affected locality, counted once regardless of how many
/// buffers cover it.
#[derive(Debug, Clone, PartialEq)]
pub struct AffectedLocality {
    pub locality_index: usize,
    pub name: Option<String>,
    pub population: u64,
    pub location: Point<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerMineStat {
    pub mine_id: String,
    pub locality_count: usize,
    pub affected_population: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalStat {
    pub total_affected_localities: usize,
    pub total_affected_population: u64,
}

/// Anything carrying coordinates that must move with its layer's CRS.
pub trait Georeferenced: Sized {
    fn map_coords_with<F>(&self, f: F) -> Self
    where
        F: Fn(Coord<f64>) -> Coord<f64> + Copy;
}

impl Georeferenced for Mine {
    fn map_coords_with<F>(&self, f: F) -> Self
    where
        F: Fn(Coord<f64>) -> Coord<f64> + Copy,
    {
        Self {
            location: self.location.map_coords(f),
            ..self.clone()
        }
    }
}

impl Georeferenced for Locality {
    fn map_coords_with<F>(&self, f: F) -> Self
    where
        F: Fn(Coord<f64>) -> Coord<f64> + Copy,
    {
        Self {
            location: self.location.map_coords(f),
            ..self.clone()
        }
    }
}

impl Georeferenced for MineBuffer {
    fn map_coords_with<F>(&self, f: F) -> Self
    where
        F: Fn(Coord<f64>) -> Coord<f64> + Copy,
    {
        Self {
            mine: self.mine.map_coords_with(f),
            geometry: self.geometry.map_coords(f),
        }
    }
}

/// A feature collection with exactly one declared coordinate reference.
///
/// The CRS only changes through [`Layer::to_crs`], which transforms every
/// coordinate along with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer<T> {
    crs: Crs,
    features: Vec<T>,
}

impl<T> Layer<T> {
    pub fn new(crs: Crs, features: Vec<T>) -> Self {
        Self { crs, features }
    }

    pub fn geographic(features: Vec<T>) -> Self {
        Self::new(Crs::Geographic, features)
    }

    pub fn empty(crs: Crs) -> Self {
        Self::new(crs, Vec::new())
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn features(&self) -> &[T] {
        &self.features
    }

    pub fn into_features(self) -> Vec<T> {
        self.features
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.features.iter()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Fails with `UnexpectedCrs` unless the layer is declared in `expected`.
    pub fn require_crs(&self, layer: &'static str, expected: Crs) -> Result<()> {
        if self.crs != expected {
            return Err(ImpactError::UnexpectedCrs {
                layer,
                expected: expected.epsg(),
                found: self.crs.epsg(),
            });
        }
        Ok(())
    }
}

impl<T: Georeferenced> Layer<T> {
    pub fn to_crs(&self, target: Crs) -> Layer<T> {
        let transform = Transform::new(self.crs, target);
        let features = self
            .features
            .iter()
            .map(|f| f.map_coords_with(|c| transform.apply(c)))
            .collect();
        Layer::new(target, features)
    }
}

impl<'a, T> IntoIterator for &'a Layer<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}
