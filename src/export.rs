//! GeoJSON views of impact results for map layers and tabular display.
//!
//! Property names are bound to by the presentation layer and must stay
//! stable.

use crate::processing::ImpactResult;
use crate::types::{
    AffectedLocality, GlobalStat, Layer, Locality, MatchRecord, Mine, MineBuffer, PerMineStat,
};
use anyhow::{Context, Result};
use geo::Geometry;
use geojson::{Feature, FeatureCollection, JsonObject, Value};
use serde::Serialize;
use serde_json::json;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

pub trait ToFeature {
    fn geometry(&self) -> Geometry<f64>;
    fn properties(&self) -> JsonObject;

    fn to_feature(&self) -> Feature {
        Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(Value::from(&self.geometry()))),
            id: None,
            properties: Some(self.properties()),
            foreign_members: None,
        }
    }
}

/// Mine marker, drawn whether or not its buffer reaches anyone.
impl ToFeature for Mine {
    fn geometry(&self) -> Geometry<f64> {
        Geometry::Point(self.location)
    }

    fn properties(&self) -> JsonObject {
        let mut props = JsonObject::new();
        props.insert("mine_id".to_string(), json!(self.id));
        props.insert("department".to_string(), json!(self.region.department));
        props.insert("province".to_string(), json!(self.region.province));
        props.insert("district".to_string(), json!(self.region.district));
        props
    }
}

impl ToFeature for Locality {
    fn geometry(&self) -> Geometry<f64> {
        Geometry::Point(self.location)
    }

    fn properties(&self) -> JsonObject {
        let mut props = JsonObject::new();
        props.insert("name".to_string(), json!(self.name));
        props.insert("population".to_string(), json!(self.population));
        props.insert("department".to_string(), json!(self.region.department));
        props.insert("province".to_string(), json!(self.region.province));
        props.insert("district".to_string(), json!(self.region.district));
        props
    }
}

impl ToFeature for MineBuffer {
    fn geometry(&self) -> Geometry<f64> {
        self.geometry.clone()
    }

    fn properties(&self) -> JsonObject {
        let mut props = JsonObject::new();
        props.insert("mine_id".to_string(), json!(self.mine.id));
        props.insert("department".to_string(), json!(self.mine.region.department));
        props.insert("province".to_string(), json!(self.mine.region.province));
        props.insert("district".to_string(), json!(self.mine.region.district));
        props
    }
}

impl ToFeature for AffectedLocality {
    fn geometry(&self) -> Geometry<f64> {
        Geometry::Point(self.location)
    }

    fn properties(&self) -> JsonObject {
        let mut props = JsonObject::new();
        props.insert("locality_index".to_string(), json!(self.locality_index));
        props.insert("name".to_string(), json!(self.name));
        props.insert("population".to_string(), json!(self.population));
        props
    }
}

/// One row per (mine, locality) pair, located at the locality. Locality
/// region fields are unprefixed, the mine's carry a `mine_` prefix.
impl ToFeature for MatchRecord {
    fn geometry(&self) -> Geometry<f64> {
        Geometry::Point(self.locality.location)
    }

    fn properties(&self) -> JsonObject {
        let mut props = JsonObject::new();
        props.insert("mine_id".to_string(), json!(self.mine.id));
        props.insert("locality_index".to_string(), json!(self.locality_index));
        props.insert("name".to_string(), json!(self.locality.name));
        props.insert("population".to_string(), json!(self.locality.population));
        props.insert("department".to_string(), json!(self.locality.region.department));
        props.insert("province".to_string(), json!(self.locality.region.province));
        props.insert("district".to_string(), json!(self.locality.region.district));
        props.insert("mine_department".to_string(), json!(self.mine.region.department));
        props.insert("mine_province".to_string(), json!(self.mine.region.province));
        props.insert("mine_district".to_string(), json!(self.mine.region.district));
        props
    }
}

pub fn to_feature_collection<T: ToFeature>(layer: &Layer<T>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: layer.iter().map(ToFeature::to_feature).collect(),
        foreign_members: None,
    }
}

#[derive(Debug, Serialize)]
pub struct ImpactSummary<'a> {
    pub global_stats: &'a GlobalStat,
    pub per_mine_stats: &'a [PerMineStat],
}

impl<'a> From<&'a ImpactResult> for ImpactSummary<'a> {
    fn from(result: &'a ImpactResult) -> Self {
        Self {
            global_stats: &result.global_stats,
            per_mine_stats: &result.per_mine_stats,
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

/// Writes the three map layers and the statistics summary into `dir`.
pub fn write_outputs(dir: &Path, result: &ImpactResult) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create output dir {:?}", dir))?;

    write_json(&dir.join("buffers.geojson"), &to_feature_collection(&result.buffers))?;
    write_json(
        &dir.join("affected_localities.geojson"),
        &to_feature_collection(&result.affected_localities),
    )?;
    write_json(
        &dir.join("detailed_match.geojson"),
        &to_feature_collection(&result.detailed_match),
    )?;
    write_json(&dir.join("impact_summary.json"), &ImpactSummary::from(result))?;

    info!("Wrote impact outputs to {:?}", dir);
    Ok(())
}
