use crate::config::{AppConfig, ColumnConfig};
use crate::types::{Layer, Locality, Mine, Region};
use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, StringRecord};
use geo::Point;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

pub fn load_data(config: &AppConfig) -> Result<(Layer<Mine>, Layer<Locality>)> {
    let columns = &config.input.columns;
    let mines = load_mines(&config.input.mines_csv, columns)?;
    info!("Loaded {} mines", mines.len());

    let localities = load_localities(&config.input.localities_csv, columns)?;
    info!("Loaded {} localities", localities.len());

    Ok((mines, localities))
}

pub fn load_mines(path: &Path, columns: &ColumnConfig) -> Result<Layer<Mine>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open mines CSV: {:?}", path))?;
    read_mines(file, columns).with_context(|| format!("Failed to load mines from {:?}", path))
}

pub fn load_localities(path: &Path, columns: &ColumnConfig) -> Result<Layer<Locality>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open localities CSV: {:?}", path))?;
    read_localities(file, columns)
        .with_context(|| format!("Failed to load localities from {:?}", path))
}

/// Header positions resolved once per file.
struct Columns {
    lat: usize,
    lon: usize,
    department: Option<usize>,
    province: Option<usize>,
    district: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord, config: &ColumnConfig) -> Result<Self> {
        Ok(Self {
            lat: required(headers, &config.lat)?,
            lon: required(headers, &config.lon)?,
            department: position(headers, &config.department),
            province: position(headers, &config.province),
            district: position(headers, &config.district),
        })
    }

    fn point(&self, record: &StringRecord) -> Option<Point<f64>> {
        let lat = parse_number(record.get(self.lat))?;
        let lon = parse_number(record.get(self.lon))?;
        if lat.abs() > 90.0 || lon.abs() > 180.0 {
            return None;
        }
        Some(Point::new(lon, lat))
    }

    fn region(&self, record: &StringRecord) -> Region {
        Region {
            department: text(record, self.department),
            province: text(record, self.province),
            district: text(record, self.district),
        }
    }
}

fn position(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

fn required(headers: &StringRecord, name: &str) -> Result<usize> {
    position(headers, name).ok_or_else(|| anyhow!("Column '{}' not found in CSV", name))
}

fn parse_number(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn text(record: &StringRecord, idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Missing, unparseable or negative counts become 0. Spreadsheet exports
/// often write counts as `120.0`, so fractions are rounded.
fn parse_population(value: Option<&str>) -> u64 {
    match parse_number(value) {
        Some(v) if v > 0.0 => v.round() as u64,
        _ => 0,
    }
}

pub fn read_mines<R: Read>(reader: R, config: &ColumnConfig) -> Result<Layer<Mine>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let columns = Columns::resolve(&headers, config)?;
    let id_idx = required(&headers, &config.mine_id)?;

    let mut mines = Vec::new();
    let mut dropped = 0usize;

    for result in rdr.records() {
        let record = result?;
        let id = text(&record, Some(id_idx));
        match (id, columns.point(&record)) {
            (Some(id), Some(location)) => mines.push(Mine {
                id,
                location,
                region: columns.region(&record),
            }),
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!("Dropped {} mine rows without id or valid coordinates", dropped);
    }

    Ok(Layer::geographic(mines))
}

pub fn read_localities<R: Read>(reader: R, config: &ColumnConfig) -> Result<Layer<Locality>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let columns = Columns::resolve(&headers, config)?;
    let population_idx = position(&headers, &config.population);
    let name_idx = position(&headers, &config.name);

    let mut localities = Vec::new();
    let mut dropped = 0usize;

    for result in rdr.records() {
        let record = result?;
        let Some(location) = columns.point(&record) else {
            dropped += 1;
            continue;
        };

        localities.push(Locality {
            name: text(&record, name_idx),
            population: parse_population(population_idx.and_then(|i| record.get(i))),
            location,
            region: columns.region(&record),
        });
    }

    if dropped > 0 {
        warn!("Dropped {} locality rows with invalid coordinates", dropped);
    }

    Ok(Layer::geographic(localities))
}
