use crate::buffer::{self, DEFAULT_SEGMENTS};
use crate::error::{ImpactError, Result};
use crate::projection::{Crs, Transform, UTM_18S};
use crate::types::{
    AffectedLocality, GlobalStat, Layer, Locality, MatchRecord, Mine, MineBuffer, PerMineStat,
};
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::{Geometry, MapCoords, Polygon};
use rstar::{RTree, RTreeObject, AABB};
use std::collections::HashSet;
use tracing::debug;

/// Knobs for the working projection and buffer shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactOptions {
    /// Metric CRS used for buffering and containment.
    pub projected: Crs,
    pub buffer_segments: usize,
}

impl Default for ImpactOptions {
    fn default() -> Self {
        Self {
            projected: UTM_18S,
            buffer_segments: DEFAULT_SEGMENTS,
        }
    }
}

/// Everything one impact computation produces. All layers are EPSG:4326.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactResult {
    pub buffers: Layer<MineBuffer>,
    /// Sorted by affected population, descending.
    pub per_mine_stats: Vec<PerMineStat>,
    pub global_stats: GlobalStat,
    pub affected_localities: Layer<AffectedLocality>,
    pub detailed_match: Layer<MatchRecord>,
}

impl ImpactResult {
    /// Result for "no data for the current filters": unbuffered mine points
    /// and zeroed statistics. `mines` must already be known to be geographic.
    pub fn empty(mines: &Layer<Mine>) -> Self {
        let buffers = mines
            .iter()
            .map(|mine| MineBuffer {
                mine: mine.clone(),
                geometry: Geometry::Point(mine.location),
            })
            .collect();

        Self {
            buffers: Layer::geographic(buffers),
            per_mine_stats: Vec::new(),
            global_stats: GlobalStat::default(),
            affected_localities: Layer::empty(Crs::Geographic),
            detailed_match: Layer::empty(Crs::Geographic),
        }
    }

    pub fn has_impact(&self) -> bool {
        self.global_stats.total_affected_localities > 0
    }
}

// R-tree entry pointing back at a buffer by position.
struct BufferIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for BufferIndex {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Impact of `mines` on `localities` within `radius_km`, using the default
/// UTM 18S working projection.
pub fn calculate_impact(
    mines: &Layer<Mine>,
    localities: &Layer<Locality>,
    radius_km: f64,
) -> Result<ImpactResult> {
    calculate_impact_with(&ImpactOptions::default(), mines, localities, radius_km)
}

pub fn calculate_impact_with(
    options: &ImpactOptions,
    mines: &Layer<Mine>,
    localities: &Layer<Locality>,
    radius_km: f64,
) -> Result<ImpactResult> {
    options.projected.validate()?;
    if !options.projected.is_metric() {
        return Err(ImpactError::NonMetricProjection(options.projected.epsg()));
    }
    // Declarations are checked before the degenerate shortcut so that even
    // an empty result never echoes a projected layer back.
    if !mines.is_empty() {
        mines.require_crs("mines", Crs::Geographic)?;
    }
    if !localities.is_empty() {
        localities.require_crs("localities", Crs::Geographic)?;
    }

    if mines.is_empty() || localities.is_empty() || !radius_km.is_finite() || radius_km <= 0.0 {
        return Ok(ImpactResult::empty(mines));
    }

    // 1. Project to metres
    let mines_proj = mines.to_crs(options.projected);
    let localities_proj = localities.to_crs(options.projected);

    // 2. Buffer
    let radius_m = radius_km * 1000.0;
    let polygons: Vec<Polygon<f64>> = mines_proj
        .iter()
        .map(|mine| buffer::disk(mine.location, radius_m, options.buffer_segments))
        .collect();

    // 3. Spatial join
    let matches = spatial_join(&polygons, mines, localities, &localities_proj);
    debug!(
        "{} mine-locality matches at {} km",
        matches.len(),
        radius_km
    );

    // 4. Per mine
    let per_mine_stats = aggregate_per_mine(&matches);

    // 5. Global, deduplicated
    let affected: Vec<AffectedLocality> = dedup_localities(&matches)
        .into_iter()
        .map(|m| AffectedLocality {
            locality_index: m.locality_index,
            name: m.locality.name.clone(),
            population: m.locality.population,
            location: m.locality.location,
        })
        .collect();

    let global_stats = GlobalStat {
        total_affected_localities: affected.len(),
        total_affected_population: affected.iter().map(|a| a.population).sum(),
    };

    // 6. Back to geographic. Only the polygons move, the mines and match
    // records keep the caller's exact coordinates.
    let back = Transform::new(options.projected, Crs::Geographic);
    let buffers = mines
        .iter()
        .zip(polygons)
        .map(|(mine, polygon)| MineBuffer {
            mine: mine.clone(),
            geometry: Geometry::Polygon(polygon.map_coords(|c| back.apply(c))),
        })
        .collect();

    Ok(ImpactResult {
        buffers: Layer::geographic(buffers),
        per_mine_stats,
        global_stats,
        affected_localities: Layer::geographic(affected),
        detailed_match: Layer::geographic(matches),
    })
}

/// Every (mine, locality) pair whose planar locality point lies inside the
/// mine's buffer. Boundary points do not count.
///
/// Output is in canonical order: mine id, then mine position, then locality
/// position. The R-tree's iteration order never leaks out.
fn spatial_join(
    polygons: &[Polygon<f64>],
    mines: &Layer<Mine>,
    localities: &Layer<Locality>,
    localities_proj: &Layer<Locality>,
) -> Vec<MatchRecord> {
    let tree_items: Vec<BufferIndex> = polygons
        .iter()
        .enumerate()
        .filter_map(|(index, polygon)| {
            polygon.bounding_rect().map(|rect| BufferIndex {
                index,
                aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
            })
        })
        .collect();
    let tree = RTree::bulk_load(tree_items);

    let mine_features = mines.features();
    let locality_features = localities.features();

    let mut pairs: Vec<(usize, usize)> = Vec::new();
    for (locality_index, locality) in localities_proj.iter().enumerate() {
        let envelope = AABB::from_point([locality.location.x(), locality.location.y()]);
        for candidate in tree.locate_in_envelope_intersecting(&envelope) {
            if polygons[candidate.index].contains(&locality.location) {
                pairs.push((candidate.index, locality_index));
            }
        }
    }

    pairs.sort_by(|a, b| {
        mine_features[a.0]
            .id
            .cmp(&mine_features[b.0].id)
            .then(a.0.cmp(&b.0))
            .then(a.1.cmp(&b.1))
    });
    pairs.dedup();

    pairs
        .into_iter()
        .map(|(mine_index, locality_index)| MatchRecord {
            mine_index,
            locality_index,
            mine: mine_features[mine_index].clone(),
            locality: locality_features[locality_index].clone(),
        })
        .collect()
}

/// Groups matches by mine id. Expects canonically ordered matches, so groups
/// are contiguous and come out in ascending id order before the stable sort.
fn aggregate_per_mine(matches: &[MatchRecord]) -> Vec<PerMineStat> {
    let mut stats: Vec<PerMineStat> = Vec::new();
    let mut seen: HashSet<usize> = HashSet::new();

    for record in matches {
        let same_group = stats
            .last()
            .map(|s| s.mine_id == record.mine.id)
            .unwrap_or(false);
        if !same_group {
            seen.clear();
            stats.push(PerMineStat {
                mine_id: record.mine.id.clone(),
                locality_count: 0,
                affected_population: 0,
            });
        }

        if seen.insert(record.locality_index) {
            if let Some(stat) = stats.last_mut() {
                stat.locality_count += 1;
                stat.affected_population += record.locality.population;
            }
        }
    }

    // Stable: ties keep ascending mine id.
    stats.sort_by(|a, b| b.affected_population.cmp(&a.affected_population));
    stats
}

/// First match per locality, in canonical order.
fn dedup_localities(matches: &[MatchRecord]) -> Vec<&MatchRecord> {
    let mut seen = HashSet::new();
    matches
        .iter()
        .filter(|m| seen.insert(m.locality_index))
        .collect()
}
