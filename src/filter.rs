//! Region and name filters applied to the input layers before an impact run.
//!
//! Department, province and district restrict both layers. Mine ids restrict
//! mines only, locality names restrict localities only. An empty list means
//! no restriction on that field.

use serde::Deserialize;

use crate::types::{Layer, Locality, Mine, Region};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RegionFilter {
    pub departments: Vec<String>,
    pub provinces: Vec<String>,
    pub districts: Vec<String>,
    pub mines: Vec<String>,
    pub localities: Vec<String>,
}

fn allows(allowed: &[String], value: Option<&str>) -> bool {
    if allowed.is_empty() {
        return true;
    }
    match value {
        Some(v) => allowed.iter().any(|a| a.eq_ignore_ascii_case(v)),
        None => false,
    }
}

impl RegionFilter {
    pub fn is_empty(&self) -> bool {
        self.departments.is_empty()
            && self.provinces.is_empty()
            && self.districts.is_empty()
            && self.mines.is_empty()
            && self.localities.is_empty()
    }

    fn allows_region(&self, region: &Region) -> bool {
        allows(&self.departments, region.department.as_deref())
            && allows(&self.provinces, region.province.as_deref())
            && allows(&self.districts, region.district.as_deref())
    }

    pub fn allows_mine(&self, mine: &Mine) -> bool {
        self.allows_region(&mine.region) && allows(&self.mines, Some(mine.id.as_str()))
    }

    pub fn allows_locality(&self, locality: &Locality) -> bool {
        self.allows_region(&locality.region) && allows(&self.localities, locality.name.as_deref())
    }

    /// Filtered copies of both layers. CRS is preserved, inputs are untouched.
    pub fn apply(
        &self,
        mines: &Layer<Mine>,
        localities: &Layer<Locality>,
    ) -> (Layer<Mine>, Layer<Locality>) {
        let mines_out = mines.iter().filter(|m| self.allows_mine(m)).cloned().collect();
        let localities_out = localities
            .iter()
            .filter(|l| self.allows_locality(l))
            .cloned()
            .collect();

        (
            Layer::new(mines.crs(), mines_out),
            Layer::new(localities.crs(), localities_out),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(dep: &str, prov: &str, dist: &str) -> Region {
        Region {
            department: Some(dep.to_string()),
            province: Some(prov.to_string()),
            district: Some(dist.to_string()),
        }
    }

    fn sample() -> (Layer<Mine>, Layer<Locality>) {
        let mines = Layer::geographic(vec![
            Mine::new("ANTAMINA", -77.05, -9.54).with_region(region("ANCASH", "HUARI", "SAN MARCOS")),
            Mine::new("LAS BAMBAS", -72.32, -14.07)
                .with_region(region("APURIMAC", "COTABAMBAS", "CHALLHUAHUACHO")),
        ]);
        let localities = Layer::geographic(vec![
            Locality::new("HUARIPAMPA", 120, -77.0, -9.5)
                .with_region(region("ANCASH", "HUARI", "SAN MARCOS")),
            Locality::new("FUERABAMBA", 450, -72.3, -14.0)
                .with_region(region("APURIMAC", "COTABAMBAS", "CHALLHUAHUACHO")),
            Locality {
                name: None,
                population: 30,
                location: geo::Point::new(-72.4, -14.1),
                region: Region::default(),
            },
        ]);
        (mines, localities)
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let (mines, localities) = sample();
        let filter = RegionFilter::default();
        assert!(filter.is_empty());

        let (m, l) = filter.apply(&mines, &localities);
        assert_eq!(m, mines);
        assert_eq!(l, localities);
    }

    #[test]
    fn department_restricts_both_layers() {
        let (mines, localities) = sample();
        let filter = RegionFilter {
            departments: vec!["apurimac".to_string()],
            ..RegionFilter::default()
        };

        let (m, l) = filter.apply(&mines, &localities);
        assert_eq!(m.len(), 1);
        assert_eq!(m.features()[0].id, "LAS BAMBAS");
        // Localities without a department are dropped once a department is set.
        assert_eq!(l.len(), 1);
        assert_eq!(l.features()[0].name.as_deref(), Some("FUERABAMBA"));
    }

    #[test]
    fn mine_filter_leaves_localities_alone() {
        let (mines, localities) = sample();
        let filter = RegionFilter {
            mines: vec!["ANTAMINA".to_string()],
            ..RegionFilter::default()
        };

        let (m, l) = filter.apply(&mines, &localities);
        assert_eq!(m.len(), 1);
        assert_eq!(l.len(), 3);
    }

    #[test]
    fn locality_filter_leaves_mines_alone() {
        let (mines, localities) = sample();
        let filter = RegionFilter {
            localities: vec!["HUARIPAMPA".to_string()],
            ..RegionFilter::default()
        };

        let (m, l) = filter.apply(&mines, &localities);
        assert_eq!(m.len(), 2);
        assert_eq!(l.len(), 1);
        assert_eq!(l.crs(), localities.crs());
    }
}
