//! Properties of the impact engine through the public API.

use geo::Geometry;
use mine_impact::projection::UTM_18S;
use mine_impact::{calculate_impact, Crs, GlobalStat, Layer, Locality, Mine};

// ~1 km of latitude in degrees near 9°S
const KM_LAT: f64 = 1.0 / 110.6;

fn assert_close(a: f64, b: f64, tol: f64, msg: &str) {
    let diff = (a - b).abs();
    assert!(
        diff < tol,
        "{msg}: expected {b}, got {a}, diff {diff} exceeds tolerance {tol}"
    );
}

/// Three mines along a parallel, localities scattered between and around
/// them, some covered by two buffers at moderate radii.
fn corridor() -> (Layer<Mine>, Layer<Locality>) {
    let mines = Layer::geographic(vec![
        Mine::new("TOQUEPALA", -75.00, -9.00),
        Mine::new("CUAJONE", -74.85, -9.00),
        Mine::new("ANTAPACCAY", -74.70, -9.05),
    ]);

    let mut localities = Vec::new();
    for i in 0..24 {
        let lon = -75.10 + 0.02 * i as f64;
        let lat = -9.00 + if i % 2 == 0 { 0.03 } else { -0.05 };
        localities.push(Locality::new(format!("CP-{i:02}"), 10 * (i as u64 + 1), lon, lat));
    }
    localities.push(Locality::new("REMOTE", 9_999, -76.5, -11.0));

    (mines, Layer::geographic(localities))
}

#[test]
fn one_mine_near_and_far_localities() {
    let mines = Layer::geographic(vec![Mine::new("MINA", -75.0, -9.0)]);
    let localities = Layer::geographic(vec![
        Locality::new("A 5 KM", 100, -75.0, -9.0 - 5.0 * KM_LAT),
        Locality::new("A 50 KM", 200, -75.0, -9.0 - 50.0 * KM_LAT),
    ]);

    let result = calculate_impact(&mines, &localities, 10.0).unwrap();

    assert_eq!(result.per_mine_stats.len(), 1);
    assert_eq!(result.per_mine_stats[0].locality_count, 1);
    assert_eq!(result.per_mine_stats[0].affected_population, 100);
    assert_eq!(
        result.global_stats,
        GlobalStat {
            total_affected_localities: 1,
            total_affected_population: 100,
        }
    );
}

#[test]
fn degenerate_inputs_yield_zero_stats() {
    let (mines, localities) = corridor();
    let empty_mines: Layer<Mine> = Layer::geographic(vec![]);
    let empty_localities: Layer<Locality> = Layer::geographic(vec![]);

    let cases = [
        calculate_impact(&mines, &localities, 0.0),
        calculate_impact(&mines, &localities, -1.0),
        calculate_impact(&empty_mines, &localities, 10.0),
        calculate_impact(&mines, &empty_localities, 10.0),
    ];

    for result in cases {
        let result = result.unwrap();
        assert_eq!(result.global_stats, GlobalStat::default());
        assert!(result.per_mine_stats.is_empty());
        assert!(result.affected_localities.is_empty());
        assert!(result.detailed_match.is_empty());
    }
}

#[test]
fn per_mine_sum_bounds_global_total() {
    let (mines, localities) = corridor();

    for radius in [2.0, 5.0, 8.0, 12.0, 20.0] {
        let result = calculate_impact(&mines, &localities, radius).unwrap();
        let per_mine_sum: u64 = result
            .per_mine_stats
            .iter()
            .map(|s| s.affected_population)
            .sum();
        assert!(per_mine_sum >= result.global_stats.total_affected_population);

        let mut coverage = std::collections::HashMap::new();
        for m in result.detailed_match.iter() {
            *coverage.entry(m.locality_index).or_insert(0usize) += 1;
        }
        let any_shared = coverage.values().any(|&n| n > 1);
        assert_eq!(
            per_mine_sum == result.global_stats.total_affected_population,
            !any_shared,
            "radius {radius}"
        );
    }
}

#[test]
fn repeated_runs_are_identical() {
    let (mines, localities) = corridor();
    let first = calculate_impact(&mines, &localities, 9.0).unwrap();
    let second = calculate_impact(&mines, &localities, 9.0).unwrap();
    assert_eq!(first, second);
}

#[test]
fn growing_radius_never_shrinks_impact() {
    let (mines, localities) = corridor();
    let mut previous = calculate_impact(&mines, &localities, 0.5).unwrap();

    for step in 1..=30 {
        let radius = 0.5 + step as f64;
        let current = calculate_impact(&mines, &localities, radius).unwrap();

        assert!(
            current.global_stats.total_affected_localities
                >= previous.global_stats.total_affected_localities
        );
        for stat in &previous.per_mine_stats {
            let now = current
                .per_mine_stats
                .iter()
                .find(|s| s.mine_id == stat.mine_id)
                .map(|s| s.affected_population)
                .unwrap_or(0);
            assert!(now >= stat.affected_population, "{} shrank at {radius}", stat.mine_id);
        }
        previous = current;
    }
}

#[test]
fn midpoint_locality_is_deduplicated() {
    let mines = Layer::geographic(vec![
        Mine::new("NORTE", -75.0, -9.0 + 8.0 * KM_LAT),
        Mine::new("SUR", -75.0, -9.0 - 8.0 * KM_LAT),
    ]);
    let localities = Layer::geographic(vec![Locality::new("MEDIO", 250, -75.0, -9.0)]);

    let result = calculate_impact(&mines, &localities, 10.0).unwrap();

    assert_eq!(result.global_stats.total_affected_localities, 1);
    assert_eq!(result.global_stats.total_affected_population, 250);
    assert_eq!(result.affected_localities.len(), 1);
    assert_eq!(result.detailed_match.len(), 2);
    assert_eq!(result.per_mine_stats.len(), 2);
    assert!(result
        .per_mine_stats
        .iter()
        .all(|s| s.locality_count == 1 && s.affected_population == 250));
}

#[test]
fn layer_round_trip_within_a_metre() {
    let (mines, _) = corridor();
    let back = mines.to_crs(UTM_18S).to_crs(Crs::Geographic);

    assert_eq!(back.crs(), Crs::Geographic);
    for (a, b) in mines.iter().zip(back.iter()) {
        assert_eq!(a.id, b.id);
        // 5e-6 degrees is about 0.55 m
        assert_close(b.location.x(), a.location.x(), 5e-6, "lon");
        assert_close(b.location.y(), a.location.y(), 5e-6, "lat");
    }
}

#[test]
fn remote_locality_never_matches() {
    let (mines, localities) = corridor();
    let result = calculate_impact(&mines, &localities, 30.0).unwrap();
    assert!(result
        .detailed_match
        .iter()
        .all(|m| m.locality.name.as_deref() != Some("REMOTE")));
}

#[test]
fn buffers_keep_input_mines_and_radius() {
    let (mines, localities) = corridor();
    let result = calculate_impact(&mines, &localities, 7.0).unwrap();

    for (buffer, mine) in result.buffers.iter().zip(mines.iter()) {
        assert_eq!(&buffer.mine, mine);
    }

    // Back in the working plane every ring vertex sits on the 7 km circle.
    let planar = result.buffers.to_crs(UTM_18S);
    for buffer in planar.iter() {
        let center = buffer.mine.location;
        match &buffer.geometry {
            Geometry::Polygon(p) => {
                for vertex in p.exterior().points() {
                    let d = (vertex.x() - center.x()).hypot(vertex.y() - center.y());
                    assert_close(d, 7_000.0, 1.0, &buffer.mine.id);
                }
            }
            other => panic!("expected polygon, got {other:?}"),
        }
    }
}
