//! Segmentation properties checked on seeded random and synthetic star frames

use std::collections::HashSet;

use approx::assert_relative_eq;
use clusterscan::image_proc::detection::SegmentationScan;
use clusterscan::{fit_background, ClusterDetector, PixelGrid};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Uniform random grid; roughly `fill` of the pixels land above 0.5.
fn random_grid(rows: usize, cols: usize, fill: f64, seed: u64) -> PixelGrid {
    let mut rng = StdRng::seed_from_u64(seed);
    let values = Array2::from_shape_fn((rows, cols), |_| {
        if rng.random::<f64>() < fill {
            1.0 + rng.random::<f64>()
        } else {
            rng.random::<f64>() * 0.5
        }
    });
    PixelGrid::new(values).unwrap()
}

/// Background plus Gaussian noise plus Gaussian PSFs at `(x, y, amplitude)`.
fn star_frame(size: usize, stars: &[(f64, f64, f64)], seed: u64) -> PixelGrid {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(100.0, 5.0).unwrap();
    let sigma: f64 = 1.3;

    let values = Array2::from_shape_fn((size, size), |(row, col)| {
        let mut value = noise.sample(&mut rng);
        for &(x, y, amplitude) in stars {
            let dx = col as f64 - x;
            let dy = row as f64 - y;
            value += amplitude * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp();
        }
        value
    });
    PixelGrid::new(values).unwrap()
}

fn scan(grid: &PixelGrid, threshold: f64) -> SegmentationScan {
    ClusterDetector::default().scan(grid, threshold).unwrap()
}

#[test]
fn test_every_pixel_accounted_once() {
    for seed in 0..5 {
        let grid = random_grid(40, 60, 0.45, seed);
        let result = scan(&grid, 0.5);

        assert!(result.mask.is_complete());
        assert_eq!(
            result.catalog.member_pixel_count() + result.below_threshold,
            grid.pixel_count()
        );
    }
}

#[test]
fn test_clusters_are_disjoint_and_complete() {
    let grid = random_grid(50, 50, 0.5, 11);
    let threshold = 0.5;
    let result = scan(&grid, threshold);

    let mut claimed = HashSet::new();
    for cluster in &result.catalog {
        for &pixel in cluster.pixels() {
            assert!(claimed.insert(pixel), "pixel {pixel:?} in two clusters");
            assert!(grid.value(pixel.0, pixel.1) >= threshold);
        }
    }

    for ((row, col), &value) in grid.view().indexed_iter() {
        assert_eq!(value >= threshold, claimed.contains(&(row, col)));
    }
}

#[test]
fn test_clusters_are_maximal_connected_components() {
    let grid = random_grid(30, 30, 0.55, 23);
    let threshold = 0.5;
    let result = scan(&grid, threshold);
    let (n_rows, n_cols) = grid.dim();

    for cluster in &result.catalog {
        let members: HashSet<_> = cluster.pixels().iter().copied().collect();

        // No above-threshold 4-neighbor is left outside the cluster
        for &(row, col) in cluster.pixels() {
            let neighbors = [
                (row.wrapping_sub(1), col),
                (row + 1, col),
                (row, col.wrapping_sub(1)),
                (row, col + 1),
            ];
            for (r, c) in neighbors {
                if r < n_rows && c < n_cols && grid.value(r, c) >= threshold {
                    assert!(members.contains(&(r, c)));
                }
            }
        }

        // Every member after the seed touches an earlier member
        for (i, &(row, col)) in cluster.pixels().iter().enumerate().skip(1) {
            let touches = cluster.pixels()[..i]
                .iter()
                .any(|&(r, c)| r.abs_diff(row) + c.abs_diff(col) == 1);
            assert!(touches);
        }
    }
}

#[test]
fn test_geometry_encloses_members() {
    let grid = random_grid(40, 40, 0.4, 5);
    let result = scan(&grid, 0.5);

    for cluster in &result.catalog {
        let bbox = cluster.bounding_box();
        let bounds = cluster.bounds();
        for &(row, col) in cluster.pixels() {
            assert!(bounds.contains_pixel(row, col));
            assert!(bbox.contains(col as f64, row as f64));
        }
        assert_eq!(bbox.x, bounds.min_col as f64 - 0.5);
        assert_eq!(bbox.y, bounds.min_row as f64 - 0.5);
        assert_relative_eq!(
            cluster.centroid().x,
            (bounds.min_col + bounds.max_col) as f64 / 2.0
        );
        assert_relative_eq!(
            cluster.centroid().y,
            (bounds.min_row + bounds.max_row) as f64 / 2.0
        );
    }
}

#[test]
fn test_integrated_luminosity_sums_members() {
    let grid = random_grid(25, 25, 0.5, 99);
    let result = scan(&grid, 0.5);

    for cluster in &result.catalog {
        let sum: f64 = cluster
            .pixels()
            .iter()
            .map(|&(row, col)| grid.value(row, col))
            .sum();
        assert_relative_eq!(cluster.integrated_luminosity(), sum, epsilon = 1e-9);
    }
}

#[test]
fn test_detection_is_deterministic() {
    let grid = random_grid(64, 64, 0.5, 7);
    let first = ClusterDetector::default().detect(&grid, 0.5).unwrap();
    let second = ClusterDetector::default().detect(&grid, 0.5).unwrap();
    assert_eq!(first, second);

    // Seeds are strictly increasing in row-major order
    let seeds: Vec<_> = first.iter().map(|c| c.seed()).collect();
    assert!(seeds.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_synthetic_star_field() {
    let stars = [(40.3, 30.7, 200.0), (150.0, 100.2, 300.0), (90.6, 180.4, 150.0)];
    let grid = star_frame(256, &stars, 42);

    let model = fit_background(&grid, 200).unwrap();
    assert_relative_eq!(model.background, 100.0, epsilon = 1.5);
    assert_relative_eq!(model.dispersion, 5.0, epsilon = 1.5);

    let catalog = ClusterDetector::default()
        .detect_with_background(&grid, &model)
        .unwrap();
    assert!(catalog.len() >= stars.len());

    // Each star's peak pixel belongs to a cluster centered near the star
    for &(x, y, _) in &stars {
        let peak = (y.round() as usize, x.round() as usize);
        let cluster = catalog
            .iter()
            .find(|c| c.pixels().contains(&peak))
            .expect("star not detected");
        let weighted = cluster.weighted_centroid(&grid);
        assert!((weighted.x - x).abs() < 0.75);
        assert!((weighted.y - y).abs() < 0.75);
        assert!((cluster.centroid().x - x).abs() < 1.5);
        assert!((cluster.centroid().y - y).abs() < 1.5);
    }

    let (_, brightest) = catalog.brightest().unwrap();
    assert!(brightest.pixels().contains(&(100, 150)));
}
