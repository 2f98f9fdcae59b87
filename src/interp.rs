//! Reconstruction of per-sample coordinates from swath anchor points.
//!
//! Each swath records latitude and longitude only at a small number of anchor points,
//! each associated with a scan mirror nadir angle. The mirror is assumed to rotate at
//! a constant rate, so samples are evenly spaced in nadir angle between the smallest
//! and largest anchor angle. Coordinates for each sample are computed with a Lagrange
//! polynomial through the anchors nearest to it.
//!
//! Coordinates are in the tape convention, i.e., colatitude in `[0, 180]` and west
//! longitude in `[0, 360]`.
use crate::config::DecodeConfig;

/// Lagrange polynomial interpolation of per-sample coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoInterpolator {
    points: usize,
    longitude_tolerance: f64,
}

impl Default for GeoInterpolator {
    fn default() -> Self {
        GeoInterpolator::new(5, 15.0)
    }
}

impl GeoInterpolator {
    /// Create an interpolator using windows of `points` anchors. Interpolated
    /// longitudes up to `longitude_tolerance` degrees outside `[0, 360]` are folded
    /// back into range.
    #[must_use]
    pub fn new(points: usize, longitude_tolerance: f64) -> Self {
        GeoInterpolator {
            points,
            longitude_tolerance,
        }
    }

    #[must_use]
    pub fn with_config(config: &DecodeConfig) -> Self {
        GeoInterpolator::new(config.interpolation_points, config.longitude_tolerance)
    }

    /// Compute `population` latitude and longitude values from anchor `nadir_angles`,
    /// `lats` and `lons`, which are all expected to be the same length.
    ///
    /// A sample is `None` if any anchor in its window is missing, or if its result is
    /// out of range.
    #[must_use]
    pub fn interpolate(
        &self,
        nadir_angles: &[Option<f64>],
        lats: &[Option<f64>],
        lons: &[Option<f64>],
        population: usize,
    ) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
        let anchors = nadir_angles.len().min(lats.len()).min(lons.len());
        let valid: Vec<f64> = nadir_angles[..anchors].iter().flatten().copied().collect();
        let (Some(min), Some(max)) = (
            valid.iter().copied().reduce(f64::min),
            valid.iter().copied().reduce(f64::max),
        ) else {
            return (vec![None; population], vec![None; population]);
        };

        let mut out_lats = Vec::with_capacity(population);
        let mut out_lons = Vec::with_capacity(population);
        for nadir in linspace(min, max, population) {
            let (lat, lon) = self.point(&nadir_angles[..anchors], lats, lons, nadir);
            out_lats.push(lat.filter(|v| (0.0..=180.0).contains(v)));
            out_lons.push(lon.and_then(|v| self.fold_longitude(v)));
        }
        (out_lats, out_lons)
    }

    fn point(
        &self,
        nadir_angles: &[Option<f64>],
        lats: &[Option<f64>],
        lons: &[Option<f64>],
        nadir: f64,
    ) -> (Option<f64>, Option<f64>) {
        let Some(nearest) = nearest_index(nadir_angles, nadir) else {
            return (None, None);
        };
        let window = self.window(nearest, nadir_angles.len());

        let collect = |values: &[Option<f64>]| -> Option<Vec<f64>> {
            values[window.clone()].iter().copied().collect()
        };
        let (Some(xs), Some(ys_lat), Some(mut ys_lon)) =
            (collect(nadir_angles), collect(lats), collect(lons))
        else {
            return (None, None);
        };

        if let (Some(first), Some(last)) = (ys_lon.first(), ys_lon.last()) {
            if (first - last).abs() > 180.0 {
                // window crosses the dateline
                for lon in ys_lon.iter_mut().filter(|lon| **lon < 180.0) {
                    *lon += 360.0;
                }
            }
        }

        (
            Some(lagrange(&xs, &ys_lat, nadir)),
            Some(lagrange(&xs, &ys_lon, nadir)),
        )
    }

    /// Indices of the window of anchors centred on `center`, shifted to stay within
    /// `[0, anchors)`.
    fn window(&self, center: usize, anchors: usize) -> std::ops::Range<usize> {
        let width = (2 * (self.points / 2) + 1).min(anchors);
        let start = center
            .saturating_sub(self.points / 2)
            .min(anchors - width);
        start..start + width
    }

    fn fold_longitude(&self, lon: f64) -> Option<f64> {
        let tol = self.longitude_tolerance;
        if lon > 360.0 + tol || lon < -tol {
            None
        } else if lon > 360.0 && lon < 360.0 + tol {
            Some(lon - 360.0)
        } else if lon < 0.0 && lon > -tol {
            Some(lon + 360.0)
        } else {
            Some(lon)
        }
    }
}

/// Index of the valid value closest to `target`, the first if there are several.
#[must_use]
pub fn nearest_index(values: &[Option<f64>], target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, value) in values.iter().enumerate() {
        let Some(value) = value else { continue };
        let dist = (value - target).abs();
        if best.map_or(true, |(_, d)| dist < d) {
            best = Some((idx, dist));
        }
    }
    best.map(|(idx, _)| idx)
}

/// `num` evenly spaced values from `start` to `end` inclusive.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn linspace(start: f64, end: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (num - 1) as f64;
            (0..num)
                .map(|i| if i == num - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Evaluate at `x` the Lagrange polynomial through the points `(xs[i], ys[i])`.
///
/// Basis terms for abscissae equal to `xs[i]` are skipped, so duplicate abscissae do
/// not divide by zero.
#[must_use]
pub fn lagrange(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    xs.iter()
        .zip(ys)
        .map(|(xi, yi)| {
            let basis: f64 = xs
                .iter()
                .filter(|xm| *xm != xi)
                .map(|xm| (x - xm) / (xi - xm))
                .product();
            yi * basis
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchors(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn lagrange_reproduces_polynomials() {
        let xs = [-2.0, -1.0, 0.5, 1.0, 3.0];
        let poly = |x: f64| 2.0 * x.powi(4) - x.powi(3) + 0.5 * x - 7.0;
        let ys: Vec<f64> = xs.iter().map(|x| poly(*x)).collect();

        for x in [-1.5, 0.0, 0.75, 2.2] {
            let zult = lagrange(&xs, &ys, x);
            assert!((zult - poly(x)).abs() < 1e-9, "x={x} got {zult}");
        }
    }

    #[test]
    fn lagrange_duplicate_abscissae() {
        let zult = lagrange(&[1.0, 1.0, 2.0], &[3.0, 3.0, 5.0], 1.5);
        assert!(zult.is_finite());
    }

    #[test]
    fn linspace_endpoints() {
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(3.0, 9.0, 1), vec![3.0]);
        assert!(linspace(3.0, 9.0, 0).is_empty());
        assert_eq!(linspace(2.0, -2.0, 3), vec![2.0, 0.0, -2.0]);
    }

    #[test]
    fn nearest_is_first_minimum() {
        let values = [Some(0.0), None, Some(2.0), Some(2.0)];
        assert_eq!(nearest_index(&values, 1.0), Some(0));
        assert_eq!(nearest_index(&values, 1.9), Some(2));
        assert_eq!(nearest_index(&values, -5.0), Some(0));
        assert_eq!(nearest_index(&[None, None], 1.0), None);
    }

    #[test]
    fn window_is_clamped() {
        let interp = GeoInterpolator::default();
        assert_eq!(interp.window(0, 31), 0..5);
        assert_eq!(interp.window(1, 31), 0..5);
        assert_eq!(interp.window(15, 31), 13..18);
        assert_eq!(interp.window(30, 31), 26..31);
        assert_eq!(interp.window(2, 3), 0..3);
    }

    #[test]
    fn linear_anchors_interpolate_exactly() {
        let nadirs = anchors(&[-50.0, -25.0, 0.0, 25.0, 50.0, 75.0]);
        let lats = anchors(&[100.0, 101.0, 102.0, 103.0, 104.0, 105.0]);
        let lons = anchors(&[200.0, 202.0, 204.0, 206.0, 208.0, 210.0]);

        let (out_lats, out_lons) =
            GeoInterpolator::default().interpolate(&nadirs, &lats, &lons, 11);
        assert_eq!(out_lats.len(), 11);
        for (i, (lat, lon)) in out_lats.iter().zip(&out_lons).enumerate() {
            let frac = i as f64 / 10.0;
            assert!((lat.unwrap() - (100.0 + 5.0 * frac)).abs() < 1e-9, "lat {i}");
            assert!((lon.unwrap() - (200.0 + 10.0 * frac)).abs() < 1e-9, "lon {i}");
        }
    }

    #[test]
    fn dateline_crossing_is_continuous() {
        let nadirs = anchors(&[-2.0, -1.0, 0.0, 1.0, 2.0]);
        let lats = anchors(&[90.0; 5]);
        let lons = anchors(&[357.0, 359.0, 1.0, 3.0, 5.0]);

        let (_, out_lons) = GeoInterpolator::default().interpolate(&nadirs, &lats, &lons, 5);
        let expected = [357.0, 359.0, 1.0, 3.0, 5.0];
        for (zult, want) in out_lons.iter().zip(expected) {
            let zult = zult.unwrap();
            assert!((zult - want).abs() < 1e-9, "expected {want} got {zult}");
        }
    }

    #[test]
    fn missing_anchor_in_window() {
        let nadirs = anchors(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let mut lats = anchors(&[90.0; 9]);
        lats[0] = None;
        let lons = anchors(&[10.0; 9]);

        let (out_lats, out_lons) = GeoInterpolator::default().interpolate(&nadirs, &lats, &lons, 9);
        // samples near the start use the window containing the missing anchor
        assert_eq!(out_lats[0], None);
        assert_eq!(out_lons[0], None);
        assert!((out_lats[8].unwrap() - 90.0).abs() < 1e-9);
        assert!((out_lons[8].unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_results() {
        let interp = GeoInterpolator::default();
        assert_eq!(interp.fold_longitude(365.0), Some(5.0));
        assert_eq!(interp.fold_longitude(376.0), None);
        assert_eq!(interp.fold_longitude(-5.0), Some(355.0));
        assert_eq!(interp.fold_longitude(-16.0), None);
        assert_eq!(interp.fold_longitude(360.0), Some(360.0));

        let nadirs = anchors(&[0.0, 1.0, 2.0]);
        let lats = anchors(&[181.0, 181.0, 181.0]);
        let lons = anchors(&[10.0, 10.0, 10.0]);
        let (out_lats, _) = interp.interpolate(&nadirs, &lats, &lons, 3);
        assert_eq!(out_lats, vec![None, None, None]);
    }

    #[test]
    fn no_valid_anchors() {
        let (lats, lons) = GeoInterpolator::default().interpolate(
            &[None, None],
            &[Some(1.0), Some(1.0)],
            &[Some(1.0), Some(1.0)],
            4,
        );
        assert_eq!(lats, vec![None; 4]);
        assert_eq!(lons, vec![None; 4]);
    }
}
