//! # Path preprocessing
//!
//! Reference paths are received sparse and noisy. Before being used for scoring they go through
//! the reception pipeline in [`prepare`]: uniform resampling, heading and cost annotation, a
//! number of smoothing passes and a final annotation. Each tick a forward window is then cut
//! from every prepared path by [`extract_horizon`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod annotate;
mod horizon;
mod resample;
mod smooth;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use annotate::annotate;
pub use horizon::{extract_horizon, Horizon};
pub use resample::resample;
pub use smooth::{smooth, SMOOTH_MAX_ITERATIONS};

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use crate::{geom::Path, params::PreprocParams};

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Prepare a newly received reference path for scoring.
pub fn prepare(raw: &Path, path_density_m: f64, params: &PreprocParams) -> Path {
    let mut path = annotate(&resample(raw, path_density_m));

    for _ in 0..params.smoothing_passes {
        path = smooth(
            &path,
            params.smoothing_data_weight,
            params.smoothing_smooth_weight,
            params.smoothing_tolerance_m,
        );
    }

    annotate(&path)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_prepare() {
        let raw = Path::from_xy(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        let params = PreprocParams::default();

        let p = prepare(&raw, 0.5, &params);

        // Resampled densely, ends kept in place
        assert!(p.len() >= 39);
        assert_eq!(p.points[0].position2(), raw.points[0].position2());
        assert_eq!(p.points[p.len() - 1].position2(), raw.points[2].position2());

        // Corner rounded and annotated
        let last = &p.points[p.len() - 1];
        assert!((last.heading_rad - std::f64::consts::FRAC_PI_2).abs() < 0.1);
        assert!(last.cost > 1.0);
        for w in p.points.windows(2) {
            assert!(w[1].station_m > w[0].station_m);
        }
    }
}
