//! Metric-bounded perturbation
//!
//! Used to plant near neighbors and to derive multiprobe offsets.

use rand::Rng;
use rand_distr::StandardNormal;

use crate::error::Result;
use crate::metric::DistanceMetric;
use crate::vector::Vector;

/// Perturb v by at most max_dist under the given metric.
///
/// Euclidean: an isotropic offset — a standard normal direction scaled to
/// unit length and then by max_dist, so the perturbed point lands on the
/// sphere of radius max_dist around v.
///
/// Hamming: flips floor(max_dist) coordinates chosen uniformly with
/// replacement, so the realized distance can be smaller when a coordinate
/// is picked twice.
pub fn perturb<R: Rng>(
    v: &Vector,
    metric: DistanceMetric,
    max_dist: f64,
    rng: &mut R,
) -> Result<Vector> {
    match metric {
        DistanceMetric::Euclidean => {
            let dim = v.dim();
            let mut direction = Vector::new(dim)?;
            for i in 0..dim {
                let sample: f64 = rng.sample(StandardNormal);
                direction.set_coord(i, sample)?;
            }
            let offset = direction.normalize().scale(max_dist);
            v.add(&offset)
        }
        DistanceMetric::Hamming => {
            let mut out = v.clone();
            for _ in 0..max_dist.floor() as usize {
                let coord = rng.gen_range(0..out.dim());
                let val = out.coord(coord)?;
                out.set_coord(coord, 1.0 - val)?;
            }
            Ok(out)
        }
    }
}
