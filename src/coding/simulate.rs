//! Camera noise simulation.

use super::types::FramePattern;
use crate::params::Params;
use ndarray_rand::rand_distr::{Distribution, Normal, Poisson};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Adds shot noise and dark noise of the configured camera to `frames`.
///
/// Shot noise is Poisson distributed around the intensity and scaled by
/// `sqrt(gain)`; the dark signal `y0` and dark noise `gain·dark` are added as
/// a normal distribution. Values are clipped to `[0, Imax]` and converted back
/// to the element type of `frames`. The same seed gives the same result.
pub fn simulate(frames: &FramePattern, p: &Params, seed: u64) -> FramePattern {
    let dtype = frames.dtype();
    let imax = dtype.imax();
    let gain = p.gain();
    let mut data = frames.to_f64();
    let mut rng = StdRng::seed_from_u64(seed);

    if gain > 0.0 {
        let scale = gain.sqrt();
        for v in data.iter_mut() {
            if *v > 0.0 {
                if let Ok(poisson) = Poisson::new(*v) {
                    let sample: f64 = poisson.sample(&mut rng);
                    *v += (*v - sample) * scale;
                }
            }
        }
    }

    let std = p.dark() * gain;
    if p.y0() > 0.0 || std > 0.0 {
        if let Ok(dark) = Normal::new(p.y0(), std) {
            for v in data.iter_mut() {
                *v += dark.sample(&mut rng);
            }
        }
    }

    data.mapv_inplace(|v| v.clamp(0.0, imax));
    FramePattern::from_f64(data, dtype, true)
}
