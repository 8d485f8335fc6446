//! 2D coherent value noise.

/// Bilinear, smoothstepped lattice noise.
///
/// Each integer lattice point gets a pseudo-random value in `[-1, 1]` derived
/// from the seed and its coordinates; samples in between blend the four
/// surrounding corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueNoise2D {
    /// Noise seed
    seed: u32,
}

impl ValueNoise2D {
    /// Creates a noise field for the given seed.
    #[must_use]
    pub const fn new(seed: u32) -> Self {
        Self { seed }
    }

    /// Returns the seed.
    #[must_use]
    pub const fn seed(&self) -> u32 {
        self.seed
    }

    /// Value of the lattice point `(ix, iy)`, in `[-1, 1]`.
    #[must_use]
    pub fn lattice(&self, ix: i32, iy: i32) -> f64 {
        let mut h = self.seed
            ^ (ix as u32).wrapping_mul(0x27D4_EB2D)
            ^ (iy as u32).wrapping_mul(0x1656_67B1);
        h = (h ^ (h >> 15)).wrapping_mul(0x85EB_CA6B);
        h = (h ^ (h >> 13)).wrapping_mul(0xC2B2_AE35);
        h ^= h >> 16;
        f64::from(h) / f64::from(u32::MAX) * 2.0 - 1.0
    }

    /// Samples the field at `(x, y)`, in `[-1, 1]`.
    #[must_use]
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let x0 = x.floor();
        let y0 = y.floor();
        let tx = smoothstep(x - x0);
        let ty = smoothstep(y - y0);
        let ix = x0 as i32;
        let iy = y0 as i32;

        let v00 = self.lattice(ix, iy);
        let v10 = self.lattice(ix.wrapping_add(1), iy);
        let v01 = self.lattice(ix, iy.wrapping_add(1));
        let v11 = self.lattice(ix.wrapping_add(1), iy.wrapping_add(1));

        let top = lerp(v00, v10, tx);
        let bottom = lerp(v01, v11, tx);
        lerp(top, bottom, ty)
    }

    /// Weighted sum of samples at several frequencies.
    ///
    /// `octaves` holds `(frequency, weight)` pairs; the result is divided by the
    /// total weight, so it stays in `[-1, 1]`.
    #[must_use]
    pub fn fractal(&self, x: f64, y: f64, octaves: &[(f64, f64)]) -> f64 {
        let mut sum = 0.0;
        let mut total = 0.0;
        for (octave, &(frequency, weight)) in octaves.iter().enumerate() {
            // Offset each octave so lattice points of different octaves don't line up.
            let offset = octave as f64 * 17.31;
            sum += self.sample(x * frequency + offset, y * frequency - offset) * weight;
            total += weight;
        }
        if total > 0.0 {
            sum / total
        } else {
            0.0
        }
    }
}

/// Hermite smoothstep on `[0, 1]`.
#[inline]
fn smoothstep(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_deterministic_per_seed() {
        let a = ValueNoise2D::new(99);
        let b = ValueNoise2D::new(99);
        let c = ValueNoise2D::new(100);
        assert_eq!(a.sample(3.7, -2.2).to_bits(), b.sample(3.7, -2.2).to_bits());
        assert_ne!(a.sample(3.7, -2.2).to_bits(), c.sample(3.7, -2.2).to_bits());
    }

    #[test]
    fn test_noise_hits_lattice_values_exactly() {
        let noise = ValueNoise2D::new(5);
        for (ix, iy) in [(0, 0), (4, -3), (-10, 7)] {
            let v = noise.sample(f64::from(ix), f64::from(iy));
            assert!((v - noise.lattice(ix, iy)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_noise_range_and_continuity() {
        let noise = ValueNoise2D::new(2024);
        let mut previous = noise.sample(0.0, 0.5);
        for step in 1..2000 {
            let x = f64::from(step) * 0.01;
            let v = noise.sample(x, 0.5);
            assert!((-1.0..=1.0).contains(&v));
            // A 0.01 step can't jump more than the lattice span allows.
            assert!((v - previous).abs() < 0.05);
            previous = v;
        }
    }

    #[test]
    fn test_fractal_normalized() {
        let noise = ValueNoise2D::new(1);
        let octaves = [(1.0 / 12.0, 0.6), (1.0 / 6.0, 0.3), (1.0 / 3.0, 0.1)];
        for y in 0..16 {
            for x in 0..16 {
                let v = noise.fractal(f64::from(x), f64::from(y), &octaves);
                assert!((-1.0..=1.0).contains(&v));
            }
        }
        assert_eq!(noise.fractal(1.0, 1.0, &[]), 0.0);
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_sample_stays_in_range(
                seed in any::<u32>(),
                x in -10_000.0f64..10_000.0,
                y in -10_000.0f64..10_000.0,
            ) {
                let v = ValueNoise2D::new(seed).sample(x, y);
                prop_assert!(v.abs() <= 1.0 + 1e-9);
            }
        }
    }
}
