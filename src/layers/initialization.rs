use ndarray::{Array1, Array2};
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::Uniform;

/// Weight initialization strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightInit {
    /// Xavier/Glorot uniform initialization, bound `sqrt(6 / (fan_in + fan_out))`
    #[default]
    XavierUniform,

    /// All zeros
    Zeros,
}

impl WeightInit {
    /// Half-width of the Xavier/Glorot uniform range for a layer.
    pub fn xavier_limit(fan_in: usize, fan_out: usize) -> f32 {
        (6.0 / (fan_in + fan_out) as f32).sqrt()
    }

    /// Initialize weights for a layer with shape `(fan_in, fan_out)`
    pub fn initialize_weights<R: Rng + ?Sized>(&self, shape: (usize, usize), rng: &mut R) -> Array2<f32> {
        let (fan_in, fan_out) = shape;

        match self {
            WeightInit::XavierUniform => {
                let limit = Self::xavier_limit(fan_in, fan_out);
                Array2::random_using(shape, Uniform::new(-limit, limit), rng)
            }

            WeightInit::Zeros => {
                Array2::zeros(shape)
            }
        }
    }

    /// Biases always start at zero.
    pub fn initialize_biases(&self, size: usize) -> Array1<f32> {
        Array1::zeros(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_xavier_limit() {
        let limit = WeightInit::xavier_limit(2, 4);
        assert!((limit - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_xavier_uniform_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let weights = WeightInit::XavierUniform.initialize_weights((16, 8), &mut rng);
        let limit = WeightInit::xavier_limit(16, 8);
        assert_eq!(weights.dim(), (16, 8));
        assert!(weights.iter().all(|w| w.abs() <= limit));
        // 128 draws should not all collapse to one value
        assert!(weights.iter().any(|&w| w != weights[[0, 0]]));
    }

    #[test]
    fn test_zero_init() {
        let mut rng = StdRng::seed_from_u64(7);
        let weights = WeightInit::Zeros.initialize_weights((3, 2), &mut rng);
        assert!(weights.iter().all(|&w| w == 0.0));
        assert_eq!(WeightInit::Zeros.initialize_biases(2), Array1::<f32>::zeros(2));
    }
}
