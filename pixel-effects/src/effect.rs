//! The effect palette and its convolution kernels.

use crate::error::EffectError;

/// A flat 3×3 convolution matrix.
pub struct Kernel {
    values: [f64; 9],
}

/// Kernel side length; all kernels here are 3×3.
pub(crate) const KERNEL_DIM: usize = 3;
/// Index of the center element along one axis.
pub(crate) const KERNEL_CENTER: i64 = (KERNEL_DIM / 2) as i64;

static SHARPEN: Kernel = Kernel {
    values: [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0],
};
static EDGE: Kernel = Kernel {
    values: [-1.0, -1.0, -1.0, -1.0, 8.0, -1.0, -1.0, -1.0, -1.0],
};
static BLUR: Kernel = Kernel {
    values: [1.0 / 9.0; 9],
};

impl Kernel {
    pub(crate) fn values(&self) -> &[f64; 9] {
        &self.values
    }
}

/// One filtering effect from the descriptor-file palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Channel-averaging grayscale; the only effect without a kernel.
    Grayscale,
    Sharpen,
    Edge,
    Blur,
}

impl Effect {
    /// Parse a single-letter descriptor code.
    pub fn from_code(code: &str) -> Result<Self, EffectError> {
        match code {
            "G" => Ok(Effect::Grayscale),
            "S" => Ok(Effect::Sharpen),
            "E" => Ok(Effect::Edge),
            "B" => Ok(Effect::Blur),
            other => Err(EffectError::UnknownEffect(other.to_string())),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Effect::Grayscale => "G",
            Effect::Sharpen => "S",
            Effect::Edge => "E",
            Effect::Blur => "B",
        }
    }

    /// The convolution kernel, or `None` for grayscale.
    pub fn kernel(&self) -> Option<&'static Kernel> {
        match self {
            Effect::Grayscale => None,
            Effect::Sharpen => Some(&SHARPEN),
            Effect::Edge => Some(&EDGE),
            Effect::Blur => Some(&BLUR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for code in ["G", "S", "E", "B"] {
            assert_eq!(Effect::from_code(code).unwrap().code(), code);
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert!(matches!(
            Effect::from_code("X"),
            Err(EffectError::UnknownEffect(_))
        ));
    }

    #[test]
    fn kernels_have_expected_weights() {
        assert!(Effect::Grayscale.kernel().is_none());
        assert_eq!(Effect::Sharpen.kernel().unwrap().values()[4], 5.0);
        assert_eq!(Effect::Edge.kernel().unwrap().values()[4], 8.0);
        let blur_sum: f64 = Effect::Blur.kernel().unwrap().values().iter().sum();
        assert!((blur_sum - 1.0).abs() < 1e-12);
    }
}
