use std::f64::consts::LN_10;

/// A measured quantity with its 1-sigma uncertainty.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Measure {
    pub value: f64,
    pub error: f64,
}

impl Measure {
    pub fn new(value: f64, error: f64) -> Self {
        Self { value, error }
    }

    pub fn undefined() -> Self {
        Self {
            value: f64::NAN,
            error: f64::NAN,
        }
    }

    /// Relative uncertainty `error / |value|`.
    pub fn relative_error(self) -> f64 {
        self.error / self.value.abs()
    }

    /// `self / other`, relative errors added in quadrature.
    pub fn ratio(self, other: Measure) -> Measure {
        let value = self.value / other.value;
        let rel = self.relative_error().hypot(other.relative_error());
        Measure::new(value, value.abs() * rel)
    }

    /// Base-10 logarithm, first-order propagation.
    pub fn log10(self) -> Measure {
        Measure::new(self.value.log10(), self.error / (self.value.abs() * LN_10))
    }

    pub fn scale(self, factor: f64) -> Measure {
        Measure::new(self.value * factor, self.error * factor.abs())
    }

    /// Astronomical magnitude difference `-2.5 log10(self / reference)`.
    pub fn magnitude_against(self, reference: Measure) -> Measure {
        self.ratio(reference).log10().scale(-2.5)
    }
}

impl std::ops::Sub for Measure {
    type Output = Measure;

    /// Errors added in quadrature.
    fn sub(self, rhs: Measure) -> Measure {
        Measure::new(self.value - rhs.value, self.error.hypot(rhs.error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_quadrature() {
        let d = Measure::new(5.0, 3.0) - Measure::new(2.0, 4.0);
        assert_eq!(d.value, 3.0);
        assert!((d.error - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_magnitude_dimming_is_positive() {
        let m = Measure::new(50.0, 5.0).magnitude_against(Measure::new(100.0, 0.0));
        assert!((m.value - 0.752_574_989).abs() < 1e-6, "{}", m.value);
        // 10% relative error in flux: 2.5 * 0.1 / ln 10
        assert!((m.error - 0.108_573_62).abs() < 1e-6, "{}", m.error);
    }

    #[test]
    fn test_nan_propagates() {
        let m = Measure::undefined().magnitude_against(Measure::new(1.0, 0.1));
        assert!(m.value.is_nan());
        assert!(m.error.is_nan());
    }
}
