/// A trait to convert values from mired to Kelvin and vice versa.
/// See https://en.wikipedia.org/wiki/Mired.
///
/// Both directions compute `round(1_000_000 / self)`, so converting back and forth may drift
/// by a few units (2700 K -> 370 mired -> 2703 K). Returns `None` for zero.
pub trait MiredConversions: Sized {
    /// Returns the value in Kelvin by treating `self` as the value in mired.
    fn mired_to_kelvin(self) -> Option<Self>;

    /// Returns the value in mired by treating `self` as the value in Kelvin.
    fn kelvin_to_mired(self) -> Option<Self>;
}

macro_rules! impl_mired_conversions {
    ($($t:ty)*) => ($(
        impl MiredConversions for $t {
            fn mired_to_kelvin(self) -> Option<$t> {
                reciprocal_mega(self as f64).map(|v| v as $t)
            }
            fn kelvin_to_mired(self) -> Option<$t> {
                reciprocal_mega(self as f64).map(|v| v as $t)
            }
        }
    )*)
}

impl_mired_conversions! { u16 u32 u64 usize }

fn reciprocal_mega(value: f64) -> Option<f64> {
    if value == 0.0 {
        return None;
    }
    Some((1_000_000.0 / value).round_ties_even())
}

/// Converts between the 0-255 brightness scale and device percentages.
pub trait BrightnessConversions {
    /// Treats `self` as a 0-255 brightness and returns the percentage, `round(100 * v / 255)`.
    fn brightness_to_percent(self) -> u8;

    /// Treats `self` as a percentage and returns the 0-255 brightness, `round(255 * v / 100)`.
    fn percent_to_brightness(self) -> u8;
}

impl BrightnessConversions for u8 {
    fn brightness_to_percent(self) -> u8 {
        (100.0 * self as f64 / 255.0).round_ties_even() as u8
    }

    fn percent_to_brightness(self) -> u8 {
        (255.0 * self.min(100) as f64 / 100.0).round_ties_even() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, None)]
    #[case(153, Some(6536))]
    #[case(370, Some(2703))]
    #[case(500, Some(2000))]
    fn mired_to_kelvin_u32(#[case] input: u32, #[case] expected: Option<u32>) {
        assert_eq!(input.mired_to_kelvin(), expected);
    }

    #[rstest]
    #[case(0, None)]
    #[case(2700, Some(370))]
    #[case(5700, Some(175))]
    #[case(6500, Some(154))]
    fn kelvin_to_mired_u64(#[case] input: u64, #[case] expected: Option<u64>) {
        assert_eq!(input.kelvin_to_mired(), expected);
    }

    #[test]
    fn kelvin_drifts_after_a_round_trip() {
        let mired = 2700u32.kelvin_to_mired();
        assert_eq!(mired, Some(370));
        assert_eq!(mired.and_then(|m| m.mired_to_kelvin()), Some(2703));
    }

    #[rstest]
    #[case(0, 0)]
    #[case(10, 4)]
    #[case(128, 50)]
    #[case(255, 100)]
    fn brightness_to_percent(#[case] input: u8, #[case] expected: u8) {
        assert_eq!(input.brightness_to_percent(), expected);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(4, 10)]
    #[case(10, 26)]
    #[case(30, 76)]
    #[case(100, 255)]
    #[case(120, 255)]
    fn percent_to_brightness(#[case] input: u8, #[case] expected: u8) {
        assert_eq!(input.percent_to_brightness(), expected);
    }

    #[test]
    fn every_brightness_lands_in_the_direct_percent_bucket() {
        for v in 0..=255u8 {
            let percent = v.brightness_to_percent();
            let expected = (100.0 * v as f64 / 255.0).round_ties_even() as u8;
            assert_eq!(percent, expected);
            assert_eq!(percent.percent_to_brightness().brightness_to_percent(), percent);
        }
    }
}
