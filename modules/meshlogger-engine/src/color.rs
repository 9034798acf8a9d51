use serde::{Serialize, Serializer};

/// SNR at or below this is drawn fully red.
const SNR_COLOR_FLOOR_DB: f64 = -20.0;
/// SNR at or above this is drawn fully green.
const SNR_COLOR_CEIL_DB: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Red→green ramp over [-20, 0] dB; the blue channel is always 0.
pub fn snr_color(snr: f64) -> Rgb {
    let clamped = snr.clamp(SNR_COLOR_FLOOR_DB, SNR_COLOR_CEIL_DB);
    let fraction = (clamped - SNR_COLOR_FLOOR_DB) / (SNR_COLOR_CEIL_DB - SNR_COLOR_FLOOR_DB);
    Rgb {
        r: (255.0 * (1.0 - fraction)).round() as u8,
        g: (255.0 * fraction).round() as u8,
        b: 0,
    }
}
