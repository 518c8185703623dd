//! Fixed global color table and nearest-color quantization.

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

/// Number of entries in the global color table.
pub const PALETTE_SIZE: usize = 256;

/// A 256-entry RGB color table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: [[u8; 3]; PALETTE_SIZE],
}

/// Round half up, matching the rounding used to derive the table.
fn round_channel(value: f64) -> u8 {
    (value + 0.5).floor().clamp(0.0, 255.0) as u8
}

impl Palette {
    /// The fixed palette tuned to the scanner's dark theme.
    ///
    /// ```text
    ///   0..64   dark green-grays (backgrounds)
    ///  64..128  greens (accent, nodes)
    /// 128..192  blues and cyans (secondary)
    /// 192..224  reds and oranges (anomalies)
    /// 224..256  neutral grays
    /// ```
    pub fn tonal() -> Self {
        let mut colors = [[0u8; 3]; PALETTE_SIZE];
        for (i, color) in colors.iter_mut().enumerate() {
            let i = i as f64;
            *color = if i < 64.0 {
                let v = round_channel(i / 63.0 * 40.0);
                let v = f64::from(v);
                [v as u8, round_channel(v * 1.3), round_channel(v * 1.1)]
            } else if i < 128.0 {
                let t = (i - 64.0) / 63.0;
                [
                    round_channel(t * 80.0),
                    round_channel(80.0 + t * 175.0),
                    round_channel(t * 136.0),
                ]
            } else if i < 192.0 {
                let t = (i - 128.0) / 63.0;
                [
                    round_channel(t * 100.0),
                    round_channel(100.0 + t * 120.0),
                    round_channel(150.0 + t * 105.0),
                ]
            } else if i < 224.0 {
                let t = (i - 192.0) / 31.0;
                [
                    round_channel(150.0 + t * 105.0),
                    round_channel(t * 100.0),
                    round_channel(t * 80.0),
                ]
            } else {
                let v = round_channel((i - 224.0) / 31.0 * 255.0);
                [v, v, v]
            };
        }
        Self { colors }
    }

    pub fn from_colors(colors: [[u8; 3]; PALETTE_SIZE]) -> Self {
        Self { colors }
    }

    pub fn colors(&self) -> &[[u8; 3]; PALETTE_SIZE] {
        &self.colors
    }

    /// The table as 768 packed RGB bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.colors.iter().flatten().copied().collect()
    }

    /// Index of the entry closest to `rgb` by squared Euclidean distance.
    ///
    /// Ties go to the lowest index.
    pub fn nearest(&self, rgb: [u8; 3]) -> u8 {
        let mut best = 0usize;
        let mut best_distance = u32::MAX;
        for (i, entry) in self.colors.iter().enumerate() {
            let distance: u32 = rgb
                .iter()
                .zip(entry)
                .map(|(&a, &b)| {
                    let d = a.abs_diff(b) as u32;
                    d * d
                })
                .sum();
            if distance < best_distance {
                best_distance = distance;
                best = i;
                if distance == 0 {
                    break;
                }
            }
        }
        best as u8
    }

    /// Map every RGBA pixel to its nearest palette index. Alpha is ignored.
    pub fn quantize(&self, pixels: &[[u8; 4]]) -> Vec<u8> {
        #[cfg(not(target_arch = "wasm32"))]
        {
            pixels
                .par_iter()
                .map(|&[r, g, b, _]| self.nearest([r, g, b]))
                .collect()
        }

        #[cfg(target_arch = "wasm32")]
        {
            pixels
                .iter()
                .map(|&[r, g, b, _]| self.nearest([r, g, b]))
                .collect()
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::tonal()
    }
}
