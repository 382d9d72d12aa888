// src/qr.rs
use std::io::Cursor;

use base64::{engine::general_purpose, Engine as _};
use image::{ImageFormat, Rgba, RgbaImage};
use qrcode::{Color, EcLevel, QrCode};

use crate::error::QrError;

/// White modules around the symbol, in modules.
const QUIET_ZONE: u32 = 4;

const DARK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const LIGHT: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Debug, Clone, Copy)]
pub struct QrService {
    ec_level: EcLevel,
}

impl Default for QrService {
    /// High correction: overlays occlude the centre and rely on the ~30% budget.
    fn default() -> Self {
        Self::new(EcLevel::H)
    }
}

impl QrService {
    pub fn new(ec_level: EcLevel) -> Self {
        Self { ec_level }
    }

    /// Render `payload` as a square `size × size` raster.
    ///
    /// The size is not checked against the allowed enumeration; callers do that.
    pub fn produce(&self, payload: &str, size: u32) -> Result<RgbaImage, QrError> {
        let code = QrCode::with_error_correction_level(payload, self.ec_level).map_err(|e| {
            QrError::Encoding {
                level: self.ec_level,
                reason: e.to_string(),
            }
        })?;

        let symbol = code.width() as u32;
        let modules = code.to_colors();
        let total = symbol + 2 * QUIET_ZONE;

        log::debug!(
            "Rendering {}x{} symbol ({} bytes, {:?}) into {}px",
            symbol,
            symbol,
            payload.len(),
            self.ec_level,
            size
        );

        let is_dark = |mx: u32, my: u32| -> bool {
            // Quiet zone coordinates fall outside 0..symbol after the shift.
            if mx < QUIET_ZONE || my < QUIET_ZONE {
                return false;
            }
            let (x, y) = (mx - QUIET_ZONE, my - QUIET_ZONE);
            x < symbol && y < symbol && modules[(y * symbol + x) as usize] == Color::Dark
        };

        let scale = size / total;
        let img = if scale >= 1 {
            let offset = (size - total * scale) / 2;
            RgbaImage::from_fn(size, size, |px, py| {
                if px < offset || py < offset {
                    return LIGHT;
                }
                let (mx, my) = ((px - offset) / scale, (py - offset) / scale);
                if mx < total && my < total && is_dark(mx, my) {
                    DARK
                } else {
                    LIGHT
                }
            })
        } else {
            // Fewer pixels than modules: sample the module under each pixel.
            RgbaImage::from_fn(size, size, |px, py| {
                let mx = (u64::from(px) * u64::from(total) / u64::from(size)) as u32;
                let my = (u64::from(py) * u64::from(total) / u64::from(size)) as u32;
                if is_dark(mx, my) {
                    DARK
                } else {
                    LIGHT
                }
            })
        };

        Ok(img)
    }

    /// Serialise a raster as PNG bytes.
    pub fn encode_png(&self, img: &RgbaImage) -> Result<Vec<u8>, QrError> {
        let mut png_bytes = Cursor::new(Vec::new());
        img.write_to(&mut png_bytes, ImageFormat::Png)?;
        Ok(png_bytes.into_inner())
    }
}

/// Already-encoded PNG bytes as a base64 data URL.
pub fn png_data_url(png_bytes: &[u8]) -> String {
    let base64_string = general_purpose::STANDARD.encode(png_bytes);
    format!("data:image/png;base64,{}", base64_string)
}

/// Parse an error correction level name (`L`, `M`, `Q`, `H`, or the long form).
pub fn parse_ec_level(value: &str) -> Option<EcLevel> {
    match value.trim().to_ascii_uppercase().as_str() {
        "L" | "LOW" => Some(EcLevel::L),
        "M" | "MEDIUM" => Some(EcLevel::M),
        "Q" | "QUARTILE" => Some(EcLevel::Q),
        "H" | "HIGH" => Some(EcLevel::H),
        _ => None,
    }
}
