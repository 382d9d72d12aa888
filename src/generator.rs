use image::RgbaImage;

use crate::cards::QrSize;
use crate::compositor;
use crate::config::Config;
use crate::error::GenerateError;
use crate::logos::{Logo, LogoStore};
use crate::qr::QrService;

#[derive(Clone)]
pub struct GeneratorService {
    qr_service: QrService,
    logos: LogoStore,
    logo_fraction: f64,
}

/// What to draw on top of the code.
#[derive(Debug)]
pub enum OverlayRequest {
    None,
    Branded(Logo),
    /// Undecoded upload bytes with the caller's fraction and opacity.
    Custom {
        image: Vec<u8>,
        fraction: f64,
        opacity: f64,
    },
}

#[derive(Debug)]
pub struct GenerateRequest {
    pub payload: String,
    pub size: QrSize,
    pub overlay: OverlayRequest,
}

impl GeneratorService {
    pub fn new(config: &Config, logos: LogoStore) -> Self {
        Self {
            qr_service: QrService::new(config.qr.ec_level),
            logos,
            logo_fraction: config.qr.logo_fraction,
        }
    }

    pub fn qr_service(&self) -> &QrService {
        &self.qr_service
    }

    /// Render the code and merge any requested overlay onto it.
    pub fn generate(&self, request: &GenerateRequest) -> Result<RgbaImage, GenerateError> {
        let qr_code = self.qr_service.produce(&request.payload, request.size.pixels())?;

        let merged = match &request.overlay {
            OverlayRequest::None => qr_code,
            OverlayRequest::Branded(logo) => {
                let logo_image = self.logos.get(*logo).ok_or(GenerateError::MissingLogo(*logo))?;
                compositor::composite(&qr_code, logo_image, self.logo_fraction)
            }
            OverlayRequest::Custom {
                image: bytes,
                fraction,
                opacity,
            } => {
                let overlay = image::load_from_memory(bytes).map_err(GenerateError::Decode)?.to_rgba8();
                log::debug!(
                    "Custom overlay {}x{} at fraction {} opacity {}",
                    overlay.width(),
                    overlay.height(),
                    fraction,
                    opacity
                );
                compositor::composite_with_opacity(&qr_code, &overlay, *fraction, *opacity)
            }
        };

        Ok(merged)
    }
}
