use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;

/// Fixed branding logos, one per platform endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Logo {
    Instagram,
    Facebook,
    TikTok,
    LinkedIn,
    YouTube,
    Wifi,
    Map,
    Event,
    PayPal,
    WhatsApp,
    X,
    Email,
    Sms,
    Phone,
    Spotify,
    Telegram,
    Zoom,
}

impl Logo {
    pub const ALL: [Logo; 17] = [
        Logo::Instagram,
        Logo::Facebook,
        Logo::TikTok,
        Logo::LinkedIn,
        Logo::YouTube,
        Logo::Wifi,
        Logo::Map,
        Logo::Event,
        Logo::PayPal,
        Logo::WhatsApp,
        Logo::X,
        Logo::Email,
        Logo::Sms,
        Logo::Phone,
        Logo::Spotify,
        Logo::Telegram,
        Logo::Zoom,
    ];

    /// Asset file name inside the logo directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Logo::Instagram => "instagram_logo.png",
            Logo::Facebook => "facebook_logo.png",
            Logo::TikTok => "tiktok_logo.png",
            Logo::LinkedIn => "linkedin_logo.png",
            Logo::YouTube => "youtube_logo.png",
            Logo::Wifi => "wifi_logo.png",
            Logo::Map => "map_logo.png",
            Logo::Event => "event_logo.png",
            Logo::PayPal => "paypal_logo.png",
            Logo::WhatsApp => "whatsapp_logo.png",
            Logo::X => "x_logo.png",
            Logo::Email => "email_logo.png",
            Logo::Sms => "sms_logo.png",
            Logo::Phone => "phone_logo.png",
            Logo::Spotify => "spotify_logo.png",
            Logo::Telegram => "telegram_logo.png",
            Logo::Zoom => "zoom_logo.png",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Logo::Instagram => "Instagram",
            Logo::Facebook => "Facebook",
            Logo::TikTok => "TikTok",
            Logo::LinkedIn => "LinkedIn",
            Logo::YouTube => "YouTube",
            Logo::Wifi => "Wi-Fi",
            Logo::Map => "map",
            Logo::Event => "event",
            Logo::PayPal => "PayPal",
            Logo::WhatsApp => "WhatsApp",
            Logo::X => "X",
            Logo::Email => "email",
            Logo::Sms => "SMS",
            Logo::Phone => "phone",
            Logo::Spotify => "Spotify",
            Logo::Telegram => "Telegram",
            Logo::Zoom => "Zoom",
        }
    }
}

/// Decoded logos, loaded once at start-up and shared read-only between workers.
#[derive(Debug, Clone, Default)]
pub struct LogoStore {
    logos: Arc<HashMap<Logo, RgbaImage>>,
}

impl LogoStore {
    /// Decode every logo found in `dir`. Missing or broken files are logged and
    /// left out; requests for them fail later with a per-logo error.
    pub fn load(dir: &Path) -> Self {
        let mut logos = HashMap::new();

        for logo in Logo::ALL {
            let path = dir.join(logo.file_name());
            match image::open(&path) {
                Ok(img) => {
                    let rgba = img.to_rgba8();
                    log::debug!("Loaded {} logo ({}x{})", logo.display_name(), rgba.width(), rgba.height());
                    logos.insert(logo, rgba);
                }
                Err(e) => log::warn!("Could not load {} logo from {}: {}", logo.display_name(), path.display(), e),
            }
        }

        log::info!("{} of {} logos loaded from {}", logos.len(), Logo::ALL.len(), dir.display());

        Self {
            logos: Arc::new(logos),
        }
    }

    #[cfg(test)]
    pub fn from_images(images: impl IntoIterator<Item = (Logo, RgbaImage)>) -> Self {
        Self {
            logos: Arc::new(images.into_iter().collect()),
        }
    }

    pub fn get(&self, logo: Logo) -> Option<&RgbaImage> {
        self.logos.get(&logo)
    }
}
