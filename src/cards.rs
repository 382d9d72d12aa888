//! Endpoint descriptors: which fields each card reads, how its payload is
//! built, and which logo (if any) goes on top.

use std::collections::HashMap;

use crate::error::ApiError;
use crate::logos::Logo;

/// Form field values keyed by name. Absent fields read as empty strings.
#[derive(Debug, Default, Clone)]
pub struct Fields(HashMap<String, String>);

impl Fields {
    pub fn new(map: HashMap<String, String>) -> Self {
        Self(map)
    }

    pub fn get(&self, name: &str) -> &str {
        self.0.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    fn required(&self, name: &str, message: &str) -> Result<&str, ApiError> {
        match self.get(name) {
            "" => Err(ApiError::validation(message)),
            value => Ok(value),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Output edge lengths the service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrSize {
    Small = 128,
    Medium = 256,
    Large = 512,
    ExtraLarge = 1024,
}

impl QrSize {
    pub fn pixels(self) -> u32 {
        self as u32
    }

    pub fn from_pixels(px: u32) -> Option<Self> {
        match px {
            128 => Some(QrSize::Small),
            256 => Some(QrSize::Medium),
            512 => Some(QrSize::Large),
            1024 => Some(QrSize::ExtraLarge),
            _ => None,
        }
    }

    pub fn from_fields(fields: &Fields) -> Result<Self, ApiError> {
        let raw = fields.required("size", "Missing size")?;
        raw.trim()
            .parse::<u32>()
            .ok()
            .and_then(Self::from_pixels)
            .ok_or_else(|| ApiError::validation("Invalid size"))
    }
}

/// What goes on top of the generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlaySource {
    /// A fixed branding logo at the configured fraction.
    Branded(Logo),
    /// An optional uploaded image with caller-chosen fraction and opacity.
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardKind {
    Url,
    VCard,
    Instagram,
    Facebook,
    TikTok,
    LinkedIn,
    YouTube,
    X,
    Wifi,
    Map,
    Event,
    PayPal,
    WhatsApp,
    Email,
    Sms,
    Phone,
    Spotify,
    Telegram,
    Zoom,
}

impl CardKind {
    pub const ALL: [CardKind; 19] = [
        CardKind::Url,
        CardKind::VCard,
        CardKind::Instagram,
        CardKind::Facebook,
        CardKind::TikTok,
        CardKind::LinkedIn,
        CardKind::YouTube,
        CardKind::X,
        CardKind::Wifi,
        CardKind::Map,
        CardKind::Event,
        CardKind::PayPal,
        CardKind::WhatsApp,
        CardKind::Email,
        CardKind::Sms,
        CardKind::Phone,
        CardKind::Spotify,
        CardKind::Telegram,
        CardKind::Zoom,
    ];

    pub fn route(self) -> &'static str {
        match self {
            CardKind::Url => "/generate",
            CardKind::VCard => "/generate_vcard",
            CardKind::Instagram => "/generate_instagram",
            CardKind::Facebook => "/generate_facebook",
            CardKind::TikTok => "/generate_tiktok",
            CardKind::LinkedIn => "/generate_linkedin",
            CardKind::YouTube => "/generate_youtube",
            CardKind::X => "/generate_x",
            CardKind::Wifi => "/generate_wifi",
            CardKind::Map => "/generate_map",
            CardKind::Event => "/generate_event",
            CardKind::PayPal => "/generate_paypal",
            CardKind::WhatsApp => "/generate_whatsapp",
            CardKind::Email => "/generate_email",
            CardKind::Sms => "/generate_sms",
            CardKind::Phone => "/generate_phone",
            CardKind::Spotify => "/generate_spotify",
            CardKind::Telegram => "/generate_telegram",
            CardKind::Zoom => "/generate_zoom",
        }
    }

    pub fn overlay(self) -> OverlaySource {
        match self {
            CardKind::Url | CardKind::VCard => OverlaySource::Custom,
            CardKind::Instagram => OverlaySource::Branded(Logo::Instagram),
            CardKind::Facebook => OverlaySource::Branded(Logo::Facebook),
            CardKind::TikTok => OverlaySource::Branded(Logo::TikTok),
            CardKind::LinkedIn => OverlaySource::Branded(Logo::LinkedIn),
            CardKind::YouTube => OverlaySource::Branded(Logo::YouTube),
            CardKind::X => OverlaySource::Branded(Logo::X),
            CardKind::Wifi => OverlaySource::Branded(Logo::Wifi),
            CardKind::Map => OverlaySource::Branded(Logo::Map),
            CardKind::Event => OverlaySource::Branded(Logo::Event),
            CardKind::PayPal => OverlaySource::Branded(Logo::PayPal),
            CardKind::WhatsApp => OverlaySource::Branded(Logo::WhatsApp),
            CardKind::Email => OverlaySource::Branded(Logo::Email),
            CardKind::Sms => OverlaySource::Branded(Logo::Sms),
            CardKind::Phone => OverlaySource::Branded(Logo::Phone),
            CardKind::Spotify => OverlaySource::Branded(Logo::Spotify),
            CardKind::Telegram => OverlaySource::Branded(Logo::Telegram),
            CardKind::Zoom => OverlaySource::Branded(Logo::Zoom),
        }
    }

    /// Validate the card's own fields and build the text to encode.
    pub fn build_payload(self, f: &Fields) -> Result<String, ApiError> {
        let payload = match self {
            CardKind::Url => f.required("url", "Missing URL")?.to_string(),
            CardKind::VCard => vcard(f),
            CardKind::Instagram => {
                format!("https://www.instagram.com/{}", f.required("username", "Missing username")?)
            }
            CardKind::Facebook => {
                format!("https://www.facebook.com/{}", f.required("username", "Missing username")?)
            }
            CardKind::TikTok => {
                format!("https://www.tiktok.com/@{}", f.required("username", "Missing username")?)
            }
            CardKind::LinkedIn => {
                format!("https://www.linkedin.com/in/{}", f.required("username", "Missing username")?)
            }
            CardKind::YouTube => {
                format!("https://www.youtube.com/channel/{}", f.required("channel", "Missing channel")?)
            }
            CardKind::X => {
                format!("https://www.twitter.com/{}", f.required("username", "Missing username")?)
            }
            CardKind::Wifi => wifi(f)?,
            CardKind::Map => geo(f)?,
            CardKind::Event => event(f)?,
            CardKind::PayPal => paypal(f)?,
            CardKind::WhatsApp => {
                let phone = f.required("phone", "Missing phone number")?;
                format!("https://wa.me/{}?text={}", phone, f.get("message"))
            }
            CardKind::Email => {
                let email = f.required("email", "Missing email")?;
                format!("mailto:{}?subject={}&body={}", email, f.get("subject"), f.get("body"))
            }
            CardKind::Sms => {
                let phone = f.required("phoneNumber", "Missing phone number")?;
                format!("sms:{}?body={}", phone, f.get("message"))
            }
            CardKind::Phone => format!("tel:{}", f.required("phoneNumber", "Missing phone number")?),
            CardKind::Spotify => f.required("spotifyURL", "Missing Spotify URL")?.to_string(),
            CardKind::Telegram => format!(
                "https://t.me/{}",
                f.required("telegramName", "Missing Telegram username or group name")?
            ),
            CardKind::Zoom => {
                let meeting = f.required("meetingID", "Missing meeting ID")?;
                format!("https://zoom.us/j/{}?pwd={}", meeting, f.get("password"))
            }
        };
        Ok(payload)
    }
}

const WIFI_SECURITIES: [&str; 5] = ["WPA", "WPA2", "WPA3", "WEP", "nopass"];

fn wifi(f: &Fields) -> Result<String, ApiError> {
    let ssid = f.required("ssid", "Missing SSID")?;
    let security = f.get("security");
    let password = f.get("password");

    if !WIFI_SECURITIES.contains(&security) {
        return Err(ApiError::validation("Invalid security type"));
    }

    // Lengths are in bytes, as the WPA passphrase rules count octets.
    match security {
        "WPA" | "WPA2" | "WPA3" => {
            if password.is_empty() {
                return Err(ApiError::validation("Password is required for WPA/WPA2/WPA3 security"));
            }
            if !(8..=63).contains(&password.len()) {
                return Err(ApiError::validation(
                    "Password for WPA/WPA2/WPA3 must be between 8 and 63 characters",
                ));
            }
        }
        "WEP" if password.len() != 5 && password.len() != 13 => {
            return Err(ApiError::validation("Password for WEP must be exactly 5 or 13 characters"));
        }
        _ => {}
    }

    Ok(format!("WIFI:T:{};S:{};P:{};;", security, ssid, password))
}

fn geo(f: &Fields) -> Result<String, ApiError> {
    let (lat, lon) = (f.get("latitude"), f.get("longitude"));
    if lat.is_empty() || lon.is_empty() {
        return Err(ApiError::validation("Missing latitude or longitude"));
    }

    let lat = parse_in_range(lat, 90.0).ok_or_else(|| ApiError::validation("Invalid latitude"))?;
    let lon = parse_in_range(lon, 180.0).ok_or_else(|| ApiError::validation("Invalid longitude"))?;

    Ok(format!("geo:{:.6},{:.6}", lat, lon))
}

fn parse_in_range(raw: &str, limit: f64) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| (-limit..=limit).contains(v))
}

fn event(f: &Fields) -> Result<String, ApiError> {
    let (name, start, end) = (f.get("eventName"), f.get("startDateTime"), f.get("endDateTime"));
    if name.is_empty() || start.is_empty() || end.is_empty() {
        return Err(ApiError::validation("Missing event details"));
    }

    Ok(format!(
        "BEGIN:VEVENT\nSUMMARY:{}\nDTSTART:{}\nDTEND:{}\nLOCATION:{}\nDESCRIPTION:{}\nEND:VEVENT",
        name,
        start,
        end,
        f.get("location"),
        f.get("description")
    ))
}

fn paypal(f: &Fields) -> Result<String, ApiError> {
    let (email, amount, currency) = (f.get("email"), f.get("amount"), f.get("currency"));
    if email.is_empty() || amount.is_empty() || currency.is_empty() {
        return Err(ApiError::validation("Missing payment details"));
    }

    Ok(format!(
        "https://www.paypal.com/cgi-bin/webscr?cmd=_xclick&business={}&amount={}&currency_code={}&item_name={}",
        email,
        amount,
        currency,
        f.get("description")
    ))
}

fn vcard(f: &Fields) -> String {
    let (first, last) = (f.get("firstName"), f.get("lastName"));
    let mut lines = vec![
        "BEGIN:VCARD".to_string(),
        "VERSION:3.0".to_string(),
        format!("N:{};{};;;", last, first),
        format!("FN:{} {}", first, last),
    ];

    let optional = |lines: &mut Vec<String>, key: &str, field: &str| {
        let value = f.get(field);
        if !value.is_empty() {
            lines.push(format!("{}:{}", key, value));
        }
    };

    optional(&mut lines, "ORG", "company");
    lines.push(format!("TITLE:{}", f.get("title")));
    lines.push(format!("TEL;TYPE=WORK,VOICE:{}", f.get("phone")));
    optional(&mut lines, "TEL;TYPE=CELL,VOICE", "mobile");
    lines.push(format!("EMAIL:{}", f.get("email")));
    lines.push(format!("ADR:{}", f.get("address")));
    optional(&mut lines, "URL", "url");
    optional(&mut lines, "ROLE", "role");
    optional(&mut lines, "LANG", "lang");
    optional(&mut lines, "GEO", "geo");
    lines.push("END:VCARD".to_string());

    lines.join("\n")
}
