use actix_files::NamedFile;
use actix_web::{http::header, web, HttpRequest, HttpResponse, Result};
use serde::Serialize;
use tokio::time::timeout;
use uuid::Uuid;

use crate::cards::{CardKind, Fields, OverlaySource, QrSize};
use crate::compositor::DEFAULT_LOGO_FRACTION;
use crate::config::Config;
use crate::error::{ApiError, GenerateError};
use crate::form::{read_form, FormData};
use crate::generator::{GenerateRequest, GeneratorService, OverlayRequest};
use crate::qr::png_data_url;

#[derive(Serialize)]
struct ServerInfo {
    status: String,
    version: String,
    cards: Vec<String>,
}

#[derive(Serialize)]
struct ImageResponse {
    image: String,
}

// Index page of the static UI
pub async fn index(config: web::Data<Config>) -> Result<NamedFile> {
    Ok(NamedFile::open(config.server.static_dir.join("index.html"))?)
}

pub async fn health() -> Result<HttpResponse> {
    let info = ServerInfo {
        status: "running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cards: CardKind::ALL.iter().map(|c| c.route().to_string()).collect(),
    };
    Ok(HttpResponse::Ok().json(info))
}

pub async fn method_not_allowed() -> Result<HttpResponse, ApiError> {
    Err(ApiError::MethodNotAllowed)
}

/// Shared handler behind every `/generate*` route.
pub async fn generate(
    card: CardKind,
    req: HttpRequest,
    payload: web::Payload,
    generator: web::Data<GeneratorService>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let request_id = Uuid::new_v4().simple().to_string();
    let request_id = &request_id[..8];

    let form = read_form(&req, payload, config.server.max_upload_bytes)
        .await
        .map_err(|e| {
            log::warn!("[{}] {}: {}", request_id, card.route(), e);
            e
        })?;

    let request = build_request(card, form).map_err(|e| {
        log::warn!("[{}] {}: {}", request_id, card.route(), e);
        e
    })?;

    let size = request.size.pixels();
    let wants_json = accepts_json(&req);
    let service = generator.clone();

    let job = web::block(move || -> Result<(Vec<u8>, Option<String>), GenerateError> {
        let img = service.generate(&request)?;
        let png = service.qr_service().encode_png(&img)?;
        let data_url = wants_json.then(|| png_data_url(&png));
        Ok((png, data_url))
    });

    let (png, data_url) = match timeout(config.server.generate_timeout, job).await {
        Ok(Ok(Ok(output))) => output,
        Ok(Ok(Err(e))) => {
            log::error!("[{}] {}: {}", request_id, card.route(), e);
            return Err(e.into());
        }
        Ok(Err(e)) => {
            log::error!("[{}] {}: worker failed: {}", request_id, card.route(), e);
            return Err(ApiError::Internal("Failed to generate QR code".to_string()));
        }
        Err(_) => {
            log::error!("[{}] {}: generation timed out", request_id, card.route());
            return Err(ApiError::Timeout);
        }
    };

    log::info!("[{}] {}: generated {}px code ({} bytes)", request_id, card.route(), size, png.len());

    match data_url {
        Some(image) => Ok(HttpResponse::Ok().json(ImageResponse { image })),
        None => Ok(HttpResponse::Ok().content_type("image/png").body(png)),
    }
}

/// Validate the form for `card` and turn it into a generation request.
pub fn build_request(card: CardKind, form: FormData) -> Result<GenerateRequest, ApiError> {
    let FormData { fields, image } = form;

    let payload = card.build_payload(&fields)?;
    let size = QrSize::from_fields(&fields)?;

    let overlay = match card.overlay() {
        OverlaySource::Branded(logo) => OverlayRequest::Branded(logo),
        OverlaySource::Custom => {
            let fraction = logo_fraction(&fields)?;
            match image {
                Some(image) => OverlayRequest::Custom {
                    image,
                    fraction,
                    opacity: logo_opacity(&fields),
                },
                None => OverlayRequest::None,
            }
        }
    };

    Ok(GenerateRequest { payload, size, overlay })
}

fn logo_fraction(fields: &Fields) -> Result<f64, ApiError> {
    match fields.get("logoWidthPercent").trim() {
        "" => Ok(DEFAULT_LOGO_FRACTION),
        raw => raw
            .parse::<f64>()
            .ok()
            .filter(|f| *f > 0.0 && *f <= 1.0)
            .ok_or_else(|| ApiError::validation("Invalid logo width percent")),
    }
}

/// Opacity falls back to fully opaque when missing or unparsable.
fn logo_opacity(fields: &Fields) -> f64 {
    fields.get("logoOpacity").trim().parse::<f64>().unwrap_or(1.0)
}

fn accepts_json(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("application/json"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logos::{Logo, LogoStore};
    use actix_web::{http::StatusCode, test as actix_test, App};
    use base64::Engine as _;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn form(pairs: &[(&str, &str)], image: Option<Vec<u8>>) -> FormData {
        FormData {
            fields: pairs.iter().copied().collect(),
            image,
        }
    }

    fn app_state(logos: LogoStore) -> (web::Data<GeneratorService>, web::Data<Config>) {
        let config = Config::default();
        let generator = GeneratorService::new(&config, logos);
        (web::Data::new(generator), web::Data::new(config))
    }

    macro_rules! test_app {
        ($logos:expr) => {{
            let (generator, config) = app_state($logos);
            actix_test::init_service(
                App::new()
                    .app_data(generator)
                    .app_data(config)
                    .configure(crate::configure_routes),
            )
            .await
        }};
    }

    #[test]
    fn fraction_defaults_and_validates() {
        assert_eq!(logo_fraction(&Fields::default()).unwrap(), 0.25);
        assert_eq!(logo_fraction(&[("logoWidthPercent", "0.4")].into_iter().collect()).unwrap(), 0.4);
        for bad in ["abc", "0", "-0.1", "1.5"] {
            let fields: Fields = [("logoWidthPercent", bad)].into_iter().collect();
            assert_eq!(logo_fraction(&fields).unwrap_err().to_string(), "Invalid logo width percent");
        }
    }

    #[test]
    fn opacity_defaults_to_one() {
        assert_eq!(logo_opacity(&Fields::default()), 1.0);
        assert_eq!(logo_opacity(&[("logoOpacity", "oops")].into_iter().collect()), 1.0);
        assert_eq!(logo_opacity(&[("logoOpacity", "0.3")].into_iter().collect()), 0.3);
    }

    #[test]
    fn url_without_upload_has_no_overlay() {
        let req = build_request(CardKind::Url, form(&[("url", "https://example.com"), ("size", "256")], None)).unwrap();
        assert_eq!(req.payload, "https://example.com");
        assert_eq!(req.size, QrSize::Medium);
        assert!(matches!(req.overlay, OverlayRequest::None));
    }

    #[test]
    fn upload_carries_fraction_and_opacity() {
        let req = build_request(
            CardKind::VCard,
            form(
                &[("size", "128"), ("logoWidthPercent", "0.3"), ("logoOpacity", "0.5")],
                Some(vec![1, 2, 3]),
            ),
        )
        .unwrap();
        match req.overlay {
            OverlayRequest::Custom { fraction, opacity, .. } => {
                assert_eq!(fraction, 0.3);
                assert_eq!(opacity, 0.5);
            }
            other => panic!("unexpected overlay {other:?}"),
        }
    }

    #[test]
    fn branded_cards_use_their_logo() {
        let req = build_request(CardKind::Telegram, form(&[("telegramName", "rust"), ("size", "512")], None)).unwrap();
        assert!(matches!(req.overlay, OverlayRequest::Branded(Logo::Telegram)));
    }

    #[test]
    fn payload_errors_come_before_size_errors() {
        let err = build_request(CardKind::Instagram, form(&[], None)).unwrap_err();
        assert_eq!(err.to_string(), "Missing username");
    }

    #[actix_web::test]
    async fn generate_returns_png_of_requested_size() {
        let app = test_app!(LogoStore::default());
        let req = actix_test::TestRequest::post()
            .uri("/generate")
            .set_form([("url", "https://example.com"), ("size", "256")])
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");

        let body = actix_test::read_body(resp).await;
        let img = image::load_from_memory(&body).unwrap();
        assert_eq!((img.width(), img.height()), (256, 256));
    }

    #[actix_web::test]
    async fn branded_route_composites_logo() {
        let green = Rgba([0, 200, 0, 255]);
        let app = test_app!(LogoStore::from_images([(Logo::Wifi, RgbaImage::from_pixel(64, 64, green))]));
        let req = actix_test::TestRequest::post()
            .uri("/generate_wifi")
            .set_form([("ssid", "MyNet"), ("security", "WPA2"), ("password", "secret123"), ("size", "512")])
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = actix_test::read_body(resp).await;
        let img = image::load_from_memory(&body).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (512, 512));
        // 64x64 fits the 128x128 box as-is, centred at (224, 224).
        assert_eq!(*img.get_pixel(224, 224), green);
        assert_eq!(*img.get_pixel(287, 287), green);
    }

    #[actix_web::test]
    async fn missing_logo_is_a_server_error() {
        let app = test_app!(LogoStore::default());
        let req = actix_test::TestRequest::post()
            .uri("/generate_phone")
            .set_form([("phoneNumber", "+100"), ("size", "128")])
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(actix_test::read_body(resp).await, "Failed to open phone logo");
    }

    #[actix_web::test]
    async fn validation_errors_are_bad_requests() {
        let app = test_app!(LogoStore::default());
        let cases = [
            ("/generate", vec![("url", "https://example.com")], "Missing size"),
            ("/generate", vec![("url", "https://example.com"), ("size", "300")], "Invalid size"),
            ("/generate_map", vec![("latitude", "100"), ("longitude", "0"), ("size", "128")], "Invalid latitude"),
            ("/generate_zoom", vec![("size", "128")], "Missing meeting ID"),
        ];
        for (uri, fields, message) in cases {
            let req = actix_test::TestRequest::post().uri(uri).set_form(fields).to_request();
            let resp = actix_test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(actix_test::read_body(resp).await, message, "{uri}");
        }
    }

    #[actix_web::test]
    async fn get_on_card_route_is_not_allowed() {
        let app = test_app!(LogoStore::default());
        let req = actix_test::TestRequest::get().uri("/generate_sms").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[actix_web::test]
    async fn oversized_payload_is_a_server_error() {
        let app = test_app!(LogoStore::default());
        let long_url = format!("https://example.com/{}", "a".repeat(3000));
        let req = actix_test::TestRequest::post()
            .uri("/generate")
            .set_form([("url", long_url.as_str()), ("size", "1024")])
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(actix_test::read_body(resp).await, "Failed to generate QR code");
    }

    #[actix_web::test]
    async fn json_variant_returns_data_url() {
        let app = test_app!(LogoStore::default());
        let req = actix_test::TestRequest::post()
            .uri("/generate")
            .insert_header((header::ACCEPT, "application/json"))
            .set_form([("url", "https://example.com"), ("size", "128")])
            .to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;
        let data_url = body["image"].as_str().unwrap();
        let encoded = data_url.strip_prefix("data:image/png;base64,").unwrap();

        let png = base64::engine::general_purpose::STANDARD.decode(encoded).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (128, 128));
    }

    #[actix_web::test]
    async fn multipart_upload_is_composited() {
        let app = test_app!(LogoStore::default());

        let mut png = Cursor::new(Vec::new());
        RgbaImage::from_pixel(64, 64, Rgba([255, 0, 0, 255]))
            .write_to(&mut png, ImageFormat::Png)
            .unwrap();

        let mut body = Vec::new();
        for (name, value) in [("url", "https://example.com"), ("size", "256"), ("logoWidthPercent", "0.25")] {
            body.extend_from_slice(
                format!("--B0UND\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
            );
        }
        body.extend_from_slice(
            b"--B0UND\r\nContent-Disposition: form-data; name=\"image\"; filename=\"logo.png\"\r\nContent-Type: image/png\r\n\r\n",
        );
        body.extend_from_slice(png.get_ref());
        body.extend_from_slice(b"\r\n--B0UND--\r\n");

        let req = actix_test::TestRequest::post()
            .uri("/generate")
            .insert_header((header::CONTENT_TYPE, "multipart/form-data; boundary=B0UND"))
            .set_payload(body)
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let img = image::load_from_memory(&actix_test::read_body(resp).await).unwrap().to_rgba8();
        assert_eq!(*img.get_pixel(96, 96), Rgba([255, 0, 0, 255]));
        assert_eq!(*img.get_pixel(159, 159), Rgba([255, 0, 0, 255]));
    }
}
