//! Request body extraction for card endpoints.
//!
//! Accepts `application/x-www-form-urlencoded` and `multipart/form-data`
//! bodies. Multipart file fields named `image` are kept as raw bytes; every
//! other part is read as text.

use std::collections::HashMap;

use actix_multipart::Multipart;
use actix_web::{http::header, web, HttpRequest};
use futures::StreamExt;

use crate::cards::Fields;
use crate::error::ApiError;

/// Multipart field carrying the uploaded overlay.
pub const IMAGE_FIELD: &str = "image";

#[derive(Debug, Default)]
pub struct FormData {
    pub fields: Fields,
    pub image: Option<Vec<u8>>,
}

/// Read the whole form, refusing bodies larger than `limit` bytes.
pub async fn read_form(req: &HttpRequest, payload: web::Payload, limit: usize) -> Result<FormData, ApiError> {
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false);

    let mut form = if is_multipart {
        read_multipart(Multipart::new(req.headers(), payload), limit).await?
    } else {
        let body = read_body(payload, limit).await?;
        FormData {
            fields: parse_urlencoded(&body)?,
            image: None,
        }
    };

    // Query parameters fill in anything the body did not set.
    let query: HashMap<String, String> =
        serde_urlencoded::from_str(req.query_string()).map_err(|e| ApiError::BadForm(e.to_string()))?;
    for (name, value) in query {
        if form.fields.get(&name).is_empty() {
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

async fn read_body(mut payload: web::Payload, limit: usize) -> Result<web::BytesMut, ApiError> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| ApiError::BadForm(e.to_string()))?;
        if body.len() + chunk.len() > limit {
            return Err(ApiError::PayloadTooLarge);
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

async fn read_multipart(mut multipart: Multipart, limit: usize) -> Result<FormData, ApiError> {
    let mut form = FormData::default();
    let mut total = 0usize;

    while let Some(item) = multipart.next().await {
        let mut field = item.map_err(|e| ApiError::BadForm(e.to_string()))?;
        let disposition = field.content_disposition();
        let name = disposition.get_name().unwrap_or_default().to_string();
        let is_file = disposition.get_filename().is_some();

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| ApiError::BadForm(e.to_string()))?;
            total += chunk.len();
            if total > limit {
                return Err(ApiError::PayloadTooLarge);
            }
            data.extend_from_slice(&chunk);
        }

        if name == IMAGE_FIELD && is_file {
            // A file input left empty still posts a part with no bytes.
            if !data.is_empty() {
                form.image = Some(data);
            }
        } else if !name.is_empty() {
            let value = String::from_utf8(data).map_err(|_| ApiError::BadForm(format!("field {name} is not UTF-8")))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

fn parse_urlencoded(body: &[u8]) -> Result<Fields, ApiError> {
    let map: HashMap<String, String> =
        serde_urlencoded::from_bytes(body).map_err(|e| ApiError::BadForm(e.to_string()))?;
    Ok(Fields::new(map))
}
