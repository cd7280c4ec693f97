use std::io::Read;

use anyhow::Result;
use axum::http::HeaderMap;
use flate2::read::GzDecoder;

use backend_domain::{IntakeEnvelope, ParcelIntake, RuntimeConfig};

pub fn authorize(config: &RuntimeConfig, headers: &HeaderMap) -> bool {
    if let Some(api_token) = &config.api_token {
        return extract_bearer(headers)
            .map(|v| v == *api_token)
            .unwrap_or(false);
    }
    true
}

/// Intake bodies arrive as an envelope, a bare array or a single parcel,
/// optionally gzipped.
pub fn parse_intake(headers: &HeaderMap, body: &[u8]) -> Result<IntakeEnvelope> {
    let content = maybe_gunzip(headers, body)?;
    if let Ok(envelope) = serde_json::from_str::<IntakeEnvelope>(&content) {
        if !envelope.parcels.is_empty() {
            return Ok(envelope);
        }
    }
    if let Ok(parcels) = serde_json::from_str::<Vec<ParcelIntake>>(&content) {
        return Ok(IntakeEnvelope { parcels });
    }
    let single: ParcelIntake = serde_json::from_str(&content)?;
    Ok(IntakeEnvelope {
        parcels: vec![single],
    })
}

fn maybe_gunzip(headers: &HeaderMap, body: &[u8]) -> Result<String> {
    if let Some(encoding) = headers.get("Content-Encoding") {
        if encoding.to_str().unwrap_or("") == "gzip" {
            let mut decoder = GzDecoder::new(body);
            let mut out = String::new();
            decoder.read_to_string(&mut out)?;
            return Ok(out);
        }
    }
    Ok(String::from_utf8(body.to_vec())?)
}

fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("Authorization")?.to_str().ok()?.trim();
    let prefix = "Bearer ";
    if !value.starts_with(prefix) {
        return None;
    }
    let token = value[prefix.len()..].trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE: &str = r#"{
        "tracking_number": "BRT-1",
        "sender": {"name": "a", "phone": "1", "address": "x"},
        "receiver": {"name": "b", "phone": "2", "address": "y"},
        "weight_kg": "1.5",
        "station_id": "ST-01"
    }"#;

    #[test]
    fn single_parcel_becomes_an_envelope() {
        let envelope = parse_intake(&HeaderMap::new(), SINGLE.as_bytes()).expect("parse");
        assert_eq!(envelope.parcels.len(), 1);
        assert_eq!(envelope.parcels[0].tracking_number, "BRT-1");
    }

    #[test]
    fn bare_array_is_accepted() {
        let body = format!("[{}]", SINGLE);
        let envelope = parse_intake(&HeaderMap::new(), body.as_bytes()).expect("parse");
        assert_eq!(envelope.parcels.len(), 1);
    }

    #[test]
    fn envelope_form_is_accepted() {
        let body = format!(r#"{{"parcels": [{}]}}"#, SINGLE);
        let envelope = parse_intake(&HeaderMap::new(), body.as_bytes()).expect("parse");
        assert_eq!(envelope.parcels.len(), 1);
    }

    #[test]
    fn gzip_bodies_are_inflated() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(SINGLE.as_bytes()).expect("compress");
        let compressed = encoder.finish().expect("finish");

        let mut headers = HeaderMap::new();
        headers.insert("Content-Encoding", "gzip".parse().expect("header"));
        let envelope = parse_intake(&headers, &compressed).expect("parse");
        assert_eq!(envelope.parcels.len(), 1);
    }

    #[test]
    fn missing_bearer_fails_when_token_configured() {
        let mut config = RuntimeConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            api_token: Some("secret".to_string()),
            data_path: String::new(),
            stations_path: String::new(),
            default_currency: Default::default(),
            scan_dedup_window_seconds: 10,
            stale_retry_attempts: 3,
            stale_retry_delay_ms: 25,
            pod_webhook_url: None,
            pod_webhook_template: None,
            max_body_bytes: 1024,
            request_timeout_seconds: 5,
        };
        assert!(!authorize(&config, &HeaderMap::new()));

        let mut headers = HeaderMap::new();
        headers.insert("Authorization", "Bearer secret".parse().expect("header"));
        assert!(authorize(&config, &headers));

        config.api_token = None;
        assert!(authorize(&config, &HeaderMap::new()));
    }
}
