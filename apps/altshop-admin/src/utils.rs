use axum::http::HeaderMap;
use chrono::{NaiveDate, NaiveDateTime};

/// Backup sizes: always two decimals.
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{:.2} B", b)
    } else if b < KB * KB {
        format!("{:.2} KB", b / KB)
    } else if b < KB * KB * KB {
        format!("{:.2} MB", b / (KB * KB))
    } else {
        format!("{:.2} GB", b / (KB * KB * KB))
    }
}

/// Traffic counters: up to two decimals with trailing zeros dropped ("1.5 GB", "2 MB").
pub fn format_traffic(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

/// Client address behind the reverse proxy: first `X-Forwarded-For` hop, then `X-Real-IP`.
pub fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let trimmed = first.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Accepts `YYYY-MM-DD` (midnight) or an ISO timestamp with or without offset.
pub fn parse_date_param(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn size_keeps_two_decimals() {
        assert_eq!(format_size(512), "512.00 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn traffic_trims_trailing_zeros() {
        assert_eq!(format_traffic(0), "0 B");
        assert_eq!(format_traffic(1000), "1000 B");
        assert_eq!(format_traffic(1024), "1 KB");
        assert_eq!(format_traffic(1536), "1.5 KB");
        assert_eq!(format_traffic(1_288_490_189), "1.2 GB");
        assert_eq!(format_traffic(2 * 1024u64.pow(4)), "2 TB");
        assert_eq!(format_traffic(3 * 1024u64.pow(5)), "3072 TB");
    }

    #[test]
    fn client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(extract_client_ip(&headers).as_deref(), Some("10.0.0.2"));

        headers.insert("x-forwarded-for", HeaderValue::from_static(" 1.2.3.4, 10.0.0.1"));
        assert_eq!(extract_client_ip(&headers).as_deref(), Some("1.2.3.4"));

        assert_eq!(extract_client_ip(&HeaderMap::new()), None);
    }

    #[test]
    fn date_params() {
        let day = parse_date_param("2024-03-01").unwrap();
        assert_eq!(day.to_string(), "2024-03-01 00:00:00");
        let ts = parse_date_param("2024-03-01T10:00:00Z").unwrap();
        assert_eq!(ts.to_string(), "2024-03-01 10:00:00");
        assert!(parse_date_param("yesterday").is_none());
    }
}
