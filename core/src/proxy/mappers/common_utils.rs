//! Helpers shared by the request and response mappers

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

static DATA_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^data:([^;]+);base64,(.+)$").expect("valid data url regex"));

/// Render inline data as `data:<mime>;base64,<data>`
pub fn to_data_url(mime_type: &str, data: &str) -> String {
    format!("data:{};base64,{}", mime_type, data)
}

/// Split a base64 data URL into `(mime_type, data)`
pub fn parse_data_url(url: &str) -> Option<(String, String)> {
    let caps = DATA_URL_RE.captures(url)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

/// Lowercase alphanumeric string of `len` random characters
pub fn random_suffix(len: usize) -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(len)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}

/// `call_<name>_<unix millis>_<random>`
pub fn generate_tool_call_id(function_name: &str) -> String {
    format!(
        "call_{}_{}_{}",
        function_name,
        chrono::Utc::now().timestamp_millis(),
        random_suffix(9)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_round_trips() {
        let url = to_data_url("image/png", "iVBORw0KGgo=");
        assert_eq!(url, "data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(
            parse_data_url(&url),
            Some(("image/png".to_string(), "iVBORw0KGgo=".to_string()))
        );
    }

    #[test]
    fn non_base64_urls_are_rejected() {
        assert_eq!(parse_data_url("https://example.com/cat.png"), None);
        assert_eq!(parse_data_url("data:image/png,raw"), None);
    }

    #[test]
    fn tool_call_ids_are_prefixed_and_distinct() {
        let a = generate_tool_call_id("read_file");
        let b = generate_tool_call_id("read_file");
        assert!(a.starts_with("call_read_file_"));
        assert_ne!(a, b);
        let suffix = a.rsplit('_').next().unwrap();
        assert_eq!(suffix.len(), 9);
        assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }
}
