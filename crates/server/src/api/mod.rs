use serde_json::Value;
use shared::frame::{FrameMetadata, LEGACY_FRAME_META_NAME, MINIAPP_META_NAME};
use thiserror::Error;
use url::Url;

pub const APP_NAME: &str = "TipJar";

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("failed to read request body: {0}")]
    Read(#[from] axum::Error),
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to encode page metadata: {0}")]
    Metadata(String),
}

pub fn action_route() -> &'static str {
    shared::frame::ACTION_PATH
}

fn is_json_content_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|value| {
            let essence = value.split(';').next().unwrap_or_default().trim();
            essence.eq_ignore_ascii_case("application/json") || essence.ends_with("+json")
        })
        .unwrap_or(false)
}

/// Turns a raw action body into the value echoed back to the caller.
///
/// An empty body is `null`. A body that parses as JSON is returned as that value
/// regardless of content type. Non-JSON bodies are kept as a string unless the
/// caller declared JSON, which makes them an error.
pub fn decode_payload(content_type: Option<&str>, body: &[u8]) -> Result<Value, PayloadError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(value) => Ok(value),
        Err(err) if is_json_content_type(content_type) => Err(PayloadError::Json(err)),
        Err(_) => Ok(Value::String(String::from_utf8_lossy(body).into_owned())),
    }
}

pub fn render_index_page(site_url: &Url, contract_address: &str) -> Result<String, PayloadError> {
    let metadata = FrameMetadata::for_site(site_url, APP_NAME);
    let miniapp = serde_json::to_string(&metadata.miniapp)
        .map_err(|e| PayloadError::Metadata(e.to_string()))?;
    let legacy = serde_json::to_string(&metadata.legacy)
        .map_err(|e| PayloadError::Metadata(e.to_string()))?;

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{APP_NAME}</title>
<meta name="{MINIAPP_META_NAME}" content="{miniapp}">
<meta name="{LEGACY_FRAME_META_NAME}" content="{legacy}">
</head>
<body style="padding: 24px; font-family: Inter, Arial, sans-serif; max-width: 720px; margin: 0 auto">
<h1 style="margin-bottom: 6px">{APP_NAME}</h1>
<p style="color: #555; margin-top: 0">Contract: <code>{contract}</code></p>
<footer style="margin-top: 28px; color: #888; font-size: 13px">Built as a Farcaster Frame. Contract verified on Base.</footer>
</body>
</html>
"#,
        miniapp = escape_html(&miniapp),
        legacy = escape_html(&legacy),
        contract = escape_html(contract_address),
    ))
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
