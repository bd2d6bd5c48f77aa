//! Show what a client sees for a stored entry.

use anyhow::{anyhow, Context as _, Result};
use http::header::{HeaderMap, HeaderName, HeaderValue};
use swr::swr_cache::{decode_for_client, extract_caching_values};

use super::classify::print_verdict;
use super::DecodeArgs;
use crate::context::Context;

/// Run the decode command.
pub async fn run(args: DecodeArgs, ctx: &Context) -> Result<()> {
    let stored = parse_headers(&args.headers)?;
    let client = decode_for_client(&stored).context("Failed to decode headers")?;

    if ctx.output.is_json() {
        let headers: serde_json::Map<String, serde_json::Value> = client
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    serde_json::Value::String(value.to_str().unwrap_or_default().to_string()),
                )
            })
            .collect();
        ctx.output.json(&serde_json::json!({
            "client": headers,
            "values": extract_caching_values(&stored),
        }));
        return Ok(());
    }

    ctx.output.header("Client headers");
    for (name, value) in &client {
        ctx.output.kv(name.as_str(), value.to_str().unwrap_or("<binary>"));
    }

    match extract_caching_values(&stored) {
        Some(values) => print_verdict(&values, ctx),
        None => ctx
            .output
            .warn("No age or max-age: the entry would be treated as absent"),
    }

    Ok(())
}

/// Parse `name: value` pairs into a header map.
fn parse_headers(raw: &[String]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for line in raw {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| anyhow!("Expected `name: value`, got: {}", line))?;
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .with_context(|| format!("Invalid header name: {}", name))?;
        let value = HeaderValue::from_str(value.trim())
            .with_context(|| format!("Invalid header value: {}", value))?;
        headers.append(name, value);
    }
    Ok(headers)
}
