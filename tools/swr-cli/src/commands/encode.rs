//! Show how a Cache-Control value is stored.

use anyhow::Result;
use swr::swr_cache::encode_for_store;

use super::EncodeArgs;
use crate::context::Context;

/// Run the encode command.
pub async fn run(args: EncodeArgs, ctx: &Context) -> Result<()> {
    let encoded = encode_for_store(Some(&args.cache_control));

    if ctx.output.is_json() {
        let headers: Option<serde_json::Map<String, serde_json::Value>> = encoded.map(|h| {
            h.to_pairs()
                .into_iter()
                .map(|(k, v)| (k, serde_json::Value::String(v)))
                .collect()
        });
        ctx.output.json(&serde_json::json!({
            "cache_control": args.cache_control,
            "stored": headers,
        }));
        return Ok(());
    }

    let Some(encoded) = encoded else {
        ctx.output.warn("No directives: the response would not be cached");
        return Ok(());
    };

    ctx.output.header("Stored headers");
    for (name, value) in encoded.to_pairs() {
        ctx.output.kv(&name, &value);
    }

    Ok(())
}
