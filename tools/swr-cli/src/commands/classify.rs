//! Classify caching values.

use anyhow::Result;
use swr::swr_cache::{CachingValues, Verdict};

use super::ClassifyArgs;
use crate::context::Context;
use crate::output::format_duration;

/// Run the classify command.
pub async fn run(args: ClassifyArgs, ctx: &Context) -> Result<()> {
    let mut values = CachingValues::new(args.age, args.max_age);
    if let Some(swr) = args.swr {
        values = values.with_swr(swr);
    }
    if let Some(sie) = args.sie {
        values = values.with_sie(sie);
    }

    print_verdict(&values, ctx);
    Ok(())
}

/// Print caching values and their verdict.
pub fn print_verdict(values: &CachingValues, ctx: &Context) {
    let verdict = values.verdict();

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({
            "values": values,
            "verdict": verdict,
        }));
        return;
    }

    ctx.output.header("Caching values");
    ctx.output.kv("age", &format_duration(values.age));
    ctx.output.kv("max-age", &format_duration(values.max_age));
    if let Some(swr) = values.swr {
        ctx.output.kv("stale-while-revalidate", &format_duration(swr));
    }
    if let Some(sie) = values.sie {
        ctx.output.kv("stale-if-error", &format_duration(sie));
    }

    ctx.output.header("Verdict");
    ctx.output.kv("verdict", describe(&verdict));
    ctx.output.kv("serve from cache", &verdict.is_fresh().to_string());
    ctx.output.kv("revalidate in background", &verdict.should_revalidate().to_string());
    ctx.output.kv("mask origin errors", &verdict.should_override_error().to_string());
}

fn describe(verdict: &Verdict) -> &'static str {
    match verdict {
        Verdict::Absent => "absent",
        Verdict::Fresh => "fresh",
        Verdict::Stale {
            revalidate: true,
            override_error: true,
        } => "stale (revalidate, override errors)",
        Verdict::Stale {
            revalidate: true, ..
        } => "stale (revalidate)",
        Verdict::Stale {
            override_error: true,
            ..
        } => "stale (override errors)",
        Verdict::Stale { .. } => "expired",
    }
}
