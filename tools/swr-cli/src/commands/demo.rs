//! Replay requests through the middleware against a demo origin.
//!
//! The demo origin echoes the request path and its current time and sends
//! whatever caching directives the request asks for in the
//! `x-workers-swr-demo-request-values` header. Time is a manual clock, so the
//! stale windows can be stepped through without waiting.

use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::header::{AGE, CACHE_CONTROL, CONTENT_TYPE};
use http::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use swr::prelude::*;

use super::DemoArgs;
use crate::context::Context;
use crate::output::status_badge;

/// Request header carrying the directives the demo origin should send.
pub const DEMO_VALUES_HEADER: &str = "x-workers-swr-demo-request-values";

/// Values requested from the demo origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoValues {
    pub max_age: u64,
    pub swr: u64,
    pub sie: u64,
    pub error: bool,
}

impl DemoValues {
    /// Read values from the demo header. Missing or unparsable values are 0.
    pub fn from_header(raw: Option<&str>) -> Self {
        let json: serde_json::Value = raw
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default();

        let int = |key: &str| match &json[key] {
            serde_json::Value::Number(n) => n.as_u64().unwrap_or(0),
            serde_json::Value::String(s) => leading_int(s),
            _ => 0,
        };
        let error = match &json["error"] {
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::Null => false,
            serde_json::Value::String(s) => !s.is_empty(),
            serde_json::Value::Number(n) => n.as_f64() != Some(0.0),
            _ => true,
        };

        Self {
            max_age: int("maxAge"),
            swr: int("swr"),
            sie: int("sie"),
            error,
        }
    }

    fn cache_control(&self) -> String {
        format!(
            "max-age={}, stale-while-revalidate={}, stale-if-error={}",
            self.max_age, self.swr, self.sie
        )
    }
}

fn leading_int(s: &str) -> u64 {
    let s = s.trim();
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s[..end].parse().unwrap_or(0)
}

/// Origin echoing path and time with caller-chosen directives.
pub struct DemoOrigin {
    clock: ManualClock,
    started: DateTime<Utc>,
}

impl DemoOrigin {
    /// Create a demo origin whose time is `started` plus the clock.
    pub fn new(clock: ManualClock, started: DateTime<Utc>) -> Self {
        Self { clock, started }
    }

    fn now(&self) -> DateTime<Utc> {
        i64::try_from(self.clock.now_secs())
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|offset| self.started.checked_add_signed(offset))
            .unwrap_or(self.started)
    }
}

#[async_trait]
impl Origin for DemoOrigin {
    async fn fetch(&self, request: Request<Body>) -> OriginResult {
        let values = DemoValues::from_header(
            request
                .headers()
                .get(DEMO_VALUES_HEADER)
                .and_then(|v| v.to_str().ok()),
        );

        let mut body = format!(
            "Path: {}\nCurrent Time: {}\n",
            request.uri().path(),
            self.now().to_rfc3339()
        );
        if values.error {
            body.push_str("Internal Server Error! (as requested)\n");
        } else {
            body.push_str(&format!(
                "requested max-age: {}\nrequested stale-while-revalidate: {}\nrequested stale-if-error: {}\n",
                values.max_age, values.swr, values.sie
            ));
        }

        let status = if values.error {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::OK
        };

        Response::builder()
            .status(status)
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .header(CACHE_CONTROL, values.cache_control())
            .body(body.into_bytes())
            .map_err(|e| OriginError::Other(e.into()))
    }
}

/// One request of a demo run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoStep {
    /// Clock time of the request.
    pub at: u64,
    /// How the gate answered.
    pub cache: String,
    /// HTTP status returned.
    pub status: u16,
    /// Age of the served entry, if it came from cache.
    pub age: Option<String>,
    /// Cache-Control the client saw.
    pub cache_control: Option<String>,
    /// Time the origin generated the body.
    pub generated: Option<String>,
}

/// Result of a demo run.
#[derive(Debug, Clone, Serialize)]
pub struct DemoReport {
    pub steps: Vec<DemoStep>,
    pub metrics: MetricsSnapshot,
}

/// Run the demo command.
pub async fn run(args: DemoArgs, ctx: &Context) -> Result<()> {
    let pb = ctx.output.progress(args.at.len() as u64, "sending requests");
    let report = run_demo(&args, ctx.config.swr.clone(), |_| pb.inc(1)).await?;
    pb.finish_and_clear();

    if ctx.output.is_json() {
        ctx.output.json(&report);
        return Ok(());
    }

    ctx.output.header("Demo");
    ctx.output.kv(
        "origin sends",
        &DemoValues {
            max_age: args.max_age,
            swr: args.swr,
            sie: args.sie,
            error: false,
        }
        .cache_control(),
    );
    if !args.fail_at.is_empty() {
        let fail_at: Vec<String> = args.fail_at.iter().map(u64::to_string).collect();
        ctx.output.kv("origin fails at", &fail_at.join(", "));
    }

    ctx.output.header("Requests");
    let widths = [4, 14, 6, 4, 52];
    ctx.output
        .table_row(&["at", "cache", "status", "age", "cache-control"], &widths);
    for step in &report.steps {
        let at = step.at.to_string();
        let badge = status_badge(&step.cache);
        let status = step.status.to_string();
        ctx.output.table_row(
            &[
                at.as_str(),
                badge.as_str(),
                status.as_str(),
                step.age.as_deref().unwrap_or("-"),
                step.cache_control.as_deref().unwrap_or("-"),
            ],
            &widths,
        );
        if let Some(generated) = &step.generated {
            ctx.output.debug(&format!("body generated at {}", generated));
        }
    }

    ctx.output.header("Metrics");
    for (status, count) in &report.metrics.responses {
        ctx.output.kv(status, &count.to_string());
    }
    ctx.output.kv(
        "revalidations",
        &format!(
            "{} scheduled, {} completed, {} failed",
            report.metrics.revalidations_scheduled,
            report.metrics.revalidations_completed,
            report.metrics.revalidations_failed
        ),
    );

    Ok(())
}

/// Send the scripted requests and collect what the gate returned.
///
/// Background revalidations are drained after every request so each step
/// sees the effect of the previous one.
pub async fn run_demo(
    args: &DemoArgs,
    config: SwrConfig,
    mut on_step: impl FnMut(&DemoStep),
) -> Result<DemoReport> {
    if args.at.windows(2).any(|w| w[1] < w[0]) {
        bail!("Request times must not decrease: {:?}", args.at);
    }

    let clock = ManualClock::new();
    let store = Arc::new(InMemoryStore::with_clock(Arc::new(clock.clone())));
    let origin = DemoOrigin::new(clock.clone(), Utc::now());
    let swr = Swr::new(
        Arc::new(origin),
        store,
        config.with_explain_headers(true),
    );

    let mut steps = Vec::with_capacity(args.at.len());
    for &at in &args.at {
        clock.set(at);

        let values = DemoValues {
            max_age: args.max_age,
            swr: args.swr,
            sie: args.sie,
            error: args.fail_at.contains(&at),
        };
        let request = Request::get(args.path.as_str())
            .header(DEMO_VALUES_HEADER, serde_json::to_string(&values)?)
            .body(Vec::new())
            .with_context(|| format!("Invalid request path: {}", args.path))?;

        let step = match swr.handle(request).await {
            Ok(response) => step_from_response(at, &response),
            Err(err) => bail!("Origin failed at {}: {}", at, err),
        };
        swr.tasks().drain().await;

        tracing::debug!(at, cache = %step.cache, "demo step");
        on_step(&step);
        steps.push(step);
    }

    Ok(DemoReport {
        steps,
        metrics: swr.metrics().snapshot(),
    })
}

fn step_from_response(at: u64, response: &Response<Body>) -> DemoStep {
    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let generated = String::from_utf8_lossy(response.body())
        .lines()
        .find_map(|line| line.strip_prefix("Current Time: "))
        .map(str::to_string);

    DemoStep {
        at,
        cache: header(header_names::X_CACHE_STATUS).unwrap_or_default(),
        status: response.status().as_u16(),
        age: header(AGE.as_str()),
        cache_control: header(CACHE_CONTROL.as_str()),
        generated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(at: &[u64], max_age: u64, swr: u64, sie: u64, fail_at: &[u64]) -> DemoArgs {
        DemoArgs {
            at: at.to_vec(),
            max_age,
            swr,
            sie,
            fail_at: fail_at.to_vec(),
            path: "/demo".to_string(),
        }
    }

    fn statuses(report: &DemoReport) -> Vec<&str> {
        report.steps.iter().map(|s| s.cache.as_str()).collect()
    }

    #[test]
    fn test_demo_values_from_header() {
        let values =
            DemoValues::from_header(Some(r#"{"maxAge": 10, "swr": "5", "sie": "x", "error": true}"#));

        assert_eq!(
            values,
            DemoValues {
                max_age: 10,
                swr: 5,
                sie: 0,
                error: true
            }
        );
    }

    #[test]
    fn test_demo_values_default_to_zero() {
        assert_eq!(DemoValues::from_header(None), DemoValues::default());
        assert_eq!(DemoValues::from_header(Some("not json")), DemoValues::default());
    }

    #[test]
    fn test_demo_values_header_round_trip() {
        let values = DemoValues {
            max_age: 1,
            swr: 5,
            sie: 0,
            error: false,
        };
        let json = serde_json::to_string(&values).unwrap();

        assert_eq!(DemoValues::from_header(Some(&json)), values);
    }

    #[tokio::test]
    async fn test_demo_origin_response() {
        let origin = DemoOrigin::new(ManualClock::new(), Utc::now());
        let request = Request::get("/hello")
            .header(DEMO_VALUES_HEADER, r#"{"maxAge": 2, "error": true}"#)
            .body(Vec::new())
            .unwrap();

        let response = origin.fetch(request).await.unwrap();
        let body = String::from_utf8(response.body().clone()).unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers()["cache-control"],
            "max-age=2, stale-while-revalidate=0, stale-if-error=0"
        );
        assert!(body.contains("Path: /hello"));
        assert!(body.contains("as requested"));
    }

    #[tokio::test]
    async fn test_run_demo_default_scenario() {
        let report = run_demo(&args(&[0, 0, 3, 13], 1, 5, 0, &[]), SwrConfig::default(), |_| {})
            .await
            .unwrap();

        assert_eq!(statuses(&report), ["MISS", "HIT", "STALE", "MISS"]);
        assert_eq!(report.steps[2].age.as_deref(), Some("3"));
        assert_eq!(
            report.steps[1].cache_control.as_deref(),
            Some("max-age=1, stale-while-revalidate=5")
        );
        assert_eq!(report.metrics.revalidations_scheduled, 1);
    }

    #[tokio::test]
    async fn test_run_demo_stale_if_error() {
        let report = run_demo(&args(&[0, 5], 1, 0, 10, &[5]), SwrConfig::default(), |_| {})
            .await
            .unwrap();

        assert_eq!(statuses(&report), ["MISS", "STALE-IF-ERROR"]);
        assert_eq!(report.steps[1].status, 200);
        assert_eq!(report.steps[0].generated, report.steps[1].generated);
    }

    #[tokio::test]
    async fn test_run_demo_rejects_decreasing_times() {
        let result = run_demo(&args(&[5, 1], 1, 0, 0, &[]), SwrConfig::default(), |_| {}).await;

        assert!(result.is_err());
    }
}
