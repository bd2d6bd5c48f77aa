//! Configuration management commands.

use std::fs;

use anyhow::{bail, Context as _, Result};
use dialoguer::Confirm;

use super::{ConfigArgs, ConfigCommand};
use crate::config::{generate_default_config, CliConfig, CONFIG_FILE_NAMES};
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx).await,
        ConfigCommand::Init { force } => init_config(force, ctx).await,
        ConfigCommand::Validate => validate_config(ctx).await,
    }
}

async fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(defaults)"),
    }

    ctx.output.info("");
    ctx.output.info("[swr]");
    ctx.output.kv(
        "serve_cached_not_modified",
        &ctx.config.swr.serve_cached_not_modified.to_string(),
    );
    ctx.output.kv("cache_name", &ctx.config.swr.cache_name);
    ctx.output
        .kv("explain_headers", &ctx.config.swr.explain_headers.to_string());

    ctx.output.info("");
    ctx.output.info("[logging]");
    ctx.output
        .kv("level", ctx.config.logging.level.as_filter());
    ctx.output.kv(
        "format",
        &format!("{:?}", ctx.config.logging.format).to_lowercase(),
    );

    Ok(())
}

async fn init_config(force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.cwd.join(CONFIG_FILE_NAMES[0]);

    if config_path.exists() && !force {
        if ctx.output.is_json() {
            bail!(
                "Config file already exists: {}. Use --force to overwrite.",
                config_path.display()
            );
        }

        let confirmed = Confirm::new()
            .with_prompt(format!("{} exists. Overwrite?", config_path.display()))
            .default(false)
            .interact()?;

        if !confirmed {
            ctx.output.warn("Config init cancelled");
            return Ok(());
        }
    }

    fs::write(&config_path, generate_default_config())
        .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

    ctx.output
        .success(&format!("Created: {}", config_path.display()));

    Ok(())
}

async fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");

    let Some(path) = &ctx.config_path else {
        bail!("No config file found. Run `swr config init` to create one.");
    };

    // Re-read so unknown keys are reported too.
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let path_str = path.to_string_lossy();
    CliConfig::parse(&path_str, &content)?;

    let (errors, warnings) = check_config(&ctx.config, &content, &path_str);

    if errors.is_empty() && warnings.is_empty() {
        ctx.output.success("Configuration is valid");
        return Ok(());
    }

    for error in &errors {
        ctx.output.error(&format!("Error: {}", error));
    }

    for warning in &warnings {
        ctx.output.warn(&format!("Warning: {}", warning));
    }

    if !errors.is_empty() {
        bail!("Configuration has {} error(s)", errors.len());
    }

    ctx.output.success("Configuration is valid (with warnings)");

    Ok(())
}

/// Collect errors and warnings for a loaded configuration.
fn check_config(config: &CliConfig, content: &str, path: &str) -> (Vec<String>, Vec<String>) {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    if config.swr.cache_name.trim().is_empty() {
        errors.push("swr.cache_name must not be empty".to_string());
    }
    if config.swr.cache_name.contains('|') {
        warnings.push("swr.cache_name contains '|', the cache key separator".to_string());
    }

    for key in unknown_tables(content, path) {
        warnings.push(format!("unknown table '{}' is ignored", key));
    }

    (errors, warnings)
}

fn unknown_tables(content: &str, path: &str) -> Vec<String> {
    let keys: Vec<String> = if path.ends_with(".json") {
        match serde_json::from_str::<serde_json::Value>(content) {
            Ok(serde_json::Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    } else {
        match content.parse::<toml::Table>() {
            Ok(table) => table.keys().cloned().collect(),
            Err(_) => Vec::new(),
        }
    };

    keys.into_iter()
        .filter(|k| k != "swr" && k != "logging")
        .collect()
}
