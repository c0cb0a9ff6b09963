//! Doctor command - validate configuration and show status

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

use vote_herald_adapters::state::FileStateStore;

use crate::args::DoctorArgs;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    source: CheckResult,
    state: CheckResult,
    mastodon: CheckResult,
    mirror: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
    details: Option<serde_json::Value>,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self::with_status("ok", message)
    }

    fn warn(message: impl Into<String>) -> Self {
        Self::with_status("warn", message)
    }

    fn error(message: impl Into<String>) -> Self {
        Self::with_status("error", message)
    }

    fn with_status(status: &str, message: impl Into<String>) -> Self {
        Self {
            status: status.to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        source: CheckResult::error("Not checked"),
        state: CheckResult::error("Not checked"),
        mastodon: CheckResult::error("Not checked"),
        mirror: CheckResult::error("Not checked"),
        overall: "error".to_string(),
    };

    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = check_config(&c);
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {:#}", e));
            None
        }
    };

    if let Some(ref config) = config {
        report.source = check_source(config);
        let legislature = config.general.legislature.to_uppercase();
        let state_path = FileStateStore::new(&config.general.state_path).path_for(&legislature);
        report.state = check_state(&state_path).await;
        report.mastodon = check_mastodon(config);
        report.mirror = check_mirror(config);
    }

    let checks = [
        &report.config,
        &report.source,
        &report.state,
        &report.mastodon,
        &report.mirror,
    ];

    let has_error = checks.iter().any(|c| c.is_error());
    let all_ok = checks.iter().all(|c| c.is_ok());

    report.overall = if has_error {
        "error".to_string()
    } else if all_ok {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

fn check_config(config: &AppConfig) -> CheckResult {
    match config.override_cutoff() {
        Err(e) => CheckResult::error(format!("Invalid override_cutoff_date: {:#}", e)),
        // Without a cutoff the override publishes the whole backlog
        Ok(None) if config.general.override_too_many_new_votes => CheckResult::warn(
            "override_too_many_new_votes is set without override_cutoff_date, every new vote will be posted",
        ),
        Ok(_) => CheckResult::ok("Configuration loaded successfully"),
    }
}

fn check_source(config: &AppConfig) -> CheckResult {
    let feeds = config.legislature_feeds();
    let legislature = config.general.legislature.to_uppercase();

    let known: Vec<&String> = config.source.legislatures.keys().collect();
    if !feeds.contains_key(&legislature) {
        return CheckResult::error(format!("No feed configured for legislature {}", legislature))
            .with_details(serde_json::json!({ "configured": known }));
    }

    CheckResult::ok(format!("Legislature {} ({} feeds configured)", legislature, feeds.len()))
        .with_details(serde_json::json!({ "configured": known }))
}

async fn check_state(path: &Path) -> CheckResult {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return CheckResult::warn(format!(
                "No state file at {}, the first run will treat every vote as new",
                path.display()
            ));
        }
        Err(e) => {
            return CheckResult::error(format!("Cannot read {}: {}", path.display(), e));
        }
    };

    match serde_json::from_str::<vote_herald_domain::PublicationState>(&content) {
        Ok(state) => CheckResult::ok(format!("{} known votes in {}", state.len(), path.display())),
        Err(e) => CheckResult::error(format!("Corrupt state file {}: {}", path.display(), e)),
    }
}

fn check_mastodon(config: &AppConfig) -> CheckResult {
    let env_var = &config.mastodon.access_token_env;

    if env_var.is_empty() {
        return CheckResult::error("No access token env var configured");
    }

    match std::env::var(env_var) {
        Ok(val) if !val.is_empty() => CheckResult::ok(format!(
            "Instance: {}, Access token: {} (set)",
            config.mastodon.base_url, env_var
        )),
        _ if config.general.dry_run => CheckResult::ok(format!(
            "Instance: {}, Access token: {} (not set, dry-run)",
            config.mastodon.base_url, env_var
        )),
        _ => CheckResult::warn(format!(
            "Instance: {}, Access token: {} (not set)",
            config.mastodon.base_url, env_var
        )),
    }
}

fn check_mirror(config: &AppConfig) -> CheckResult {
    let mirror = &config.mirror;
    if !mirror.enabled {
        return CheckResult::ok("State mirror disabled");
    }

    if mirror.owner.trim().is_empty() || mirror.repo.trim().is_empty() {
        return CheckResult::error("State mirror enabled but owner/repo not configured");
    }

    match std::env::var(&mirror.token_env) {
        Ok(val) if !val.is_empty() => CheckResult::ok(format!(
            "Repository: {}/{}, Token: {} (set)",
            mirror.owner, mirror.repo, mirror.token_env
        )),
        _ => CheckResult::warn(format!(
            "Repository: {}/{}, Token: {} (not set)",
            mirror.owner, mirror.repo, mirror.token_env
        )),
    }
}

fn print_report(report: &DoctorReport) {
    println!("vote-herald Doctor Report");
    println!("=========================");
    println!();

    print_check("Config", &report.config);
    print_check("Source", &report.source);
    print_check("State", &report.state);
    print_check("Mastodon", &report.mastodon);
    print_check("Mirror", &report.mirror);

    println!();
    println!("{} Overall: {}", symbol(&report.overall), report.overall.to_uppercase());

    if report.overall == "ok" {
        println!();
        println!("Ready to run! Try: vote-herald run --dry-run");
    }
}

fn print_check(name: &str, result: &CheckResult) {
    println!("{} {}: {}", symbol(&result.status), name, result.message);
}

fn symbol(status: &str) -> &'static str {
    match status {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    }
}
