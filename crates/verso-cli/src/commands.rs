use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use verso_ledger::SiteJournal;
use verso_server::{ServerConfig, VersoServer};
use verso_types::SiteId;

use crate::cli::{Cli, Command, ConfigAction, HistoryArgs, OutputFormat, ServeArgs};

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::Sites(args) => cmd_sites(&args.config, cli.format).await,
        Command::History(args) => cmd_history(args, cli.format).await,
        Command::Config(args) => match args.action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Check(args) => cmd_config_check(&args.config),
        },
    }
}

fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
    ServerConfig::load(path).with_context(|| format!("loading {}", path.display()))
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = load_config(&args.config.config)?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if config.state_dir.is_none() {
        println!(
            "{} no state_dir configured; site history will not survive a restart",
            "warning:".yellow().bold()
        );
    }
    println!("verso server on {}", config.bind_addr.to_string().bold());
    VersoServer::new(config).serve().await?;
    Ok(())
}

async fn cmd_sites(config_path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let state_dir = config
        .state_dir
        .context("no state_dir configured; sites are not persisted")?;
    let records = SiteJournal::open(&state_dir).await?.load_all().await?;

    if format == OutputFormat::Json {
        let ids: Vec<&SiteId> = records.iter().map(|r| &r.id).collect();
        println!("{}", serde_json::to_string_pretty(&ids)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No sites.");
        return Ok(());
    }
    for record in &records {
        println!(
            "{}  {} versions (keep {})  {}",
            record.id.as_str().bold(),
            record.saved_version_count(),
            record.keep_count(),
            record.activity_summary().dimmed()
        );
    }
    Ok(())
}

async fn cmd_history(args: HistoryArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config(&args.config.config)?;
    let site = SiteId::new(args.site)?;
    let state = VersoServer::new(config).build_state().await?;
    let ctx = state.history.context_for(site);
    let summary = state.history.history(&ctx).await?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "{} ({} access): {} of {} versions kept, {}",
        summary.site.as_str().bold(),
        summary.access,
        summary.saved_version_count,
        summary.keep_count,
        summary.activity
    );
    for version in &summary.versions {
        let marker = if version.blob_id == summary.current_blob_id {
            "*".green().bold()
        } else {
            " ".normal()
        };
        println!(
            "{} {}  {}  {:>8} bytes  {}",
            marker,
            version.blob_id.to_string().yellow(),
            version.created_at.format("%Y-%m-%d %H:%M:%S"),
            version.size,
            version.kind.to_string().cyan()
        );
    }
    Ok(())
}

fn cmd_config_init() -> anyhow::Result<()> {
    print!("{}", ServerConfig::default().to_toml()?);
    Ok(())
}

fn cmd_config_check(path: &Path) -> anyhow::Result<()> {
    let config = load_config(path)?;
    println!("{} {} is valid", "✓".green().bold(), path.display());
    println!("  bind: {}", config.bind_addr);
    match &config.state_dir {
        Some(dir) => println!("  state: {}", dir.display()),
        None => println!("  state: {}", "memory only".yellow()),
    }
    println!("  store: {:?} (timeout {} ms)", config.store.backend, config.store.timeout_ms);
    println!("  default keep-count: {}", config.history.default_keep_count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verso.toml");
        std::fs::write(&path, ServerConfig::default().to_toml().unwrap()).unwrap();
        cmd_config_check(&path).unwrap();
    }

    #[test]
    fn missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(cmd_config_check(&dir.path().join("absent.toml")).is_err());
    }

    #[tokio::test]
    async fn sites_requires_state_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verso.toml");
        std::fs::write(&path, "").unwrap();
        let err = cmd_sites(&path, OutputFormat::Text).await.unwrap_err();
        assert!(err.to_string().contains("state_dir"));
    }

    #[tokio::test]
    async fn sites_lists_journaled_sites() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = dir.path().join("sites");
        let path = dir.path().join("verso.toml");
        std::fs::write(&path, format!("state_dir = {:?}\n", state_dir.display().to_string()))
            .unwrap();

        let config = ServerConfig::load(&path).unwrap();
        let state = VersoServer::new(config).build_state().await.unwrap();
        state
            .history
            .create_site(SiteId::new("notes").unwrap(), None, "<p>hi</p>".into())
            .await
            .unwrap();

        cmd_sites(&path, OutputFormat::Json).await.unwrap();
    }
}
