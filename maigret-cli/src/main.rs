//! `maigret` command line entry point.

mod actions;
mod bootstrap;
mod cli;
mod presenter;

use actions::FoundActions;
use anyhow::{Context, Result};
use bootstrap::CatalogBootstrap;
use clap::Parser;
use cli::Cli;
use maigret_browser::{CaptureSettings, ScreenshotCapture};
use maigret_core::{AppConfig, TransportConfig, Username};
use maigret_download::DownloaderRegistry;
use maigret_probe::{ProbeDispatcher, ProbeExecutor, ResultAggregator, SelfTest};
use maigret_sites::{CatalogLoader, SiteRegistry};
use presenter::{print_lines, Presenter};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

fn init_tracing(default_filter: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.default_log_filter());

    if cli.no_color {
        colored::control::set_override(false);
    }
    let presenter = Presenter::new(!cli.no_color, cli.verbose);

    let mut config = AppConfig::load_with_env().context("Failed to load configuration")?;
    if let Some(database) = &cli.database {
        config.catalog.path.clone_from(database);
    }
    config.validate().context("Invalid configuration")?;

    let transport = TransportConfig::from_app_config(&config, cli.tor, cli.screenshots_enabled());

    if cli.lists_downloaders() {
        let downloaders = DownloaderRegistry::with_defaults(
            &transport.user_agent,
            transport.request_timeout,
        )?;
        print_lines(&presenter.render_downloaders(&downloaders.names()));
        return Ok(ExitCode::SUCCESS);
    }

    let Some(registry) = load_registry(&cli, &config, &presenter).await? else {
        return Ok(ExitCode::FAILURE);
    };

    if cli.tor {
        println!(
            "{}",
            presenter.warning(&format!(
                "Routing probes through {}; this can be slow.",
                transport.proxy_address
            ))
        );
    }

    let executor = ProbeExecutor::new(&transport).context("Failed to set up HTTP transport")?;

    if cli.test {
        if cli.screenshot {
            println!(
                "{}",
                presenter.warning("Screenshots are not available in test mode; aborting.")
            );
            return Ok(ExitCode::FAILURE);
        }

        println!(
            "{}",
            presenter.info(&format!("Testing {} sites", registry.len()))
        );
        let report = SelfTest::new(executor, transport.concurrency_limit)?
            .run(&registry)
            .await;
        print_lines(&presenter.render_self_test(&report));
        return Ok(ExitCode::SUCCESS);
    }

    let usernames = cli
        .usernames
        .iter()
        .map(|name| Username::new(name.as_str()))
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid username")?;

    run_scan(&cli, &config, &transport, executor, &usernames, &registry, presenter).await?;
    Ok(ExitCode::SUCCESS)
}

/// Bootstrap, load and filter the catalog. `None` means the requested site
/// does not exist and the run should stop.
async fn load_registry(
    cli: &Cli,
    config: &AppConfig,
    presenter: &Presenter,
) -> Result<Option<SiteRegistry>> {
    let path = &config.catalog.path;
    let downloaded = CatalogBootstrap::from_config(&config.catalog)
        .ensure(path, cli.update)
        .await?;
    if downloaded {
        println!(
            "{}",
            presenter.info(&format!("Site catalog saved to {}", path.display()))
        );
    }

    let report = CatalogLoader::new(path)?.load()?;
    print_lines(&presenter.render_rejected(&report.rejected));
    info!(sites = report.registry.len(), rejected = report.rejected.len(), "site catalog loaded");

    match report.registry.select(cli.site.as_deref()) {
        Ok(registry) => Ok(Some(registry)),
        Err(e) => {
            println!("{}", presenter.warning(&e.to_string()));
            Ok(None)
        }
    }
}

async fn run_scan(
    cli: &Cli,
    config: &AppConfig,
    transport: &TransportConfig,
    executor: ProbeExecutor,
    usernames: &[Username],
    registry: &SiteRegistry,
    presenter: Presenter,
) -> Result<()> {
    let screenshots = if cli.screenshots_enabled() {
        let settings = CaptureSettings::from_config(&config.screenshot, &transport.user_agent);
        Some(Arc::new(
            ScreenshotCapture::launch(settings)
                .await
                .context("Failed to start headless browser")?,
        ))
    } else {
        None
    };

    let mut actions = FoundActions::new();
    if let Some(capture) = &screenshots {
        actions = actions.with_screenshots(Arc::clone(capture));
    }
    if cli.download {
        let downloaders = DownloaderRegistry::with_defaults(
            &transport.user_agent,
            transport.request_timeout,
        )?;
        actions = actions.with_downloads(Arc::new(downloaders), config.download.dir.clone());
    }

    let mut dispatcher = ProbeDispatcher::new(executor, transport.concurrency_limit)?;
    if !actions.is_empty() {
        dispatcher = dispatcher.with_found_handler(Arc::new(actions));
    }

    let (aggregator, events) = ResultAggregator::with_events();
    let aggregator = Arc::new(aggregator);
    let printer = tokio::spawn(presenter.drain(events));

    let started = Instant::now();
    let results = dispatcher
        .run_batch(usernames, registry, Arc::clone(&aggregator))
        .await;
    let counters = aggregator.snapshot();
    debug!(results = results.len(), "batch complete");

    // The printer exits once the last event sender is dropped.
    drop(dispatcher);
    drop(aggregator);
    printer.await.context("Result printer failed")?;

    print_lines(&presenter.render_summary(counters, started.elapsed()));

    if let Some(capture) = screenshots {
        match Arc::try_unwrap(capture) {
            Ok(capture) => capture.shutdown().await,
            Err(_) => warn!("browser still in use at exit"),
        }
    }

    Ok(())
}
