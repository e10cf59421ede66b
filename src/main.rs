mod api;
mod app;
mod backend;
mod config;
mod error;
mod event;
mod session;
mod theme;
mod ui;

use anyhow::Context;
use api::ApiClient;
use app::HelixApp;
use backend::HelixClient;
use clap::Parser;
use config::Config;
use eframe::egui;
use std::sync::mpsc;
use theme::Theme;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn log_filter(directives: &str) -> anyhow::Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .with_context(|| format!("invalid log filter `{directives}`"))
}

fn init_tracing(directives: &str) -> anyhow::Result<()> {
    let filter = log_filter(directives)?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(&config.log_filter)?;

    let (tx, rx) = mpsc::channel();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("helix-runtime")
        .build()
        .context("failed to build tokio runtime")?;

    let api = ApiClient::new(&config.api_base_url, config.request_timeout())
        .context("failed to build HTTP client")?;
    let client = HelixClient::new(api, tx, runtime.handle().clone());
    let _runtime = runtime;

    info!(base_url = %config.api_base_url, "starting helix");

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([960.0, 600.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Helix",
        native_options,
        Box::new(move |creation_context| {
            let theme = Theme::default();
            theme.apply_visuals(&creation_context.egui_ctx);
            client.attach_repaint(creation_context.egui_ctx.clone());
            Ok(Box::new(HelixApp::new(rx, client, theme)))
        }),
    )
    .map_err(|err| anyhow::anyhow!("ui exited with an error: {err}"))?;

    Ok(())
}
