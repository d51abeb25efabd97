mod commands;
mod config;
mod error;
mod models;
mod services;
mod state;

use config::AppConfig;
use services::classifier::model_manager::ModelManager;
use services::session_store::SessionStore;
use state::AppState;
use tauri::path::BaseDirectory;
use tauri::{Emitter, Manager, WindowEvent};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "asclepius_lib=info,asclepius=info";

/// Colored text by default, JSON when `LOG_FORMAT=json`.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if use_json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(false))
            .try_init()
    };
    if let Err(e) = result {
        eprintln!("tracing already initialised: {}", e);
    }
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    init_tracing();
    let config = AppConfig::from_env();
    tracing::info!(?config, "starting asclepius");

    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_window_state::Builder::default().build())
        .setup(move |app| {
            let app_data_dir = app.path().app_data_dir()?;
            std::fs::create_dir_all(&app_data_dir)?;
            let cache_dir = app.path().app_cache_dir()?;
            let model_path = app
                .path()
                .resolve(format!("resources/{}", config.model_asset), BaseDirectory::Resource)?;

            let state = AppState::new(config.clone(), cache_dir, SessionStore::new(&app_data_dir));
            state.restore_session();
            app.manage(state);

            let model_manager: ModelManager = ModelManager::new(config.model_asset.clone());
            app.manage(model_manager.clone());

            let app_handle = app.handle().clone();
            let (use_gpu, threads) = (config.use_gpu, config.intra_threads);
            tauri::async_runtime::spawn(async move {
                if let Err(e) = model_manager.load_model(model_path, use_gpu, threads).await {
                    let _ = app_handle.emit("model-error", e.to_string());
                }
            });

            Ok(())
        })
        .on_window_event(|window, event| {
            if let WindowEvent::Destroyed = event {
                let app = window.app_handle();
                // Drop any in-flight analysis with the screen that asked for it.
                if let Some(model_manager) = app.try_state::<ModelManager>() {
                    model_manager.cancel();
                }
                if let Some(state) = app.try_state::<AppState>() {
                    if let Err(e) = state.save_session() {
                        tracing::warn!(error = %e, "failed to save session on teardown");
                    }
                }
            }
        })
        .invoke_handler(tauri::generate_handler![
            commands::classifier::get_model_status,
            commands::classifier::analyze_image,
            commands::classifier::cancel_analysis,
            commands::classifier::take_result,
            commands::crop::aspect_ratio_options,
            commands::crop::get_flow_state,
            commands::crop::current_image,
            commands::crop::pick_image,
            commands::crop::choose_aspect_ratio,
            commands::crop::apply_crop,
            commands::crop::cancel_crop,
            commands::image::get_preview,
            commands::session::save_session,
            commands::session::restore_session,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
