pub mod types;
pub mod config;
pub mod data;
pub mod processing;
pub mod render;
pub mod dashboard;
pub mod server;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the dashboard
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Write the dashboard views as JSON files
    Export {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(short, long, value_name = "DIR", default_value = "output")]
        out: PathBuf,
        /// Pub shown in the detail view (defaults to the first listed)
        #[arg(long = "pub", value_name = "NAME")]
        pub_name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => {
            info!("Serving dashboard with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(&config)?;
            let store = data::load_data(&app_config.input.data_csv, &app_config.input.null_marker)?;

            server::start_server(app_config, store).await?;
        }
        Commands::Export { config, out, pub_name } => {
            info!("Exporting dashboard views with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(&config)?;
            let store = data::load_data(&app_config.input.data_csv, &app_config.input.null_marker)?;
            let dashboard = dashboard::Dashboard::new(Arc::new(store), app_config);

            export(&dashboard, &out, pub_name.as_deref())?;
            info!("Export complete: {:?}", out);
        }
    }

    Ok(())
}

fn export(dashboard: &dashboard::Dashboard, out: &Path, pub_name: Option<&str>) -> Result<()> {
    fs::create_dir_all(out)
        .with_context(|| format!("Failed to create output directory: {:?}", out))?;

    write_json(&out.join("page.json"), &dashboard.page())?;
    write_json(&out.join("density.json"), dashboard.density())?;
    write_json(&out.join("neighborhoods.json"), &dashboard.set_filter(dashboard.default_selection())?)?;

    let selected = pub_name
        .or_else(|| dashboard.store().pub_names().first().map(String::as_str))
        .unwrap_or_default();
    write_json(&out.join("detail.json"), &dashboard.select_pub(selected))?;

    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::data::tests::sample_store;
    use serde_json::Value;

    #[test]
    fn test_export_writes_all_views() {
        let dir = tempfile::tempdir().unwrap();
        let dashboard = dashboard::Dashboard::new(Arc::new(sample_store()), AppConfig::default());

        export(&dashboard, dir.path(), None).unwrap();

        for file in ["page.json", "density.json", "neighborhoods.json", "detail.json"] {
            assert!(dir.path().join(file).exists(), "{} missing", file);
        }
        let detail: Value = serde_json::from_str(&fs::read_to_string(dir.path().join("detail.json")).unwrap()).unwrap();
        assert_eq!(detail["heading"], "Details for The Crown");
    }

    #[test]
    fn test_export_named_pub_missing() {
        let dir = tempfile::tempdir().unwrap();
        let dashboard = dashboard::Dashboard::new(Arc::new(sample_store()), AppConfig::default());

        export(&dashboard, dir.path(), Some("Nowhere")).unwrap();

        let detail: Value = serde_json::from_str(&fs::read_to_string(dir.path().join("detail.json")).unwrap()).unwrap();
        assert_eq!(detail["status"], "not_found");
    }

    #[test]
    fn test_cli_parses_export() {
        let cli = Cli::try_parse_from(["pub-explorer", "export", "--out", "views", "--pub", "The Lamb"]).unwrap();
        match cli.command {
            Commands::Export { config, out, pub_name } => {
                assert_eq!(config, PathBuf::from("config.toml"));
                assert_eq!(out, PathBuf::from("views"));
                assert_eq!(pub_name.as_deref(), Some("The Lamb"));
            }
            Commands::Serve { .. } => panic!("expected export"),
        }
    }
}
