use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use facemood::classifier::OnnxEmotionModel;
use facemood::dataset::DatasetLayout;
use facemood::detector::CascadeFaceLocator;
use facemood::frontend::{create_frontend_router, FrontendState};
use facemood::server::{self, create_router, AppState};
use facemood::{AppConfig, EmotionClassifier, InferencePipeline, PipelineProfile, PredictionResponse};

/// Happy/Sad face emotion classifier.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the prediction API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
        /// Haar cascade XML
        #[arg(long)]
        cascade: Option<PathBuf>,
        /// ONNX emotion model
        #[arg(long)]
        model: Option<PathBuf>,
    },
    /// Run the browser front end that forwards uploads to the API
    Frontend {
        #[arg(short, long)]
        port: Option<u16>,
        /// Base URL of the prediction API
        #[arg(long)]
        api_url: Option<String>,
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
    /// Classify a single image file and print the JSON result
    Predict {
        image: PathBuf,
        #[arg(long)]
        cascade: Option<PathBuf>,
        #[arg(long)]
        model: Option<PathBuf>,
    },
    /// Label faces live from a webcam
    #[cfg(feature = "webcam")]
    Webcam {
        /// Camera index
        #[arg(long, default_value_t = 0)]
        device: u32,
        /// Frames to analyze (0 = until Ctrl+C)
        #[arg(long, default_value_t = 0)]
        frames: u64,
        /// List cameras and exit
        #[arg(long)]
        list_devices: bool,
    },
    /// Validate a train/validation/test dataset directory
    Dataset { root: PathBuf },
}

/// Initializes logging: a file when configured, else stderr (JSON with LOG_FORMAT=json)
fn init_logging(log_file: Option<&Path>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("facemood=info,tower_http=warn"));

    if let Some(path) = log_file {
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating log file {}", path.display()))?;
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(Arc::new(file)).with_ansi(false))
            .with(env_filter)
            .init();
        return Ok(());
    }

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

/// Loads both model artifacts; either one failing aborts startup
fn load_pipeline(config: &AppConfig, profile: PipelineProfile) -> anyhow::Result<InferencePipeline> {
    let locator = CascadeFaceLocator::load(&config.cascade_path)?;
    let model = OnnxEmotionModel::load(&config.model_path, config.tensor_layout)?;

    Ok(InferencePipeline::new(
        Arc::new(locator),
        EmotionClassifier::new(Arc::new(model)),
        profile.with_channel_order(config.channel_order),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    init_logging(config.log_file.as_deref())?;

    let outcome = run(cli.command, &mut config).await;
    if let Err(e) = &outcome {
        error!("{:#}", e);
    }
    outcome
}

async fn run(command: Command, config: &mut AppConfig) -> anyhow::Result<()> {
    match command {
        Command::Serve {
            host,
            port,
            cascade,
            model,
        } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(cascade) = cascade {
                config.cascade_path = cascade;
            }
            if let Some(model) = model {
                config.model_path = model;
            }

            let pipeline = load_pipeline(config, PipelineProfile::serving())?;

            info!("Starting prediction API");
            let app = create_router(AppState::new(config.clone(), pipeline));
            server::serve(app, &config.host, config.port)
                .await
                .with_context(|| format!("serving on {}:{}", config.host, config.port))?;
        }
        Command::Frontend {
            port,
            api_url,
            static_dir,
        } => {
            if let Some(port) = port {
                config.frontend_port = port;
            }
            if let Some(api_url) = api_url {
                config.api_url = api_url;
            }
            if let Some(static_dir) = static_dir {
                config.static_dir = static_dir;
            }

            info!(api = %config.api_url, "Starting front end");
            let app = create_frontend_router(
                FrontendState::new(config.api_url.clone()),
                &config.static_dir,
                config.max_body_size,
            );
            server::serve(app, &config.host, config.frontend_port)
                .await
                .with_context(|| format!("serving on {}:{}", config.host, config.frontend_port))?;
        }
        Command::Predict {
            image,
            cascade,
            model,
        } => {
            if let Some(cascade) = cascade {
                config.cascade_path = cascade;
            }
            if let Some(model) = model {
                config.model_path = model;
            }

            let pipeline = load_pipeline(config, PipelineProfile::serving())?;
            let bytes = std::fs::read(&image)
                .with_context(|| format!("reading {}", image.display()))?;
            let result = pipeline.infer(&bytes)?;

            let filename = image
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let response = PredictionResponse::new(filename, &result);
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        #[cfg(feature = "webcam")]
        Command::Webcam {
            device,
            frames,
            list_devices,
        } => {
            use facemood::camera::{run_live, CameraManager};
            use std::sync::atomic::{AtomicBool, Ordering};

            if list_devices {
                for (index, name) in CameraManager::list_devices()?.iter().enumerate() {
                    println!("{index}: {name}");
                }
                return Ok(());
            }

            let pipeline = load_pipeline(config, PipelineProfile::interactive())?;
            let stop = Arc::new(AtomicBool::new(false));
            {
                let stop = Arc::clone(&stop);
                tokio::spawn(async move {
                    server::shutdown_signal().await;
                    stop.store(true, Ordering::Relaxed);
                });
            }

            println!("Webcam started. Press Ctrl+C to quit.");
            let summary = tokio::task::spawn_blocking(move || {
                run_live(&pipeline, device, frames, &stop, |frame, faces| {
                    for face in faces {
                        println!("frame {frame}: {} at {}", face.result.label, face.bbox);
                    }
                })
            })
            .await??;
            println!(
                "Analyzed {} frames, {} faces",
                summary.frames, summary.faces
            );
        }
        Command::Dataset { root } => {
            let layout = DatasetLayout::scan(&root)?;
            print!("{layout}");
        }
    }

    Ok(())
}
