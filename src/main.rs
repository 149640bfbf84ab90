use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use admit_core::common::config::AppCfg;
use admit_core::common::log;
use admit_core::pipeline::load_schema;
use admit_core::{api, AdmitError, AdmitResult, InferenceService, TrainingPipeline};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "admit", about = "Admission and scholarship prediction pipeline", version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
    /// Emit JSON log lines regardless of ADMIT_LOG_FORMAT
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run ingestion through promotion once
    Train,
    /// Serve the production bundle over HTTP
    Serve {
        /// Listen address, defaults to ADMIT_BIND
        #[arg(long)]
        addr: Option<String>,
    },
    /// Predict one applicant from a JSON file
    Predict {
        /// Path to a JSON object with the applicant fields
        file: PathBuf,
    },
}

fn print_json(value: &impl serde::Serialize) -> AdmitResult<()> {
    let text = serde_json::to_string_pretty(value).map_err(AdmitError::serialization)?;
    println!("{text}");
    Ok(())
}

fn run(args: Args, cfg: AppCfg) -> AdmitResult<()> {
    match args.command {
        Commands::Train => {
            let outcome = TrainingPipeline::from_cfg(cfg)?.run()?;
            print_json(&outcome)
        }
        Commands::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| cfg.bind_addr.clone());
            let service = Arc::new(InferenceService::new(cfg.best_model_dir(), load_schema(&cfg)?));
            if let Err(err) = service.snapshot() {
                tracing::warn!(code = err.code().as_u32(), error = %err, "starting without a production bundle");
            }
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(api::serve(&addr, service))
        }
        Commands::Predict { file } => {
            let raw = std::fs::read_to_string(&file)?;
            let payload: serde_json::Value =
                serde_json::from_str(&raw).map_err(AdmitError::serialization)?;
            let service = InferenceService::new(cfg.best_model_dir(), load_schema(&cfg)?);
            print_json(&service.predict_json(&payload)?)
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let cfg = match AppCfg::load() {
        Ok(cfg) => cfg,
        Err(err) => {
            log::init(args.json_logs);
            tracing::error!(code = err.code().as_u32(), error = %err, "configuration rejected");
            return ExitCode::from(2);
        }
    };
    log::init(args.json_logs || cfg.log_json);

    match run(args, cfg) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(code = err.code().as_u32(), error = %err, "command failed");
            ExitCode::FAILURE
        }
    }
}
