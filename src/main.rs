use kube_jobs::command::Command;
use kube_jobs::config::settings::{Logger, Settings};
use kube_jobs::kube_api::KubeApi;
use kube_jobs::system::shutdown::create_shutdown_channel;
use kube_jobs::system::signals;
use rolling_file::{BasicRollingFileAppender, RollingConditionBasic};
use std::process::ExitCode;
use std::str::FromStr;
use std::{env, fs};
use tracing::{Level, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::Layer;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Registry, layer::SubscriberExt};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const BASE_DIRECTORY_LOG: &str = "logs";
const BASE_DIRECTORY_SIZE: usize = 5;
const PREFIX_LOG_NAME: &str = "kube-jobs.log";

// The returned guard flushes the file writer when dropped
fn init_logger(logger_config: &Logger) -> Option<WorkerGuard> {
    let log_level = Level::from_str(logger_config.level.as_str()).unwrap_or(Level::INFO);
    let file_writer = logger_config
        .directory
        .then(|| {
            let current_exe_path = env::current_exe().ok()?;
            let log_path = current_exe_path.parent()?.join(BASE_DIRECTORY_LOG);
            fs::create_dir(log_path.clone()).unwrap_or_default();
            let condition = RollingConditionBasic::new().daily();
            let file_appender = BasicRollingFileAppender::new(
                log_path.join(PREFIX_LOG_NAME),
                condition,
                BASE_DIRECTORY_SIZE,
            )
            .ok()?;
            Some(tracing_appender::non_blocking(file_appender))
        })
        .flatten();
    let (file_layer, guard) = match file_writer {
        Some((writer, guard)) => {
            let layer = Layer::new()
                .with_writer(writer.with_max_level(log_level))
                .json();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    let console_layer = Layer::new()
        .with_writer(std::io::stderr.with_max_level(log_level))
        .pretty();
    Registry::default()
        .with(logger_config.console.then_some(console_layer))
        .with(file_layer)
        .init();
    guard
}

async fn run(settings: &Settings, command: Command) -> kube_jobs::Result<()> {
    let api = KubeApi::connect(&settings.kube).await?;
    let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
    signals::shutdown_on_signal(shutdown_tx);
    let lines = command
        .run(&api, &settings.kube.namespace, shutdown_rx)
        .await?;
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let settings = match Settings::new() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("Error loading settings: {}", err);
            return ExitCode::FAILURE;
        }
    };
    let _guard = init_logger(&settings.logger);
    let run_mode = Settings::mode();
    info!(version = VERSION, env = run_mode, "Starting kube-jobs");
    let command = match Command::parse(env::args().skip(1)) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::from(2);
        }
    };
    if !settings.kube.is_namespace_set() {
        warn!(namespace = settings.kube.namespace, "Active namespace was not set");
    }
    match run(&settings, command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Command failed");
            ExitCode::FAILURE
        }
    }
}
