mod cli;

use crate::cli::Cli;
use clap::Parser;
use derive_more::{Display, Error};
use dialoguer::Input;
use exn::ResultExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use trawl_config::Config;
use trawl_library::{OutputDocument, Pipeline, PipelineEvent, ScanSummary};

type Result<T> = std::result::Result<T, exn::Exn<ErrorKind>>;

#[derive(Debug, Display, Error)]
enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("no source path given")]
    Prompt,
    #[display("extraction failed")]
    Run,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{err:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    cli.apply(&mut config);
    config.validate().or_raise(|| ErrorKind::Config)?;

    let source = match &cli.path {
        Some(path) => path.clone(),
        None => prompt_for_source()?,
    };

    let (sender, receiver) = mpsc::unbounded_channel();
    let pipeline = Pipeline::new(&config).or_raise(|| ErrorKind::Run)?.with_events(sender);
    let files = pipeline.discover(&source).or_raise(|| ErrorKind::Run)?;

    let summary = ScanSummary::from_paths(&files);
    tracing::info!(files = summary.total_files, size = %summary.total_size_human(), "scan summary");
    for (extension, stats) in &summary.by_extension {
        tracing::debug!(extension = %extension, count = stats.count, size = %trawl_library::human_size(stats.bytes));
    }

    let cancel = pipeline.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, finishing files in progress");
            cancel.cancel();
        }
    });

    let progress = show_progress(receiver);
    let report = pipeline.run(files).await.or_raise(|| ErrorKind::Run);
    // Closes the event channel so the progress task can finish.
    drop(pipeline);
    let _ = progress.await;
    let report = report?;

    let results = report.results.len();
    let document = OutputDocument::new(source.display().to_string(), report.results);
    match document.write(&config.output_dir, config.pretty) {
        Ok(path) => {
            tracing::info!(path = %path.display(), results, "done");
            println!("{}", report.progress);
            Ok(ExitCode::SUCCESS)
        },
        Err(err) => {
            tracing::error!(results, "{err:?}");
            Ok(ExitCode::FAILURE)
        },
    }
}

fn prompt_for_source() -> Result<PathBuf> {
    let answer: String = Input::new()
        .with_prompt("Directory to extract")
        .validate_with(|input: &String| match Path::new(input.trim()).exists() {
            true => Ok(()),
            false => Err("no such file or directory"),
        })
        .interact_text()
        .or_raise(|| ErrorKind::Prompt)?;
    Ok(PathBuf::from(answer.trim()))
}

/// Drive a progress bar from pipeline events until the channel closes.
fn show_progress(mut receiver: mpsc::UnboundedReceiver<PipelineEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.green/dim}] {pos}/{len} {wide_msg}")
        {
            bar.set_style(style.progress_chars("█▓░"));
        }
        bar.enable_steady_tick(Duration::from_millis(100));

        while let Some(event) = receiver.recv().await {
            match event {
                PipelineEvent::Started { total } => bar.set_length(total),
                PipelineEvent::Skipped { path } => bar.println(format!("skipped {path}")),
                PipelineEvent::Failed { path, message } => bar.println(format!("failed  {path}: {message}")),
                PipelineEvent::Progress(snapshot) => {
                    bar.set_length(snapshot.total);
                    bar.set_position(snapshot.processed);
                    bar.set_message(snapshot.current_file);
                },
                PipelineEvent::Finished { snapshot, cancelled } => {
                    bar.set_length(snapshot.total);
                    bar.set_position(snapshot.processed);
                    match cancelled {
                        true => bar.abandon_with_message("cancelled"),
                        false => bar.finish_with_message("complete"),
                    }
                },
            }
        }
    })
}
