// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use clap::{Parser, Subcommand};
use imgcorpus::{
    BuildReport, Client, Error, Progress, PublishOutcome, PublishReport, Settings, build_corpus,
    generate_manifest, plan_corpus, publish,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tokio::{
    sync::mpsc::{self, Sender},
    task::JoinHandle,
};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file (TOML).  Defaults to the platform configuration
    /// directory, e.g. ~/.config/imgcorpus/config.toml on Linux.
    #[clap(long, global = true, env = "IMGCORPUS_CONFIG")]
    config: Option<PathBuf>,

    /// Raw dataset root holding one folder per class
    #[clap(long, global = true)]
    input: Option<PathBuf>,

    /// Normalized corpus root
    #[clap(long, global = true)]
    output: Option<PathBuf>,

    /// Width of normalized images
    #[clap(long, global = true)]
    width: Option<u32>,

    /// Height of normalized images
    #[clap(long, global = true)]
    height: Option<u32>,

    /// JPEG quality of normalized images (1-100)
    #[clap(long, global = true)]
    quality: Option<u8>,

    /// Prefix of the image URLs written to the manifest
    #[clap(long, global = true)]
    base_url: Option<String>,

    /// Dataset service URL
    #[clap(long, global = true)]
    backend: Option<String>,

    /// Remote dataset name
    #[clap(long, global = true)]
    dataset: Option<String>,

    /// Fail when any file was skipped
    #[clap(long, global = true)]
    strict: bool,

    /// Client Command
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Normalize the raw dataset into the corpus directory.  Every supported
    /// image of every class folder is resized and re-encoded as JPEG under
    /// `<output>/<Class>/<class><n>.jpg`.
    Process {
        /// Print the planned file names without writing anything
        #[clap(long)]
        dry_run: bool,
    },
    /// Write the `index.json` manifest of the corpus directory.
    Index,
    /// Upload every JPEG of the corpus directory to the dataset service and
    /// create one dataset record per uploaded image.
    Upload,
    /// Process the dataset and write the manifest, optionally uploading the
    /// corpus afterwards.
    Run {
        /// Also upload the corpus to the dataset service
        #[clap(long)]
        upload: bool,
    },
}

fn load_settings(args: &Args) -> Result<Settings, Error> {
    let mut settings = Settings::load(args.config.as_deref())?;

    if let Some(input) = &args.input {
        settings.input = input.clone();
    }
    if let Some(output) = &args.output {
        settings.output = output.clone();
    }
    if let Some(width) = args.width {
        settings.width = width;
    }
    if let Some(height) = args.height {
        settings.height = height;
    }
    if let Some(quality) = args.quality {
        settings.quality = quality;
    }
    if let Some(base_url) = &args.base_url {
        settings.base_url = base_url.clone();
    }
    if let Some(backend) = &args.backend {
        settings.backend_url = backend.clone();
    }
    if let Some(dataset) = &args.dataset {
        settings.dataset_name = dataset.clone();
    }

    Ok(settings)
}

/// Spawns a task rendering progress updates on a progress bar.  The task ends
/// once every sender has been dropped.
fn progress_bar(message: &'static str) -> (Sender<Progress>, JoinHandle<()>) {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise} ETA: {eta}] {msg}: {wide_bar:.yellow} {human_pos}/{human_len}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▇▆▅▄▃▂▁  "),
    );
    bar.set_message(message);

    let (tx, mut rx) = mpsc::channel::<Progress>(16);

    let handle = tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            if progress.total > 0 {
                bar.set_length(progress.total as u64);
                bar.set_position(progress.current as u64);
            }
        }
        bar.finish_and_clear();
    });

    (tx, handle)
}

fn handle_dry_run(settings: &Settings) -> Result<(), Error> {
    let plans = plan_corpus(&settings.input, &settings.corpus_options())?;

    for plan in plans {
        if let Some(reason) = &plan.error {
            println!("{} (unreadable: {})", plan.name, reason);
            continue;
        }
        println!("{} ({} files)", plan.name, plan.images.len());
        for image in plan.images {
            println!(
                "  {} -> {}",
                image.source.display(),
                settings
                    .output
                    .join(&plan.name)
                    .join(&image.file_name)
                    .display()
            );
        }
    }

    Ok(())
}

async fn handle_process(settings: &Settings) -> Result<BuildReport, Error> {
    let input = settings.input.clone();
    let output = settings.output.clone();
    let options = settings.corpus_options();

    let (tx, bar) = progress_bar("Processing");
    let report =
        tokio::task::spawn_blocking(move || build_corpus(&input, &output, &options, Some(tx)))
            .await??;
    bar.await?;

    for failure in &report.failures {
        println!("Skipped {}: {}", failure.source.display(), failure.reason);
    }
    for class in &report.classes {
        println!("{}: {}/{} images", class.name, class.written, class.attempted);
    }
    println!(
        "Saved {} of {} images to {}",
        report.written,
        report.attempted,
        settings.output.display()
    );

    Ok(report)
}

fn handle_index(settings: &Settings) -> Result<(), Error> {
    let (path, entries) = generate_manifest(&settings.output, &settings.manifest_options())?;
    println!(
        "Generated index with {} images at {}",
        entries.len(),
        path.display()
    );
    Ok(())
}

async fn handle_upload(settings: &Settings) -> Result<PublishReport, Error> {
    let client = Client::new()?.with_server(&settings.backend_url)?;
    let options = settings.publish_options();

    let (tx, bar) = progress_bar("Uploading");
    let report = publish(&client, &settings.output, &options, Some(tx)).await?;
    bar.await?;

    for item in report.failures() {
        match &item.outcome {
            PublishOutcome::UploadFailed { reason } => {
                println!("Error processing {}: {}", item.path.display(), reason)
            }
            PublishOutcome::Orphaned { locator, reason } => println!(
                "Error processing {}: {} (orphaned asset {})",
                item.path.display(),
                reason,
                locator
            ),
            PublishOutcome::Published { .. } => {}
        }
    }
    println!(
        "Published {} of {} images to {}/{} ({} upload failures, {} orphaned assets)",
        report.published(),
        report.attempted(),
        client.url(),
        options.dataset_name,
        report.upload_failures(),
        report.orphaned()
    );

    Ok(report)
}

fn check_strict(strict: bool, skipped: usize) -> Result<(), Error> {
    if strict && skipped > 0 {
        Err(Error::IncompleteRun(skipped))
    } else {
        Ok(())
    }
}

#[cfg(feature = "profiling")]
fn init_profiling() {
    use tracing_subscriber::fmt::format::FmtSpan;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("imgcorpus=info"))
        .with_span_events(FmtSpan::CLOSE)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        log::warn!("Could not install tracing subscriber: {}", e);
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    #[cfg(feature = "profiling")]
    init_profiling();

    let args = Args::parse();
    let settings = load_settings(&args)?;

    match args.cmd {
        Command::Process { dry_run: true } => handle_dry_run(&settings),
        Command::Process { dry_run: false } => {
            let report = handle_process(&settings).await?;
            check_strict(args.strict, report.skipped())
        }
        Command::Index => handle_index(&settings),
        Command::Upload => {
            let report = handle_upload(&settings).await?;
            check_strict(args.strict, report.failures().count())
        }
        Command::Run { upload } => {
            let built = handle_process(&settings).await?;
            handle_index(&settings)?;

            let mut skipped = built.skipped();
            if upload {
                skipped += handle_upload(&settings).await?.failures().count();
            }
            check_strict(args.strict, skipped)
        }
    }
}
