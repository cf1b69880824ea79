//! CLI binary for paper2md.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig`, runs one conversion and reports the result.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use paper2md::{
    convert, ConversionConfig, ConversionOutput, ConversionProgressCallback, ConversionStats,
    ProgressCallback, Stage,
};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that follows the pipeline stages and counts published images.
struct CliProgressCallback {
    bar: ProgressBar,
    published: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style =
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Starting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            published: AtomicUsize::new(0),
        })
    }

    fn abandon(&self) {
        self.bar.finish_and_clear();
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        let prefix = match stage {
            Stage::Validate | Stage::Configure | Stage::PrepareOutput => "Preparing",
            Stage::Ocr => "OCR",
            Stage::PublishImages => "Uploading",
            Stage::Assemble => "Writing",
        };
        self.bar.set_prefix(prefix);
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_ocr_complete(&self, page_count: usize, image_count: usize) {
        self.bar.println(format!(
            "{} OCR returned {} pages, {} images",
            cyan("◆"),
            bold(&page_count.to_string()),
            bold(&image_count.to_string())
        ));
    }

    fn on_image_published(&self, id: &str, _url: &str, total: usize) {
        let done = self.published.fetch_add(1, Ordering::SeqCst) + 1;
        self.bar.set_message(format!("{done}/{total} images  {}", dim(id)));
    }

    fn on_image_skipped(&self, id: &str, reason: &str) {
        self.bar.println(format!("  {} {}  {}", cyan("⚠"), id, dim(reason)));
    }

    fn on_page_written(&self, page_num: usize, total_pages: usize) {
        self.bar.set_message(format!("page {page_num}/{total_pages}"));
    }

    fn on_conversion_complete(&self, stats: &ConversionStats) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages, {} images published  {}",
            green("✔"),
            bold(&stats.page_count.to_string()),
            bold(&stats.images_published.to_string()),
            dim(&format!("{}ms", stats.total_duration_ms)),
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a paper into ./out (the directory must exist)
  paper2md --input paper.pdf --outDir out

  # Upload four images at a time and print run statistics as JSON
  paper2md -i paper.pdf -o out --upload-concurrency 4 --json

OUTPUT:
  <outDir>/page-<n>.md     one file per page, 1-indexed
  <outDir>/all-pages.md    every page, in order

  Images are stored as <bucket>/paper/<YYYY-MM-DD>/<id>.png and linked
  as <S3_PUBLIC_URL>/paper/<YYYY-MM-DD>/<id>.png.

ENVIRONMENT VARIABLES (a .env file in the working directory is loaded first):
  MISTRAL_OCR_API_KEY     Mistral API key
  S3_ENDPOINT             S3-compatible endpoint URL
  S3_ACCESS_KEY_ID        Storage access key
  S3_SECRET_ACCESS_KEY    Storage secret key
  S3_BUCKET               Bucket for images
  S3_PUBLIC_URL           Public base URL of the bucket
  S3_REGION               Optional, default us-east-1
  RUST_LOG                Override log filter (e.g. paper2md=debug)
"#;

/// Convert a PDF to Markdown with Mistral OCR, hosting images on S3.
#[derive(Parser, Debug)]
#[command(
    name = "paper2md",
    version,
    about = "Convert a PDF to Markdown with Mistral OCR, hosting images on S3",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path of the PDF to convert.
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Existing directory to write the Markdown files into.
    #[arg(short = 'o', long = "outDir", visible_alias = "out-dir")]
    out_dir: PathBuf,

    /// Number of images uploaded at once.
    #[arg(long, env = "PAPER2MD_UPLOAD_CONCURRENCY", default_value_t = 1)]
    upload_concurrency: usize,

    /// Print run statistics as JSON on stdout.
    #[arg(long, env = "PAPER2MD_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "PAPER2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs and print error causes.
    #[arg(short, long, env = "PAPER2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PAPER2MD_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine; the variables may come from the shell.
    let _ = dotenvy::dotenv();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => {
            // --help / --version
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let rendered = e.to_string();
            let line = rendered.lines().next().unwrap_or("invalid arguments");
            eprintln!("{line}");
            return ExitCode::FAILURE;
        }
    };

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters; keep INFO logs out of
    // its way unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let spinner = show_progress.then(CliProgressCallback::new);

    match run(&cli, spinner.clone()).await {
        Ok(output) => {
            if let Err(e) = report(&cli, show_progress, &output) {
                print_error(&e, cli.verbose);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            if let Some(ref s) = spinner {
                s.abandon();
            }
            print_error(&e, cli.verbose);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, spinner: Option<Arc<CliProgressCallback>>) -> Result<ConversionOutput> {
    let progress: Option<ProgressCallback> =
        spinner.map(|s| s as Arc<dyn ConversionProgressCallback>);
    let config = build_config(cli, progress)?;
    Ok(convert(&cli.input, &cli.out_dir, &config).await?)
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder().upload_concurrency(cli.upload_concurrency);
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    Ok(builder.build()?)
}

fn report(cli: &Cli, show_progress: bool, output: &ConversionOutput) -> Result<()> {
    if cli.json {
        let json =
            serde_json::to_string_pretty(&output.stats).context("Failed to serialise stats")?;
        println!("{json}");
        return Ok(());
    }
    if cli.quiet {
        return Ok(());
    }
    if !show_progress {
        eprintln!(
            "Converted {} pages ({} of {} images published) in {}ms",
            output.stats.page_count,
            output.stats.images_published,
            output.stats.images_seen,
            output.stats.total_duration_ms
        );
    }
    if let Some(combined) = output.files.last() {
        eprintln!("   →  {}", bold(&combined.display().to_string()));
    }
    Ok(())
}

/// One line on stderr; causes follow only with `--verbose`.
fn print_error(err: &anyhow::Error, verbose: bool) {
    eprintln!("{} {}", red("error:"), err);
    if verbose {
        for cause in err.chain().skip(1) {
            eprintln!("  {} {}", dim("caused by:"), cause);
        }
    }
}
