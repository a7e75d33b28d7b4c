//! CLI binary for scanpress.
//!
//! A thin shim over the library crate that maps CLI flags to `RunConfig`
//! and prints the per-profile run summary.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use scanpress::{
    run, NormalizePolicy, Profile, RunCallback, RunConfig, RunProgressCallback,
};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

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

/// Terminal progress callback: renders a live progress bar and per-page log
/// lines using [indicatif]. Designed to work correctly when pages complete
/// out-of-order (concurrent page workers).
struct CliProgressCallback {
    /// The single progress bar anchored at the bottom of the terminal.
    bar: ProgressBar,
    /// Per-page wall-clock start times for elapsed reporting, keyed by
    /// (profile suffix, page index).
    start_times: Mutex<HashMap<(String, usize), Instant>>,
    /// Count of pages that errored out.
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Create a callback whose progress-bar length is set dynamically by
    /// `on_run_start` (called once the page count is known).
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_run_start

        // Initial style: spinner only (no counter until we know the total).
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Splitting source…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    /// Switch to the full progress-bar style once we know the total
    /// page-work count.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Processing");
        self.bar.reset_eta();
    }
}

impl RunProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_pages: usize, profiles: usize) {
        // One bar tick per (page, profile) unit of work.
        self.activate_bar(total_pages * profiles);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "Processing {total_pages} pages across {profiles} profile(s)…"
            ))
        ));
    }

    fn on_profile_start(&self, suffix: &str, _total_pages: usize) {
        self.bar.set_message(format!("profile {suffix}"));
    }

    fn on_page_start(&self, suffix: &str, page: usize, _total: usize) {
        self.start_times
            .lock()
            .unwrap()
            .insert((suffix.to_string(), page), Instant::now());
        self.bar.set_message(format!("{suffix} page {page}"));
    }

    fn on_page_complete(&self, suffix: &str, page: usize, total: usize, reused: bool) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&(suffix.to_string(), page))
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        let mark = if reused { cyan("↺") } else { green("✓") };
        let note = if reused { dim("cached") } else { String::new() };
        self.bar.println(format!(
            "  {} {:<4} Page {:>3}/{:<3}  {:<6}  {}",
            mark,
            suffix,
            page,
            total,
            note,
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, suffix: &str, page: usize, total: usize, error: &str) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&(suffix.to_string(), page))
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg = if error.len() > 80 {
            let mut end = 79;
            while !error.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}\u{2026}", &error[..end])
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:<4} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            suffix,
            page,
            total,
            red(&msg),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_profile_complete(&self, suffix: &str, succeeded: bool) {
        let mark = if succeeded { green("✔") } else { red("✘") };
        self.bar
            .println(format!("{} profile {} finished", mark, bold(suffix)));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Default profiles: hi (300 dpi) + lo (150 dpi)
  scanpress scan.pdf out/book

  # Single 200 dpi profile
  scanpress --profile web=200 scan.pdf out/book

  # Directory of page scans instead of a PDF
  scanpress pages/ out/book

  # Pure size reduction, no page standardisation
  scanpress --policy reduce --quality 10 scan.pdf out/book

  # Reuse previously computed text layers across runs
  scanpress --aux-dir aux/ scan.pdf out/book
  scanpress --aux-dir aux/ --overwrite scan.pdf out/book   # force re-OCR

  # Keep going when OCR fails on a page (image-only page, no text)
  scanpress --lenient scan.pdf out/book

OUTPUTS:
  One document per profile: {output_base}_{suffix}.pdf
  The exit status is non-zero if ANY profile failed, even when
  others produced their document.

REQUIRED TOOLS (on PATH):
  pdfimages    poppler-utils         page raster extraction
  magick       ImageMagick 7 (or `convert` from ImageMagick 6)
  tesseract    tesseract-ocr         text recognition
  pdftk        pdftk-java            page concatenation

ENVIRONMENT VARIABLES:
  SCANPRESS_CONCURRENCY   Page workers per profile
  SCANPRESS_AUX_DIR       Auxiliary text-layer reuse directory
  SCANPRESS_TMP_ROOT      Preferred workspace root (falls back to $TMPDIR)
"#;

/// Turn scanned documents into compact, searchable PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "scanpress",
    version,
    about = "Turn scanned documents into compact, searchable PDFs",
    long_about = "Process a scanned PDF (or a directory of page images) into one or more \
output PDFs at configured resolutions, each carrying an invisible OCR text layer \
suitable for full-text search.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Source PDF file, or a directory of per-page scan images.
    input: String,

    /// Base path for outputs; each profile writes {base}_{suffix}.pdf.
    output_base: PathBuf,

    /// Output profile as suffix=dpi (repeatable).
    #[arg(
        short,
        long = "profile",
        value_name = "SUFFIX=DPI",
        long_help = "Output profile as suffix=dpi, e.g. --profile hi=300 --profile lo=150.\n\
          Repeat for multiple output documents. Default: hi=300 and lo=150."
    )]
    profiles: Vec<String>,

    /// Normalisation policy: fit (pad to uniform page) or reduce (re-encode only).
    #[arg(long, value_enum, default_value = "fit")]
    policy: PolicyArg,

    /// JPEG quality for --policy reduce (1-100).
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Physical paper size in inches for --policy fit, as WxH.
    #[arg(long, default_value = "8.5x11")]
    paper: String,

    /// Number of pages processed concurrently within a profile.
    #[arg(short, long, env = "SCANPRESS_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Re-run OCR even when the aux directory has a cached text layer.
    #[arg(short = 'f', long)]
    overwrite: bool,

    /// Process at most this many pages.
    #[arg(long, value_name = "N")]
    max_pages: Option<usize>,

    /// Auxiliary directory of reusable per-page text layers.
    #[arg(long, env = "SCANPRESS_AUX_DIR")]
    aux_dir: Option<PathBuf>,

    /// Carry pages whose OCR failed as image-only pages instead of aborting.
    #[arg(long)]
    lenient: bool,

    /// Preferred root for the temporary workspace.
    #[arg(long, env = "SCANPRESS_TMP_ROOT")]
    tmp_root: Option<PathBuf>,

    /// Print the run summary as JSON.
    #[arg(long)]
    json: bool,

    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs (includes every tool invocation).
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum PolicyArg {
    /// Scale + pad every page onto a uniform virtual sheet.
    Fit,
    /// Re-encode at reduced quality, native geometry preserved.
    Reduce,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<RunCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn RunProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let output = run(&cli.input, &cli.output_base, &config)
        .await
        .context("Run failed")?;

    // ── Summary ──────────────────────────────────────────────────────────
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise run summary")?
        );
    } else if !cli.quiet {
        for p in &output.profiles {
            match (&p.output_path, &p.error) {
                (Some(path), _) => eprintln!(
                    "{}  {}  {} pages ({} recognized, {} cached)  {}ms  →  {}",
                    green("✔"),
                    p.profile,
                    p.pages,
                    p.recognized_pages,
                    p.reused_pages,
                    p.duration_ms,
                    bold(&path.display().to_string()),
                ),
                (None, Some(err)) => {
                    eprintln!("{}  {}  {}", red("✘"), p.profile, red(&err.to_string()))
                }
                (None, None) => eprintln!("{}  {}  no output", red("✘"), p.profile),
            }
        }
        eprintln!(
            "   {} pages  {} profiles  {}ms total",
            dim(&output.stats.source_pages.to_string()),
            dim(&format!(
                "{}/{}",
                output.stats.profiles_succeeded, output.stats.profiles_attempted
            )),
            output.stats.total_duration_ms,
        );
    }

    // Non-zero exit when any profile aborted.
    output.into_result().context("Run finished with failures")?;
    Ok(())
}

/// Map CLI args to `RunConfig`.
fn build_config(cli: &Cli, progress: Option<RunCallback>) -> Result<RunConfig> {
    let profiles = if cli.profiles.is_empty() {
        vec![Profile::new("hi", 300), Profile::new("lo", 150)]
    } else {
        cli.profiles
            .iter()
            .map(|s| parse_profile(s))
            .collect::<Result<Vec<_>>>()?
    };

    let (paper_w, paper_h) = parse_paper(&cli.paper)?;

    let policy = match cli.policy {
        PolicyArg::Fit => NormalizePolicy::FitToPage,
        PolicyArg::Reduce => NormalizePolicy::QualityReduction {
            quality: cli.quality,
        },
    };

    let mut builder = RunConfig::builder()
        .profiles(profiles)
        .paper_size_in(paper_w, paper_h)
        .policy(policy)
        .concurrency(cli.concurrency)
        .overwrite(cli.overwrite)
        .strict_recognition(!cli.lenient)
        .verbose_tools(cli.verbose);

    if let Some(n) = cli.max_pages {
        builder = builder.max_pages(n);
    }
    if let Some(ref dir) = cli.aux_dir {
        builder = builder.aux_dir(dir);
    }
    if let Some(ref root) = cli.tmp_root {
        builder = builder.preferred_tmp_root(root);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--profile` values of the form `suffix=dpi`.
fn parse_profile(s: &str) -> Result<Profile> {
    let Some((suffix, dpi)) = s.split_once('=') else {
        bail!("Invalid profile '{s}': expected SUFFIX=DPI, e.g. hi=300");
    };
    let suffix = suffix.trim();
    if suffix.is_empty() {
        bail!("Invalid profile '{s}': empty suffix");
    }
    let dpi: u32 = dpi
        .trim()
        .parse()
        .with_context(|| format!("Invalid DPI in profile '{s}'"))?;
    Ok(Profile::new(suffix, dpi))
}

/// Parse `--paper` values of the form `WxH` (inches).
fn parse_paper(s: &str) -> Result<(f64, f64)> {
    let Some((w, h)) = s.split_once('x') else {
        bail!("Invalid paper size '{s}': expected WxH, e.g. 8.5x11");
    };
    let w: f64 = w
        .trim()
        .parse()
        .with_context(|| format!("Invalid paper width in '{s}'"))?;
    let h: f64 = h
        .trim()
        .parse()
        .with_context(|| format!("Invalid paper height in '{s}'"))?;
    if w <= 0.0 || h <= 0.0 {
        bail!("Paper dimensions must be positive, got '{s}'");
    }
    Ok((w, h))
}
