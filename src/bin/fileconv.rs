//! CLI binary for edgequake-fileconv.
//!
//! Plays the part of the interactive client: select files, pick a
//! conversion, optionally edit the preview, then write the artifact.

use anyhow::{bail, Context, Result};
use clap::Parser;
use edgequake_fileconv::{
    inspect, load_inputs, ConversionConfig, ConversionKind, ConversionOption,
    ConversionProgressCallback, ConverterSession, PreviewState, ProgressCallback, RasterFormat,
    CONVERSION_OPTIONS,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner until the item count is known,
/// then a bar with one log line per image or page.
///
/// A run reports two passes (convert, then export); each pass gets its own
/// bar and the summary line is printed once.
struct CliProgressCallback {
    bar: Mutex<ProgressBar>,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
    summarized: AtomicBool,
}

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self::with_bar(bar))
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar: Mutex::new(bar),
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
            summarized: AtomicBool::new(false),
        }
    }

    fn bar(&self) -> ProgressBar {
        match self.bar.lock() {
            Ok(bar) => bar.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} items  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        let mut slot = match self.bar.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        // A finished bar cannot be redrawn; the export pass starts a new one.
        if slot.is_finished() {
            let fresh = if slot.is_hidden() {
                ProgressBar::hidden()
            } else {
                let bar = ProgressBar::new(0);
                bar.enable_steady_tick(Duration::from_millis(80));
                bar
            };
            *slot = fresh;
        }
        slot.set_position(0);
        slot.set_length(total as u64);
        slot.set_style(progress_style);
        slot.set_prefix("Converting");
        slot.reset_eta();
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&index))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// True for the first clean completion only.
    fn take_summary(&self) -> bool {
        self.errors.load(Ordering::SeqCst) == 0 && !self.summarized.swap(true, Ordering::SeqCst)
    }

    /// Clear the bar when a conversion stops without a completion event.
    fn abandon(&self) {
        let bar = self.bar();
        if !bar.is_finished() {
            bar.finish_and_clear();
        }
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_items: usize) {
        self.activate_bar(total_items);
    }

    fn on_item_start(&self, index: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(index, Instant::now());
        }
        self.bar().set_message(format!("item {index}"));
    }

    fn on_item_complete(&self, index: usize, total: usize, output_bytes: usize) {
        let elapsed = self.elapsed_secs(index);
        let bar = self.bar();
        bar.println(format!(
            "  {} Item {:>3}/{:<3}  {:<12}  {}",
            green("✓"),
            index,
            total,
            dim(&format!("{:>8} bytes", output_bytes)),
            dim(&format!("{elapsed:.1}s")),
        ));
        bar.inc(1);
    }

    fn on_item_error(&self, index: usize, total: usize, error: &str) {
        let elapsed = self.elapsed_secs(index);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };

        let bar = self.bar();
        bar.println(format!(
            "  {} Item {:>3}/{:<3}  {}  {}",
            red("✗"),
            index,
            total,
            red(&msg),
            dim(&format!("{elapsed:.1}s")),
        ));
        bar.inc(1);
    }

    fn on_conversion_complete(&self, total_items: usize) {
        self.bar().finish_and_clear();
        if self.take_summary() {
            eprintln!(
                "{} {} item(s) processed",
                green("✔"),
                bold(&total_items.to_string())
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Images to a single PDF, in the given order
  fileconv scan-1.jpg scan-2.png -o scans.pdf

  # Every PDF page as an image (ZIP when there are several pages)
  fileconv --to pdf-to-image report.pdf

  # Same, but PNG, dropping the cover and swapping the next two pages
  fileconv --to pdf-to-image --image-format png --remove 1 --order 2,1 report.pdf

  # Word document to PDF
  fileconv letter.docx -o letter.pdf

  # PDF text into a file Word can open
  fileconv --to pdf-to-docx paper.pdf

  # Which conversions does this file qualify for?
  fileconv --list deck.pptx

  # File details only
  fileconv --inspect-only --json report.pdf

  # Look at the editable preview instead of writing a file
  fileconv --to html-to-pdf --preview-json page.html

CONVERSIONS:
  Kind           From                              To
  ─────────────  ────────────────────────────────  ─────
  image-to-pdf   jpg jpeg png gif webp bmp         pdf
  pdf-to-image   pdf                               jpg / zip
  html-to-pdf    html htm                          pdf
  docx-to-pdf    docx doc                          pdf
  ppt-to-pdf     ppt pptx                          pdf
  pdf-to-docx    pdf                               docx

  Only image-to-pdf accepts several input files.

ENVIRONMENT VARIABLES:
  FILECONV_PDFIUM_PATH    Path to libpdfium (file or directory)
  FILECONV_OUTPUT         Default output path
  FILECONV_TO             Default conversion kind
  RUST_LOG                Override the log filter

  PDF conversions need the pdfium shared library. It is looked up in
  FILECONV_PDFIUM_PATH, the working directory, ./lib, next to the
  executable, and finally the system library path.
"#;

/// Convert images, PDFs, DOCX, PPT and HTML files.
#[derive(Parser, Debug)]
#[command(
    name = "fileconv",
    version,
    about = "Convert images, PDFs, DOCX, PPT and HTML files",
    long_about = "Convert between everyday document formats. Each conversion produces an \
editable preview first; pages can be dropped or reordered before the single output file \
is written.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file paths or HTTP/HTTPS URLs.
    #[arg(required_unless_present = "list")]
    inputs: Vec<String>,

    /// Conversion to run (e.g. image-to-pdf, pdf-to-image).
    #[arg(long, env = "FILECONV_TO")]
    to: Option<String>,

    /// Output file, or an existing directory to write into.
    #[arg(short, long, env = "FILECONV_OUTPUT")]
    output: Option<PathBuf>,

    /// List the conversions the inputs qualify for, then exit.
    #[arg(long)]
    list: bool,

    /// Print file details only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Bitmap format for rendered PDF pages.
    #[arg(long, env = "FILECONV_IMAGE_FORMAT", value_enum, default_value = "jpg")]
    image_format: ImageFormatArg,

    /// Largest accepted input file in MB.
    #[arg(long, env = "FILECONV_MAX_SIZE_MB", default_value_t = 50,
          value_parser = clap::value_parser!(u64).range(1..))]
    max_size_mb: u64,

    /// New page order, 1-based, e.g. 3,1,2. Pages not listed are dropped.
    /// Applied after --remove.
    #[arg(long, value_delimiter = ',')]
    order: Vec<usize>,

    /// Pages to drop, 1-based, e.g. 2,5.
    #[arg(long, value_delimiter = ',')]
    remove: Vec<usize>,

    /// Print the (edited) preview as JSON instead of writing a file.
    #[arg(long)]
    preview_json: bool,

    /// Print results as JSON.
    #[arg(long, env = "FILECONV_JSON")]
    json: bool,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "FILECONV_PASSWORD")]
    password: Option<String>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "FILECONV_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Disable progress bar.
    #[arg(long, env = "FILECONV_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FILECONV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FILECONV_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ImageFormatArg {
    Jpg,
    Png,
}

impl From<ImageFormatArg> for RasterFormat {
    fn from(v: ImageFormatArg) -> Self {
        match v {
            ImageFormatArg::Jpg => RasterFormat::Jpeg,
            ImageFormatArg::Png => RasterFormat::Png,
        }
    }
}

/// Summary printed by `--json` after a file is written.
#[derive(Serialize)]
struct WrittenOutput {
    path: String,
    conversion: ConversionKind,
    size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pages: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; verbose mode shows everything.
    let machine_output = cli.json || cli.preview_json;
    let show_progress = !cli.quiet && !cli.no_progress && !machine_output;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress || machine_output {
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

    // ── Catalogue listing without inputs ─────────────────────────────────
    if cli.list && cli.inputs.is_empty() {
        let all: Vec<&ConversionOption> = CONVERSION_OPTIONS.iter().collect();
        print_options(&all, cli.json)?;
        return Ok(());
    }

    let progress = if show_progress && !cli.list && !cli.inspect_only {
        Some(CliProgressCallback::new_dynamic())
    } else {
        None
    };
    let config = build_config(&cli, progress.clone().map(|p| p as ProgressCallback))?;

    let result = run(&cli, config).await;
    if let Some(p) = progress {
        p.abandon();
    }
    result
}

async fn run(cli: &Cli, config: ConversionConfig) -> Result<()> {
    let files = load_inputs(cli.inputs.as_slice(), &config)
        .await
        .context("Failed to read input")?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let mut infos = Vec::with_capacity(files.len());
        for file in &files {
            infos.push(
                inspect(file, &config)
                    .await
                    .with_context(|| format!("Failed to inspect {}", file.name))?,
            );
        }
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&infos).context("Failed to serialize details")?
            );
        } else {
            for info in &infos {
                println!("File:         {}", info.name);
                println!("Size:         {} bytes", info.size_bytes);
                if let Some(ref t) = info.media_type {
                    println!("Type:         {}", t);
                }
                if let (Some(w), Some(h)) = (info.width, info.height) {
                    println!("Dimensions:   {}x{}", w, h);
                }
                if let Some(n) = info.page_count {
                    println!("Pages:        {}", n);
                }
                if let Some(ref t) = info.title {
                    println!("Title:        {}", t);
                }
                if let Some(ref a) = info.author {
                    println!("Author:       {}", a);
                }
                if let Some(ref v) = info.pdf_version {
                    println!("PDF Version:  {}", v);
                }
                println!("Conversions:  {}", info.conversions.join(", "));
                println!();
            }
        }
        return Ok(());
    }

    let mut session = ConverterSession::new(config);
    let options: Vec<&'static ConversionOption> = session
        .select(files)
        .context("Cannot select these files")?
        .to_vec();

    if cli.list {
        print_options(&options, cli.json)?;
        return Ok(());
    }

    // ── Pick the conversion ──────────────────────────────────────────────
    let kind = match cli.to.as_deref() {
        Some(tag) => tag.parse::<ConversionKind>()?,
        None => match options.as_slice() {
            [only] => only.id,
            [] => bail!("No conversion accepts these files"),
            _ => {
                print_options(&options, false)?;
                bail!("Several conversions apply; choose one with --to");
            }
        },
    };

    session
        .convert(kind)
        .await
        .with_context(|| format!("{} failed", kind.option().label))?;

    // ── Preview edits ────────────────────────────────────────────────────
    apply_edits(&mut session, &cli.remove, &cli.order)?;

    if cli.preview_json {
        if let Some(preview) = session.preview() {
            println!(
                "{}",
                serde_json::to_string_pretty(preview).context("Failed to serialize preview")?
            );
        }
        return Ok(());
    }

    // ── Download ─────────────────────────────────────────────────────────
    let pages = session.preview().and_then(PreviewState::image_count);
    let dir = match &cli.output {
        Some(path) if path.is_dir() => path.clone(),
        Some(path) => {
            if let Some(name) = path.file_name() {
                session.set_output_filename(name.to_string_lossy());
            }
            match path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            }
        }
        None => PathBuf::from("."),
    };

    let written = session
        .download(&dir)
        .await
        .context("Failed to write output")?;
    report_written(cli, kind, &written, pages)?;
    Ok(())
}

/// Drop pages listed in `remove`, then apply `order`. Both are 1-based.
fn apply_edits(session: &mut ConverterSession, remove: &[usize], order: &[usize]) -> Result<()> {
    if !remove.is_empty() {
        let mut positions = to_zero_based(remove, "--remove")?;
        positions.sort_unstable();
        positions.dedup();
        for index in positions.into_iter().rev() {
            session
                .remove_image(index)
                .with_context(|| format!("Cannot remove page {}", index + 1))?;
        }
    }
    if !order.is_empty() {
        let positions = to_zero_based(order, "--order")?;
        session
            .reorder_images(&positions)
            .context("Cannot reorder pages")?;
    }
    Ok(())
}

fn to_zero_based(pages: &[usize], flag: &str) -> Result<Vec<usize>> {
    pages
        .iter()
        .map(|&p| {
            if p < 1 {
                bail!("{flag}: pages are 1-indexed, minimum is 1 (got {p})");
            }
            Ok(p - 1)
        })
        .collect()
}

fn print_options(options: &[&ConversionOption], json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(options).context("Failed to serialize options")?
        );
        return Ok(());
    }
    if options.is_empty() {
        println!("No conversions available.");
    }
    for o in options {
        println!(
            "  {:<14} {:<14} {}",
            cyan(o.id.tag()),
            bold(o.label),
            dim(o.description)
        );
    }
    Ok(())
}

fn report_written(cli: &Cli, kind: ConversionKind, path: &Path, pages: Option<usize>) -> Result<()> {
    let size_bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    if cli.json {
        let out = WrittenOutput {
            path: path.display().to_string(),
            conversion: kind,
            size_bytes,
            pages,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("Failed to serialize result")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {}  {} bytes  →  {}",
            green("✔"),
            kind.option().label,
            size_bytes,
            bold(&path.display().to_string()),
        );
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .max_upload_mb(cli.max_size_mb)
        .raster_format(cli.image_format.into())
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_numbers_are_one_based() {
        assert_eq!(to_zero_based(&[3, 1, 2], "--order").unwrap(), [2, 0, 1]);
        assert!(to_zero_based(&[0], "--remove").is_err());
    }

    #[test]
    fn cli_parses_lists() {
        let cli = Cli::parse_from(["fileconv", "--order", "3,1,2", "--remove", "4", "a.pdf"]);
        assert_eq!(cli.order, [3, 1, 2]);
        assert_eq!(cli.remove, [4]);
        assert_eq!(cli.inputs, ["a.pdf"]);
    }

    #[test]
    fn each_pass_gets_a_live_bar_and_one_summary() {
        let progress = CliProgressCallback::with_bar(ProgressBar::hidden());

        progress.on_conversion_start(3);
        progress.on_item_complete(1, 3, 10);
        progress.on_conversion_complete(3);
        assert!(progress.bar().is_finished());
        assert!(progress.summarized.load(Ordering::SeqCst));

        progress.on_conversion_start(2);
        let bar = progress.bar();
        assert!(!bar.is_finished());
        assert_eq!(bar.length(), Some(2));
        assert_eq!(bar.position(), 0);
        assert!(!progress.take_summary());
    }

    #[test]
    fn errors_suppress_the_summary() {
        let progress = CliProgressCallback::with_bar(ProgressBar::hidden());
        progress.on_conversion_start(1);
        progress.on_item_error(1, 1, "broken");
        assert!(!progress.take_summary());
    }

    #[test]
    fn list_needs_no_input() {
        let cli = Cli::parse_from(["fileconv", "--list"]);
        assert!(cli.list);
        assert!(cli.inputs.is_empty());
    }
}
