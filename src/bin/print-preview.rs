//! CLI binary for print-preview.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PreviewConfig`, runs one preview, and writes the gallery.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use print_preview::preview::write_atomic;
use print_preview::{
    inspect, preview_form, render_error_page, FormFields, OutputFormat, PreviewConfig, PreviewOutput,
    PreviewProgressCallback, ProgressCallback, SofficeConverter,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar with one log line per finished page. Pages finish out of
/// order when `--concurrency` is above 1.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Starts as a spinner; `on_preview_start` turns it into a bar once the
    /// page count is known.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Normalising document…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Annotating");
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl PreviewProgressCallback for CliProgressCallback {
    fn on_preview_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Annotating {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, bytes: usize) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{:>6} KiB", bytes / 1024)),
            dim(&format!("{secs:.2}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(['…']).collect()
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.2}s")),
        ));
        self.bar.inc(1);
    }

    fn on_preview_complete(&self, total_pages: usize, success_count: usize) {
        self.bar.finish_and_clear();
        if self.errors.load(Ordering::SeqCst) > 0 {
            eprintln!("{} preview aborted after a page failed", red("✘"));
        } else if success_count == total_pages && total_pages > 0 {
            eprintln!(
                "{} {} pages annotated",
                green("✔"),
                bold(&success_count.to_string())
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Gallery HTML to stdout
  print-preview report.pdf > preview.html

  # Black & white, landscape, two holes, corner staple
  print-preview --color-mode black_and_white --orientation landscape \
      --punch two_holes --binding corner_staple slides.pptx -o preview.html

  # Self-contained gallery with embedded JPEG pages
  print-preview --inline --format jpeg scan.png -o scan.html

  # Page count and metadata only
  print-preview --inspect-only report.pdf

OPTION VALUES:
  --color-mode   color | black_and_white
  --orientation  portrait | landscape
  --punch        no_hole | two_holes | three_holes
  --binding      no_staple | corner_staple
  camelCase spellings (blackAndWhite, twoHoles, ...) are accepted too.

ENVIRONMENT VARIABLES:
  PREVIEW_*        every flag, e.g. PREVIEW_DPI=200
  PDFIUM_LIB_PATH  pdfium library file or directory (fallback for --pdfium-lib)
  RUST_LOG         overrides the log filter
"#;

/// Preview documents with print finishing applied.
#[derive(Parser, Debug)]
#[command(
    name = "print-preview",
    version,
    about = "Preview documents with grayscale, rotation, punch holes and staples applied",
    long_about = "Normalise an image, PDF, or Word/PowerPoint document into pages, draw the \
requested print finishing onto each page, store the pages per upload, and emit an HTML \
carousel of the result.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file path or HTTP/HTTPS URL (jpg, jpeg, png, pdf, doc, docx, ppt, pptx).
    input: String,

    /// color or black_and_white.
    #[arg(long, env = "PREVIEW_COLOR_MODE", default_value = "color")]
    color_mode: String,

    /// portrait or landscape.
    #[arg(long, env = "PREVIEW_ORIENTATION", default_value = "portrait")]
    orientation: String,

    /// no_hole, two_holes or three_holes.
    #[arg(long, env = "PREVIEW_PUNCH", default_value = "no_hole")]
    punch: String,

    /// no_staple or corner_staple.
    #[arg(long, env = "PREVIEW_BINDING", default_value = "no_staple")]
    binding: String,

    /// Write the gallery HTML to this file instead of stdout.
    #[arg(short, long, env = "PREVIEW_OUTPUT")]
    output: Option<PathBuf>,

    /// Root for uploads and conversion scratch files.
    #[arg(long, env = "PREVIEW_UPLOAD_DIR", default_value = "uploaded_files")]
    upload_dir: PathBuf,

    /// Root for annotated page images.
    #[arg(long, env = "PREVIEW_IMAGE_DIR", default_value = "pdf_images")]
    image_dir: PathBuf,

    /// URL prefix the image directory is served under.
    #[arg(long, env = "PREVIEW_STATIC_PREFIX", default_value = "/static")]
    static_prefix: String,

    /// Embed pages in the gallery as data URIs.
    #[arg(long, env = "PREVIEW_INLINE")]
    inline: bool,

    /// Rendering DPI for PDF pages (72–400).
    #[arg(long, env = "PREVIEW_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Stored image format.
    #[arg(long, env = "PREVIEW_FORMAT", value_enum, default_value = "png")]
    format: FormatArg,

    /// JPEG quality (1–100).
    #[arg(long, env = "PREVIEW_JPEG_QUALITY", default_value_t = 85,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Pages annotated at once.
    #[arg(short, long, env = "PREVIEW_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PREVIEW_PASSWORD")]
    password: Option<String>,

    /// Office converter program (soffice/libreoffice). Looked up on PATH if unset.
    #[arg(long, env = "PREVIEW_CONVERTER")]
    converter: Option<PathBuf>,

    /// pdfium library file or directory.
    #[arg(long, env = "PREVIEW_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Print the PreviewOutput as JSON instead of the gallery HTML.
    #[arg(long, env = "PREVIEW_JSON")]
    json: bool,

    /// Print page count and metadata only.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "PREVIEW_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PREVIEW_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PREVIEW_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PREVIEW_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Png,
    Jpeg,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Png => OutputFormat::Png,
            FormatArg::Jpeg => OutputFormat::Jpeg,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn PreviewProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&cli.input, &config).await.context("Failed to inspect document")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialize document info")?
            );
        } else {
            println!("File:         {}", cli.input);
            println!("Kind:         {:?}", info.kind);
            println!("Pages:        {}", info.page_count);
            if let Some(ref t) = info.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = info.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = info.subject {
                println!("Subject:      {}", s);
            }
            if let Some(ref v) = info.pdf_version {
                println!("PDF Version:  {}", v);
            }
            if let Some(ref p) = info.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = info.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    // ── Run preview ──────────────────────────────────────────────────────
    let form = FormFields::new(&cli.color_mode, &cli.orientation, &cli.punch, &cli.binding);
    let output = match preview_form(&cli.input, &form, &config).await {
        Ok(output) => output,
        Err(e) => {
            if let Some(ref path) = cli.output {
                // The error page is best effort; the original error is what we report.
                if let Err(write_err) = write_atomic(path, &render_error_page(&e.to_string())).await {
                    tracing::warn!("Could not write error page: {}", write_err);
                }
            }
            let category = e.category();
            return Err(anyhow::Error::new(e).context(format!("Preview failed ({category:?})")));
        }
    };

    if let Some(ref path) = cli.output {
        write_atomic(path, &output.gallery_html)
            .await
            .context("Failed to write gallery")?;
    } else if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.gallery_html.as_bytes())
            .context("Failed to write to stdout")?;
        handle.write_all(b"\n").ok();
    }

    if !cli.quiet {
        print_summary(&cli, &output);
    }
    Ok(())
}

fn print_summary(cli: &Cli, output: &PreviewOutput) {
    let target = match cli.output {
        Some(ref p) => bold(&p.display().to_string()),
        None => dim("stdout"),
    };
    eprintln!(
        "{}  {} pages  {} KiB  {}ms  →  {}",
        green("✔"),
        output.stats.total_pages,
        output.stats.total_bytes / 1024,
        output.stats.total_duration_ms,
        target,
    );
    eprintln!(
        "   upload {}  {}",
        dim(&output.upload_id),
        dim(&output.options.to_string())
    );
}

/// Map CLI args to `PreviewConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PreviewConfig> {
    let mut builder = PreviewConfig::builder()
        .dpi(cli.dpi)
        .concurrency(cli.concurrency)
        .upload_dir(&cli.upload_dir)
        .image_dir(&cli.image_dir)
        .static_url_prefix(&cli.static_prefix)
        .inline_images(cli.inline)
        .output_format(cli.format.into())
        .jpeg_quality(cli.jpeg_quality)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(ref program) = cli.converter {
        builder = builder.converter(Arc::new(SofficeConverter::new(program)));
    }
    let pdfium_lib = cli
        .pdfium_lib
        .clone()
        .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));
    if let Some(lib) = pdfium_lib {
        builder = builder.pdfium_lib_path(lib);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
