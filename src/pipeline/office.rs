//! Office-document conversion behind the [`DocumentConverter`] trait.
//!
//! Word and PowerPoint files are turned into PDF by an external program and
//! then rasterised exactly like an uploaded PDF. The pipeline only knows the
//! trait, so a headless LibreOffice, a cloud conversion API, or a test double
//! can be swapped in through [`crate::config::PreviewConfig::converter`].
//!
//! Conversion runs inside a scratch directory that is deleted when the call
//! returns. Only a successful PDF is moved out of it, so a crashed converter
//! never leaves half-written files in the upload workspace.

use crate::error::PreviewError;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

/// Format a converter is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Pdf,
}

impl TargetFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Pdf => "pdf",
        }
    }
}

/// An external document converter.
///
/// Implementations are called from a blocking thread and may take as long as
/// the backend needs.
pub trait DocumentConverter: Send + Sync {
    /// Short name for logs, e.g. `"soffice"`.
    fn name(&self) -> &str;

    /// Convert `input` into `target`, writing the result inside `out_dir`,
    /// and return the produced file's path.
    fn convert(&self, input: &Path, target: TargetFormat, out_dir: &Path) -> Result<PathBuf, PreviewError>;
}

/// LibreOffice in headless mode (`soffice --headless --convert-to pdf`).
#[derive(Debug, Clone)]
pub struct SofficeConverter {
    program: PathBuf,
}

const SOFFICE_NAMES: &[&str] = &["soffice", "libreoffice"];

impl SofficeConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Look for a runnable `soffice` or `libreoffice` on `PATH`.
    pub fn detect() -> Option<Self> {
        let path_var = std::env::var_os("PATH")?;
        Self::detect_in(&path_var)
    }

    /// Like [`detect`](Self::detect), over an explicit `PATH`-style list.
    ///
    /// A program that is found but fails its `--version` check counts as
    /// missing.
    pub fn detect_in(path_var: &OsStr) -> Option<Self> {
        let converter = search_path(path_var, SOFFICE_NAMES).map(Self::new)?;
        if converter.is_available() {
            Some(converter)
        } else {
            warn!(
                "Ignoring {}: it does not run (`--version` failed)",
                converter.program.display()
            );
            None
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Check the program starts and reports a version.
    pub fn is_available(&self) -> bool {
        let result = Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        matches!(result, Ok(status) if status.success())
    }
}

impl DocumentConverter for SofficeConverter {
    fn name(&self) -> &str {
        "soffice"
    }

    fn convert(&self, input: &Path, target: TargetFormat, out_dir: &Path) -> Result<PathBuf, PreviewError> {
        info!(
            "Converting {} to {} with {}",
            input.display(),
            target.extension(),
            self.program.display()
        );

        let output = Command::new(&self.program)
            .arg("--headless")
            .arg("--norestore")
            .arg("--convert-to")
            .arg(target.extension())
            .arg("--outdir")
            .arg(out_dir)
            .arg(input)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| PreviewError::ConversionFailed {
                path: input.to_path_buf(),
                detail: format!("failed to run {}: {}", self.program.display(), e),
            })?;

        if !output.status.success() {
            return Err(PreviewError::ConversionFailed {
                path: input.to_path_buf(),
                detail: format!(
                    "{} exited with {}: {}",
                    self.program.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let stem = input.file_stem().unwrap_or_else(|| OsStr::new("document"));
        let produced = out_dir.join(format!("{}.{}", stem.to_string_lossy(), target.extension()));
        if !produced.is_file() {
            return Err(PreviewError::ConversionFailed {
                path: input.to_path_buf(),
                detail: format!("converter reported success but {} is missing", produced.display()),
            });
        }
        Ok(produced)
    }
}

/// Find the first of `names` in a `PATH`-style list of directories.
pub fn search_path(path_var: &OsStr, names: &[&str]) -> Option<PathBuf> {
    std::env::split_paths(path_var).find_map(|dir| {
        names.iter().find_map(|name| {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
            let exe = candidate.with_extension("exe");
            exe.is_file().then_some(exe)
        })
    })
}

/// Convert `input` to PDF into `dest_dir`, with scratch cleanup on failure.
///
/// The converter writes into a temporary directory under `dest_dir`; only a
/// produced PDF is moved up into `dest_dir` itself.
pub fn convert_to_pdf(
    converter: &dyn DocumentConverter,
    input: &Path,
    dest_dir: &Path,
) -> Result<PathBuf, PreviewError> {
    let scratch = tempfile::Builder::new()
        .prefix("convert-")
        .tempdir_in(dest_dir)
        .map_err(|e| PreviewError::io(dest_dir, e))?;

    let produced = converter.convert(input, TargetFormat::Pdf, scratch.path())?;

    let file_name = produced
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("converted.pdf"));
    let final_path = dest_dir.join(file_name);
    std::fs::rename(&produced, &final_path).map_err(|e| PreviewError::io(&final_path, e))?;

    debug!(
        "{} produced {}",
        converter.name(),
        final_path.display()
    );
    Ok(final_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Writes a partial file, then fails like a crashed converter would.
    struct CrashingConverter;

    impl DocumentConverter for CrashingConverter {
        fn name(&self) -> &str {
            "crashing"
        }

        fn convert(&self, input: &Path, _target: TargetFormat, out_dir: &Path) -> Result<PathBuf, PreviewError> {
            std::fs::write(out_dir.join("partial.pdf"), b"%PDF-1.7 trunc").unwrap();
            Err(PreviewError::ConversionFailed {
                path: input.to_path_buf(),
                detail: "converter crashed".into(),
            })
        }
    }

    /// Copies the input as if it were already a PDF.
    struct CopyingConverter;

    impl DocumentConverter for CopyingConverter {
        fn name(&self) -> &str {
            "copying"
        }

        fn convert(&self, input: &Path, target: TargetFormat, out_dir: &Path) -> Result<PathBuf, PreviewError> {
            let out = out_dir
                .join(input.file_stem().unwrap())
                .with_extension(target.extension());
            std::fs::copy(input, &out).unwrap();
            Ok(out)
        }
    }

    #[test]
    fn failed_conversion_leaves_no_scratch_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("report.docx");
        std::fs::write(&input, b"not really a docx").unwrap();
        let dest = dir.path().join("work");
        std::fs::create_dir(&dest).unwrap();

        let err = convert_to_pdf(&CrashingConverter, &input, &dest).unwrap_err();
        assert!(matches!(err, PreviewError::ConversionFailed { .. }));
        assert_eq!(std::fs::read_dir(&dest).unwrap().count(), 0);
    }

    #[test]
    fn successful_conversion_moves_pdf_into_dest() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("slides.pptx");
        std::fs::write(&input, b"%PDF-1.4").unwrap();

        let pdf = convert_to_pdf(&CopyingConverter, &input, dir.path()).unwrap();
        assert_eq!(pdf, dir.path().join("slides.pdf"));
        assert!(pdf.is_file());
        // Only the input and the PDF remain; the scratch dir is gone.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn missing_program_is_a_conversion_failure() {
        let dir = tempfile::tempdir().unwrap();
        let converter = SofficeConverter::new(dir.path().join("no-such-soffice"));
        assert!(!converter.is_available());
        let err = converter
            .convert(&dir.path().join("a.doc"), TargetFormat::Pdf, dir.path())
            .unwrap_err();
        assert!(matches!(err, PreviewError::ConversionFailed { .. }));
    }

    #[test]
    fn unrunnable_program_on_path_is_not_a_converter() {
        let bin = tempfile::tempdir().unwrap();
        // Empty and not executable.
        std::fs::write(bin.path().join("soffice"), b"").unwrap();
        let path_var = std::env::join_paths([bin.path()]).unwrap();

        assert_eq!(search_path(&path_var, SOFFICE_NAMES), Some(bin.path().join("soffice")));
        assert!(SofficeConverter::detect_in(&path_var).is_none());
    }

    #[test]
    fn empty_path_finds_no_converter() {
        let empty = tempfile::tempdir().unwrap();
        let path_var = std::env::join_paths([empty.path()]).unwrap();
        assert!(SofficeConverter::detect_in(&path_var).is_none());
    }

    #[test]
    fn search_path_finds_first_match() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        std::fs::write(b.path().join("libreoffice"), b"").unwrap();
        let path_var = std::env::join_paths([a.path(), b.path()]).unwrap();

        assert_eq!(
            search_path(&path_var, SOFFICE_NAMES),
            Some(b.path().join("libreoffice"))
        );
        assert_eq!(search_path(&path_var, &["pandoc"]), None);
    }
}
