use std::path::{Path, PathBuf};
use std::process::Stdio;
use base64::{engine::general_purpose, Engine as _};
use tempfile::TempDir;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::{ConversionError, ConversionResult};
use crate::config::ConversionConfig;
use crate::models::payload::{CompressionQuality, FileInput, FileOutput};

/// Runs LibreOffice, Ghostscript and qpdf as isolated subprocesses.
///
/// Every call stages its files in a fresh temporary directory. The
/// directory is owned by a [`TempDir`] guard, so it is removed when the
/// call returns on any path, including timeouts and tool failures.
#[derive(Clone)]
pub struct PdfToolkit {
    config: ConversionConfig,
}

impl PdfToolkit {
    pub fn new(config: ConversionConfig) -> Self {
        Self { config }
    }

    pub async fn document_to_pdf(&self, file: &FileInput) -> ConversionResult<FileOutput> {
        let staging = staging_dir()?;
        let input_path = stage_file(staging.path(), 0, file).await?;

        let output_dir = staging.path().join("out");
        tokio::fs::create_dir(&output_dir)
            .await
            .map_err(|e| ConversionError::Tool(format!("Failed to create output directory: {e}")))?;

        self.run(
            &self.config.libreoffice_command,
            &[
                "--headless".into(),
                "--norestore".into(),
                format!("-env:UserInstallation=file://{}", staging.path().join("profile").display()),
                "--convert-to".into(),
                "pdf".into(),
                "--outdir".into(),
                output_dir.display().to_string(),
                input_path.display().to_string(),
            ],
        )
        .await?;

        let produced = input_path
            .file_stem()
            .map(|stem| output_dir.join(stem).with_extension("pdf"))
            .ok_or_else(|| ConversionError::Tool("Staged input has no file stem".to_string()))?;

        read_output(&produced, pdf_file_name(&file.file_name, None)).await
    }

    pub async fn compress(&self, file: &FileInput, quality: CompressionQuality) -> ConversionResult<FileOutput> {
        let staging = staging_dir()?;
        let input_path = stage_file(staging.path(), 0, file).await?;
        let output_path = staging.path().join("compressed.pdf");

        self.run(
            &self.config.ghostscript_command,
            &[
                "-sDEVICE=pdfwrite".into(),
                "-dCompatibilityLevel=1.4".into(),
                format!("-dPDFSETTINGS={}", quality.pdf_settings()),
                "-dNOPAUSE".into(),
                "-dQUIET".into(),
                "-dBATCH".into(),
                "-dSAFER".into(),
                format!("-sOutputFile={}", output_path.display()),
                input_path.display().to_string(),
            ],
        )
        .await?;

        let output = read_output(&output_path, pdf_file_name(&file.file_name, Some("compressed"))).await?;
        info!(
            original_bytes = file.bytes.len(),
            compressed_bytes = output.size_bytes,
            "PDF compressed"
        );
        Ok(output)
    }

    pub async fn merge(&self, files: &[FileInput]) -> ConversionResult<FileOutput> {
        let staging = staging_dir()?;
        let mut args: Vec<String> = vec!["--empty".into(), "--pages".into()];
        for (index, file) in files.iter().enumerate() {
            let path = stage_file(staging.path(), index, file).await?;
            args.push(path.display().to_string());
        }
        let output_path = staging.path().join("merged.pdf");
        args.push("--".into());
        args.push(output_path.display().to_string());

        self.run(&self.config.qpdf_command, &args).await?;

        read_output(&output_path, "merged.pdf".to_string()).await
    }

    async fn run(&self, program: &str, args: &[String]) -> ConversionResult<()> {
        debug!(program, ?args, "Running conversion tool");

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        match timeout(self.config.tool_timeout, child).await {
            Ok(Ok(output)) if output.status.success() => Ok(()),
            // qpdf exits 3 when it succeeded with warnings
            Ok(Ok(output)) if program.ends_with("qpdf") && output.status.code() == Some(3) => {
                warn!(program, "Tool finished with warnings: {}", String::from_utf8_lossy(&output.stderr));
                Ok(())
            }
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let detail = stderr.lines().last().unwrap_or("no diagnostic output").trim().to_string();
                warn!(program, status = ?output.status.code(), "Tool failed: {stderr}");
                Err(ConversionError::Tool(format!("{program} exited with {}: {detail}", output.status)))
            }
            Ok(Err(e)) => Err(ConversionError::Tool(format!("Failed to start {program}: {e}"))),
            Err(_) => Err(ConversionError::Timeout(format!(
                "{program} did not finish within {} seconds",
                self.config.tool_timeout.as_secs()
            ))),
        }
    }
}

fn staging_dir() -> ConversionResult<TempDir> {
    tempfile::Builder::new()
        .prefix("convertkit-")
        .tempdir()
        .map_err(|e| ConversionError::Tool(format!("Failed to create staging directory: {e}")))
}

/// Staged under a generated name so caller-supplied names never reach the
/// filesystem or the tool's argument list.
async fn stage_file(dir: &Path, index: usize, file: &FileInput) -> ConversionResult<PathBuf> {
    let extension = Path::new(&file.file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("bin")
        .to_lowercase();
    let path = dir.join(format!("input_{index}.{extension}"));

    tokio::fs::write(&path, &file.bytes)
        .await
        .map_err(|e| ConversionError::Tool(format!("Failed to stage input file: {e}")))?;
    Ok(path)
}

async fn read_output(path: &Path, file_name: String) -> ConversionResult<FileOutput> {
    let bytes = tokio::fs::read(path).await.map_err(|_| {
        ConversionError::Tool(format!("Output file not created: {file_name}"))
    })?;

    if bytes.is_empty() {
        return Err(ConversionError::Tool(format!("Output file is empty: {file_name}")));
    }

    Ok(FileOutput {
        file_name,
        content_type: mime::APPLICATION_PDF.essence_str().to_string(),
        size_bytes: bytes.len(),
        file_data: general_purpose::STANDARD.encode(&bytes),
    })
}

fn pdf_file_name(original: &str, suffix: Option<&str>) -> String {
    let stem = Path::new(original)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document");
    match suffix {
        Some(suffix) => format!("{stem}_{suffix}.pdf"),
        None => format!("{stem}.pdf"),
    }
}
