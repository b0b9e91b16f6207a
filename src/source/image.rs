//! Local image analysis: embedded EXIF metadata and OCR text.

use std::io::Cursor;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{Record, SourceAdapter, SourceError, SourceId};
use crate::query::Query;

const METADATA_TIMEOUT: Duration = Duration::from_secs(10);
const OCR_TIMEOUT: Duration = Duration::from_secs(30);

const NO_METADATA: &str = "No metadata found in the image.";
const NO_TEXT: &str = "No readable text found in the image.";

fn image_bytes(query: &Query) -> Result<Arc<[u8]>, SourceError> {
    query
        .image
        .clone()
        .ok_or_else(|| SourceError::Decode("query carries no image bytes".to_string()))
}

/// EXIF tag/value pairs, minus the embedded thumbnail.
pub struct ImageMetadata;

#[async_trait]
impl SourceAdapter for ImageMetadata {
    fn id(&self) -> SourceId {
        SourceId::ImageMetadata
    }

    fn timeout(&self) -> Duration {
        METADATA_TIMEOUT
    }

    async fn fetch(&self, query: &Query) -> Result<Record, SourceError> {
        let bytes = image_bytes(query)?;
        let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(&bytes[..])) {
            Ok(exif) => exif,
            Err(e) => {
                debug!(error = %e, "no readable EXIF container");
                return Err(SourceError::Empty(NO_METADATA.to_string()));
            }
        };

        let record = metadata_record(&exif);
        if record.is_empty() {
            return Err(SourceError::Empty(NO_METADATA.to_string()));
        }
        Ok(record)
    }
}

fn metadata_record(exif: &exif::Exif) -> Record {
    let mut record = Record::new();
    for field in exif.fields() {
        if field.ifd_num == exif::In::THUMBNAIL || field.tag == exif::Tag::MakerNote {
            continue;
        }
        let group = match field.tag.context() {
            exif::Context::Tiff => "Image",
            exif::Context::Exif => "EXIF",
            exif::Context::Gps => "GPS",
            exif::Context::Interop => "Interoperability",
            #[allow(unreachable_patterns)]
            _ => "Tag",
        };
        let value = field.display_value().with_unit(exif).to_string();
        record.push(
            format!("{group} {}", field.tag),
            value.trim_matches('"').to_string(),
        );
    }
    record
}

/// Page segmentation used for a recognition pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLayout {
    /// Engine default: full automatic page segmentation.
    Auto,
    /// A single uniform block of text (tesseract `--psm 6`); better for sparse text.
    SingleBlock,
}

/// Abstraction over the OCR engine so the two-pass logic can be tested without it.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// `png` is an 8-bit grayscale PNG.
    async fn recognize(&self, png: &[u8], layout: PageLayout) -> Result<String, SourceError>;
}

/// Runs the `tesseract` binary, feeding the image on stdin.
pub struct TesseractCli {
    program: String,
}

impl TesseractCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl TextRecognizer for TesseractCli {
    async fn recognize(&self, png: &[u8], layout: PageLayout) -> Result<String, SourceError> {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(["stdin", "stdout", "-l", "eng"]);
        if layout == PageLayout::SingleBlock {
            cmd.args(["--psm", "6"]);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let engine_err = |e: std::io::Error| SourceError::Engine(format!("{}: {e}", self.program));
        let mut child = cmd.spawn().map_err(engine_err)?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(png).await.map_err(engine_err)?;
        }
        let output = child.wait_with_output().await.map_err(engine_err)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let snippet: String = stderr.trim().chars().take(200).collect();
            return Err(SourceError::Engine(format!(
                "{} exited with {}: {snippet}",
                self.program, output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// OCR with a sparse-text retry when the default pass finds nothing.
pub struct ImageText<R> {
    recognizer: R,
}

impl<R: TextRecognizer> ImageText<R> {
    pub fn new(recognizer: R) -> Self {
        Self { recognizer }
    }
}

#[async_trait]
impl<R: TextRecognizer + 'static> SourceAdapter for ImageText<R> {
    fn id(&self) -> SourceId {
        SourceId::ImageText
    }

    fn timeout(&self) -> Duration {
        OCR_TIMEOUT
    }

    async fn fetch(&self, query: &Query) -> Result<Record, SourceError> {
        let bytes = image_bytes(query)?;
        let png = tokio::task::spawn_blocking(move || grayscale_png(&bytes))
            .await
            .map_err(|e| SourceError::Engine(format!("image conversion task failed: {e}")))??;

        let mut text = self.recognizer.recognize(&png, PageLayout::Auto).await?;
        if text.trim().is_empty() {
            debug!("default OCR pass empty, retrying with single-block layout");
            text = self
                .recognizer
                .recognize(&png, PageLayout::SingleBlock)
                .await?;
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(SourceError::Empty(NO_TEXT.to_string()));
        }
        let lines = text.lines().filter(|l| !l.trim().is_empty()).count();
        Ok(Record::new()
            .with("Text", text)
            .with("Lines", lines.to_string()))
    }
}

/// Decode any supported format and re-encode as single-channel PNG.
fn grayscale_png(bytes: &[u8]) -> Result<Vec<u8>, SourceError> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| SourceError::Decode(e.to_string()))?;
    let gray = DynamicImage::ImageLuma8(decoded.to_luma8());

    let mut png = Vec::new();
    gray.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| SourceError::Engine(format!("could not re-encode image: {e}")))?;
    Ok(png)
}
