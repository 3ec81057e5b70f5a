use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::app_config::Config;
use crate::audio;
use crate::eaf::ElanData;
use crate::export;
use crate::file_utils::{FileManager, FileType};
use crate::segments::Segment;

// @module: Application controller for batch document processing

// @const: Folder summary log written next to the processed documents
pub const FOLDER_LOG_FILE: &str = "elan-data.log";

/// Export target of the `rttm` and `text` commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Rttm,
    Text,
}

impl ExportFormat {
    // @returns: Output file extension
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Rttm => "rttm",
            Self::Text => "txt",
        }
    }
}

/// Result of exporting one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Output written to the path
    Written(PathBuf),
    /// Output already existed and overwrite is off
    Skipped(PathBuf),
}

/// Counts of a folder run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderSummary {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Output directory for a document: the configured one, or the document's own
    fn output_dir_for(&self, input_file: &Path) -> PathBuf {
        match &self.config.output.output_dir {
            Some(dir) => dir.clone(),
            None => input_file
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    /// Export one document
    pub fn export_file(&self, input_file: &Path, format: ExportFormat) -> Result<ExportOutcome> {
        if !FileManager::file_exists(input_file) {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }

        let output_dir = self.output_dir_for(input_file);
        FileManager::ensure_dir(&output_dir)?;

        let output_path = FileManager::generate_output_path(input_file, &output_dir, format.extension());
        if output_path.exists() && !self.config.output.overwrite {
            warn!(
                "Skipping {}, {} already exists (use --overwrite to replace it)",
                input_file.display(),
                output_path.display()
            );
            return Ok(ExportOutcome::Skipped(output_path));
        }

        let eaf = ElanData::from_file(input_file).with_context(|| format!("Failed to read {}", input_file.display()))?;
        let filter = &self.config.export.filter;

        match format {
            ExportFormat::Rttm => export::eaf_to_rttm(&eaf, &output_path, filter)?,
            ExportFormat::Text => match &self.config.export.text_template {
                Some(template) => {
                    let formatter: export::Formatter = &|segment: &Segment| export::render_template(template, segment);
                    export::eaf_to_text(&eaf, &output_path, filter, Some(formatter))?
                }
                None => export::eaf_to_text(&eaf, &output_path, filter, None)?,
            },
        }

        info!("Success: {}", output_path.display());
        Ok(ExportOutcome::Written(output_path))
    }

    /// Export a single document or every `.eaf` below a directory
    pub fn run(&self, input: &Path, format: ExportFormat) -> Result<()> {
        if input.is_dir() {
            self.run_folder(input, format)?;
            Ok(())
        } else if input.is_file() {
            self.export_file(input, format).map(|_| ())
        } else {
            Err(anyhow!("Input path does not exist: {:?}", input))
        }
    }

    /// Export every `.eaf` below a directory, reporting progress
    ///
    /// Failures are counted and logged; the run continues with the next file.
    pub fn run_folder(&self, input_dir: &Path, format: ExportFormat) -> Result<FolderSummary> {
        let start_time = std::time::Instant::now();

        if !FileManager::dir_exists(input_dir) {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let documents = FileManager::find_files(input_dir, "eaf")?;
        if documents.is_empty() {
            return Err(anyhow!("No .eaf files found in directory: {:?}", input_dir));
        }

        let folder_pb = ProgressBar::new(documents.len() as u64);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        folder_pb.set_style(template_result.progress_chars("█▓▒░"));
        folder_pb.set_message("Processing files");

        let mut summary = FolderSummary::default();

        for document in &documents {
            let file_name = document
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            folder_pb.set_message(format!("Processing: {}", file_name));

            match self.export_file(document, format) {
                Ok(ExportOutcome::Written(_)) => summary.processed += 1,
                Ok(ExportOutcome::Skipped(_)) => summary.skipped += 1,
                Err(e) => {
                    error!("Error processing file {}: {:#}", file_name, e);
                    summary.errors += 1;
                }
            }

            folder_pb.inc(1);
        }

        folder_pb.finish_with_message("Folder processing complete");

        let summary_message = format!(
            "Folder processing completed: {} processed, {} skipped, {} errors",
            summary.processed, summary.skipped, summary.errors
        );
        info!("{}", summary_message);

        let log_file_path = input_dir.join(FOLDER_LOG_FILE);
        let entry = format!(
            "{} ({} export of {}) - Duration: {}",
            summary_message,
            format.extension(),
            input_dir.display(),
            Self::format_duration(start_time.elapsed())
        );
        if let Err(e) = FileManager::append_to_log_file(&log_file_path, &entry) {
            warn!("Failed to write folder log: {}", e);
        }

        Ok(summary)
    }

    /// Human-readable overview of a document
    pub fn describe(&self, input_file: &Path) -> Result<String> {
        if FileManager::detect_file_type(input_file)? != FileType::Eaf {
            warn!("{} does not look like an ELAN document", input_file.display());
        }

        let eaf = ElanData::from_file(input_file).with_context(|| format!("Failed to read {}", input_file.display()))?;

        let mut out = eaf.to_string();
        writeln!(out, "segments: {}", eaf.len())?;
        for name in eaf.tier_names() {
            let count = eaf.segments().tier_segments(&name).count();
            let tier = eaf.tier(&name);
            let parent = tier
                .and_then(|t| t.parent.as_deref())
                .map(|p| format!(", parent {}", p))
                .unwrap_or_default();
            let tier_type = tier.map(|t| t.tier_type.as_str()).unwrap_or_default();
            writeln!(out, "  {} ({}{}): {} segments", name, tier_type, parent, count)?;
        }

        Ok(out)
    }

    /// Create and save a new document
    pub fn create(&self, file: &Path, tiers: &[String], audio: Option<&Path>, remove_default: bool) -> Result<ElanData> {
        let mut eaf = ElanData::create_eaf(file, audio, tiers, remove_default)?;
        eaf.save(None, self.config.output.overwrite)
            .with_context(|| format!("Failed to save {}", file.display()))?;

        info!("Created {}", file.display());
        Ok(eaf)
    }

    /// Sound wave data of a document's audio, written as JSON to `output` or returned
    pub fn sound_wave(
        &self,
        input_file: &Path,
        start: f64,
        stop: Option<f64>,
        channels: &[(String, usize)],
        output: Option<&Path>,
    ) -> Result<String> {
        let eaf = ElanData::from_file(input_file).with_context(|| format!("Failed to read {}", input_file.display()))?;
        let wave = audio::sound_wave(&eaf, start, stop, channels)?;
        let json = serde_json::to_string_pretty(&wave).context("Failed to serialize sound wave")?;

        if let Some(output) = output {
            if output.exists() && !self.config.output.overwrite {
                return Err(anyhow!("{} already exists (use --overwrite to replace it)", output.display()));
            }
            FileManager::write_to_file(output, &json)?;
            info!("Success: {}", output.display());
        }

        Ok(json)
    }

    // Format duration in a human-readable format
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
