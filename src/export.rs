/*!
 * Exporters from `.eaf` documents to line-oriented text formats.
 *
 * - RTTM (Rich Transcription Time Marked), one `SPEAKER` line per segment
 * - Plain text, one line per segment with a configurable layout
 */

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::eaf::ElanData;
use crate::errors::EafError;
use crate::segments::Segment;

// @const: `{name}` placeholders of a text template
pub static TEMPLATE_PLACEHOLDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").expect("valid placeholder regex"));

// @const: Placeholders understood by `render_template`
pub const TEMPLATE_PLACEHOLDERS: [&str; 6] = ["tier", "start", "end", "duration", "id", "text"];

/// Formats one segment as one line of text (without the trailing newline)
pub type Formatter<'a> = &'a dyn Fn(&Segment) -> String;

/// Convert milliseconds to seconds with six decimals
fn seconds(ms: u64) -> String {
    format!("{:.6}", ms as f64 / 1000.0)
}

/// One RTTM `SPEAKER` line; spaces in the tier name become underscores
pub fn rttm_line(file_id: &str, segment: &Segment) -> String {
    let speaker = segment.tier.trim().replace(' ', "_");
    format!(
        "SPEAKER {} 1 {} {} <NA> <NA> {} <NA> <NA>",
        file_id,
        seconds(segment.start),
        seconds(segment.duration()),
        speaker
    )
}

/// Default text line: `{tier} {start}-{end}: {text}`
pub fn text_line(segment: &Segment) -> String {
    format!("{} {}-{}: {}", segment.tier, segment.start, segment.end, segment.text.trim())
}

/// Fill a template's placeholders from a segment; unknown placeholders are kept verbatim
pub fn render_template(template: &str, segment: &Segment) -> String {
    TEMPLATE_PLACEHOLDER_REGEX
        .replace_all(template, |caps: &regex::Captures| match &caps[1] {
            "tier" => segment.tier.clone(),
            "start" => segment.start.to_string(),
            "end" => segment.end.to_string(),
            "duration" => segment.duration().to_string(),
            "id" => segment.id.clone(),
            "text" => segment.text.trim().to_string(),
            _ => caps[0].to_string(),
        })
        .into_owned()
}

fn write_lines<'a>(
    dst: &Path,
    segments: impl Iterator<Item = &'a Segment>,
    line: impl Fn(&Segment) -> String,
) -> Result<usize, EafError> {
    let mut out = BufWriter::new(File::create(dst)?);
    let mut written = 0;

    for segment in segments {
        out.write_all(line(segment).as_bytes())?;
        out.write_all(b"\n")?;
        written += 1;
    }

    out.flush()?;
    Ok(written)
}

/// Write every unfiltered segment of `eaf` as RTTM
pub fn eaf_to_rttm(eaf: &ElanData, dst: impl AsRef<Path>, filter: &[String]) -> Result<(), EafError> {
    let dst = dst.as_ref();
    let file_id = eaf
        .file()
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let segments = eaf.iter().filter(|segment| !filter.contains(&segment.tier));
    let written = write_lines(dst, segments, |segment| rttm_line(&file_id, segment))?;

    info!("Wrote {} RTTM lines to {}", written, dst.display());
    Ok(())
}

/// Write every unfiltered segment of `eaf` as a line of text
///
/// Without a `formatter`, lines use [`text_line`].
pub fn eaf_to_text(
    eaf: &ElanData,
    dst: impl AsRef<Path>,
    filter: &[String],
    formatter: Option<Formatter>,
) -> Result<(), EafError> {
    let dst = dst.as_ref();
    let segments = eaf.iter().filter(|segment| !filter.contains(&segment.tier));

    let written = match formatter {
        Some(formatter) => write_lines(dst, segments, formatter)?,
        None => write_lines(dst, segments, text_line)?,
    };

    info!("Wrote {} text lines to {}", written, dst.display());
    Ok(())
}

/// Read `src` and export it as RTTM; nothing is created when `src` cannot be read
pub fn rttm_from_file(src: impl AsRef<Path>, dst: impl AsRef<Path>, filter: &[String]) -> Result<(), EafError> {
    let eaf = ElanData::from_file(src)?;
    eaf_to_rttm(&eaf, dst, filter)
}

/// Read `src` and export it as text; nothing is created when `src` cannot be read
pub fn text_from_file(
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    filter: &[String],
    formatter: Option<Formatter>,
) -> Result<(), EafError> {
    let eaf = ElanData::from_file(src)?;
    eaf_to_text(&eaf, dst, filter, formatter)
}
