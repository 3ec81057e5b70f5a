/*!
 * Tests for the RTTM and text exporters
 */

use anyhow::Result;
use elan_data::export::{self, Formatter};
use elan_data::{ElanData, Segment};
use std::fs;

use crate::common;

/// Test RTTM export of the sample with a filtered tier
#[test]
fn test_eafToRttm_withFilter_shouldSkipFilteredTier() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let eaf = ElanData::from_xml_str(temp_dir.path().join("interview.eaf"), common::SAMPLE_EAF)?;
    let dst = temp_dir.path().join("interview.rttm");

    export::eaf_to_rttm(&eaf, &dst, &["Gloss".to_string()])?;

    let content = fs::read_to_string(&dst)?;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
        lines,
        vec![
            "SPEAKER interview 1 0.000000 1.500000 <NA> <NA> Speaker_A <NA> <NA>",
            "SPEAKER interview 1 2.000000 2.200000 <NA> <NA> Speaker_A <NA> <NA>",
            "SPEAKER interview 1 1.500000 2.700000 <NA> <NA> Speaker_B <NA> <NA>",
        ]
    );
    Ok(())
}

/// Test default text export
#[test]
fn test_eafToText_withoutFormatter_shouldWriteDefaultLines() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let eaf = ElanData::from_xml_str("sample.eaf", common::SAMPLE_EAF)?;
    let dst = temp_dir.path().join("sample.txt");

    export::eaf_to_text(&eaf, &dst, &[], None)?;

    let content = fs::read_to_string(&dst)?;
    assert_eq!(content.lines().count(), 4);
    assert!(content.starts_with("Speaker A 0-1500: hello there\n"));
    assert!(content.ends_with("Gloss 0-1500: greeting\n"));
    Ok(())
}

/// Test text export with a custom formatter
#[test]
fn test_eafToText_withFormatter_shouldUseIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let eaf = ElanData::from_xml_str("sample.eaf", common::SAMPLE_EAF)?;
    let dst = temp_dir.path().join("sample.txt");

    let formatter: Formatter = &|segment: &Segment| segment.text.to_uppercase();
    export::eaf_to_text(&eaf, &dst, &["Speaker A".to_string(), "Gloss".to_string()], Some(formatter))?;

    assert_eq!(fs::read_to_string(&dst)?, "FINE THANKS\n");
    Ok(())
}

/// Test that an empty document produces an empty file
#[test]
fn test_eafToRttm_withEmptyDocument_shouldWriteEmptyFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let eaf = ElanData::new("empty.eaf")?;
    let dst = temp_dir.path().join("empty.rttm");

    export::eaf_to_rttm(&eaf, &dst, &[])?;

    assert!(dst.exists());
    assert!(fs::read_to_string(&dst)?.is_empty());
    Ok(())
}

/// Test that no output is created when the source cannot be read
#[test]
fn test_rttmFromFile_withMissingSource_shouldNotCreateOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dst = temp_dir.path().join("out.rttm");

    assert!(export::rttm_from_file(temp_dir.path().join("missing.eaf"), &dst, &[]).is_err());
    assert!(!dst.exists());
    Ok(())
}

/// Test exporting straight from a file
#[test]
fn test_textFromFile_withTemplate_shouldRenderPlaceholders() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let src = common::create_test_eaf(temp_dir.path(), "sample.eaf")?;
    let dst = temp_dir.path().join("sample.tsv");

    let formatter: Formatter = &|segment: &Segment| export::render_template("{id}\t{start}\t{end}\t{text}", segment);
    export::text_from_file(&src, &dst, &["Gloss".to_string()], Some(formatter))?;

    let content = fs::read_to_string(&dst)?;
    assert_eq!(
        content,
        "a1\t0\t1500\thello there\na2\t2000\t4200\thow are you\na3\t1500\t4200\tfine thanks\n"
    );
    Ok(())
}
