/*!
 * Tests for error types and conversions
 */

use elan_data::{AppError, AudioError, EafError};
use std::io;
use std::path::PathBuf;

/// Test error messages shown to users
#[test]
fn test_eafError_display_shouldDescribeProblem() {
    let error = EafError::UnknownTierType {
        tier: "Gloss".to_string(),
        type_ref: "gloss-lt".to_string(),
    };
    assert_eq!(error.to_string(), "Gloss has unknown Linguistic Type Reference gloss-lt");

    let error = EafError::InvalidBounds { start: 10, end: 5 };
    assert_eq!(
        error.to_string(),
        "Invalid segment bounds: start 10 is greater than end 5"
    );

    let error = EafError::FileExists(PathBuf::from("a.eaf"));
    assert_eq!(error.to_string(), "a.eaf already exists, refusing to overwrite it");
}

/// Test the message of a document without audio
#[test]
fn test_audioError_noAudio_shouldNameDocument() {
    assert_eq!(
        AudioError::NoAudio.to_string(),
        "ELAN_Data object has no associated audio file"
    );
}

/// Test conversions into the application error
#[test]
fn test_appError_from_shouldWrapSourceErrors() {
    let app: AppError = EafError::NoTier.into();
    assert!(matches!(app, AppError::Eaf(EafError::NoTier)));
    assert_eq!(app.to_string(), "Document error: No tier given");

    let app: AppError = AudioError::NoAudio.into();
    assert!(matches!(app, AppError::Audio(AudioError::NoAudio)));

    let app: AppError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
    assert!(matches!(app, AppError::File(message) if message == "gone"));

    let app: AppError = anyhow::anyhow!("boom").into();
    assert_eq!(app.to_string(), "Unknown error: boom");
}

/// Test that I/O errors convert into document errors
#[test]
fn test_eafError_fromIo_shouldKeepSource() {
    let error: EafError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
    assert!(matches!(error, EafError::Io(ref e) if e.kind() == io::ErrorKind::PermissionDenied));
    assert_eq!(error.to_string(), "I/O error: denied");
}
