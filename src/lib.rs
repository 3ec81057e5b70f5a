/*!
 * # elan-data
 *
 * A Rust library for reading, editing and exporting ELAN transcription files
 * (`.eaf`) and for inspecting the audio they reference.
 *
 * ## Features
 *
 * - Parse and write EAF 3.0 documents
 * - Tiers, subtiers and tier types with their stereotype constraints
 * - Add, remove, split and merge timed annotation segments
 * - Find overlapping segments across tiers
 * - Export to RTTM or plain text
 * - Decode the associated WAV audio and extract sound wave data
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `eaf`: The `ElanData` document (parsing, editing, saving, snapshots)
 * - `tiers`: Tier types, tiers and subtiers
 * - `segments`: The tier table of annotation segments
 * - `export`: RTTM and text exporters
 * - `audio`: WAV loading and sound wave data
 * - `app_config`: Configuration management for the CLI
 * - `file_utils`: File system operations
 * - `app_controller`: Batch conversion controller
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod audio;
pub mod eaf;
pub mod errors;
pub mod export;
pub mod file_utils;
pub mod segments;
pub mod tiers;

// Re-export main types for easier usage
pub use app_config::Config;
pub use audio::{audio_loader, load_wave, sound_wave, AudioInfo, SoundWave, WaveAudio};
pub use eaf::{version, ElanData, ELAN_ENCODING, MINIMUM_ELAN, VERSION};
pub use errors::{AppError, AudioError, EafError};
pub use export::{eaf_to_rttm, eaf_to_text, rttm_from_file, text_from_file};
pub use segments::{Segment, Segmentations};
pub use tiers::{Stereotype, Tier, TierType};
