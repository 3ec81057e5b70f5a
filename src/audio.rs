/*!
 * Audio associated with an ELAN document.
 *
 * WAV files are decoded with symphonia into interleaved samples at their
 * native integer scale. `sound_wave` turns a time window of selected channels
 * into plot-ready data.
 */

use std::fs::File;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::eaf::ElanData;
use crate::errors::AudioError;

// @const: Bit depth assumed when the container does not say
const DEFAULT_BITS_PER_SAMPLE: u32 = 16;

// @struct: Stream parameters of a WAV file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioInfo {
    // @field: Number of channels
    pub channels: usize,

    // @field: Bytes per sample
    pub sample_width: usize,

    // @field: Frames per second
    pub frame_rate: u32,

    // @field: Number of frames
    pub frames: usize,
}

impl AudioInfo {
    /// Length of the audio in seconds
    pub fn duration(&self) -> f64 {
        if self.frame_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / f64::from(self.frame_rate)
    }
}

/// Decoded audio
#[derive(Debug, Clone)]
pub struct WaveAudio {
    pub path: PathBuf,
    pub info: AudioInfo,

    /// Interleaved samples at the file's native integer scale
    pub samples: Vec<i32>,
}

impl WaveAudio {
    /// Samples of one channel (1-based), `None` past the last channel
    pub fn channel(&self, channel: usize) -> Option<Vec<i32>> {
        if channel == 0 || channel > self.info.channels {
            return None;
        }
        Some(
            self.samples
                .iter()
                .skip(channel - 1)
                .step_by(self.info.channels)
                .copied()
                .collect(),
        )
    }
}

/// Decode a WAV file
pub fn load_wave(path: impl AsRef<Path>) -> Result<WaveAudio, AudioError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("wav");

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AudioError::Decode(format!("probe failed: {e}")))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::Decode("no audio track found".into()))?;

    let codec_params = track.codec_params.clone();
    let track_id = track.id;
    let frame_rate = codec_params.sample_rate.unwrap_or_default();
    let channels = codec_params.channels.map_or(1, |c| c.count());
    let bits = codec_params.bits_per_sample.unwrap_or(DEFAULT_BITS_PER_SAMPLE).clamp(1, 32);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::Decode(format!("codec init failed: {e}")))?;

    let mut samples: Vec<i32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(AudioError::Decode(format!("packet read: {e}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .map_err(|e| AudioError::Decode(format!("decode: {e}")))?;

        let spec = *decoded.spec();
        let mut sample_buf = SampleBuffer::<i32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        // Samples come back scaled to the full i32 range
        samples.extend(sample_buf.samples().iter().map(|&s| s >> (32 - bits)));
    }

    let info = AudioInfo {
        channels,
        sample_width: bits.div_ceil(8) as usize,
        frame_rate,
        frames: samples.len() / channels.max(1),
    };

    debug!(
        "Decoded {}: {} channels, {} Hz, {} frames",
        path.display(),
        info.channels,
        info.frame_rate,
        info.frames
    );

    Ok(WaveAudio {
        path: path.to_path_buf(),
        info,
        samples,
    })
}

/// Decode the audio associated with a document
pub fn audio_loader(eaf: &ElanData) -> Result<WaveAudio, AudioError> {
    let audio = eaf.audio().ok_or(AudioError::NoAudio)?;
    load_wave(audio)
}

/// One channel of a sound wave plot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub channel: usize,
    pub label: String,
    pub color: String,
    pub alpha: f64,
    pub amplitude: Vec<i32>,
}

/// Plot-ready amplitude data for a time window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundWave {
    pub title: String,
    pub x_label: String,
    pub y_label: String,

    /// Seconds of every plotted frame, shared by all traces
    pub time: Vec<f64>,
    pub traces: Vec<Trace>,
}

/// Amplitude of the requested channels between `start` and `stop` seconds
///
/// `channels` pairs a color with a 1-based channel number; channels the audio
/// does not have are skipped. A `stop` of `None` or past the end of the audio
/// runs to the end.
pub fn sound_wave(
    eaf: &ElanData,
    start: f64,
    stop: Option<f64>,
    channels: &[(String, usize)],
) -> Result<SoundWave, AudioError> {
    let audio_path = eaf.audio().ok_or(AudioError::NoAudio)?;

    if start < 0.0 {
        return Err(AudioError::InvalidRange(format!("start time {start} is negative")));
    }
    if let Some(stop) = stop {
        if start >= stop {
            return Err(AudioError::InvalidRange(format!(
                "start time {start} is not before stop time {stop}"
            )));
        }
    }

    let audio = load_wave(audio_path)?;
    let info = audio.info;
    let duration = info.duration();

    if start > duration {
        return Err(AudioError::InvalidRange(format!(
            "start time {start} is past the audio duration {duration}"
        )));
    }

    let rate = f64::from(info.frame_rate);
    let first = ((start * rate) as usize).min(info.frames);
    let last = match stop {
        Some(stop) if stop <= duration => ((stop * rate) as usize).min(info.frames),
        _ => info.frames,
    };

    let step = if info.frames > 1 {
        duration / (info.frames - 1) as f64
    } else {
        0.0
    };
    let time: Vec<f64> = (first..last).map(|frame| frame as f64 * step).collect();

    let mut traces = Vec::new();
    for (color, channel) in channels {
        let Some(signal) = audio.channel(*channel) else {
            warn!("Audio has {} channels, skipping channel {}", info.channels, channel);
            continue;
        };

        let alpha = (1.0 - (*channel - 1) as f64 / channels.len() as f64).max(0.0);
        traces.push(Trace {
            channel: *channel,
            label: format!("Channel {channel}"),
            color: color.clone(),
            alpha,
            amplitude: signal[first..last].to_vec(),
        });
    }

    let name = audio_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(SoundWave {
        title: format!("Soundwave of {name}"),
        x_label: "Time (Seconds)".to_string(),
        y_label: "Amplitude".to_string(),
        time,
        traces,
    })
}
