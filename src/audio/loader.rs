// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Loading of tabla stems and note samples into memory.

use std::fs::File;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, info, warn};

use super::Buffer;

/// Sample rate assumed when a file doesn't report one.
const FALLBACK_SAMPLE_RATE: u32 = 44100;

/// Error types for sample loading.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("unable to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: SymphoniaError,
    },

    #[error("no audio track found in {0}")]
    NoTrack(PathBuf),

    #[error("{0} contains no audio")]
    Empty(PathBuf),

    #[error("sample loading task failed: {0}")]
    Task(String),
}

/// Asynchronously loads a sample from a path.
pub trait StemLoader: Send + Sync + 'static {
    fn load(&self, path: PathBuf) -> impl Future<Output = Result<Buffer, LoadError>> + Send;
}

impl<T: StemLoader> StemLoader for Arc<T> {
    fn load(&self, path: PathBuf) -> impl Future<Output = Result<Buffer, LoadError>> + Send {
        (**self).load(path)
    }
}

/// Decodes audio files with symphonia on the blocking pool.
#[derive(Clone, Copy, Debug, Default)]
pub struct SampleLoader;

impl SampleLoader {
    pub fn new() -> SampleLoader {
        SampleLoader
    }

    /// Decodes an entire file into memory.
    pub fn load_file(path: &Path) -> Result<Buffer, LoadError> {
        let decode_error = |source| LoadError::Decode {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let probed = get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(decode_error)?;
        let mut format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| LoadError::NoTrack(path.to_path_buf()))?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        let mut decoder = get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(decode_error)?;

        let mut channels = params.channels.map(|c| c.count() as u16);
        let mut sample_rate = params.sample_rate;
        let mut samples: Vec<f32> = Vec::new();

        loop {
            let packet = match format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    break
                }
                Err(e) => return Err(decode_error(e)),
            };
            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(msg)) => {
                    warn!(path = ?path, err = msg, "Skipping undecodable packet");
                    continue;
                }
                Err(e) => return Err(decode_error(e)),
            };

            let spec = *decoded.spec();
            channels.get_or_insert(spec.channels.count() as u16);
            sample_rate.get_or_insert(spec.rate);

            let mut sample_buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            sample_buffer.copy_interleaved_ref(decoded);
            samples.extend_from_slice(sample_buffer.samples());
        }

        if samples.is_empty() {
            return Err(LoadError::Empty(path.to_path_buf()));
        }

        let buffer = Buffer::new(
            samples,
            channels.unwrap_or(1),
            sample_rate.unwrap_or(FALLBACK_SAMPLE_RATE),
        );
        debug!(
            path = ?path,
            channels = buffer.channels(),
            sample_rate = buffer.sample_rate(),
            duration_ms = buffer.duration().as_millis(),
            "Sample loaded"
        );
        Ok(buffer)
    }
}

impl StemLoader for SampleLoader {
    fn load(&self, path: PathBuf) -> impl Future<Output = Result<Buffer, LoadError>> + Send {
        async move {
            info!(path = ?path, "Loading sample");
            tokio::task::spawn_blocking(move || SampleLoader::load_file(&path))
                .await
                .map_err(|e| LoadError::Task(e.to_string()))?
        }
    }
}

#[cfg(test)]
mod test {
    use std::error::Error;

    use super::*;
    use crate::testutil::write_wav;

    #[test]
    fn test_load_file() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("tone.wav");
        write_wav(path.clone(), vec![vec![0.5f32; 4410], vec![-0.5f32; 4410]], 44100)?;

        let buffer = SampleLoader::load_file(&path)?;
        assert_eq!(2, buffer.channels());
        assert_eq!(44100, buffer.sample_rate());
        assert_eq!(4410, buffer.frames());
        assert_eq!(100, buffer.duration().as_millis());
        assert_eq!(0.5, buffer.sample_at(10.0, 0));
        assert_eq!(-0.5, buffer.sample_at(10.0, 1));
        Ok(())
    }

    #[test]
    fn test_load_missing_file() {
        let result = SampleLoader::load_file(Path::new("does/not/exist.wav"));
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }

    #[tokio::test]
    async fn test_async_load() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("mono.wav");
        write_wav(path.clone(), vec![vec![0.25f32; 22050]], 44100)?;

        let buffer = SampleLoader::new().load(path).await?;
        assert_eq!(1, buffer.channels());
        assert_eq!(500, buffer.duration().as_millis());
        Ok(())
    }
}
