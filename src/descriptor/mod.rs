//! Per-dataset, per-item and per-job metadata records.
//!
//! Descriptors are plain values. They refer to each other only through the
//! dataset names, video paths and ids they embed; where each one is stored is
//! up to the caller.

mod dataset;
mod item;
mod job;
mod timestamps;

pub use dataset::DatasetDescriptor;
pub use item::{DatasetItemMetadata, Keyframe};
pub use job::{Interval, JobDescriptor};
pub use timestamps::DatasetItemWebTimestamps;

use crate::error::{Error, Result};

/// Compressed bitstream format of a source video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum VideoCodecType {
    Mpeg1 = 0,
    Mpeg2 = 1,
    Mpeg4 = 2,
    Vc1 = 3,
    #[default]
    H264 = 4,
    Jpeg = 5,
    H264Svc = 6,
    H264Mvc = 7,
    Hevc = 8,
    Vp8 = 9,
    Vp9 = 10,
}

impl TryFrom<u32> for VideoCodecType {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        Ok(match value {
            0 => Self::Mpeg1,
            1 => Self::Mpeg2,
            2 => Self::Mpeg4,
            3 => Self::Vc1,
            4 => Self::H264,
            5 => Self::Jpeg,
            6 => Self::H264Svc,
            7 => Self::H264Mvc,
            8 => Self::Hevc,
            9 => Self::Vp8,
            10 => Self::Vp9,
            value => {
                return Err(Error::InvalidEnum {
                    field: "codec type",
                    value,
                })
            }
        })
    }
}

/// Chroma subsampling of decoded frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum VideoChromaFormat {
    Monochrome = 0,
    #[default]
    Yuv420 = 1,
    Yuv422 = 2,
    Yuv444 = 3,
}

impl TryFrom<u32> for VideoChromaFormat {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        Ok(match value {
            0 => Self::Monochrome,
            1 => Self::Yuv420,
            2 => Self::Yuv422,
            3 => Self::Yuv444,
            value => {
                return Err(Error::InvalidEnum {
                    field: "chroma format",
                    value,
                })
            }
        })
    }
}

/// Checks that a parallel sequence has as many entries as its leader.
pub(crate) fn check_parallel(field: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(Error::LengthMismatch {
            field,
            expected,
            actual,
        });
    }
    Ok(())
}
