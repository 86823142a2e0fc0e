use super::check_parallel;
use crate::codec::{Binary, BinaryRecord, Decoder, Encoder, Record};
use crate::error::Result;
use crate::storage::ReadStream;

/// Per-frame presentation and decode timestamps of an item, in units of
/// `time_base_numerator / time_base_denominator` seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetItemWebTimestamps {
    pub time_base_numerator: i32,
    pub time_base_denominator: i32,
    pub pts_timestamps: Vec<i64>,
    pub dts_timestamps: Vec<i64>,
}

impl DatasetItemWebTimestamps {
    pub fn frame_count(&self) -> usize {
        self.pts_timestamps.len()
    }

    /// Presentation time of `frame` in seconds.
    pub fn pts_seconds(&self, frame: usize) -> Option<f64> {
        if self.time_base_denominator == 0 {
            return None;
        }
        let pts = *self.pts_timestamps.get(frame)?;
        Some(pts as f64 * self.time_base_numerator as f64 / self.time_base_denominator as f64)
    }
}

impl Record for DatasetItemWebTimestamps {
    const NAME: &'static str = "item web timestamps";
    type Format = Binary;
}

impl BinaryRecord for DatasetItemWebTimestamps {
    fn validate(&self) -> Result<()> {
        check_parallel(
            "dts_timestamps",
            self.pts_timestamps.len(),
            self.dts_timestamps.len(),
        )
    }

    fn encode_into(&self, enc: &mut Encoder) {
        enc.write_i32(self.time_base_numerator);
        enc.write_i32(self.time_base_denominator);
        enc.write_len(self.frame_count());
        enc.write_i64_run(&self.pts_timestamps);
        enc.write_i64_run(&self.dts_timestamps);
    }

    fn decode_from<R: ReadStream>(dec: &mut Decoder<'_, R>) -> Result<Self> {
        let time_base_numerator = dec.read_i32("time base numerator")?;
        let time_base_denominator = dec.read_i32("time base denominator")?;
        let count = dec.read_len("frame count", 16)?;
        let pts_timestamps = dec.read_i64_run(count, "pts timestamps")?;
        let dts_timestamps = dec.read_i64_run(count, "dts timestamps")?;

        Ok(DatasetItemWebTimestamps {
            time_base_numerator,
            time_base_denominator,
            pts_timestamps,
            dts_timestamps,
        })
    }
}
