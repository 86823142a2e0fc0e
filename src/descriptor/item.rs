use itertools::izip;

use super::{check_parallel, VideoChromaFormat, VideoCodecType};
use crate::codec::{Binary, BinaryRecord, Decoder, Encoder, Record};
use crate::error::Result;
use crate::storage::ReadStream;

/// One seekable frame in a source video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keyframe {
    /// Frame number.
    pub position: i64,
    /// Presentation timestamp.
    pub timestamp: i64,
    /// Offset of the frame's packet in the source file.
    pub byte_offset: i64,
}

/// What a decoder needs to start decoding an item mid-stream.
///
/// The three keyframe sequences are parallel: index `i` of each describes the
/// same keyframe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetItemMetadata {
    pub frames: i32,
    pub width: i32,
    pub height: i32,
    pub codec_type: VideoCodecType,
    pub chroma_format: VideoChromaFormat,
    /// Container extradata used to initialise the decoder.
    pub metadata_packets: Vec<u8>,
    pub keyframe_positions: Vec<i64>,
    pub keyframe_timestamps: Vec<i64>,
    pub keyframe_byte_offsets: Vec<i64>,
}

impl DatasetItemMetadata {
    pub fn push_keyframe(&mut self, keyframe: Keyframe) {
        self.keyframe_positions.push(keyframe.position);
        self.keyframe_timestamps.push(keyframe.timestamp);
        self.keyframe_byte_offsets.push(keyframe.byte_offset);
    }

    pub fn keyframe_count(&self) -> usize {
        self.keyframe_positions.len()
    }

    pub fn keyframes(&self) -> impl Iterator<Item = Keyframe> + '_ {
        izip!(
            &self.keyframe_positions,
            &self.keyframe_timestamps,
            &self.keyframe_byte_offsets
        )
        .map(|(&position, &timestamp, &byte_offset)| Keyframe {
            position,
            timestamp,
            byte_offset,
        })
    }

    /// Last keyframe at or before `frame`, where decoding has to start to
    /// reach it.
    pub fn keyframe_before(&self, frame: i64) -> Option<Keyframe> {
        let idx = self.keyframe_positions.partition_point(|&p| p <= frame);
        idx.checked_sub(1).map(|i| Keyframe {
            position: self.keyframe_positions[i],
            timestamp: self.keyframe_timestamps[i],
            byte_offset: self.keyframe_byte_offsets[i],
        })
    }
}

impl Record for DatasetItemMetadata {
    const NAME: &'static str = "item metadata";
    type Format = Binary;
}

impl BinaryRecord for DatasetItemMetadata {
    fn validate(&self) -> Result<()> {
        let count = self.keyframe_positions.len();
        check_parallel("keyframe_timestamps", count, self.keyframe_timestamps.len())?;
        check_parallel(
            "keyframe_byte_offsets",
            count,
            self.keyframe_byte_offsets.len(),
        )
    }

    fn encode_into(&self, enc: &mut Encoder) {
        enc.write_i32(self.frames);
        enc.write_i32(self.width);
        enc.write_i32(self.height);
        enc.write_u32(self.codec_type as u32);
        enc.write_u32(self.chroma_format as u32);

        enc.write_bytes(&self.metadata_packets);

        enc.write_len(self.keyframe_count());
        enc.write_i64_run(&self.keyframe_positions);
        enc.write_i64_run(&self.keyframe_timestamps);
        enc.write_i64_run(&self.keyframe_byte_offsets);
    }

    fn decode_from<R: ReadStream>(dec: &mut Decoder<'_, R>) -> Result<Self> {
        let frames = dec.read_i32("frames")?;
        let width = dec.read_i32("width")?;
        let height = dec.read_i32("height")?;
        let codec_type = VideoCodecType::try_from(dec.read_u32("codec type")?)?;
        let chroma_format = VideoChromaFormat::try_from(dec.read_u32("chroma format")?)?;

        let metadata_packets = dec.read_bytes("metadata packets")?;

        // Three i64 runs share the count
        let count = dec.read_len("keyframe count", 24)?;
        let keyframe_positions = dec.read_i64_run(count, "keyframe positions")?;
        let keyframe_timestamps = dec.read_i64_run(count, "keyframe timestamps")?;
        let keyframe_byte_offsets = dec.read_i64_run(count, "keyframe byte offsets")?;

        Ok(DatasetItemMetadata {
            frames,
            width,
            height,
            codec_type,
            chroma_format,
            metadata_packets,
            keyframe_positions,
            keyframe_timestamps,
            keyframe_byte_offsets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{read_record, write_record};
    use crate::config::RetryConfig;
    use crate::error::Error;
    use crate::storage::{MemoryStream, ResilientReader, ResilientWriter};

    fn create_test_metadata() -> DatasetItemMetadata {
        let mut meta = DatasetItemMetadata {
            frames: 300,
            width: 1920,
            height: 1080,
            codec_type: VideoCodecType::H264,
            chroma_format: VideoChromaFormat::Yuv420,
            metadata_packets: vec![0x00, 0x00, 0x01, 0x67, 0x42, 0xC0, 0x1E],
            ..Default::default()
        };
        for (i, offset) in [48i64, 90_112, 180_224].into_iter().enumerate() {
            meta.push_keyframe(Keyframe {
                position: i as i64 * 120,
                timestamp: i as i64 * 4_004,
                byte_offset: offset,
            });
        }
        meta
    }

    fn encode(meta: &DatasetItemMetadata) -> MemoryStream {
        let config = RetryConfig::default().propagate();
        let mut out = ResilientWriter::new(MemoryStream::new(), &config);
        write_record(&mut out, meta).expect("Failed to encode");
        out.into_inner()
    }

    fn decode(stream: MemoryStream) -> Result<DatasetItemMetadata> {
        let config = RetryConfig::default().propagate();
        let mut input = ResilientReader::new(stream, &config);
        read_record(&mut input)
    }

    #[test]
    fn test_item_metadata_roundtrip() {
        let original = create_test_metadata();
        let decoded = decode(encode(&original)).expect("Failed to decode");
        assert_eq!(decoded, original);
        assert_eq!(decoded.keyframes().count(), 3);
    }

    #[test]
    fn test_empty_item_metadata_roundtrip() {
        let original = DatasetItemMetadata {
            codec_type: VideoCodecType::Vp9,
            chroma_format: VideoChromaFormat::Monochrome,
            ..Default::default()
        };
        let decoded = decode(encode(&original)).expect("Failed to decode");
        assert!(decoded.metadata_packets.is_empty());
        assert_eq!(decoded.keyframe_count(), 0);
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_truncated_mid_blob_fails() {
        let original = create_test_metadata();
        let mut stream = encode(&original);
        // 5 scalar fields, blob length, then 3 of the 7 blob bytes
        stream.truncate(5 * 4 + 8 + 3);

        let result = decode(stream);
        assert!(matches!(
            result,
            Err(Error::Truncated {
                context: "metadata packets",
                ..
            })
        ));
    }

    #[test]
    fn test_truncated_keyframe_run_fails() {
        let original = create_test_metadata();
        let mut stream = encode(&original);
        let len = stream.len();
        stream.truncate(len - 1);

        let result = decode(stream);
        assert!(matches!(result, Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_mismatched_keyframe_arrays_rejected() {
        let mut meta = create_test_metadata();
        meta.keyframe_timestamps.push(99);

        let config = RetryConfig::default().propagate();
        let mut out = ResilientWriter::new(MemoryStream::new(), &config);
        let result = write_record(&mut out, &meta);
        assert!(matches!(
            result,
            Err(Error::LengthMismatch {
                field: "keyframe_timestamps",
                expected: 3,
                actual: 4
            })
        ));
        assert!(out.get_ref().is_empty());
    }

    #[test]
    fn test_unknown_codec_rejected() {
        let mut stream = encode(&create_test_metadata());
        let mut bytes = stream.as_bytes().to_vec();
        // codec type is the fourth i32
        bytes[12..16].copy_from_slice(&[0, 0, 0, 77]);
        stream = MemoryStream::from(bytes);

        let result = decode(stream);
        assert!(matches!(
            result,
            Err(Error::InvalidEnum {
                field: "codec type",
                value: 77
            })
        ));
    }

    #[test]
    fn test_keyframe_before() {
        let meta = create_test_metadata();
        assert_eq!(meta.keyframe_before(-1), None);
        assert_eq!(meta.keyframe_before(0).map(|k| k.position), Some(0));
        assert_eq!(meta.keyframe_before(119).map(|k| k.position), Some(0));
        let kf = meta.keyframe_before(250).expect("Keyframe expected");
        assert_eq!(kf.position, 240);
        assert_eq!(kf.byte_offset, 180_224);
    }
}
