use itertools::izip;

use super::check_parallel;
use crate::codec::{Binary, BinaryRecord, Decoder, Encoder, Record};
use crate::error::Result;
use crate::storage::ReadStream;

/// Summary of a dataset: frame and geometry statistics over its items, and
/// the source video of each item.
///
/// `original_video_paths[i]` is the source of `item_names[i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetDescriptor {
    pub total_frames: i64,

    pub min_frames: i32,
    pub average_frames: i32,
    pub max_frames: i32,

    pub min_width: i32,
    pub average_width: i32,
    pub max_width: i32,

    pub min_height: i32,
    pub average_height: i32,
    pub max_height: i32,

    pub original_video_paths: Vec<String>,
    pub item_names: Vec<String>,
}

impl DatasetDescriptor {
    /// Appends an item and the video it came from.
    pub fn push_item(&mut self, video_path: impl Into<String>, item_name: impl Into<String>) {
        self.original_video_paths.push(video_path.into());
        self.item_names.push(item_name.into());
    }

    pub fn item_count(&self) -> usize {
        self.item_names.len()
    }

    /// `(video path, item name)` pairs in item order.
    pub fn items(&self) -> impl Iterator<Item = (&str, &str)> {
        izip!(&self.original_video_paths, &self.item_names).map(|(p, n)| (p.as_str(), n.as_str()))
    }
}

impl Record for DatasetDescriptor {
    const NAME: &'static str = "dataset descriptor";
    type Format = Binary;
}

impl BinaryRecord for DatasetDescriptor {
    fn validate(&self) -> Result<()> {
        check_parallel(
            "item_names",
            self.original_video_paths.len(),
            self.item_names.len(),
        )
    }

    fn encode_into(&self, enc: &mut Encoder) {
        enc.write_i64(self.total_frames);

        enc.write_i32(self.min_frames);
        enc.write_i32(self.average_frames);
        enc.write_i32(self.max_frames);

        enc.write_i32(self.min_width);
        enc.write_i32(self.average_width);
        enc.write_i32(self.max_width);

        enc.write_i32(self.min_height);
        enc.write_i32(self.average_height);
        enc.write_i32(self.max_height);

        enc.write_len(self.item_count());
        for (path, name) in self.items() {
            enc.write_str(path);
            enc.write_str(name);
        }
    }

    fn decode_from<R: ReadStream>(dec: &mut Decoder<'_, R>) -> Result<Self> {
        let total_frames = dec.read_i64("total frames")?;

        let min_frames = dec.read_i32("min frames")?;
        let average_frames = dec.read_i32("average frames")?;
        let max_frames = dec.read_i32("max frames")?;

        let min_width = dec.read_i32("min width")?;
        let average_width = dec.read_i32("average width")?;
        let max_width = dec.read_i32("max width")?;

        let min_height = dec.read_i32("min height")?;
        let average_height = dec.read_i32("average height")?;
        let max_height = dec.read_i32("max height")?;

        // Each item is two length-prefixed strings
        let count = dec.read_len("item count", 16)?;
        let mut original_video_paths = Vec::with_capacity(count);
        let mut item_names = Vec::with_capacity(count);
        for _ in 0..count {
            original_video_paths.push(dec.read_string("video path")?);
            item_names.push(dec.read_string("item name")?);
        }

        Ok(DatasetDescriptor {
            total_frames,
            min_frames,
            average_frames,
            max_frames,
            min_width,
            average_width,
            max_width,
            min_height,
            average_height,
            max_height,
            original_video_paths,
            item_names,
        })
    }
}
