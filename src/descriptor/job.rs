use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::codec::{Document, DocumentRecord, Record};

/// `(start_frame, end_frame)` of a span of a video.
pub type Interval = (i32, i32);

/// The slices of a dataset's videos that one job processes.
///
/// Stored as a JSON document so operators can inspect and edit it:
///
/// ```json
/// {
///   "dataset_name": "videos-2016",
///   "videos": [
///     { "path": "/videos/a.mp4", "intervals": [[0, 100], [200, 300]] }
///   ]
/// }
/// ```
///
/// `dataset_name` is required. A missing `videos` array means no intervals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "JobDocument", from = "JobDocument")]
pub struct JobDescriptor {
    pub dataset_name: String,
    /// Video path to the intervals of that video, in processing order.
    pub intervals: BTreeMap<String, Vec<Interval>>,
}

impl JobDescriptor {
    pub fn new(dataset_name: impl Into<String>) -> Self {
        Self {
            dataset_name: dataset_name.into(),
            intervals: BTreeMap::new(),
        }
    }

    /// Adds an interval for `path` after any already assigned to it.
    pub fn add_interval(&mut self, path: impl Into<String>, start_frame: i32, end_frame: i32) {
        self.intervals
            .entry(path.into())
            .or_default()
            .push((start_frame, end_frame));
    }

    /// Frames covered by all intervals, counting `end_frame` as exclusive.
    pub fn total_frames(&self) -> i64 {
        self.intervals
            .values()
            .flatten()
            .map(|&(start, end)| (i64::from(end) - i64::from(start)).max(0))
            .sum()
    }
}

impl Record for JobDescriptor {
    const NAME: &'static str = "job descriptor";
    type Format = Document;
}

impl DocumentRecord for JobDescriptor {}

#[derive(Serialize, Deserialize)]
struct JobDocument {
    dataset_name: String,
    #[serde(default)]
    videos: Vec<VideoDocument>,
}

#[derive(Serialize, Deserialize)]
struct VideoDocument {
    path: String,
    #[serde(default)]
    intervals: Vec<[i32; 2]>,
}

impl From<JobDescriptor> for JobDocument {
    fn from(descriptor: JobDescriptor) -> Self {
        let videos: Vec<VideoDocument> = descriptor
            .intervals
            .into_iter()
            .map(|(path, intervals)| VideoDocument {
                path,
                intervals: intervals.into_iter().map(|(s, e)| [s, e]).collect(),
            })
            .collect();
        JobDocument {
            dataset_name: descriptor.dataset_name,
            videos,
        }
    }
}

impl From<JobDocument> for JobDescriptor {
    fn from(doc: JobDocument) -> Self {
        // A path listed twice keeps its last entry
        let intervals: BTreeMap<String, Vec<Interval>> = doc
            .videos
            .into_iter()
            .map(|video| {
                let spans: Vec<Interval> = video.intervals.into_iter().map(|[s, e]| (s, e)).collect();
                (video.path, spans)
            })
            .collect();
        JobDescriptor {
            dataset_name: doc.dataset_name,
            intervals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{read_record, write_record};
    use crate::config::RetryConfig;
    use crate::error::{Error, Result};
    use crate::storage::{MemoryStream, ResilientReader, ResilientWriter};

    fn decode_text(text: &str) -> Result<JobDescriptor> {
        let config = RetryConfig::default().propagate();
        let mut input = ResilientReader::new(MemoryStream::from(text.as_bytes().to_vec()), &config);
        read_record(&mut input)
    }

    #[test]
    fn test_job_descriptor_roundtrip() {
        let mut original = JobDescriptor::new("videos-2016");
        original.add_interval("/videos/a.mp4", 0, 100);
        original.add_interval("/videos/a.mp4", 200, 300);
        original.add_interval("/videos/b.mp4", 50, 60);
        original.intervals.insert("/videos/c.mp4".to_string(), Vec::new());

        let config = RetryConfig::default().propagate();
        let mut out = ResilientWriter::new(MemoryStream::new(), &config);
        write_record(&mut out, &original).unwrap();

        let mut input = ResilientReader::new(out.into_inner(), &config);
        let decoded: JobDescriptor = read_record(&mut input).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.total_frames(), 210);
    }

    #[test]
    fn test_field_order_does_not_matter() {
        let decoded = decode_text(
            r#"{"videos": [{"intervals": [[1, 2]], "path": "x.mp4"}], "dataset_name": "d"}"#,
        )
        .unwrap();
        assert_eq!(decoded.dataset_name, "d");
        assert_eq!(decoded.intervals["x.mp4"], vec![(1, 2)]);
    }

    #[test]
    fn test_missing_dataset_name_rejected() {
        let result = decode_text(r#"{"videos": [{"path": "x.mp4", "intervals": [[0, 5]]}]}"#);
        match result {
            Err(Error::MalformedDocument(msg)) => assert!(msg.contains("dataset_name")),
            other => panic!("Expected malformed document, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_videos_means_no_intervals() {
        let decoded = decode_text(r#"{"dataset_name": "empty"}"#).unwrap();
        assert_eq!(decoded, JobDescriptor::new("empty"));
    }

    #[test]
    fn test_malformed_interval_rejected() {
        let three = decode_text(
            r#"{"dataset_name": "d", "videos": [{"path": "x", "intervals": [[0, 1, 2]]}]}"#,
        );
        assert!(matches!(three, Err(Error::MalformedDocument(_))));

        let too_big = decode_text(
            r#"{"dataset_name": "d", "videos": [{"path": "x", "intervals": [[0, 4294967296]]}]}"#,
        );
        assert!(matches!(too_big, Err(Error::MalformedDocument(_))));
    }

    #[test]
    fn test_duplicate_path_keeps_last() {
        let decoded = decode_text(
            r#"{"dataset_name": "d", "videos": [
                {"path": "x", "intervals": [[0, 1]]},
                {"path": "x", "intervals": [[5, 9]]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(decoded.intervals["x"], vec![(5, 9)]);
    }
}
