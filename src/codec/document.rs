use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Format, Record};
use crate::error::Result;
use crate::storage::{ReadStream, ResilientReader, ResilientWriter, WriteStream};

/// A record stored as a JSON document. The document must be the last thing in
/// its stream: decoding consumes everything after the reader's position.
pub trait DocumentRecord: Serialize + DeserializeOwned {}

/// The document format strategy.
pub struct Document;

impl<T: DocumentRecord + Record> Format<T> for Document {
    fn write<W: WriteStream>(value: &T, out: &mut ResilientWriter<W>) -> Result<()> {
        let doc = serde_json::to_vec_pretty(value)?;
        out.append(&doc, T::NAME)
    }

    fn read<R: ReadStream>(input: &mut ResilientReader<R>) -> Result<T> {
        let bytes = input.read_to_end(T::NAME)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{read_record, write_record};
    use crate::config::RetryConfig;
    use crate::error::Error;
    use crate::storage::MemoryStream;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        title: String,
        #[serde(default)]
        tags: Vec<String>,
    }

    impl DocumentRecord for Note {}

    impl Record for Note {
        const NAME: &'static str = "note";
        type Format = Document;
    }

    #[test]
    fn test_document_is_readable_text() {
        let config = RetryConfig::default().propagate();
        let mut out = ResilientWriter::new(MemoryStream::new(), &config);
        let note = Note {
            title: "hello".to_string(),
            tags: vec!["a".to_string()],
        };
        write_record(&mut out, &note).unwrap();

        let bytes = out.into_inner().into_inner();
        let text = std::str::from_utf8(&bytes).expect("Document should be UTF-8");
        assert!(text.contains("\"title\": \"hello\""));

        let mut input = ResilientReader::new(MemoryStream::from(bytes), &config);
        assert_eq!(read_record::<Note, _>(&mut input).unwrap(), note);
    }

    #[test]
    fn test_garbage_is_malformed() {
        let config = RetryConfig::default().propagate();
        let mut input = ResilientReader::new(MemoryStream::from(b"{not json".to_vec()), &config);
        let result = read_record::<Note, _>(&mut input);
        assert!(matches!(result, Err(Error::MalformedDocument(_))));
        assert_eq!(input.position(), 0);
    }
}
