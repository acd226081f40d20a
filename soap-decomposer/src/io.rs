//! Reading and writing of persisted data.
//!
//! Composite objects (vectors, collections) are stored as JSON documents
//! wrapped in an envelope containing a format tag and a version number. Files
//! with a `.gz` extension are transparently compressed with gzip. Dense
//! arrays are stored in numpy's `.npy` format.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use ndarray::{Array, Dimension};
use ndarray_npy::{ReadableElement, WritableElement};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::Error;

/// Version of the JSON documents written by this crate
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    format: &'a str,
    version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope {
    format: String,
    version: u32,
    data: serde_json::Value,
}

fn is_gzip(path: &Path) -> bool {
    path.extension().map_or(false, |extension| extension == "gz")
}

/// Write `data` to the file at `path`, tagged with the given `format` name
pub(crate) fn write_json<T: Serialize>(path: &Path, format: &str, data: &T) -> Result<(), Error> {
    let envelope = EnvelopeRef {
        format: format,
        version: FORMAT_VERSION,
        data: data,
    };

    let file = File::create(path)?;
    if is_gzip(path) {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        serde_json::to_writer(&mut encoder, &envelope)?;
        encoder.finish()?.flush()?;
    } else {
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &envelope)?;
        writer.flush()?;
    }

    return Ok(());
}

/// Read data with the given `format` name from the file at `path`. Any
/// problem with the content of the file is reported as
/// `Error::Persistence`.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path, format: &str) -> Result<T, Error> {
    let file = File::open(path)?;
    let mut content = String::new();
    if is_gzip(path) {
        GzDecoder::new(BufReader::new(file)).read_to_string(&mut content)?;
    } else {
        BufReader::new(file).read_to_string(&mut content)?;
    }

    let envelope = serde_json::from_str::<Envelope>(&content).map_err(|e| Error::Persistence(
        format!("failed to parse '{}': {}", path.display(), e)
    ))?;

    if envelope.format != format {
        return Err(Error::Persistence(format!(
            "expected a '{}' file, but '{}' contains '{}'",
            format, path.display(), envelope.format
        )));
    }

    if envelope.version != FORMAT_VERSION {
        return Err(Error::Persistence(format!(
            "'{}' was written with format version {}, only version {} is supported",
            path.display(), envelope.version, FORMAT_VERSION
        )));
    }

    return serde_json::from_value(envelope.data).map_err(|e| Error::Persistence(
        format!("invalid '{}' data in '{}': {}", format, path.display(), e)
    ));
}

/// Read a dense array from a `.npy` file
pub fn read_npy<A, D>(path: impl AsRef<Path>) -> Result<Array<A, D>, Error>
    where A: ReadableElement, D: Dimension
{
    return Ok(ndarray_npy::read_npy(path)?);
}

/// Write a dense array to a `.npy` file
pub fn write_npy<A, D>(path: impl AsRef<Path>, array: &Array<A, D>) -> Result<(), Error>
    where A: WritableElement, D: Dimension
{
    ndarray_npy::write_npy(path, array)?;
    return Ok(());
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, array};

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Data {
        name: String,
        values: Vec<f64>,
    }

    fn data() -> Data {
        Data {
            name: "test".into(),
            values: vec![0.1, 1.0 / 3.0, -2.5e-300, 7.0],
        }
    }

    #[test]
    fn round_trip() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["data.json", "data.json.gz"] {
            let path = dir.path().join(name);
            write_json(&path, "test-data", &data()).unwrap();
            let loaded: Data = read_json(&path, "test-data").unwrap();
            assert_eq!(loaded, data());
        }
    }

    #[test]
    fn wrong_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        write_json(&path, "test-data", &data()).unwrap();

        let error = read_json::<Data>(&path, "other-data").unwrap_err();
        assert!(matches!(error, Error::Persistence(_)));
    }

    #[test]
    fn wrong_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, r#"{"format": "test-data", "version": 42, "data": {}}"#).unwrap();

        let error = read_json::<Data>(&path, "test-data").unwrap_err();
        assert!(matches!(error, Error::Persistence(_)));
    }

    #[test]
    fn malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, r#"{"format": "test-data", "vers"#).unwrap();
        let error = read_json::<Data>(&path, "test-data").unwrap_err();
        assert!(matches!(error, Error::Persistence(_)));

        std::fs::write(&path, r#"{"format": "test-data", "version": 1, "data": {"name": 3}}"#).unwrap();
        let error = read_json::<Data>(&path, "test-data").unwrap_err();
        assert!(matches!(error, Error::Persistence(_)));

        let error = read_json::<Data>(&dir.path().join("missing.json"), "test-data").unwrap_err();
        assert!(matches!(error, Error::Io(_)));
    }

    #[test]
    fn npy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("array.npy");
        let array = array![[1.0, 2.0], [3.5, -4.0]];
        write_npy(&path, &array).unwrap();

        let loaded: Array2<f64> = read_npy(&path).unwrap();
        assert_eq!(loaded, array);
    }
}
