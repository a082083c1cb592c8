use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const COMPRESSION_LEVEL: i32 = 3;

/// Write `value` as zstd-compressed bincode.
pub fn save_to<T: Serialize, W: Write>(value: &T, writer: W) -> Result<()> {
    let mut encoder = zstd::stream::write::Encoder::new(writer, COMPRESSION_LEVEL)?;
    bincode::serialize_into(&mut encoder, value)?;
    encoder.finish()?.flush()?;
    Ok(())
}

pub fn load_from<T: DeserializeOwned, R: Read>(reader: R) -> Result<T> {
    let decoder = zstd::stream::read::Decoder::new(reader)?;
    let value = bincode::deserialize_from(decoder)?;
    Ok(value)
}

pub fn save_to_file<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("unable to create {}", dir.display()))?;
    }
    let f = File::create(path).with_context(|| format!("unable to open file: {}", path.display()))?;
    save_to(value, BufWriter::new(f)).with_context(|| format!("unable to serialise to {}", path.display()))
}

pub fn load_from_file<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("unable to open file: {}", path.display()))?;
    load_from(BufReader::new(f)).with_context(|| format!("unable to deserialise {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Dictionary;

    #[test]
    fn round_trips_through_a_buffer() {
        let mut dictionary = Dictionary::new();
        dictionary.get(b"alpha");
        dictionary.get(b"beta");
        dictionary.close();

        let mut buf = Vec::new();
        save_to(&dictionary, &mut buf).unwrap();
        let loaded: Dictionary = load_from(buf.as_slice()).unwrap();
        assert_eq!(loaded, dictionary);
    }

    #[test]
    fn rejects_garbage() {
        let garbage = b"definitely not zstd".to_vec();
        assert!(load_from::<Dictionary, _>(garbage.as_slice()).is_err());
    }
}
