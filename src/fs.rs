//! Save-state framing: magic + version header, DEFLATE-compressed payload.
//!
//! This is the named-slot `save_state`/`load_state` path through a host-provided sink, not the
//! rewind ring itself, which stays raw fixed-size bytes for O(1) push/pop. This crate makes no
//! syscalls of its own: `save`/`load` take generic `std::io::{Read, Write}` sinks so the host
//! decides whether that maps to a file, a socket, or an in-memory buffer.

use flate2::{read::DeflateDecoder, write::DeflateEncoder, Compression};
use serde::{de::DeserializeOwned, Serialize};
use std::io::{Read, Write};
use thiserror::Error;

const SAVE_FILE_MAGIC_LEN: usize = 8;
const SAVE_FILE_MAGIC: [u8; SAVE_FILE_MAGIC_LEN] = *b"NESMAPR\x1a";
// Keep this separate from Semver because breaking API changes may not invalidate the save format.
const SAVE_VERSION: &str = "1";

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
#[must_use]
pub enum Error {
    #[error("invalid save header: {0}")]
    InvalidHeader(String),
    #[error("failed to write save header: {0:?}")]
    WriteHeaderFailed(std::io::Error),
    #[error("failed to encode data: {0:?}")]
    EncodingFailed(std::io::Error),
    #[error("failed to decode data: {0:?}")]
    DecodingFailed(std::io::Error),
    #[error("failed to serialize data: {0}")]
    SerializationFailed(String),
}

/// Writes a header including a magic string and a version
///
/// # Errors
///
/// If the header fails to write to disk, then an error is returned.
pub(crate) fn write_header(f: &mut impl Write) -> std::io::Result<()> {
    f.write_all(&SAVE_FILE_MAGIC)?;
    f.write_all(SAVE_VERSION.as_bytes())
}

/// Verifies a saved state header.
///
/// # Errors
///
/// If the header fails to validate, then an error is returned.
pub(crate) fn validate_header(f: &mut impl Read) -> Result<()> {
    let mut magic = [0u8; SAVE_FILE_MAGIC_LEN];
    f.read_exact(&mut magic)
        .map_err(|s| Error::InvalidHeader(s.to_string()))?;
    if magic != SAVE_FILE_MAGIC {
        return Err(Error::InvalidHeader(format!(
            "invalid magic (expected {SAVE_FILE_MAGIC:?}, found: {magic:?}",
        )));
    }

    let mut version = [0u8];
    f.read_exact(&mut version)
        .map_err(|s| Error::InvalidHeader(s.to_string()))?;
    if version == SAVE_VERSION.as_bytes() {
        Ok(())
    } else {
        Err(Error::InvalidHeader(format!(
            "invalid version (expected {SAVE_VERSION:?}, found: {version:?}",
        )))
    }
}

pub fn encode(mut writer: &mut impl Write, data: &[u8]) -> std::io::Result<()> {
    let mut encoder = DeflateEncoder::new(&mut writer, Compression::default());
    encoder.write_all(data)?;
    encoder.finish()?;
    Ok(())
}

pub fn decode(data: impl Read) -> std::io::Result<Vec<u8>> {
    let mut decoded = vec![];
    let mut decoder = DeflateDecoder::new(data);
    decoder.read_to_end(&mut decoded)?;
    Ok(decoded)
}

/// Serializes `value` and writes it to `writer` behind the magic+version header, DEFLATE-
/// compressed. The sink is caller-provided (file, socket, `Vec<u8>`, ...); this crate never opens
/// one itself.
pub fn save<T>(writer: &mut impl Write, value: &T) -> Result<()>
where
    T: ?Sized + Serialize,
{
    let data =
        bincode::serialize(value).map_err(|err| Error::SerializationFailed(err.to_string()))?;
    write_header(writer).map_err(Error::WriteHeaderFailed)?;
    encode(writer, &data).map_err(Error::EncodingFailed)?;
    Ok(())
}

/// Validates the header and deserializes a `T` out of `reader`. See [`save`].
pub fn load<T>(reader: &mut impl Read) -> Result<T>
where
    T: DeserializeOwned,
{
    validate_header(reader)?;
    let data = decode(reader).map_err(Error::DecodingFailed)?;
    bincode::deserialize(&data).map_err(|err| Error::SerializationFailed(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_header() {
        let mut file = Vec::new();
        assert!(write_header(&mut file).is_ok(), "write header");
        assert!(
            validate_header(&mut file.as_slice()).is_ok(),
            "validate header"
        );
    }
}
