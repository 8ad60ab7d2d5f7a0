//! Deserialization of cached model files
//!
//! Models are published as R serialized objects (`.rds`): a stream that may be
//! gzip, bzip2 or xz compressed, starting with a format marker and a small
//! header.
//! Only the header is interpreted; the object body is kept as opaque bytes.

use super::resolver::ModelDescriptor;
use bytes::Bytes;
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use serde::Serialize;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use thiserror::Error;
use xz2::read::XzDecoder;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const BZIP2_MAGIC: &[u8] = b"BZh";
const XZ_MAGIC: &[u8] = &[0xfd, b'7', b'z', b'X', b'Z', 0x00];

/// Reasons a model file cannot be decoded
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("file is empty")]
    Empty,

    #[error("{0} stream is invalid: {1}")]
    Decompress(RdsCompression, #[source] std::io::Error),

    #[error("unrecognised serialization format marker {0:?}")]
    UnknownFormat(Vec<u8>),

    #[error("header truncated while reading {0}")]
    Truncated(&'static str),

    #[error("unsupported serialization version {0}")]
    UnsupportedVersion(i32),

    #[error("malformed header field {0}")]
    Malformed(&'static str),
}

/// Serialization format recorded in the file's first two bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RdsFormat {
    /// `X\n`, big-endian binary
    Xdr,
    /// `B\n`, little-endian binary
    Binary,
    /// `A\n`, newline separated decimal text
    Ascii,
}

/// Compression wrapping the serialized stream, detected from its magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RdsCompression {
    None,
    Gzip,
    Bzip2,
    Xz,
}

impl RdsCompression {
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(GZIP_MAGIC) {
            Self::Gzip
        } else if bytes.starts_with(BZIP2_MAGIC) {
            Self::Bzip2
        } else if bytes.starts_with(XZ_MAGIC) {
            Self::Xz
        } else {
            Self::None
        }
    }

    fn decompress(self, bytes: &[u8]) -> Result<Vec<u8>, DecodeError> {
        let mut out = Vec::new();
        let result = match self {
            Self::None => {
                out.extend_from_slice(bytes);
                Ok(0)
            }
            Self::Gzip => GzDecoder::new(bytes).read_to_end(&mut out),
            Self::Bzip2 => BzDecoder::new(bytes).read_to_end(&mut out),
            Self::Xz => XzDecoder::new_multi_decoder(bytes).read_to_end(&mut out),
        };
        result.map_err(|e| DecodeError::Decompress(self, e))?;
        Ok(out)
    }
}

impl fmt::Display for RdsCompression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "uncompressed",
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
        };
        f.write_str(name)
    }
}

/// R version packed as `major * 65536 + minor * 256 + patch`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RVersion(pub i32);

impl fmt::Display for RVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        write!(f, "{}.{}.{}", v / 65536, (v % 65536) / 256, v % 256)
    }
}

/// Decoded file header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RdsHeader {
    pub format: RdsFormat,
    pub compression: RdsCompression,
    pub version: i32,
    pub writer_version: RVersion,
    pub min_reader_version: RVersion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_encoding: Option<String>,
}

/// Header plus the undecoded object body
#[derive(Debug, Clone)]
pub struct DecodedModel {
    pub header: RdsHeader,
    pub payload: Bytes,
}

/// In-memory handle to a loaded model
#[derive(Debug, Clone)]
pub struct ModelHandle {
    pub descriptor: ModelDescriptor,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub header: RdsHeader,
    pub payload: Bytes,
}

/// Turns raw cached bytes into a model
pub trait ModelDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedModel, DecodeError>;
}

/// Decoder for `.rds` files
#[derive(Debug, Clone, Copy, Default)]
pub struct RdsDecoder;

impl ModelDecoder for RdsDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedModel, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }

        let compression = RdsCompression::detect(bytes);
        let data = compression.decompress(bytes)?;

        let format = match data.get(..2) {
            Some(b"X\n") => RdsFormat::Xdr,
            Some(b"B\n") => RdsFormat::Binary,
            Some(b"A\n") => RdsFormat::Ascii,
            Some(other) => return Err(DecodeError::UnknownFormat(other.to_vec())),
            None => return Err(DecodeError::Truncated("format marker")),
        };

        let mut reader = HeaderReader {
            data: &data,
            pos: 2,
            format,
        };

        let version = reader.int("version")?;
        if !(2..=3).contains(&version) {
            return Err(DecodeError::UnsupportedVersion(version));
        }
        let writer_version = RVersion(reader.int("writer version")?);
        let min_reader_version = RVersion(reader.int("minimum reader version")?);

        let native_encoding = if version == 3 {
            let len = reader.int("native encoding length")?;
            let len = usize::try_from(len).map_err(|_| DecodeError::Malformed("native encoding length"))?;
            let raw = reader.take(len, "native encoding")?;
            Some(String::from_utf8_lossy(raw).into_owned())
        } else {
            None
        };

        let body_start = reader.pos;
        let body = Bytes::from(data).slice(body_start..);
        if body.is_empty() {
            return Err(DecodeError::Truncated("object body"));
        }

        Ok(DecodedModel {
            header: RdsHeader {
                format,
                compression,
                version,
                writer_version,
                min_reader_version,
                native_encoding,
            },
            payload: body,
        })
    }
}

struct HeaderReader<'a> {
    data: &'a [u8],
    pos: usize,
    format: RdsFormat,
}

impl<'a> HeaderReader<'a> {
    fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(DecodeError::Truncated(field))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn int(&mut self, field: &'static str) -> Result<i32, DecodeError> {
        match self.format {
            RdsFormat::Xdr => {
                let raw = self.take(4, field)?;
                Ok(i32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
            }
            RdsFormat::Binary => {
                let raw = self.take(4, field)?;
                Ok(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
            }
            RdsFormat::Ascii => {
                let rest = &self.data[self.pos..];
                let newline = rest
                    .iter()
                    .position(|b| *b == b'\n')
                    .ok_or(DecodeError::Truncated(field))?;
                let line = self.take(newline + 1, field)?;
                std::str::from_utf8(&line[..newline])
                    .ok()
                    .and_then(|s| s.trim().parse().ok())
                    .ok_or(DecodeError::Malformed(field))
            }
        }
    }
}
