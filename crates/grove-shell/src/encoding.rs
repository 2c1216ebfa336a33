//! Charsets for data arguments and script files.
//!
//! Payloads typed at the shell are encoded per `--encoding` before they
//! hit the wire, and decoded the same way for `get --string`. Unknown
//! charsets fail argument parsing, before any session traffic.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A charset the shell can encode and decode.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Encoding {
    /// UTF-8, the default.
    #[default]
    Utf8,
    /// Seven-bit ASCII.
    Ascii,
    /// ISO-8859-1, one byte per code point up to U+00FF.
    Latin1,
}

/// Charset failures: unknown names and undecodable/unencodable payloads.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    /// The charset name is not supported.
    #[error("unsupported charset '{0}'")]
    UnsupportedCharset(String),
    /// The text cannot be represented in the charset.
    #[error("text is not representable in {0}")]
    Unencodable(Encoding),
    /// The bytes are not valid in the charset.
    #[error("data is not valid {0}")]
    Undecodable(Encoding),
}

impl Encoding {
    /// Canonical name of the charset.
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Ascii => "ascii",
            Encoding::Latin1 => "latin-1",
        }
    }

    /// Encodes text into charset bytes.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, EncodingError> {
        match self {
            Encoding::Utf8 => Ok(text.as_bytes().to_vec()),
            Encoding::Ascii => {
                if text.is_ascii() {
                    Ok(text.as_bytes().to_vec())
                } else {
                    Err(EncodingError::Unencodable(*self))
                }
            }
            Encoding::Latin1 => text
                .chars()
                .map(|ch| u8::try_from(u32::from(ch)).map_err(|_| EncodingError::Unencodable(*self)))
                .collect(),
        }
    }

    /// Decodes charset bytes into text.
    pub fn decode(&self, bytes: &[u8]) -> Result<String, EncodingError> {
        match self {
            Encoding::Utf8 => String::from_utf8(bytes.to_vec())
                .map_err(|_| EncodingError::Undecodable(*self)),
            Encoding::Ascii => {
                if bytes.is_ascii() {
                    Ok(String::from_utf8_lossy(bytes).into_owned())
                } else {
                    Err(EncodingError::Undecodable(*self))
                }
            }
            Encoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, EncodingError> {
        match s.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "ascii" | "us-ascii" => Ok(Encoding::Ascii),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(Encoding::Latin1),
            other => Err(EncodingError::UnsupportedCharset(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charset_names_parse() {
        assert_eq!("UTF-8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("us-ascii".parse::<Encoding>().unwrap(), Encoding::Ascii);
        assert_eq!("ISO-8859-1".parse::<Encoding>().unwrap(), Encoding::Latin1);
        assert!(matches!(
            "koi8-r".parse::<Encoding>(),
            Err(EncodingError::UnsupportedCharset(_))
        ));
    }

    #[test]
    fn test_utf8_round_trip() {
        let bytes = Encoding::Utf8.encode("héllo").unwrap();
        assert_eq!(Encoding::Utf8.decode(&bytes).unwrap(), "héllo");
    }

    #[test]
    fn test_ascii_rejects_non_ascii() {
        assert!(Encoding::Ascii.encode("héllo").is_err());
        assert!(Encoding::Ascii.decode("héllo".as_bytes()).is_err());
        assert_eq!(Encoding::Ascii.encode("hello").unwrap(), b"hello");
    }

    #[test]
    fn test_latin1_maps_bytes_directly() {
        let bytes = Encoding::Latin1.encode("héllo").unwrap();
        assert_eq!(bytes, vec![b'h', 0xe9, b'l', b'l', b'o']);
        assert_eq!(Encoding::Latin1.decode(&bytes).unwrap(), "héllo");
        assert!(Encoding::Latin1.encode("日本").is_err());
    }
}
