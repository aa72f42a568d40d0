// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_bytes::{ByteBuf as SerdeByteBuf, Bytes as SerdeBytes};

use crate::cid::{Cid, CidError};
use crate::version::Version;

/// Helper method for `serde` to serialize a value through its string representation.
pub fn serialize_display<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Display,
    S: serde::Serializer,
{
    serializer.collect_str(value)
}

/// Helper method for `serde` to deserialize a value from its string representation.
pub fn deserialize_from_str<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: FromStr,
    T::Err: Display,
    D: serde::Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    value.parse().map_err(serde::de::Error::custom)
}

impl Serialize for Cid {
    /// Serializes the multibase string form when using a human readable encoding (JSON),
    /// otherwise it serializes the binary cid directly (CBOR).
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serialize_display(self, serializer)
        } else {
            SerdeBytes::new(&self.to_bytes()).serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Cid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            deserialize_from_str(deserializer)
        } else {
            let bytes = <SerdeByteBuf>::deserialize(deserializer)?;
            bytes
                .as_slice()
                .try_into()
                .map_err(|err: CidError| serde::de::Error::custom(err.to_string()))
        }
    }
}

impl Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serialize_display(self, serializer)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserialize_from_str(deserializer)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::canonical::{decode_cbor, encode_cbor};
    use crate::cid::{Cid, address_of};
    use crate::version::Version;

    #[test]
    fn cid_as_bytes_in_cbor() {
        let cid = address_of(&json!({ "title": "Root" })).unwrap();
        let bytes = encode_cbor(&cid).unwrap();

        // CBOR byte string header (major type 2, one byte length) followed by the binary cid.
        assert_eq!(bytes[0], 0x58);
        assert_eq!(bytes[1] as usize, cid.to_bytes().len());
        assert_eq!(&bytes[2..], cid.to_bytes().as_slice());

        let cid_again: Cid = decode_cbor(&bytes[..]).unwrap();
        assert_eq!(cid, cid_again);
    }

    #[test]
    fn version_as_string() {
        let version = Version::new(1, 12);
        assert_eq!(serde_json::to_string(&version).unwrap(), "\"1.12\"");
        assert_eq!(
            serde_json::from_str::<Version>("\"1.12\"").unwrap(),
            version
        );
        assert!(serde_json::from_str::<Version>("\"1.x\"").is_err());
    }
}
