use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Error raised while encoding or decoding a cached value.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct CodecError(#[from] serde_json::Error);

/// Value codec used to turn cached values into bytes and back.
///
/// Only one codec is used per process: [`BackendRegistry::build`](crate::BackendRegistry::build)
/// overwrites whatever codec the caller put into [`Options`](crate::Options)
/// with [`Codec::default()`], so that values written by one backend instance
/// can always be read by another one and by the degraded path of
/// [`fetch_or_save`](crate::fetch_or_save).
///
/// # Examples
///
/// ```
/// use dogpile_core::Codec;
///
/// let codec = Codec::default();
/// let bytes = codec.encode(&vec![1, 2, 3]).unwrap();
/// let decoded: Vec<i32> = codec.decode(&bytes).unwrap();
/// assert_eq!(decoded, vec![1, 2, 3]);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Codec {
    /// JSON through `serde_json`.
    #[default]
    Json,
}

impl Codec {
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        match self {
            Codec::Json => Ok(serde_json::to_vec(value)?),
        }
    }

    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        match self {
            Codec::Json => Ok(serde_json::from_slice(bytes)?),
        }
    }

    /// Copies `value` into a fresh `T` by encoding and decoding it.
    ///
    /// The result is exactly what a cache round trip would have produced.
    pub fn transcode<S, T>(&self, value: &S) -> Result<T, CodecError>
    where
        S: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let bytes = self.encode(value)?;
        self.decode(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        id: u64,
        name: String,
        tags: Vec<String>,
    }

    #[test]
    fn test_struct_round_trip() {
        let profile = Profile {
            id: 7,
            name: "ada".to_string(),
            tags: vec!["admin".to_string()],
        };

        let bytes = Codec::Json.encode(&profile).unwrap();
        assert_eq!(Codec::Json.decode::<Profile>(&bytes).unwrap(), profile);
    }

    #[test]
    fn test_transcode_into_compatible_type() {
        let source = HashMap::from([("a".to_string(), 1u8)]);
        let target: HashMap<String, u64> = Codec::Json.transcode(&source).unwrap();
        assert_eq!(target.get("a"), Some(&1));
    }

    #[test]
    fn test_decode_type_mismatch_fails() {
        let bytes = Codec::Json.encode("not a number").unwrap();
        assert!(Codec::Json.decode::<u32>(&bytes).is_err());
    }

    #[test]
    fn test_default_is_json() {
        assert_eq!(Codec::default(), Codec::Json);
    }
}
