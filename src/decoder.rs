use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Serialization format of a fetched blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ConfigFormat {
    #[default]
    Json,
    Yaml,
    /// A tag the default decoder does not understand; custom decoders may.
    Other(String),
}

impl FromStr for ConfigFormat {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "json" => ConfigFormat::Json,
            "yaml" | "yml" => ConfigFormat::Yaml,
            _ => ConfigFormat::Other(s.to_string()),
        })
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigFormat::Json => f.write_str("json"),
            ConfigFormat::Yaml => f.write_str("yaml"),
            ConfigFormat::Other(tag) => f.write_str(tag),
        }
    }
}

/// Turns raw bytes into a config document.
pub trait ConfigDecoder<D>: Send + Sync {
    fn decode(&self, format: &ConfigFormat, data: &[u8]) -> Result<D, DecodeError>;
}

/// JSON and YAML through serde.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDecoder;

impl<D: DeserializeOwned> ConfigDecoder<D> for DefaultDecoder {
    fn decode(&self, format: &ConfigFormat, data: &[u8]) -> Result<D, DecodeError> {
        match format {
            ConfigFormat::Json => Ok(serde_json::from_slice(data)?),
            ConfigFormat::Yaml => Ok(serde_yaml::from_slice(data)?),
            ConfigFormat::Other(tag) => Err(DecodeError::UnsupportedFormat(tag.clone())),
        }
    }
}

impl<D, F> ConfigDecoder<D> for F
where
    F: Fn(&ConfigFormat, &[u8]) -> Result<D, DecodeError> + Send + Sync,
{
    fn decode(&self, format: &ConfigFormat, data: &[u8]) -> Result<D, DecodeError> {
        self(format, data)
    }
}

/// A user-defined sub-document carried in the `MyConfig` slot.
pub trait Extension:
    Serialize + DeserializeOwned + fmt::Display + fmt::Debug + Clone + PartialEq + Send + Sync + 'static
{
}

impl<T> Extension for T where
    T: Serialize + DeserializeOwned + fmt::Display + fmt::Debug + Clone + PartialEq + Send + Sync + 'static
{
}

/// Extension slot for callers with no custom section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoExtension {}

impl fmt::Display for NoExtension {
    fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    type Doc = BTreeMap<String, u32>;

    #[test]
    fn parses_format_tags() {
        assert_eq!("JSON".parse::<ConfigFormat>().unwrap(), ConfigFormat::Json);
        assert_eq!("yml".parse::<ConfigFormat>().unwrap(), ConfigFormat::Yaml);
        assert_eq!(
            "toml".parse::<ConfigFormat>().unwrap(),
            ConfigFormat::Other("toml".into())
        );
    }

    #[test]
    fn decodes_json_and_yaml() {
        let json: Doc = DefaultDecoder.decode(&ConfigFormat::Json, br#"{"a": 1}"#).unwrap();
        let yaml: Doc = DefaultDecoder.decode(&ConfigFormat::Yaml, b"a: 1\n").unwrap();
        assert_eq!(json, yaml);
    }

    #[test]
    fn unknown_format_is_named() {
        let err = ConfigDecoder::<Doc>::decode(&DefaultDecoder, &ConfigFormat::Other("ini".into()), b"")
            .unwrap_err();
        assert_eq!(err.to_string(), "unsupported config data type ini");
    }

    #[test]
    fn closures_are_decoders() {
        let decoder = |_: &ConfigFormat, data: &[u8]| -> Result<Doc, DecodeError> {
            let mut doc = Doc::new();
            doc.insert("len".into(), data.len() as u32);
            Ok(doc)
        };
        let doc = decoder.decode(&ConfigFormat::Other("raw".into()), b"abc").unwrap();
        assert_eq!(doc["len"], 3);
    }
}
