//! Pluggable document codecs ("storage engines").

use std::fmt;
use std::str::FromStr;

use crate::common::{AttributeMap, Error, Result};

/// Serializes an attribute map to bytes and back.
pub trait Codec: Send + Sync {
    /// Engine name, as accepted by [`EngineKind::from_str`].
    fn name(&self) -> &'static str;

    /// File extension of documents written by this codec, without the dot.
    fn extension(&self) -> &'static str;

    fn encode(&self, data: &AttributeMap) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<AttributeMap>;
}

/// JSON documents via `serde_json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    pub fn compact() -> Self {
        Self { pretty: false }
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        if self.pretty {
            "json-pretty"
        } else {
            "json"
        }
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn encode(&self, data: &AttributeMap) -> Result<Vec<u8>> {
        let mut bytes = if self.pretty {
            serde_json::to_vec_pretty(data)?
        } else {
            serde_json::to_vec(data)?
        };
        bytes.push(b'\n');
        Ok(bytes)
    }

    fn decode(&self, bytes: &[u8]) -> Result<AttributeMap> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// YAML documents via `serde_yaml`.
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlCodec;

impl Codec for YamlCodec {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn extension(&self) -> &'static str {
        "yml"
    }

    fn encode(&self, data: &AttributeMap) -> Result<Vec<u8>> {
        serde_yaml::to_string(data)
            .map(String::into_bytes)
            .map_err(|e| Error::Codec(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<AttributeMap> {
        serde_yaml::from_slice(bytes).map_err(|e| Error::Codec(e.to_string()))
    }
}

/// Named storage engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Json,
    PrettyJson,
    Yaml,
}

impl EngineKind {
    pub fn codec(self) -> Box<dyn Codec> {
        match self {
            EngineKind::Json => Box::new(JsonCodec::compact()),
            EngineKind::PrettyJson => Box::new(JsonCodec::pretty()),
            EngineKind::Yaml => Box::new(YamlCodec),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EngineKind::Json => "json",
            EngineKind::PrettyJson => "json-pretty",
            EngineKind::Yaml => "yaml",
        }
    }
}

impl FromStr for EngineKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(EngineKind::Json),
            "json-pretty" | "pretty-json" => Ok(EngineKind::PrettyJson),
            "yaml" | "yml" => Ok(EngineKind::Yaml),
            _ => Err(Error::InvalidEngine(s.to_string())),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> AttributeMap {
        let mut data = AttributeMap::new();
        data.insert("name".into(), json!("Ada"));
        data.insert("tags".into(), json!(["a", "b"]));
        data.insert("age".into(), json!(36));
        data
    }

    #[test]
    fn test_compact_and_pretty_agree() {
        let data = sample();
        let compact = JsonCodec::compact().encode(&data).unwrap();
        let pretty = JsonCodec::pretty().encode(&data).unwrap();

        assert!(pretty.len() > compact.len());
        assert_eq!(JsonCodec::compact().decode(&pretty).unwrap(), data);
    }

    #[test]
    fn test_decode_rejects_non_object() {
        assert!(matches!(
            JsonCodec::compact().decode(b"[1, 2, 3]"),
            Err(Error::Codec(_))
        ));
        assert!(JsonCodec::compact().decode(b"{\"trunc").is_err());
    }

    #[test]
    fn test_engine_names() {
        assert_eq!("json".parse::<EngineKind>().unwrap(), EngineKind::Json);
        assert_eq!("JSON-Pretty".parse::<EngineKind>().unwrap(), EngineKind::PrettyJson);
        assert_eq!("yml".parse::<EngineKind>().unwrap(), EngineKind::Yaml);
        assert!(matches!("xml".parse::<EngineKind>(), Err(Error::InvalidEngine(_))));
        assert_eq!(EngineKind::PrettyJson.codec().extension(), "json");
        assert_eq!(EngineKind::Yaml.codec().extension(), "yml");
    }

    #[test]
    fn test_yaml_round_trip() {
        let mut data = sample();
        data.insert("ratio".into(), json!(2.5));
        data.insert("missing".into(), json!(null));
        data.insert("nested".into(), json!({"ok": true, "n": [1, -2]}));
        data.insert("big".into(), json!(u64::MAX));

        let codec = YamlCodec;
        let bytes = codec.encode(&data).unwrap();
        assert!(String::from_utf8(bytes.clone()).unwrap().contains("name: Ada"));
        assert_eq!(codec.decode(&bytes).unwrap(), data);
    }

    #[test]
    fn test_yaml_rejects_non_mapping() {
        assert!(matches!(YamlCodec.decode(b"- 1\n- 2\n"), Err(Error::Codec(_))));
        assert!(matches!(YamlCodec.decode(b"a: [unclosed"), Err(Error::Codec(_))));
    }
}
