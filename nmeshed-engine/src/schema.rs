// Opaque prefix -> encoder/decoder map. `set` consults the registry for the
// longest matching prefix (the empty prefix registered as a catch-all);
// `null` values bypass the codec entirely since a delete carries no value to
// encode.

use nmeshed_base::Error;

pub trait SchemaCodec {
    fn encode(&self, value: &[u8]) -> Result<Vec<u8>, Error>;
    fn decode(&self, value: &[u8]) -> Result<Vec<u8>, Error>;
}

#[derive(Default)]
pub struct SchemaRegistry {
    // Sorted longest-prefix-first is unnecessary; we scan and keep the best match.
    entries: Vec<(String, Box<dyn SchemaCodec>)>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        SchemaRegistry::default()
    }

    pub fn register(&mut self, prefix: impl Into<String>, codec: Box<dyn SchemaCodec>) {
        self.entries.push((prefix.into(), codec));
    }

    fn lookup(&self, key: &str) -> Option<&dyn SchemaCodec> {
        self.entries
            .iter()
            .filter(|(prefix, _)| key.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, codec)| codec.as_ref())
    }

    /// Encodes `value` through the longest-matching registered codec, if
    /// any; `None` passes through unchanged (no codec registered for `key`).
    pub fn encode_for(&self, key: &str, value: &[u8]) -> Result<Vec<u8>, Error> {
        match self.lookup(key) {
            Some(codec) => codec.encode(value),
            None => Ok(value.to_vec()),
        }
    }

    pub fn decode_for(&self, key: &str, value: &[u8]) -> Result<Vec<u8>, Error> {
        match self.lookup(key) {
            Some(codec) => codec.decode(value),
            None => Ok(value.to_vec()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    struct UpperCaseCodec;
    impl SchemaCodec for UpperCaseCodec {
        fn encode(&self, value: &[u8]) -> Result<Vec<u8>, Error> {
            Ok(value.to_ascii_uppercase())
        }
        fn decode(&self, value: &[u8]) -> Result<Vec<u8>, Error> {
            Ok(value.to_ascii_lowercase())
        }
    }

    #[test]
    fn test_passthrough_without_registered_codec() {
        let reg = SchemaRegistry::new();
        assert_eq!(reg.encode_for("doc:1", b"hi").unwrap(), b"hi".to_vec());
    }

    #[test]
    fn test_longest_prefix_wins() {
        let mut reg = SchemaRegistry::new();
        reg.register("", Box::new(UpperCaseCodec));
        reg.register("doc:", Box::new(UpperCaseCodec));
        assert_eq!(reg.encode_for("doc:1", b"hi").unwrap(), b"HI".to_vec());
        assert_eq!(reg.encode_for("other:1", b"hi").unwrap(), b"HI".to_vec());
    }

    #[test]
    fn test_round_trip_through_codec() {
        let mut reg = SchemaRegistry::new();
        reg.register("doc:", Box::new(UpperCaseCodec));
        let encoded = reg.encode_for("doc:1", b"Hi").unwrap();
        let decoded = reg.decode_for("doc:1", &encoded).unwrap();
        assert_eq!(decoded, b"hi".to_vec());
    }
}
