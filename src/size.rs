use bytesize::ByteSize;
use humansize::BINARY;
use serde::{Deserialize, Deserializer};

/// Parse a byte count such as `65536`, `64KiB`, `4 MiB`, `1GB` or `-1`.
///
/// Plain integers, including the `0` and `-1` sentinels, are taken as is.
/// Anything else goes through [`ByteSize`], so `*iB` units are binary and
/// `KB`/`MB`/`GB`/`TB` are decimal. Negative values cannot carry a unit.
pub(crate) fn parse_size(input: &str) -> Result<i64, String> {
    let trimmed = input.trim();
    if let Ok(bytes) = trimmed.parse::<i64>() {
        return Ok(bytes);
    }
    if trimmed.starts_with('-') {
        return Err(format!("'{input}': negative sizes cannot carry a unit"));
    }

    let size = trimmed
        .parse::<ByteSize>()
        .map_err(|e| format!("'{input}' is not a valid size: {e}"))?;
    i64::try_from(size.as_u64()).map_err(|_| format!("'{input}' is too large"))
}

/// Render a byte count with a binary unit, e.g. `64 KiB`.
pub(crate) fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, BINARY)
}

/// Render a configured limit value, where anything `<= 0` is not enforced.
pub(crate) fn format_limit(limit: i64) -> String {
    if limit <= 0 {
        format!("unlimited ({limit})")
    } else {
        format_size(limit as u64)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SizeRepr {
    Bytes(i64),
    Text(String),
}

/// Accepts either an integer byte count or a human size string.
pub(crate) fn deserialize_size<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match SizeRepr::deserialize(deserializer)? {
        SizeRepr::Bytes(bytes) => Ok(bytes),
        SizeRepr::Text(text) => parse_size(&text).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_and_binary_units() {
        assert_eq!(parse_size("65536"), Ok(65536));
        assert_eq!(parse_size("64KiB"), Ok(64 * 1024));
        assert_eq!(parse_size("4 MiB"), Ok(4 * 1024 * 1024));
        assert_eq!(parse_size(" 1GiB "), Ok(1024 * 1024 * 1024));
        assert_eq!(parse_size("128B"), Ok(128));
    }

    #[test]
    fn test_parse_decimal_units() {
        assert_eq!(parse_size("1KB"), Ok(1_000));
        assert_eq!(parse_size("2GB"), Ok(2_000_000_000));
    }

    #[test]
    fn test_parse_sentinels() {
        assert_eq!(parse_size("0"), Ok(0));
        assert_eq!(parse_size("-1"), Ok(-1));
        assert!(parse_size("-1MiB").is_err());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_size("").is_err());
        assert!(parse_size("big").is_err());
        assert!(parse_size("12 parsecs").is_err());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(64 * 1024), "64 KiB");
        assert_eq!(format_size(4 * 1024 * 1024), "4 MiB");
        assert_eq!(format_limit(-1), "unlimited (-1)");
        assert_eq!(format_limit(0), "unlimited (0)");
        assert_eq!(format_limit(2048), "2 KiB");
    }

    #[test]
    fn test_deserialize_either_form() {
        #[derive(Deserialize)]
        struct Holder {
            #[serde(deserialize_with = "deserialize_size")]
            limit: i64,
        }
        let text: Holder = toml::from_str("limit = \"128KiB\"").unwrap();
        assert_eq!(text.limit, 128 * 1024);
        let number: Holder = toml::from_str("limit = -1").unwrap();
        assert_eq!(number.limit, -1);
    }
}
