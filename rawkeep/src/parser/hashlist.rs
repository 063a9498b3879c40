//! A plain-text hash manifest (§4.1 "HashList"): lines of `hash  filename`,
//! merged into the global hash table for coherency checks without decoding
//! the file it describes.

use std::collections::HashMap;

/// Returns `None` when `data` isn't plausibly a hash manifest (no line looks
/// like `hex  name`), so the probe loop falls through to `Unknown`.
pub fn parse(data: &[u8]) -> Option<HashMap<String, String>> {
    let text = std::str::from_utf8(data).ok()?;
    let mut entries = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.splitn(2, char::is_whitespace);
        let hash = parts.next()?;
        let name = parts.next()?.trim_start();
        if !is_hex(hash) || name.is_empty() {
            return None;
        }
        entries.insert(name.to_string(), hash.to_lowercase());
    }
    if entries.is_empty() {
        None
    } else {
        Some(entries)
    }
}

fn is_hex(s: &str) -> bool {
    matches!(s.len(), 32 | 40 | 64) && s.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_md5_manifest() {
        let text = "d41d8cd98f00b204e9800998ecf8427e  empty.dpx\n\
                     900150983cd24fb0d6963f7d28e17f72  abc.dpx\n";
        let entries = parse(text.as_bytes()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries["empty.dpx"], "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn rejects_non_manifest_text() {
        assert!(parse(b"just some notes, nothing hashy here\n").is_none());
    }

    #[test]
    fn rejects_binary_data() {
        assert!(parse(&[0xFF, 0xFE, 0x00, 0x01]).is_none());
    }
}
