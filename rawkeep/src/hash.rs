//! Streaming digests attached to a reassembled file's name for verification
//! without a disk round-trip (§4.5).

use sha1::Sha1;
use sha2::{Digest, Sha256};

/// MD5 is always computed; SHA-1/SHA-256 are optional per run (§4.3).
#[derive(Debug, Clone, Default)]
pub struct FrameHash {
    pub md5: [u8; 16],
    pub sha1: Option<[u8; 20]>,
    pub sha256: Option<[u8; 32]>,
}

#[derive(Default)]
pub struct Hasher {
    md5: md5::Context,
    sha1: Option<Sha1>,
    sha256: Option<Sha256>,
}

impl Hasher {
    pub fn new(want_sha1: bool, want_sha256: bool) -> Self {
        Self {
            md5: md5::Context::new(),
            sha1: want_sha1.then(Sha1::new),
            sha256: want_sha256.then(Sha256::new),
        }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.md5.consume(bytes);
        if let Some(sha1) = &mut self.sha1 {
            sha1::Digest::update(sha1, bytes);
        }
        if let Some(sha256) = &mut self.sha256 {
            Digest::update(sha256, bytes);
        }
    }

    pub fn finish(self) -> FrameHash {
        FrameHash {
            md5: self.md5.compute().0,
            sha1: self.sha1.map(|h| sha1::Digest::finalize(h).into()),
            sha256: self.sha256.map(|h| h.finalize().into()),
        }
    }
}

/// Convenience for the common case: hash a whole in-memory buffer at once.
pub fn hash_buffer(bytes: &[u8], want_sha1: bool, want_sha256: bool) -> FrameHash {
    let mut hasher = Hasher::new(want_sha1, want_sha256);
    hasher.update(bytes);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_of_empty_matches_known_digest() {
        let hash = hash_buffer(b"", false, false);
        assert_eq!(hex::encode(hash.md5), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn md5_of_abc_matches_known_digest() {
        let hash = hash_buffer(b"abc", false, false);
        assert_eq!(hex::encode(hash.md5), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn optional_digests_are_none_unless_requested() {
        let hash = hash_buffer(b"abc", false, false);
        assert!(hash.sha1.is_none());
        assert!(hash.sha256.is_none());

        let hash = hash_buffer(b"abc", true, true);
        assert!(hash.sha1.is_some());
        assert!(hash.sha256.is_some());
    }
}
