//! Fallback for any file that matches no known format (§4.1 "Unknown"): the
//! whole file is carried verbatim as an attachment.

use super::Attachment;

pub fn parse(data: &[u8]) -> Attachment {
    Attachment {
        bytes: data.to_vec(),
    }
}
