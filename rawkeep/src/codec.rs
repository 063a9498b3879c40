//! External codec seam (§6 "External codec seam"): the actual FFV1/FLAC
//! encode/decode lives outside this repository. The Driver is generic over
//! these two traits so it can orchestrate a real external process without
//! knowing anything about it; no production implementation ships here.

use crate::error::RawkeepError;
use crate::flavor::Flavor;

/// Compresses one stream's payload bytes, frame by frame.
pub trait PayloadEncoder {
    /// Starts a new stream with the given flavor. Called once per Stream
    /// before any `encode_frame` call for it.
    fn begin_stream(&mut self, flavor: &Flavor) -> Result<(), RawkeepError>;

    /// Compresses one frame's payload bytes, returning the codec's output
    /// for that frame.
    fn encode_frame(&mut self, payload: &[u8]) -> Result<Vec<u8>, RawkeepError>;

    fn finish_stream(&mut self) -> Result<(), RawkeepError>;
}

/// Decompresses codec output back into payload bytes, frame by frame.
pub trait PayloadDecoder {
    fn begin_stream(&mut self, flavor: &Flavor) -> Result<(), RawkeepError>;

    /// Decompresses one frame's codec output into its original payload
    /// bytes. The returned length must equal the payload length recorded in
    /// the frame's reversibility record.
    fn decode_frame(&mut self, encoded: &[u8]) -> Result<Vec<u8>, RawkeepError>;

    fn finish_stream(&mut self) -> Result<(), RawkeepError>;
}

/// Default codec when no external FFV1/FLAC process is wired in: payload
/// bytes pass through unchanged. This keeps the CLI runnable end to end
/// without the external codec this system doesn't implement (§6); a real
/// deployment supplies its own `PayloadEncoder`/`PayloadDecoder` in place of
/// this one to get actual compression.
#[derive(Debug, Default)]
pub struct PassthroughCodec;

impl PayloadEncoder for PassthroughCodec {
    fn begin_stream(&mut self, _flavor: &Flavor) -> Result<(), RawkeepError> {
        Ok(())
    }

    fn encode_frame(&mut self, payload: &[u8]) -> Result<Vec<u8>, RawkeepError> {
        Ok(payload.to_vec())
    }

    fn finish_stream(&mut self) -> Result<(), RawkeepError> {
        Ok(())
    }
}

impl PayloadDecoder for PassthroughCodec {
    fn begin_stream(&mut self, _flavor: &Flavor) -> Result<(), RawkeepError> {
        Ok(())
    }

    fn decode_frame(&mut self, encoded: &[u8]) -> Result<Vec<u8>, RawkeepError> {
        Ok(encoded.to_vec())
    }

    fn finish_stream(&mut self) -> Result<(), RawkeepError> {
        Ok(())
    }
}

#[cfg(test)]
/// Thin in-memory stand-in used only by tests to exercise the Driver's
/// orchestration without an external encoder process: "compression" is the
/// identity function.
pub mod identity {
    use super::*;

    #[derive(Default)]
    pub struct IdentityCodec;

    impl PayloadEncoder for IdentityCodec {
        fn begin_stream(&mut self, _flavor: &Flavor) -> Result<(), RawkeepError> {
            Ok(())
        }

        fn encode_frame(&mut self, payload: &[u8]) -> Result<Vec<u8>, RawkeepError> {
            Ok(payload.to_vec())
        }

        fn finish_stream(&mut self) -> Result<(), RawkeepError> {
            Ok(())
        }
    }

    impl PayloadDecoder for IdentityCodec {
        fn begin_stream(&mut self, _flavor: &Flavor) -> Result<(), RawkeepError> {
            Ok(())
        }

        fn decode_frame(&mut self, encoded: &[u8]) -> Result<Vec<u8>, RawkeepError> {
            Ok(encoded.to_vec())
        }

        fn finish_stream(&mut self) -> Result<(), RawkeepError> {
            Ok(())
        }
    }
}
