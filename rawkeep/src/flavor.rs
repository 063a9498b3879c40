//! Flavor tables: the closed set of sample/pixel layouts this system will
//! hand to an external codec (§3 Flavor). Transcribed from the source's
//! `AIFF_Tested`/`WAV`-chunk matching tables as Rust enums and a predicate
//! instead of a C array of structs.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endianness {
    Big,
    Little,
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Endianness::Big => "BE",
            Endianness::Little => "LE",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFlavor {
    pub sample_rate: u32,
    pub sample_size: u8,
    pub channels: u8,
    pub endianness: Endianness,
}

impl fmt::Display for AudioFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PCM_{}_{}_{}_{}",
            self.sample_rate, self.sample_size, self.channels, self.endianness
        )
    }
}

const SAMPLE_RATES: [u32; 3] = [44100, 48000, 96000];
const SAMPLE_SIZES: [u8; 3] = [8, 16, 24];
const CHANNEL_COUNTS: [u8; 3] = [1, 2, 6];

fn base_combination_supported(flavor: &AudioFlavor) -> bool {
    SAMPLE_RATES.contains(&flavor.sample_rate)
        && SAMPLE_SIZES.contains(&flavor.sample_size)
        && CHANNEL_COUNTS.contains(&flavor.channels)
}

/// WAV's `data` chunk is always little-endian PCM (or unsigned for 8-bit),
/// including at 24-bit.
pub fn is_supported_wav_flavor(flavor: &AudioFlavor) -> bool {
    base_combination_supported(flavor) && flavor.endianness == Endianness::Little
}

/// AIFF's `SSND` chunk defaults to big-endian (or signed for 8-bit); 24-bit
/// stays BE-only even when `compressionType` requests `sowt`/`raw`.
pub fn is_supported_aiff_flavor(flavor: &AudioFlavor) -> bool {
    base_combination_supported(flavor) && (flavor.sample_size != 24 || flavor.endianness == Endianness::Big)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageColorLayout {
    Rgb,
    Rgba,
    Luma,
    Yuv422,
    Yuv444,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageFlavor {
    pub bit_depth: u8,
    pub colorspace: ImageColorLayout,
    /// `true` when samples are packed to a container width wider than
    /// `bit_depth` (e.g. 10-bit samples in 32-bit words) — the case the
    /// padding check (§4.1, §8) cares about.
    pub word_padded: bool,
}

impl fmt::Display for ImageFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}_{}bit", self.colorspace, self.bit_depth)
    }
}

const IMAGE_BIT_DEPTHS: [u8; 4] = [8, 10, 12, 16];

pub fn is_supported_image_flavor(flavor: &ImageFlavor) -> bool {
    IMAGE_BIT_DEPTHS.contains(&flavor.bit_depth)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flavor {
    Audio(AudioFlavor),
    Image(ImageFlavor),
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flavor::Audio(a) => a.fmt(f),
            Flavor::Image(i) => i.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aiff_twenty_four_bit_requires_big_endian() {
        let be = AudioFlavor {
            sample_rate: 48000,
            sample_size: 24,
            channels: 2,
            endianness: Endianness::Big,
        };
        let le = AudioFlavor {
            endianness: Endianness::Little,
            ..be
        };
        assert!(is_supported_aiff_flavor(&be));
        assert!(!is_supported_aiff_flavor(&le));
    }

    #[test]
    fn wav_twenty_four_bit_requires_little_endian() {
        let le = AudioFlavor {
            sample_rate: 48000,
            sample_size: 24,
            channels: 2,
            endianness: Endianness::Little,
        };
        let be = AudioFlavor {
            endianness: Endianness::Big,
            ..le
        };
        assert!(is_supported_wav_flavor(&le));
        assert!(!is_supported_wav_flavor(&be));
    }

    #[test]
    fn aiff_eight_and_sixteen_bit_support_both_endiannesses() {
        for size in [8u8, 16] {
            for endianness in [Endianness::Big, Endianness::Little] {
                let flavor = AudioFlavor {
                    sample_rate: 44100,
                    sample_size: size,
                    channels: 2,
                    endianness,
                };
                assert!(is_supported_aiff_flavor(&flavor));
            }
        }
    }

    #[test]
    fn unsupported_sample_rate_is_rejected() {
        let flavor = AudioFlavor {
            sample_rate: 22050,
            sample_size: 16,
            channels: 2,
            endianness: Endianness::Little,
        };
        assert!(!is_supported_wav_flavor(&flavor));
        assert!(!is_supported_aiff_flavor(&flavor));
    }
}
