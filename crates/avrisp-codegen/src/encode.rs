//! Intel HEX to firmware image encoding

use std::fmt;
use std::str::FromStr;

use avrisp_core::error::Error as IspError;
use avrisp_core::flash::is_blank;
use avrisp_core::hex::{DecodedRecord, HexReader, HexRecord, RecordType};
use avrisp_core::image::{ContiguousImage, FirmwareImage, HexLineImage, PagedImage, ERASED};

use crate::error::Result;
use crate::profile::ChipProfile;

/// Output layout of an encoded image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// One byte array from the first data byte, trailing 0xFF dropped
    Contiguous,
    /// Page table with blank pages left out
    #[default]
    Paged,
    /// The HEX records as decoded
    HexLines,
}

impl ImageFormat {
    /// All formats, for help text
    pub const ALL: [ImageFormat; 3] = [Self::Contiguous, Self::Paged, Self::HexLines];

    /// Name accepted by [`FromStr`]
    pub fn name(self) -> &'static str {
        match self {
            Self::Contiguous => "contiguous",
            Self::Paged => "paged",
            Self::HexLines => "hex-lines",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown image format '{}'", s))
    }
}

/// An encoded image owning its data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedImage {
    /// Linear bytes starting at `base_address`
    Contiguous {
        base_address: u32,
        data: Vec<u8>,
    },
    /// Page table indexed by absolute page number
    Paged {
        base_address: u32,
        page_size: u16,
        pages: Vec<Option<Vec<u8>>>,
    },
    /// Data records followed by the end-of-file record
    HexLines { records: Vec<DecodedRecord> },
}

impl EncodedImage {
    /// Layout of this image
    pub fn format(&self) -> ImageFormat {
        match self {
            Self::Contiguous { .. } => ImageFormat::Contiguous,
            Self::Paged { .. } => ImageFormat::Paged,
            Self::HexLines { .. } => ImageFormat::HexLines,
        }
    }

    /// Borrow as a [`FirmwareImage`] named `name` for the duration of `f`
    pub fn with_image<R>(&self, name: &str, f: impl FnOnce(&FirmwareImage<'_>) -> R) -> R {
        match self {
            Self::Contiguous { base_address, data } => {
                let image = FirmwareImage::Contiguous(ContiguousImage::new(name, *base_address, data));
                f(&image)
            }
            Self::Paged {
                base_address,
                page_size,
                pages,
            } => {
                let table: Vec<Option<&[u8]>> = pages.iter().map(|p| p.as_deref()).collect();
                let image =
                    FirmwareImage::Paged(PagedImage::new(name, *base_address, *page_size, &table));
                f(&image)
            }
            Self::HexLines { records } => {
                let lines: Vec<HexRecord<'_>> = records.iter().map(|r| r.as_record()).collect();
                let image = FirmwareImage::HexLines(HexLineImage::new(name, &lines));
                f(&image)
            }
        }
    }
}

/// Decode HEX text into records, stopping at the end-of-file record
pub fn decode_hex(text: &str) -> Result<Vec<DecodedRecord>> {
    let records = HexReader::new(text).collect::<std::result::Result<Vec<_>, _>>()?;
    log::debug!("codegen: decoded {} records", records.len());
    Ok(records)
}

/// Flash contents described by the data records, plus the covered span
struct FlashMap {
    bytes: Vec<u8>,
    start: u32,
    end: u32,
}

fn materialize(records: &[DecodedRecord], profile: &ChipProfile) -> Result<FlashMap> {
    let flash_size = profile.flash_bytes();
    let mut bytes = vec![ERASED; flash_size as usize];
    let mut start = u32::MAX;
    let mut end = 0;

    for record in records.iter().filter(|r| r.kind == RecordType::Data) {
        let record_start = record.address as u32;
        let record_end = record_start + record.data.len() as u32;
        if record_end > flash_size {
            return Err(IspError::ImageTooLarge {
                end: record_end,
                flash_size,
            }
            .into());
        }
        bytes[record_start as usize..record_end as usize].copy_from_slice(&record.data);
        start = start.min(record_start);
        end = end.max(record_end);
    }

    if end == 0 {
        start = 0;
    }
    Ok(FlashMap { bytes, start, end })
}

/// Encode decoded records for a chip in the requested layout
///
/// Only data records contribute bytes. Data reaching past the profile's
/// flash size fails with `ImageTooLarge`.
pub fn encode(
    records: &[DecodedRecord],
    profile: &ChipProfile,
    format: ImageFormat,
) -> Result<EncodedImage> {
    profile.validate()?;
    let map = materialize(records, profile)?;
    log::info!(
        "codegen: {} bytes at 0x{:04X}..0x{:04X} for {}",
        map.end - map.start,
        map.start,
        map.end,
        profile.name
    );

    let image = match format {
        ImageFormat::Contiguous => {
            let mut data = map.bytes[map.start as usize..map.end as usize].to_vec();
            while data.last() == Some(&ERASED) {
                data.pop();
            }
            EncodedImage::Contiguous {
                base_address: map.start,
                data,
            }
        }
        ImageFormat::Paged => {
            let page_size = profile.page_size as usize;
            let used_pages = (map.end as usize).div_ceil(page_size);
            let pages = map.bytes[..used_pages * page_size]
                .chunks(page_size)
                .map(|page| (!is_blank(page)).then(|| page.to_vec()))
                .collect();
            EncodedImage::Paged {
                base_address: map.start / page_size as u32 * page_size as u32,
                page_size: profile.page_size,
                pages,
            }
        }
        ImageFormat::HexLines => {
            let records = records
                .iter()
                .filter(|r| matches!(r.kind, RecordType::Data | RecordType::EndOfFile))
                .cloned()
                .collect();
            EncodedImage::HexLines { records }
        }
    };
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodegenError;

    const BLINK: &str = ":100000000C9434000C943E000C943E000C943E0082\n\
                         :0400100011241FBEDA\n\
                         :00000001FF\n";

    fn profile() -> ChipProfile {
        ChipProfile::resolve("m88pa").unwrap()
    }

    #[test]
    fn test_format_names() {
        for format in ImageFormat::ALL {
            assert_eq!(format.name().parse::<ImageFormat>(), Ok(format));
        }
        assert_eq!("Hex-Lines".parse::<ImageFormat>(), Ok(ImageFormat::HexLines));
        assert!("bin".parse::<ImageFormat>().is_err());
    }

    #[test]
    fn test_decode_stops_on_checksum_error() {
        let bad = ":0400100011241FBEDB\n:00000001FF\n";
        assert!(matches!(
            decode_hex(bad),
            Err(CodegenError::Isp(IspError::ChecksumError { line: 1 }))
        ));
    }

    #[test]
    fn test_encode_contiguous() {
        let records = decode_hex(BLINK).unwrap();
        let image = encode(&records, &profile(), ImageFormat::Contiguous).unwrap();
        match image {
            EncodedImage::Contiguous { base_address, data } => {
                assert_eq!(base_address, 0);
                assert_eq!(data.len(), 0x14);
                assert_eq!(&data[0x10..], &[0x11, 0x24, 0x1F, 0xBE]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_encode_paged_leaves_gaps() {
        let text = ":0400100011241FBEDA\n:02008000AABB19\n:00000001FF\n";
        let records = decode_hex(text).unwrap();
        let image = encode(&records, &profile(), ImageFormat::Paged).unwrap();
        match &image {
            EncodedImage::Paged {
                base_address,
                page_size,
                pages,
            } => {
                assert_eq!(*base_address, 0);
                assert_eq!(*page_size, 64);
                assert_eq!(pages.len(), 3);
                assert!(pages[0].is_some());
                assert!(pages[1].is_none());
                assert_eq!(&pages[2].as_ref().unwrap()[..3], &[0xAA, 0xBB, 0xFF]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_layouts_materialize_identically() {
        let records = decode_hex(BLINK).unwrap();
        let profile = profile();
        let read_all = |format| {
            let image = encode(&records, &profile, format).unwrap();
            image.with_image("blink", |image| {
                let mut flash = vec![0u8; 256];
                for (i, page) in flash.chunks_mut(64).enumerate() {
                    image.read_page(i as u32 * 64, page).unwrap();
                }
                flash
            })
        };

        let contiguous = read_all(ImageFormat::Contiguous);
        assert_eq!(contiguous, read_all(ImageFormat::Paged));
        assert_eq!(contiguous, read_all(ImageFormat::HexLines));
        assert_eq!(&contiguous[..4], &[0x0C, 0x94, 0x34, 0x00]);
        assert!(contiguous[0x14..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_image_too_large() {
        // 8 KiB part, record ending at 0x2004
        let text = ":0420000001020304D2\n:00000001FF\n";
        let records = decode_hex(text).unwrap();
        assert!(matches!(
            encode(&records, &profile(), ImageFormat::Paged),
            Err(CodegenError::Isp(IspError::ImageTooLarge {
                end: 0x2004,
                flash_size: 0x2000
            }))
        ));
    }
}
