/*!
A reader for DOS-binary EPS containers.

A DOS EPS file opens with a fixed 32-byte little-endian record that
locates a PostScript program, an optional WMF preview, and an optional
TIFF preview inside the file. [`EpsHeader`] parses that record and
[`EpsDocument`] slices out the three segments, leaving their
interpretation to other crates.

## Safety
This crate forbids unsafe code via a crate-level attribute.
*/

#![forbid(unsafe_code)]
#![allow(missing_docs)]

use core::fmt;

/// A specialized [`Result`] type for container parsing.
pub type Result<T> = core::result::Result<T, Error>;

/// Identifies one of the three payload segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    PostScript,
    Wmf,
    Tiff,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PostScript => f.write_str("PostScript"),
            Self::Wmf => f.write_str("WMF"),
            Self::Tiff => f.write_str("TIFF"),
        }
    }
}

/// An error encountered while reading an EPS container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The input ends before the 32-byte header is complete.
    TooShort(usize),
    /// The id field does not carry the DOS-binary EPS magic.
    InvalidMagic(u32),
    /// A segment's offset and size reach outside the file.
    SegmentOutOfRange {
        segment: Segment,
        offset: u32,
        size: u32,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort(len) => {
                write!(f, "input of {len} bytes is shorter than the EPS header")
            }
            Self::InvalidMagic(id) => write!(f, "invalid EPS magic 0x{id:08x}"),
            Self::SegmentOutOfRange {
                segment,
                offset,
                size,
            } => write!(
                f,
                "{segment} segment at offset {offset} with size {size} exceeds the file"
            ),
        }
    }
}

impl core::error::Error for Error {}

/// The fixed 32-byte header at the start of a DOS-binary EPS file.
///
/// All fields are little-endian `u32`s. Offsets are absolute from the
/// start of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpsHeader {
    pub id: u32,
    pub postscript_offset: u32,
    pub postscript_length: u32,
    pub wmf_offset: u32,
    pub wmf_size: u32,
    pub tif_offset: u32,
    pub tif_size: u32,
    /// Read but never validated; the historical readers ignore it.
    pub checksum: u32,
}

impl EpsHeader {
    /// The size of the header in bytes.
    pub const SIZE: usize = 32;

    /// The magic constant carried in the `id` field.
    pub const MAGIC: u32 = 0xC6D3_D0C5;

    /// Parse the header from the first 32 bytes of a file.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::TooShort(data.len()));
        }

        let mut fields = [0_u32; 8];
        for (i, field) in fields.iter_mut().enumerate() {
            *field = read_u32(data, i * 4);
        }

        let header = Self {
            id: fields[0],
            postscript_offset: fields[1],
            postscript_length: fields[2],
            wmf_offset: fields[3],
            wmf_size: fields[4],
            tif_offset: fields[5],
            tif_size: fields[6],
            checksum: fields[7],
        };

        if header.id != Self::MAGIC {
            return Err(Error::InvalidMagic(header.id));
        }

        Ok(header)
    }
}

/// Reads a `u32` whose range the caller has already checked.
fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

/// The payload segments extracted from a DOS-binary EPS file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpsDocument {
    pub header: EpsHeader,
    /// The embedded PostScript program. Nominally 7-bit text; decoded
    /// permissively, replacing non-UTF-8 bytes.
    pub postscript: String,
    pub wmf: Vec<u8>,
    pub tiff: Vec<u8>,
}

impl EpsDocument {
    /// Parse the header and extract all three segments.
    ///
    /// A segment declared with size 0 yields an empty result regardless
    /// of its offset.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header = EpsHeader::parse(data)?;

        let postscript = slice_segment(
            data,
            Segment::PostScript,
            header.postscript_offset,
            header.postscript_length,
        )?;
        let wmf = slice_segment(data, Segment::Wmf, header.wmf_offset, header.wmf_size)?;
        let tiff = slice_segment(data, Segment::Tiff, header.tif_offset, header.tif_size)?;

        Ok(Self {
            header,
            postscript: String::from_utf8_lossy(postscript).into_owned(),
            wmf: wmf.to_vec(),
            tiff: tiff.to_vec(),
        })
    }
}

fn slice_segment(data: &[u8], segment: Segment, offset: u32, size: u32) -> Result<&[u8]> {
    if size == 0 {
        return Ok(&[]);
    }

    if u64::from(offset) + u64::from(size) > data.len() as u64 {
        return Err(Error::SegmentOutOfRange {
            segment,
            offset,
            size,
        });
    }

    Ok(&data[offset as usize..offset as usize + size as usize])
}
