//! Packed (image, mask) record: a fixed 32-byte header followed by the
//! encoded image blob and the encoded mask blob.
//!
//! Header layout, little-endian:
//!
//! | offset | field        | type       |
//! |--------|--------------|------------|
//! | 0      | `flag`       | `u32`      |
//! | 4      | `label`      | `f32`      |
//! | 8      | `image_size` | `u32`      |
//! | 12     | `label_size` | `u32`      |
//! | 16     | `image_id`   | `[u64; 2]` |

use ndarray::Array3;

use crate::error::{Error, Result};

/// Size of [`SegRecordHeader`] on disk
pub const HEADER_SIZE: usize = 32;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SegRecordHeader {
    /// Reserved for extensions
    pub flag: u32,
    /// Scalar label of the whole image
    pub label: f32,
    /// Byte length of the encoded image
    pub image_size: u32,
    /// Byte length of the encoded mask
    pub label_size: u32,
    /// `image_id[0]` holds the id, `image_id[1]` is reserved
    pub image_id: [u64; 2],
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[at..at + 4]);
    u32::from_le_bytes(bytes)
}

fn read_u64(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}

impl SegRecordHeader {
    /// Parse the header at the start of `buf`.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::RecordTooShort {
                len: buf.len(),
                required: HEADER_SIZE,
            });
        }
        Ok(SegRecordHeader {
            flag: read_u32(buf, 0),
            label: f32::from_bits(read_u32(buf, 4)),
            image_size: read_u32(buf, 8),
            label_size: read_u32(buf, 12),
            image_id: [read_u64(buf, 16), read_u64(buf, 24)],
        })
    }

    #[must_use]
    pub fn save(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&self.flag.to_le_bytes());
        out[4..8].copy_from_slice(&self.label.to_bits().to_le_bytes());
        out[8..12].copy_from_slice(&self.image_size.to_le_bytes());
        out[12..16].copy_from_slice(&self.label_size.to_le_bytes());
        out[16..24].copy_from_slice(&self.image_id[0].to_le_bytes());
        out[24..32].copy_from_slice(&self.image_id[1].to_le_bytes());
        out
    }

    #[must_use]
    pub fn image_index(&self) -> u64 {
        self.image_id[0]
    }
}

/// A record borrowed from a caller-owned buffer
#[derive(Clone, Copy, Debug)]
pub struct SegRecord<'a> {
    pub header: SegRecordHeader,
    pub image_data: &'a [u8],
    pub label_data: &'a [u8],
}

impl<'a> SegRecord<'a> {
    /// Split `buf` into header, image blob and mask blob.
    pub fn load(buf: &'a [u8]) -> Result<Self> {
        let header = SegRecordHeader::parse(buf)?;
        let payload = &buf[HEADER_SIZE..];
        let image_size = header.image_size as usize;
        let label_size = header.label_size as usize;
        let declared = image_size.saturating_add(label_size);
        if declared > payload.len() {
            return Err(Error::RecordTruncated {
                declared,
                available: payload.len(),
            });
        }
        let (image_data, rest) = payload.split_at(image_size);
        Ok(SegRecord {
            header,
            image_data,
            label_data: &rest[..label_size],
        })
    }

    /// Serialize `header` followed by both blobs.
    ///
    /// The size fields of `header` are overwritten with the blob lengths.
    pub fn pack(header: SegRecordHeader, image: &[u8], label: &[u8]) -> Result<Vec<u8>> {
        let blob_len = |name: &str, blob: &[u8]| {
            u32::try_from(blob.len())
                .map_err(|_| Error::invalid(name, format!("{} bytes exceeds u32", blob.len())))
        };
        let header = SegRecordHeader {
            image_size: blob_len("image", image)?,
            label_size: blob_len("label", label)?,
            ..header
        };
        let mut out = Vec::with_capacity(HEADER_SIZE + image.len() + label.len());
        out.extend_from_slice(&header.save());
        out.extend_from_slice(image);
        out.extend_from_slice(label);
        Ok(out)
    }

    /// Decode both blobs into a BGR image and a single-channel mask.
    pub fn decode(&self) -> Result<(Array3<u8>, Array3<u8>)> {
        Ok((decode_image(self.image_data)?, decode_mask(self.label_data)?))
    }
}

/// Decode an encoded image blob into an `(H, W, 3)` BGR array.
pub fn decode_image(bytes: &[u8]) -> Result<Array3<u8>> {
    let rgb = image::load_from_memory(bytes)
        .map_err(Error::ImageDecode)?
        .to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(Array3::from_shape_fn(
        (height as usize, width as usize, 3),
        |(y, x, c)| rgb.get_pixel(x as u32, y as u32)[2 - c],
    ))
}

/// Decode an encoded mask blob into an `(H, W, 1)` array of class ids.
pub fn decode_mask(bytes: &[u8]) -> Result<Array3<u8>> {
    let luma = image::load_from_memory(bytes)
        .map_err(Error::ImageDecode)?
        .to_luma8();
    let (width, height) = luma.dimensions();
    Array3::from_shape_vec((height as usize, width as usize, 1), luma.into_raw()).map_err(|e| {
        Error::ShapeMismatch {
            expected: format!("({height}, {width}, 1) mask"),
            actual: e.to_string(),
        }
    })
}
