//! Header sniffing for the image formats that can be embedded
//!
//! Only the headers are read: dimensions, animation and whether the encoding
//! is lossy. Pixel data is never decoded.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Gif,
    Bmp,
    Jpeg,
}

impl ImageFormat {
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Jpeg => "image/jpeg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub animated: bool,
    pub lossy: bool,
}

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Identify the format of `bytes` and read its intrinsic geometry
pub fn sniff(bytes: &[u8]) -> Option<ImageInfo> {
    if bytes.starts_with(PNG_SIGNATURE) {
        sniff_png(bytes)
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        sniff_gif(bytes)
    } else if bytes.starts_with(b"BM") {
        sniff_bmp(bytes)
    } else if bytes.starts_with(&[0xFF, 0xD8]) {
        sniff_jpeg(bytes)
    } else {
        None
    }
}

fn be_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let slice = bytes.get(at..at + 4)?;
    Some(u32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

fn be_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let slice = bytes.get(at..at + 2)?;
    Some(u16::from_be_bytes([slice[0], slice[1]]))
}

fn le_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let slice = bytes.get(at..at + 2)?;
    Some(u16::from_le_bytes([slice[0], slice[1]]))
}

fn le_i32(bytes: &[u8], at: usize) -> Option<i32> {
    let slice = bytes.get(at..at + 4)?;
    Some(i32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

fn sniff_png(bytes: &[u8]) -> Option<ImageInfo> {
    if bytes.get(12..16)? != b"IHDR" {
        return None;
    }
    let width = be_u32(bytes, 16)?;
    let height = be_u32(bytes, 20)?;

    // acTL must appear before the first IDAT in an animated PNG
    let mut animated = false;
    let mut offset = PNG_SIGNATURE.len();
    while let (Some(length), Some(kind)) = (be_u32(bytes, offset), bytes.get(offset + 4..offset + 8)) {
        match kind {
            b"acTL" => {
                animated = true;
                break;
            }
            b"IDAT" | b"IEND" => break,
            _ => offset += 12 + length as usize,
        }
    }

    Some(ImageInfo {
        format: ImageFormat::Png,
        width,
        height,
        animated,
        lossy: false,
    })
}

/// Skip a run of GIF data sub-blocks starting at `offset`
fn skip_sub_blocks(bytes: &[u8], mut offset: usize) -> Option<usize> {
    loop {
        let size = usize::from(*bytes.get(offset)?);
        offset += 1;
        if size == 0 {
            return Some(offset);
        }
        offset += size;
    }
}

fn color_table_size(packed: u8) -> usize {
    if packed & 0x80 == 0 {
        0
    } else {
        3 * (1 << ((packed & 0x07) + 1))
    }
}

fn count_gif_frames(bytes: &[u8]) -> Option<usize> {
    let mut offset = 13 + color_table_size(*bytes.get(10)?);
    let mut frames = 0;
    loop {
        match *bytes.get(offset)? {
            0x2C => {
                frames += 1;
                if frames > 1 {
                    return Some(frames);
                }
                let packed = *bytes.get(offset + 9)?;
                offset += 10 + color_table_size(packed);
                // LZW minimum code size precedes the image data
                offset = skip_sub_blocks(bytes, offset + 1)?;
            }
            0x21 => offset = skip_sub_blocks(bytes, offset + 2)?,
            // trailer, or a block this reader does not know
            _ => return Some(frames),
        }
    }
}

fn sniff_gif(bytes: &[u8]) -> Option<ImageInfo> {
    let width = u32::from(le_u16(bytes, 6)?);
    let height = u32::from(le_u16(bytes, 8)?);
    // Truncated frame data still yields the logical screen size
    let frames = count_gif_frames(bytes).unwrap_or(1);
    Some(ImageInfo {
        format: ImageFormat::Gif,
        width,
        height,
        animated: frames > 1,
        lossy: false,
    })
}

fn sniff_bmp(bytes: &[u8]) -> Option<ImageInfo> {
    let width = le_i32(bytes, 18)?.unsigned_abs();
    // Negative heights mark top-down bitmaps
    let height = le_i32(bytes, 22)?.unsigned_abs();
    Some(ImageInfo {
        format: ImageFormat::Bmp,
        width,
        height,
        animated: false,
        lossy: false,
    })
}

const fn is_start_of_frame(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

fn sniff_jpeg(bytes: &[u8]) -> Option<ImageInfo> {
    let mut offset = 2;
    loop {
        if *bytes.get(offset)? != 0xFF {
            return None;
        }
        let marker = *bytes.get(offset + 1)?;
        match marker {
            0xFF => offset += 1,
            0x01 | 0xD0..=0xD8 => offset += 2,
            0xD9 => return None,
            _ if is_start_of_frame(marker) => {
                let height = u32::from(be_u16(bytes, offset + 5)?);
                let width = u32::from(be_u16(bytes, offset + 7)?);
                return Some(ImageInfo {
                    format: ImageFormat::Jpeg,
                    width,
                    height,
                    animated: false,
                    lossy: true,
                });
            }
            _ => offset += 2 + usize::from(be_u16(bytes, offset + 2)?),
        }
    }
}

/// Minimal well-formed headers, shared with the generator tests
#[cfg(test)]
pub(crate) mod fixtures {
    pub(crate) fn png(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = super::PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(&13_u32.to_be_bytes());
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes.extend_from_slice(&[8, 6, 0, 0, 0]);
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        bytes.extend_from_slice(&0_u32.to_be_bytes());
        bytes.extend_from_slice(b"IEND");
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        bytes
    }

    pub(crate) fn gif(width: u16, height: u16, frames: usize) -> Vec<u8> {
        let mut bytes = b"GIF89a".to_vec();
        bytes.extend_from_slice(&width.to_le_bytes());
        bytes.extend_from_slice(&height.to_le_bytes());
        bytes.extend_from_slice(&[0, 0, 0]);
        for _ in 0..frames {
            bytes.extend_from_slice(&[0x21, 0xF9, 4, 0, 10, 0, 0, 0]);
            bytes.push(0x2C);
            bytes.extend_from_slice(&[0, 0, 0, 0]);
            bytes.extend_from_slice(&width.to_le_bytes());
            bytes.extend_from_slice(&height.to_le_bytes());
            bytes.push(0);
            bytes.extend_from_slice(&[2, 2, 0x4C, 0x01, 0]);
        }
        bytes.push(0x3B);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_png_dimensions() {
        let info = sniff(&fixtures::png(64, 48)).expect("valid png");
        assert_eq!(
            info,
            ImageInfo {
                format: ImageFormat::Png,
                width: 64,
                height: 48,
                animated: false,
                lossy: false,
            }
        );
    }

    #[test]
    fn test_apng_is_animated() {
        let mut bytes = fixtures::png(1, 1);
        // Insert an acTL chunk right after IHDR
        let at = 8 + 12 + 13;
        let mut actl = 8_u32.to_be_bytes().to_vec();
        actl.extend_from_slice(b"acTL");
        actl.extend_from_slice(&[0; 12]);
        bytes.splice(at..at, actl);

        assert!(sniff(&bytes).expect("valid png").animated);
    }

    #[test]
    fn test_gif_frames() {
        let still = sniff(&fixtures::gif(16, 8, 1)).expect("valid gif");
        assert_eq!((still.width, still.height, still.animated), (16, 8, false));

        let animated = sniff(&fixtures::gif(16, 8, 3)).expect("valid gif");
        assert!(animated.animated);
    }

    #[test]
    fn test_bmp_top_down_height() {
        let mut bytes = vec![0_u8; 54];
        bytes[..2].copy_from_slice(b"BM");
        bytes[18..22].copy_from_slice(&20_i32.to_le_bytes());
        bytes[22..26].copy_from_slice(&(-10_i32).to_le_bytes());

        let info = sniff(&bytes).expect("valid bmp");
        assert_eq!((info.width, info.height), (20, 10));
    }

    #[test]
    fn test_jpeg_is_lossy() {
        let mut bytes = vec![0xFF, 0xD8];
        // APP0 segment with a 4 byte payload
        bytes.extend_from_slice(&[0xFF, 0xE0, 0, 6, b'J', b'F', b'I', b'F']);
        // SOF0: length, precision, height, width
        bytes.extend_from_slice(&[0xFF, 0xC0, 0, 11, 8, 0, 30, 0, 40, 1, 1, 0x11, 0]);

        let info = sniff(&bytes).expect("valid jpeg");
        assert_eq!((info.width, info.height, info.lossy), (40, 30, true));
        assert_eq!(info.format.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_unknown_bytes() {
        assert!(sniff(b"not an image").is_none());
        assert!(sniff(&[0, 0, 0, 0]).is_none());
    }
}
