//! Raster post-processing into delivery-sized WebP files
//!
//! A page no taller than `webp_limit` becomes a single `{stem}.webp`.
//! Taller pages are cut top to bottom into bands of at most `split_height`
//! rows, written as `{stem}_part1.webp`, `{stem}_part2.webp`, ...

use crate::error::{MenushotError, MenushotResult};
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, ImageReader};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::debug;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Convert one raster page into WebP delivery artifacts
///
/// Returns an empty list when `source` does not exist.
pub fn process_to_webp(
    source: &Path,
    output_dir: &Path,
    stem: &str,
    webp_limit: u32,
    split_height: u32,
) -> MenushotResult<Vec<PathBuf>> {
    if !source.exists() {
        debug!("No raster at {}, nothing to convert", source.display());
        return Ok(Vec::new());
    }

    let image = ImageReader::open(source)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| postprocess_err(format!("opening {}", source.display()), e))?
        .decode()
        .map_err(|e| postprocess_err(format!("decoding {}", source.display()), e))?;

    let (width, height) = (image.width(), image.height());

    if height <= webp_limit {
        let path = output_dir.join(format!("{}.webp", stem));
        encode_webp(&image, &path)?;
        return Ok(vec![path]);
    }

    if split_height == 0 {
        return Err(MenushotError::PostProcess(
            "split_height must be greater than zero".to_string(),
        ));
    }

    let parts = height.div_ceil(split_height);
    let mut outputs = Vec::with_capacity(parts as usize);

    for index in 0..parts {
        let top = index * split_height;
        let band_height = split_height.min(height - top);
        let band = image.crop_imm(0, top, width, band_height);

        let path = output_dir.join(format!("{}_part{}.webp", stem, index + 1));
        encode_webp(&band, &path)?;
        outputs.push(path);
    }

    debug!(
        "Split {}x{} raster into {} parts of <= {} rows",
        width, height, parts, split_height
    );
    Ok(outputs)
}

fn encode_webp(image: &DynamicImage, path: &Path) -> MenushotResult<()> {
    let rgba = image.to_rgba8();
    let file = File::create(path)
        .map_err(|e| postprocess_err(format!("creating {}", path.display()), e))?;

    WebPEncoder::new_lossless(BufWriter::new(file))
        .write_image(
            rgba.as_raw(),
            rgba.width(),
            rgba.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| postprocess_err(format!("encoding {}", path.display()), e))
}

fn postprocess_err(context: String, err: impl std::fmt::Display) -> MenushotError {
    MenushotError::PostProcess(format!("{}: {}", context, err))
}

/// Structural check of an existing image
///
/// Reads the header for dimensions and walks the container without decoding
/// pixels: every PNG chunk must carry a matching CRC and end at IEND, and
/// every RIFF chunk of a WebP must land exactly on the declared length.
/// Any failure means corrupt.
pub fn verify_image(path: &Path) -> bool {
    let reader = match ImageReader::open(path).and_then(|r| r.with_guessed_format()) {
        Ok(r) => r,
        Err(_) => return false,
    };

    let format = reader.format();
    match reader.into_dimensions() {
        Ok((w, h)) if w > 0 && h > 0 => {}
        _ => return false,
    }

    let check: fn(&[u8]) -> bool = match format {
        Some(ImageFormat::Png) => png_chunks_intact,
        Some(ImageFormat::WebP) => riff_chunks_intact,
        Some(_) => return true,
        None => return false,
    };

    match fs::read(path) {
        Ok(bytes) => check(&bytes),
        Err(_) => false,
    }
}

fn be_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let word = bytes.get(at..at.checked_add(4)?)?;
    Some(u32::from_be_bytes([word[0], word[1], word[2], word[3]]))
}

fn le_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let word = bytes.get(at..at.checked_add(4)?)?;
    Some(u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
}

/// Chunk layout: length (BE), type, data, CRC-32 over type and data
fn png_chunks_intact(bytes: &[u8]) -> bool {
    if !bytes.starts_with(&PNG_SIGNATURE) {
        return false;
    }

    let mut pos = PNG_SIGNATURE.len();
    loop {
        let Some(len) = be_u32(bytes, pos) else {
            return false;
        };
        let body = pos + 4;
        let Some(crc_at) = body.checked_add(4 + len as usize) else {
            return false;
        };
        let (Some(stored), Some(covered)) = (be_u32(bytes, crc_at), bytes.get(body..crc_at))
        else {
            return false;
        };
        if crc32fast::hash(covered) != stored {
            return false;
        }

        pos = crc_at + 4;
        if &covered[..4] == b"IEND" {
            return pos == bytes.len();
        }
    }
}

/// `RIFF` size `WEBP`, then chunks of fourcc, size (LE), data, pad to even
fn riff_chunks_intact(bytes: &[u8]) -> bool {
    if bytes.len() < 12 || &bytes[..4] != b"RIFF" || &bytes[8..12] != b"WEBP" {
        return false;
    }
    let Some(declared) = le_u32(bytes, 4) else {
        return false;
    };
    let end = declared as usize + 8;
    if bytes.len() != end {
        return false;
    }

    let mut pos = 12;
    while pos < end {
        let Some(size) = le_u32(bytes, pos + 4) else {
            return false;
        };
        let size = size as usize;
        pos += 8 + size + (size & 1);
    }
    pos == end
}
