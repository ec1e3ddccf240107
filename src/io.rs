use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ImageEncoder, ImageFormat, Rgb};

use crate::canvas::{MAX_CHANNEL_VALUE, RasterImage};
use crate::error::{EditorError, EditorResult};

/// Quality used for every JPEG export.
pub const JPEG_QUALITY: u8 = 90;

// ============================================================================
// FILE TYPES
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileType {
    Ppm,
    Png,
    Jpeg,
}

impl FileType {
    /// Parse an extension token such as `.png`, `PPM` or `jpg`.
    pub fn from_extension(ext: &str) -> EditorResult<Self> {
        let trimmed = ext.trim();
        match trimmed.trim_start_matches('.').to_lowercase().as_str() {
            "ppm" => Ok(FileType::Ppm),
            "png" => Ok(FileType::Png),
            "jpeg" | "jpg" => Ok(FileType::Jpeg),
            _ => Err(EditorError::invalid(format!("Invalid file type: {}", trimmed))),
        }
    }

    pub fn from_path(path: &Path) -> EditorResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| EditorError::invalid(format!("Invalid file type: {}", path.display())))?;
        Self::from_extension(ext)
    }

    fn image_format(&self) -> Option<ImageFormat> {
        match self {
            FileType::Ppm => None,
            FileType::Png => Some(ImageFormat::Png),
            FileType::Jpeg => Some(ImageFormat::Jpeg),
        }
    }
}

// ============================================================================
// PPM (plain P3 text)
// ============================================================================

/// Parse a plain-text `P3` PPM.  Lines starting with `#` are comments.
pub fn decode_ppm(text: &str) -> EditorResult<RasterImage> {
    let mut tokens = text
        .lines()
        .filter(|line| !line.starts_with('#'))
        .flat_map(str::split_whitespace);

    match tokens.next() {
        Some("P3") => {}
        _ => {
            return Err(EditorError::invalid(
                "Invalid PPM file: plain RAW file should begin with P3",
            ));
        }
    }

    let mut next_int = |what: &str| -> EditorResult<u32> {
        let tok = tokens
            .next()
            .ok_or_else(|| EditorError::invalid(format!("PPM ended before {}", what)))?;
        tok.parse::<u32>()
            .map_err(|_| EditorError::invalid(format!("PPM {} is not a non-negative integer: '{}'", what, tok)))
    };

    let width = next_int("width")?;
    let height = next_int("height")?;
    let max_value = next_int("max value")?;
    if max_value > MAX_CHANNEL_VALUE as u32 {
        return Err(EditorError::invalid(format!(
            "PPM max value {} exceeds {}",
            max_value, MAX_CHANNEL_VALUE
        )));
    }

    let count = (width as usize).checked_mul(height as usize).ok_or_else(|| {
        EditorError::invalid(format!("PPM dimensions {}x{} are too large", width, height))
    })?;
    // a pixel needs at least six bytes of text; capacity never exceeds the input
    let mut colors = Vec::with_capacity(count.min(text.len() / 6));
    for _ in 0..count {
        let mut c = [0u16; 3];
        for slot in &mut c {
            let v = next_int("pixel data")?;
            if v > max_value {
                return Err(EditorError::invalid(format!(
                    "PPM channel value {} exceeds max value {}",
                    v, max_value
                )));
            }
            *slot = v as u16;
        }
        colors.push(Rgb(c));
    }

    RasterImage::new(width, height, max_value as u16, colors)
}

/// `P3`, dimensions, max value, then one channel value per line.
pub fn encode_ppm(image: &RasterImage) -> String {
    let mut out = String::with_capacity(16 + image.pixels().len() * 12);
    let _ = write!(out, "P3\n{} {}\n{}\n", image.width(), image.height(), image.max_value());
    for p in image.pixels() {
        let _ = write!(out, "{}\n{}\n{}\n", p.red(), p.green(), p.blue());
    }
    out
}

// ============================================================================
// DECODE / ENCODE
// ============================================================================

/// Decode raw file bytes of the given kind.  PNG/JPEG images take their max
/// value from the brightest channel actually present.
pub fn decode_image(bytes: &[u8], kind: FileType) -> EditorResult<RasterImage> {
    let Some(format) = kind.image_format() else {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| EditorError::invalid("PPM file is not valid text"))?;
        return decode_ppm(text);
    };

    let rgb = image::load_from_memory_with_format(bytes, format)?.to_rgb8();
    let colors = rgb
        .pixels()
        .map(|p| Rgb(p.0.map(u16::from)))
        .collect();
    RasterImage::from_colors(rgb.width(), rgb.height(), colors)
}

pub fn encode_image(image: &RasterImage, kind: FileType) -> EditorResult<Vec<u8>> {
    match kind {
        FileType::Ppm => Ok(encode_ppm(image).into_bytes()),
        FileType::Png => {
            let buf = image.to_rgb8();
            let mut out = Cursor::new(Vec::new());
            PngEncoder::new(&mut out).write_image(
                buf.as_raw(),
                buf.width(),
                buf.height(),
                image::ColorType::Rgb8,
            )?;
            Ok(out.into_inner())
        }
        FileType::Jpeg => {
            let buf = image.to_rgb8();
            let mut out = Cursor::new(Vec::new());
            let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
            encoder.encode(
                buf.as_raw(),
                buf.width(),
                buf.height(),
                image::ColorType::Rgb8,
            )?;
            Ok(out.into_inner())
        }
    }
}

// ============================================================================
// SYNCHRONOUS FILE HELPERS
// ============================================================================

/// Load an image file, choosing the decoder from its extension.
pub fn load_image_sync(path: &Path) -> EditorResult<RasterImage> {
    let kind = FileType::from_path(path)?;
    if !path.is_file() {
        return Err(EditorError::not_found(format!("File {} not found!", path.display())));
    }
    let bytes = std::fs::read(path)?;
    let image = decode_image(&bytes, kind)?;
    log::debug!(
        "decoded {} ({}x{}, max {})",
        path.display(),
        image.width(),
        image.height(),
        image.max_value()
    );
    Ok(image)
}

/// Encode and write an image to a file.
pub fn encode_and_write(image: &RasterImage, path: &Path, kind: FileType) -> EditorResult<()> {
    let bytes = encode_image(image, kind)?;
    write_bytes(path, &bytes)?;
    log::debug!("wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

pub(crate) fn write_bytes(path: &Path, bytes: &[u8]) -> EditorResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_PPM: &str = "P3\n# made by hand\n2 2\n255\n255 0 0\n0 255 0\n0 0 255\n10 20 30\n";

    #[test]
    fn file_type_tokens() {
        assert_eq!(FileType::from_extension(".PNG").unwrap(), FileType::Png);
        assert_eq!(FileType::from_extension("jpg").unwrap(), FileType::Jpeg);
        assert_eq!(FileType::from_path(Path::new("a/b.ppm")).unwrap(), FileType::Ppm);
        assert!(matches!(FileType::from_extension(".gif"), Err(EditorError::InvalidArgument(_))));
        assert!(FileType::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn decode_ppm_reads_header_and_pixels() {
        let img = decode_ppm(SMALL_PPM).unwrap();
        assert_eq!((img.width(), img.height(), img.max_value()), (2, 2, 255));
        assert_eq!(img.color_at(1, 0).unwrap(), Rgb([0, 255, 0]));
        assert_eq!(img.color_at(1, 1).unwrap(), Rgb([10, 20, 30]));
    }

    #[test]
    fn decode_ppm_keeps_declared_max() {
        let img = decode_ppm("P3 1 1 1000 999 0 5").unwrap();
        assert_eq!(img.max_value(), 1000);
        assert_eq!(img.color_at(0, 0).unwrap(), Rgb([999, 0, 5]));
    }

    #[test]
    fn decode_ppm_rejects_garbage() {
        for bad in [
            "P6\n1 1\n255\n0 0 0",
            "P3\n1 1\n255\n0 0",
            "P3\n1 1\n255\n0 -1 0",
            "P3\n1 1\n10\n0 11 0",
            "P3\n0 1\n255\n",
            "P3\n1 1\n70000\n0 0 0",
        ] {
            assert!(matches!(decode_ppm(bad), Err(EditorError::InvalidArgument(_))), "{:?}", bad);
        }
    }

    #[test]
    fn decode_ppm_huge_header_with_little_data_is_an_error() {
        let err = decode_ppm("P3\n4000000000 4000000000\n255\n0 0 0\n").unwrap_err();
        assert!(matches!(err, EditorError::InvalidArgument(msg) if msg.contains("ended before")));
        let err = decode_ppm("P3\n100000 100000\n255\n1 2 3\n4 5 6\n").unwrap_err();
        assert!(matches!(err, EditorError::InvalidArgument(_)));
    }

    #[test]
    fn ppm_text_layout() {
        let img = RasterImage::new(2, 1, 9, vec![Rgb([1, 2, 3]), Rgb([4, 5, 9])]).unwrap();
        assert_eq!(encode_ppm(&img), "P3\n2 1\n9\n1\n2\n3\n4\n5\n9\n");
    }

    #[test]
    fn ppm_round_trip() {
        let img = decode_ppm(SMALL_PPM).unwrap();
        let back = decode_image(&encode_image(&img, FileType::Ppm).unwrap(), FileType::Ppm).unwrap();
        assert_eq!(back, img);
    }

    #[test]
    fn png_round_trip_derives_max_value() {
        let img = RasterImage::from_colors(
            3,
            1,
            vec![Rgb([10, 20, 30]), Rgb([200, 0, 7]), Rgb([0, 0, 0])],
        )
        .unwrap();
        let bytes = encode_image(&img, FileType::Png).unwrap();
        let back = decode_image(&bytes, FileType::Png).unwrap();
        assert_eq!(back.max_value(), 200);
        assert_eq!(back.colors(), img.colors());
    }

    #[test]
    fn jpeg_encodes_decodable_bytes() {
        let img = RasterImage::filled(8, 8, 255, Rgb([120, 60, 30])).unwrap();
        let bytes = encode_image(&img, FileType::Jpeg).unwrap();
        let back = decode_image(&bytes, FileType::Jpeg).unwrap();
        assert_eq!((back.width(), back.height()), (8, 8));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_image_sync(&dir.path().join("ghost.png")).unwrap_err();
        assert!(matches!(err, EditorError::NotFound(_)));
    }

    #[test]
    fn write_then_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.ppm");
        let img = decode_ppm(SMALL_PPM).unwrap();
        encode_and_write(&img, &path, FileType::Ppm).unwrap();
        assert_eq!(load_image_sync(&path).unwrap(), img);
    }
}
