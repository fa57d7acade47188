use super::tile::Pixel;
use crate::core::constants::{TILE_PIXELS, TILE_SIZE};
use crate::{MapError, Result};

/// Decodes PNG or JPEG bytes into a 256×256 RGBA pixel buffer
pub fn decode_tile(bytes: &[u8]) -> Result<Vec<Pixel>> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| MapError::Decode(e.to_string()))?
        .to_rgba8();

    if image.width() != TILE_SIZE || image.height() != TILE_SIZE {
        return Err(MapError::Decode(format!(
            "expected {TILE_SIZE}x{TILE_SIZE} tile, got {}x{}",
            image.width(),
            image.height()
        )));
    }

    let pixels: Vec<Pixel> = image.pixels().map(|p| p.0).collect();
    debug_assert_eq!(pixels.len(), TILE_PIXELS);
    Ok(pixels)
}

#[cfg(test)]
pub(crate) fn encode_png(width: u32, height: u32, color: Pixel) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba(color));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageOutputFormat::Png,
        )
        .unwrap();
    bytes
}
