use crate::core::bounds::Bounds;
use crate::core::geo::{LatLng, Point};
use crate::core::projection::Projection;
use crate::core::viewport::Viewport;
use crate::drawing::project::project_points;
use crate::prelude::{Arc, Mutex};
use crate::tiles::tile::Pixel;
use crate::{MapError, Result};
use std::sync::PoisonError;

const TRANSPARENT: Pixel = [0, 0, 0, 0];

/// RGBA image drawn at a marker's position
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerTexture {
    width: usize,
    height: usize,
    pixels: Arc<[Pixel]>,
}

impl MarkerTexture {
    pub fn new(width: usize, height: usize, pixels: Vec<Pixel>) -> Result<Self> {
        if width == 0 || height == 0 || pixels.len() != width * height {
            return Err(MapError::InvalidElement(format!(
                "marker texture of {}x{} needs {} pixels, got {}",
                width,
                height,
                width * height,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels: pixels.into(),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Pixel> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    /// Nearest-neighbour rotation about the center, clockwise in screen space. The
    /// result grows to the rotated bounding box; uncovered pixels are transparent.
    pub fn rotated(&self, degrees: f64) -> MarkerTexture {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let (w, h) = (self.width as f64, self.height as f64);
        let out_w = ((w * cos.abs() + h * sin.abs()).round() as usize).max(1);
        let out_h = ((w * sin.abs() + h * cos.abs()).round() as usize).max(1);

        let src_cx = w / 2.0;
        let src_cy = h / 2.0;
        let dst_cx = out_w as f64 / 2.0;
        let dst_cy = out_h as f64 / 2.0;

        let mut pixels = vec![TRANSPARENT; out_w * out_h];
        for y in 0..out_h {
            for x in 0..out_w {
                let dx = x as f64 + 0.5 - dst_cx;
                let dy = y as f64 + 0.5 - dst_cy;
                // Inverse rotation back into the source image
                let sx = dx * cos + dy * sin + src_cx;
                let sy = -dx * sin + dy * cos + src_cy;
                if sx >= 0.0 && sy >= 0.0 {
                    if let Some(pixel) = self.get(sx as usize, sy as usize) {
                        pixels[y * out_w + x] = pixel;
                    }
                }
            }
        }

        MarkerTexture {
            width: out_w,
            height: out_h,
            pixels: pixels.into(),
        }
    }
}

#[derive(Debug)]
struct RotatedTexture {
    rotation: f64,
    texture: MarkerTexture,
}

/// A point feature with an image anchored to a coordinate
#[derive(Debug)]
pub struct Marker {
    position: LatLng,
    texture: Option<MarkerTexture>,
    rotation: f64,
    /// Normalized point of the image placed on the position; (0.5, 1.0) is bottom center
    anchor: Point,
    pub visible: bool,
    rotated: Mutex<Option<RotatedTexture>>,
}

impl Marker {
    pub fn new(position: LatLng) -> Self {
        Self {
            position,
            texture: None,
            rotation: 0.0,
            anchor: Point::new(0.5, 1.0),
            visible: true,
            rotated: Mutex::new(None),
        }
    }

    pub fn with_texture(mut self, texture: MarkerTexture) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_anchor(mut self, anchor: Point) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn position(&self) -> LatLng {
        self.position
    }

    pub fn set_position(&mut self, position: LatLng) {
        self.position = position;
    }

    pub fn texture(&self) -> Option<&MarkerTexture> {
        self.texture.as_ref()
    }

    /// Replaces the image. A missing texture is rejected.
    pub fn set_texture(&mut self, texture: Option<MarkerTexture>) -> Result<()> {
        let texture = texture.ok_or_else(|| {
            MapError::InvalidElement("marker texture must not be missing".to_string())
        })?;
        self.texture = Some(texture);
        *self.rotated.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn set_rotation(&mut self, degrees: f64) {
        self.rotation = degrees;
    }

    /// Position in tile space at `zoom`
    pub fn tile_position(&self, zoom: u8, projection: Projection) -> Point {
        projection.coordinates_to_tile(self.position.lng, self.position.lat, zoom)
    }

    /// Position in view pixels, unwrapped toward the view center
    pub fn view_position(&self, viewport: &Viewport) -> Point {
        let mut out = Vec::with_capacity(1);
        project_points(&[self.position], viewport, &mut out);
        out.first().copied().unwrap_or_default()
    }

    /// The rotated image, rebuilt only when the rotation or texture changed
    pub fn rotated_texture(&self) -> Option<MarkerTexture> {
        let texture = self.texture.as_ref()?;
        if self.rotation.rem_euclid(360.0) == 0.0 {
            return Some(texture.clone());
        }

        let mut cached = self.rotated.lock().unwrap_or_else(PoisonError::into_inner);
        match cached.as_ref() {
            Some(entry) if entry.rotation == self.rotation => Some(entry.texture.clone()),
            _ => {
                let rotated = texture.rotated(self.rotation);
                *cached = Some(RotatedTexture {
                    rotation: self.rotation,
                    texture: rotated.clone(),
                });
                Some(rotated)
            }
        }
    }

    /// Screen rectangle covered by the (rotated) image, in view pixels
    pub fn screen_rect(&self, viewport: &Viewport) -> Option<Bounds> {
        let texture = self.rotated_texture()?;
        let size = Point::new(texture.width() as f64, texture.height() as f64);
        let origin = self
            .view_position(viewport)
            .subtract(&Point::new(size.x * self.anchor.x, size.y * self.anchor.y));
        Some(Bounds::new(origin, origin.add(&size)))
    }

    pub fn is_in_view(&self, viewport: &Viewport) -> bool {
        if !self.visible {
            return false;
        }
        let view = Bounds::from_coords(0.0, 0.0, viewport.size.x, viewport.size.y);
        match self.screen_rect(viewport) {
            Some(rect) => rect.intersects(&view),
            None => view.contains(&self.view_position(viewport)),
        }
    }
}
