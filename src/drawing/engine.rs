use super::clip::clip_polyline;
use super::element::{normalize_outline, DrawingElement, ElementMesh};
use super::fill::fill_polygon;
use super::project::project_points;
use super::stroke::stroke_polyline;
use crate::core::bounds::Bounds;
use crate::core::config::DrawingConfig;
use crate::core::geo::{LatLng, Point};
use crate::core::viewport::Viewport;
use crate::Result;

/// Scratch space for geometry generation, owned by the caller and reused across builds
#[derive(Debug, Default)]
pub struct GeometryBuffers {
    pub coordinates: Vec<LatLng>,
    pub projected: Vec<Point>,
    pub runs: Vec<Vec<Point>>,
    pub strip: Vec<Point>,
}

impl GeometryBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.coordinates.clear();
        self.projected.clear();
        self.runs.clear();
        self.strip.clear();
    }
}

/// Turns drawing elements into view-space meshes
#[derive(Debug, Clone, Default)]
pub struct DrawingEngine {
    config: DrawingConfig,
}

impl DrawingEngine {
    pub fn new(config: DrawingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DrawingConfig {
        &self.config
    }

    /// Builds the mesh of `element` for `viewport` and stores it on the element.
    ///
    /// Returns `Ok(false)` when nothing is drawn: the view zoom is outside the element's
    /// range, there are fewer than two distinct points, or every part is clipped away.
    pub fn build(
        &self,
        element: &mut DrawingElement,
        viewport: &Viewport,
        buffers: &mut GeometryBuffers,
    ) -> Result<bool> {
        element.validate()?;
        buffers.clear();

        if !element.is_visible_at(viewport.zoom) {
            element.set_mesh(None);
            return Ok(false);
        }

        if let Some(points) = element.points() {
            points.write_lat_lngs(&mut buffers.coordinates);
        }
        normalize_outline(element.kind, &mut buffers.coordinates);
        if buffers.coordinates.len() < 2 {
            element.set_mesh(None);
            return Ok(false);
        }

        project_points(&buffers.coordinates, viewport, &mut buffers.projected);
        let closed = element.kind.is_closed();
        if closed {
            let first = buffers.projected[0];
            buffers.projected.push(first);
        }

        let view = Bounds::from_coords(0.0, 0.0, viewport.size.x, viewport.size.y);
        if self.config.clip_to_view && element.check_bounds {
            // Keep the stroke's outer edge when the centerline sits just outside the view.
            let margin = element.style.stroke_width.max(0.0);
            clip_polyline(&buffers.projected, &view.expanded(margin), &mut buffers.runs);
        } else {
            buffers.runs.push(buffers.projected.clone());
        }

        let width = if element.style.stroke_width > 0.0 {
            element.style.stroke_width
        } else {
            self.config.default_stroke_width
        };
        let whole_ring = closed && buffers.runs.len() == 1 && buffers.runs[0].len() == buffers.projected.len();

        let mut mesh = ElementMesh {
            zoom: viewport.zoom,
            ..Default::default()
        };
        for run in &buffers.runs {
            stroke_polyline(run, width, whole_ring, &mut buffers.strip);
            if buffers.strip.len() >= 4 {
                mesh.strips.push(buffers.strip.clone());
            }
        }

        if closed && element.style.fill_color.is_some() {
            let ring = &buffers.projected[..buffers.projected.len() - 1];
            let fill = fill_polygon(
                ring,
                viewport.size.x.ceil().max(0.0) as usize,
                viewport.size.y.ceil().max(0.0) as usize,
                self.config.fill_block_size,
            );
            if fill.filled_count() > 0 {
                mesh.fill = Some(fill);
            }
        }

        let drawn = !mesh.is_empty();
        log::debug!(
            "built {:?} at zoom {}: {} strips, fill {}",
            element.kind,
            viewport.zoom,
            mesh.strips.len(),
            mesh.fill.is_some()
        );
        element.set_mesh(drawn.then_some(mesh));
        Ok(drawn)
    }

    /// Builds every element and returns how many were drawn. An invalid element is
    /// logged and skipped; the first such error is returned once the rest are built.
    pub fn build_all<'a>(
        &self,
        elements: impl IntoIterator<Item = &'a mut DrawingElement>,
        viewport: &Viewport,
        buffers: &mut GeometryBuffers,
    ) -> Result<usize> {
        let mut drawn = 0;
        let mut first_error = None;
        for element in elements {
            match self.build(element, viewport, buffers) {
                Ok(true) => drawn += 1,
                Ok(false) => {}
                Err(e) => {
                    log::warn!("skipping drawing element: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(drawn),
        }
    }
}
