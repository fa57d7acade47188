use super::fill::{contains_point, FillMask};
use crate::core::constants::MAX_ZOOM;
use crate::core::geo::{LatLng, Point};
use crate::tiles::tile::Pixel;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};

/// RGBA color for overlay styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_pixel(self) -> Pixel {
        [self.r, self.g, self.b, self.a]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingStyle {
    pub stroke_color: Color,
    /// Stroke width in view pixels
    pub stroke_width: f64,
    /// Interior color for polygons and rectangles; `None` draws the outline only
    pub fill_color: Option<Color>,
}

impl Default for DrawingStyle {
    fn default() -> Self {
        Self {
            stroke_color: Color::rgb(255, 0, 0),
            stroke_width: 2.0,
            fill_color: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    Line,
    Polygon,
    Rectangle,
}

impl ElementKind {
    pub fn is_closed(self) -> bool {
        !matches!(self, ElementKind::Line)
    }
}

/// Geographic point sequence in whichever shape the caller holds it.
///
/// Flat and pair forms are `(lng, lat)` ordered, matching `geo_types::Coord { x, y }`.
#[derive(Debug, Clone, PartialEq)]
pub enum PointSequence {
    Flat(Vec<f64>),
    FlatF32(Vec<f32>),
    Pairs(Vec<(f64, f64)>),
    LatLngs(Vec<LatLng>),
    Coords(Vec<geo_types::Coord<f64>>),
}

impl PointSequence {
    pub fn len(&self) -> usize {
        match self {
            PointSequence::Flat(values) => values.len() / 2,
            PointSequence::FlatF32(values) => values.len() / 2,
            PointSequence::Pairs(pairs) => pairs.len(),
            PointSequence::LatLngs(points) => points.len(),
            PointSequence::Coords(coords) => coords.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat forms must hold whole pairs
    fn check(&self) -> Result<()> {
        let odd = match self {
            PointSequence::Flat(values) => values.len() % 2 != 0,
            PointSequence::FlatF32(values) => values.len() % 2 != 0,
            _ => false,
        };
        if odd {
            return Err(MapError::InvalidElement(
                "flat point sequence has an odd number of values".to_string(),
            ));
        }
        Ok(())
    }

    /// Writes the sequence as coordinates into `out`, replacing its contents
    pub fn write_lat_lngs(&self, out: &mut Vec<LatLng>) {
        out.clear();
        match self {
            PointSequence::Flat(values) => out.extend(
                values
                    .chunks_exact(2)
                    .map(|pair| LatLng::new(pair[1], pair[0])),
            ),
            PointSequence::FlatF32(values) => out.extend(
                values
                    .chunks_exact(2)
                    .map(|pair| LatLng::new(pair[1] as f64, pair[0] as f64)),
            ),
            PointSequence::Pairs(pairs) => {
                out.extend(pairs.iter().map(|(lng, lat)| LatLng::new(*lat, *lng)))
            }
            PointSequence::LatLngs(points) => out.extend_from_slice(points),
            PointSequence::Coords(coords) => out.extend(coords.iter().map(|c| LatLng::from(*c))),
        }
    }

    pub fn to_lat_lngs(&self) -> Vec<LatLng> {
        let mut out = Vec::with_capacity(self.len());
        self.write_lat_lngs(&mut out);
        out
    }
}

impl From<Vec<LatLng>> for PointSequence {
    fn from(points: Vec<LatLng>) -> Self {
        PointSequence::LatLngs(points)
    }
}

impl From<Vec<(f64, f64)>> for PointSequence {
    fn from(pairs: Vec<(f64, f64)>) -> Self {
        PointSequence::Pairs(pairs)
    }
}

impl From<Vec<geo_types::Coord<f64>>> for PointSequence {
    fn from(coords: Vec<geo_types::Coord<f64>>) -> Self {
        PointSequence::Coords(coords)
    }
}

impl From<geo_types::LineString<f64>> for PointSequence {
    fn from(line: geo_types::LineString<f64>) -> Self {
        PointSequence::Coords(line.0)
    }
}

/// Geometry generated for one element at one zoom level
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementMesh {
    pub zoom: u8,
    /// Triangle strips in view pixels: each vertex contributes a left and a right point
    pub strips: Vec<Vec<Point>>,
    pub fill: Option<FillMask>,
}

impl ElementMesh {
    pub fn is_empty(&self) -> bool {
        self.strips.is_empty() && self.fill.is_none()
    }
}

/// A line, polygon or rectangle anchored to geographic points
#[derive(Debug, Clone)]
pub struct DrawingElement {
    pub kind: ElementKind,
    points: Option<PointSequence>,
    pub style: DrawingStyle,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Clip generated geometry against the view
    pub check_bounds: bool,
    mesh: Option<ElementMesh>,
}

impl DrawingElement {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            points: None,
            style: DrawingStyle::default(),
            min_zoom: 0,
            max_zoom: MAX_ZOOM,
            check_bounds: true,
            mesh: None,
        }
    }

    pub fn line(points: impl Into<PointSequence>) -> Self {
        Self::new(ElementKind::Line).with_points(points)
    }

    pub fn polygon(points: impl Into<PointSequence>) -> Self {
        Self::new(ElementKind::Polygon).with_points(points)
    }

    /// Rectangle spanning the bounding box of `points`
    pub fn rectangle(points: impl Into<PointSequence>) -> Self {
        Self::new(ElementKind::Rectangle).with_points(points)
    }

    pub fn with_points(mut self, points: impl Into<PointSequence>) -> Self {
        self.points = Some(points.into());
        self
    }

    pub fn with_style(mut self, style: DrawingStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom.min(max_zoom);
        self.max_zoom = max_zoom.max(min_zoom);
        self
    }

    pub fn with_boundary_check(mut self, check_bounds: bool) -> Self {
        self.check_bounds = check_bounds;
        self
    }

    /// Replaces the point sequence. A missing or malformed sequence is rejected.
    pub fn set_points(&mut self, points: Option<PointSequence>) -> Result<()> {
        let points = points.ok_or_else(|| {
            MapError::InvalidElement("point sequence must not be missing".to_string())
        })?;
        points.check()?;
        self.points = Some(points);
        self.mesh = None;
        Ok(())
    }

    pub fn points(&self) -> Option<&PointSequence> {
        self.points.as_ref()
    }

    pub fn validate(&self) -> Result<()> {
        match &self.points {
            Some(points) => points.check(),
            None => Err(MapError::InvalidElement(format!(
                "{:?} has no point sequence",
                self.kind
            ))),
        }
    }

    pub fn is_visible_at(&self, zoom: u8) -> bool {
        (self.min_zoom..=self.max_zoom).contains(&zoom)
    }

    /// Outline in `(lng, lat)` space with rectangles expanded to four corners and a
    /// duplicated closing point removed
    pub fn outline(&self) -> Vec<LatLng> {
        let mut points = self
            .points
            .as_ref()
            .map(PointSequence::to_lat_lngs)
            .unwrap_or_default();
        normalize_outline(self.kind, &mut points);
        points
    }

    /// Even-odd containment test in `(lng, lat)` space. Lines contain nothing.
    pub fn contains(&self, point: &LatLng) -> bool {
        if !self.kind.is_closed() {
            return false;
        }
        let ring: Vec<Point> = self
            .outline()
            .iter()
            .map(|p| Point::new(p.lng, p.lat))
            .collect();
        contains_point(&ring, &Point::new(point.lng, point.lat))
    }

    pub fn mesh(&self) -> Option<&ElementMesh> {
        self.mesh.as_ref()
    }

    pub(crate) fn set_mesh(&mut self, mesh: Option<ElementMesh>) {
        self.mesh = mesh;
    }

    /// Releases generated geometry; the element can be built again later
    pub fn dispose(&mut self) {
        self.mesh = None;
    }

    pub fn is_disposed(&self) -> bool {
        self.mesh.is_none()
    }
}

/// Applies the closed-shape rules to a point list in place
pub(crate) fn normalize_outline(kind: ElementKind, points: &mut Vec<LatLng>) {
    match kind {
        ElementKind::Line => {}
        ElementKind::Polygon => {
            if points.len() > 2 && points.first() == points.last() {
                points.pop();
            }
        }
        ElementKind::Rectangle => {
            if points.len() < 2 {
                return;
            }
            let (mut left, mut right) = (f64::INFINITY, f64::NEG_INFINITY);
            let (mut bottom, mut top) = (f64::INFINITY, f64::NEG_INFINITY);
            for p in points.iter() {
                left = left.min(p.lng);
                right = right.max(p.lng);
                bottom = bottom.min(p.lat);
                top = top.max(p.lat);
            }
            points.clear();
            points.extend([
                LatLng::new(top, left),
                LatLng::new(top, right),
                LatLng::new(bottom, right),
                LatLng::new(bottom, left),
            ]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_forms_agree() {
        let expected = vec![LatLng::new(2.0, 1.0), LatLng::new(4.0, 3.0)];
        let forms = [
            PointSequence::Flat(vec![1.0, 2.0, 3.0, 4.0]),
            PointSequence::FlatF32(vec![1.0, 2.0, 3.0, 4.0]),
            PointSequence::Pairs(vec![(1.0, 2.0), (3.0, 4.0)]),
            PointSequence::LatLngs(expected.clone()),
            PointSequence::Coords(vec![
                geo_types::Coord { x: 1.0, y: 2.0 },
                geo_types::Coord { x: 3.0, y: 4.0 },
            ]),
        ];
        for form in forms {
            assert_eq!(form.len(), 2);
            assert_eq!(form.to_lat_lngs(), expected);
        }
    }

    #[test]
    fn test_missing_points_fail_fast() {
        let mut element = DrawingElement::new(ElementKind::Line);
        assert!(matches!(element.validate(), Err(MapError::InvalidElement(_))));
        assert!(matches!(
            element.set_points(None),
            Err(MapError::InvalidElement(_))
        ));
        assert!(element
            .set_points(Some(PointSequence::Flat(vec![1.0, 2.0, 3.0])))
            .is_err());

        element
            .set_points(Some(PointSequence::Pairs(vec![(0.0, 0.0), (1.0, 1.0)])))
            .unwrap();
        assert!(element.validate().is_ok());
    }

    #[test]
    fn test_unit_square_containment() {
        let square = DrawingElement::polygon(vec![
            (0.0, 0.0),
            (1.0, 0.0),
            (1.0, 1.0),
            (0.0, 1.0),
            (0.0, 0.0),
        ]);
        assert_eq!(square.outline().len(), 4);
        assert!(square.contains(&LatLng::new(0.5, 0.5)));
        assert!(!square.contains(&LatLng::new(2.0, 2.0)));
    }

    #[test]
    fn test_rectangle_from_two_corners() {
        let rect = DrawingElement::rectangle(vec![(10.0, 50.0), (12.0, 48.0)]);
        let outline = rect.outline();
        assert_eq!(outline.len(), 4);
        assert_eq!(outline[0], LatLng::new(50.0, 10.0));
        assert_eq!(outline[2], LatLng::new(48.0, 12.0));
        assert!(rect.contains(&LatLng::new(49.0, 11.0)));
    }

    #[test]
    fn test_zoom_range() {
        let line = DrawingElement::line(vec![(0.0, 0.0), (1.0, 1.0)]).with_zoom_range(12, 5);
        assert_eq!((line.min_zoom, line.max_zoom), (5, 12));
        assert!(line.is_visible_at(5));
        assert!(!line.is_visible_at(13));
    }
}
