use super::key::TileId;
use crate::core::projection::Projection;

/// Trait representing anything that can produce tile URLs for a given tile.
pub trait TileSource: Send + Sync {
    /// Build a URL for the requested tile.
    fn url(&self, tile: &TileId) -> String;

    /// Prefix that namespaces this provider's entries in a shared cache
    fn cache_prefix(&self) -> &str;

    fn projection(&self) -> Projection {
        Projection::SphericalMercator
    }

    fn cache_key(&self, tile: &TileId) -> String {
        format!("{}{}", self.cache_prefix(), tile.key())
    }
}

/// Simple implementation that hits the default OpenStreetMap tile server.
pub struct OpenStreetMapSource {
    subdomains: Vec<&'static str>,
}

impl OpenStreetMapSource {
    pub fn new() -> Self {
        Self {
            subdomains: vec!["a", "b", "c"],
        }
    }
}

impl Default for OpenStreetMapSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TileSource for OpenStreetMapSource {
    fn url(&self, tile: &TileId) -> String {
        if self.subdomains.is_empty() {
            return format!(
                "https://tile.openstreetmap.org/{}/{}/{}.png",
                tile.zoom, tile.x, tile.y
            );
        }

        let idx = ((tile.x + tile.y) % self.subdomains.len() as u32) as usize;
        format!(
            "https://{}.tile.openstreetmap.org/{}/{}/{}.png",
            self.subdomains[idx], tile.zoom, tile.x, tile.y
        )
    }

    fn cache_prefix(&self) -> &str {
        "osm_"
    }
}

/// URL template with `{z}`, `{x}`, `{y}`, `{s}` (subdomain) and `{q}` (quadkey)
/// placeholders.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    template: String,
    subdomains: Vec<String>,
    cache_prefix: String,
    projection: Projection,
}

impl TemplateSource {
    pub fn new(template: impl Into<String>, cache_prefix: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            subdomains: Vec::new(),
            cache_prefix: cache_prefix.into(),
            projection: Projection::SphericalMercator,
        }
    }

    pub fn with_subdomains<I, S>(mut self, subdomains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subdomains = subdomains.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }
}

impl TileSource for TemplateSource {
    fn url(&self, tile: &TileId) -> String {
        let subdomain = if self.subdomains.is_empty() {
            ""
        } else {
            let idx = ((tile.x + tile.y) as usize) % self.subdomains.len();
            self.subdomains[idx].as_str()
        };

        self.template
            .replace("{z}", &tile.zoom.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
            .replace("{s}", subdomain)
            .replace("{q}", &tile.quadkey())
    }

    fn cache_prefix(&self) -> &str {
        &self.cache_prefix
    }

    fn projection(&self) -> Projection {
        self.projection
    }
}
