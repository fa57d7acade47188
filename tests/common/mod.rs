#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use terrascope::cache::MemoryCache;
use terrascope::runtime::{AsyncSpawner, InlineSpawner};
use terrascope::tiles::fetch::Fetcher;
use terrascope::tiles::scheduler::TileServices;
use terrascope::tiles::source::TemplateSource;
use terrascope::{MapError, Result};

pub const TILE_TEMPLATE: &str = "https://tiles.test/{z}/{x}/{y}.png";

/// A 256×256 PNG filled with one color
pub fn solid_png(color: [u8; 4]) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(256, 256, image::Rgba(color));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
        .unwrap();
    bytes
}

/// ArcGIS-style payload of `size`×`size` samples, all `value` except the first
pub fn elevation_json(size: usize, value: i16, first: i16) -> Vec<u8> {
    let mut samples = vec![value.to_string(); size * size];
    samples[0] = first.to_string();
    format!("{{\"data\":[{}]}}", samples.join(",")).into_bytes()
}

/// Mock transport: records every URL and answers from a script
pub struct MockFetcher {
    pub urls: Mutex<Vec<String>>,
    calls: AtomicUsize,
    tile: Option<Vec<u8>>,
    elevations: Mutex<VecDeque<Vec<u8>>>,
    delay: Option<Duration>,
}

impl MockFetcher {
    /// Tiles answer with a solid PNG, elevation requests fail
    pub fn tiles(color: [u8; 4]) -> Self {
        Self::new(Some(solid_png(color)))
    }

    /// Every request fails with HTTP 500
    pub fn failing() -> Self {
        Self::new(None)
    }

    fn new(tile: Option<Vec<u8>>) -> Self {
        Self {
            urls: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            tile,
            elevations: Mutex::new(VecDeque::new()),
            delay: None,
        }
    }

    /// Elevation requests answer with these payloads in order; the last one repeats
    pub fn with_elevations(self, payloads: Vec<Vec<u8>>) -> Self {
        *self.elevations.lock().unwrap() = payloads.into();
        self
    }

    /// Sleeps on the tokio timer before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn zooms(&self) -> Vec<u8> {
        self.urls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|url| url.strip_prefix("https://tiles.test/"))
            .filter_map(|path| path.split('/').next())
            .filter_map(|zoom| zoom.parse().ok())
            .collect()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let body = if url.contains("exportImage") {
            let mut queue = self.elevations.lock().unwrap();
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        } else {
            self.tile.clone()
        };

        body.ok_or_else(|| MapError::Http {
            status: 500,
            url: url.to_string(),
        })
    }
}

pub fn tile_services(fetcher: Arc<MockFetcher>, cache: Arc<MemoryCache>) -> TileServices {
    tile_services_on(fetcher, cache, Arc::new(InlineSpawner))
}

pub fn tile_services_on(
    fetcher: Arc<MockFetcher>,
    cache: Arc<MemoryCache>,
    spawner: Arc<dyn AsyncSpawner>,
) -> TileServices {
    TileServices {
        source: Arc::new(TemplateSource::new(TILE_TEMPLATE, "test_")),
        fetcher,
        cache,
        spawner,
    }
}
