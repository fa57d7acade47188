use super::grid::HeightGrid;
use super::provider::load_grid;
use super::tween::Tween;
use super::{scene_to_geo, ElevationResponse, ElevationServices, ElevationSource};
use crate::core::config::ElevationConfig;
use crate::core::geo::{GeoRect, LatLng};
use crate::core::viewport::Viewport;
use crate::prelude::Instant;
use crate::runtime::spawn_on;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// One grid and the geographic box it covers
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationDataset {
    pub bounds: GeoRect,
    pub grid: HeightGrid,
}

impl ElevationDataset {
    pub fn new(bounds: GeoRect, grid: HeightGrid) -> Self {
        Self { bounds, grid }
    }

    /// Bilinear sample at a coordinate, clamped to the dataset's edges
    pub fn sample(&self, point: &LatLng) -> f32 {
        let (nx, ny) = self.bounds.normalize(point);
        self.grid.sample(nx, ny)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinglePartState {
    Idle,
    Requesting,
    Ready,
}

/// Elevation fetched as one grid covering the visible area
pub struct SinglePartElevation {
    config: ElevationConfig,
    services: ElevationServices,
    state: SinglePartState,
    current: Option<ElevationDataset>,
    previous: Option<ElevationDataset>,
    tween: Tween,
    pending: Option<(u64, GeoRect)>,
    next_request: u64,
    /// View the current or pending data was requested for
    requested_view: Option<(GeoRect, u8)>,
    failures: u32,
    /// When the failed request for the current view may be sent again
    retry_at: Option<Instant>,
    result_tx: Sender<ElevationResponse>,
    result_rx: Receiver<ElevationResponse>,
}

impl SinglePartElevation {
    pub fn new(config: ElevationConfig, services: ElevationServices) -> Self {
        let (result_tx, result_rx) = unbounded();
        let tween = Tween::new(config.tween_duration_secs);
        Self {
            config,
            services,
            state: SinglePartState::Idle,
            current: None,
            previous: None,
            tween,
            pending: None,
            next_request: 1,
            requested_view: None,
            failures: 0,
            retry_at: None,
            result_tx,
            result_rx,
        }
    }

    pub fn state(&self) -> SinglePartState {
        self.state
    }

    pub fn current(&self) -> Option<&ElevationDataset> {
        self.current.as_ref()
    }

    pub fn previous(&self) -> Option<&ElevationDataset> {
        self.previous.as_ref()
    }

    pub fn tween(&self) -> &Tween {
        &self.tween
    }

    /// Installs a dataset directly, as if a request for it had just completed
    pub fn set_dataset(&mut self, dataset: ElevationDataset) {
        if self.config.tween_enabled {
            self.previous = self.current.take();
            self.tween.reset();
        }
        self.install(dataset);
    }

    /// Requests a grid covering `bounds`. Returns the request id.
    pub fn request_area(&mut self, bounds: GeoRect) -> u64 {
        let id = self.next_request;
        self.next_request += 1;

        if self.config.tween_enabled {
            if let Some(current) = &self.current {
                self.previous = Some(current.clone());
            }
            self.tween.reset();
        }
        self.pending = Some((id, bounds));
        self.state = SinglePartState::Requesting;

        let size = self.config.grid_resolution;
        let provider = self.services.provider.clone();
        let url = provider.area_url(&bounds, size, size);
        let cache_key = provider.area_cache_key(&bounds, size, size);
        let fetcher = self.services.fetcher.clone();
        let cache = self.services.cache.clone();
        let result_tx = self.result_tx.clone();

        log::debug!("requesting elevation {} for {:?}", id, bounds);
        spawn_on(self.services.spawner.as_ref(), async move {
            let (result, from_cache) =
                match load_grid(provider, fetcher, cache, url, cache_key, size, size).await {
                    Ok((grid, from_cache)) => (Ok(grid), from_cache),
                    Err(e) => (Err(e.to_string()), false),
                };
            let response = ElevationResponse {
                ticket: id,
                key: 0,
                result,
                from_cache,
            };
            if result_tx.send(response).is_err() {
                log::debug!("elevation source dropped before request {} completed", id);
            }
        });

        id
    }

    fn install(&mut self, dataset: ElevationDataset) {
        self.current = Some(dataset);
        self.state = SinglePartState::Ready;
        if self.previous.is_some() {
            self.tween.start();
        } else {
            self.tween.finish();
        }
    }

    fn drain_responses(&mut self) -> bool {
        let mut changed = false;
        while let Ok(response) = self.result_rx.try_recv() {
            let bounds = match self.pending {
                Some((id, bounds)) if id == response.ticket => bounds,
                _ => {
                    log::debug!("dropping stale elevation response {}", response.ticket);
                    continue;
                }
            };
            self.pending = None;

            match response.result {
                Ok(grid) => {
                    log::info!(
                        "elevation {} ready{} ({}x{}, {}..{})",
                        response.ticket,
                        if response.from_cache { " from cache" } else { "" },
                        grid.width(),
                        grid.height(),
                        grid.min(),
                        grid.max()
                    );
                    self.failures = 0;
                    self.install(ElevationDataset::new(bounds, grid));
                    changed = true;
                }
                Err(error) => {
                    self.failures += 1;
                    log::warn!(
                        "elevation request {} failed ({}/{}): {}",
                        response.ticket,
                        self.failures,
                        self.config.download_attempts,
                        error
                    );
                    self.previous = None;
                    self.tween.finish();
                    self.state = if self.current.is_some() {
                        SinglePartState::Ready
                    } else {
                        SinglePartState::Idle
                    };
                    self.retry_at = if self.failures < self.config.download_attempts {
                        self.config
                            .retry_after()
                            .map(|delay| Instant::now() + delay)
                    } else {
                        None
                    };
                }
            }
        }
        changed
    }
}

impl ElevationSource for SinglePartElevation {
    fn update(&mut self, viewport: &Viewport, dt: f32) -> bool {
        let mut changed = self.drain_responses();

        let view = (viewport.geo_rect(), viewport.zoom);
        if self.requested_view != Some(view) {
            if self.pending.is_some() {
                self.cancel_current_request();
            }
            self.failures = 0;
            self.retry_at = None;
            self.requested_view = Some(view);
            self.request_area(view.0);
        } else if self.pending.is_none()
            && self.retry_at.map_or(false, |at| at <= Instant::now())
        {
            self.retry_at = None;
            self.request_area(view.0);
        }

        if self.tween.is_running() {
            if self.tween.advance(dt) {
                self.previous = None;
            }
            changed = true;
        }
        changed
    }

    fn elevation(&self, x: f64, z: f64, y_scale: f32, bounds: &GeoRect) -> f32 {
        let Some(current) = &self.current else {
            return 0.0;
        };
        let point = scene_to_geo(&self.config.scene, x, z, bounds);
        let mut value = current.sample(&point);

        if let Some(previous) = &self.previous {
            if self.tween.progress() < 1.0 {
                value = self.tween.blend(previous.sample(&point), value);
            }
        }
        value * y_scale * self.config.scale
    }

    fn min_max(&mut self) -> Option<(i16, i16)> {
        self.current
            .as_ref()
            .map(|dataset| (dataset.grid.min(), dataset.grid.max()))
    }

    fn cancel_current_request(&mut self) {
        if let Some((id, _)) = self.pending.take() {
            log::debug!("cancelled elevation request {}", id);
            self.requested_view = None;
            self.state = if self.current.is_some() {
                SinglePartState::Ready
            } else {
                SinglePartState::Idle
            };
        }
    }

    fn has_data(&self) -> bool {
        self.current.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::elevation::provider::ArcGisElevationProvider;
    use crate::prelude::Arc;
    use crate::runtime::InlineSpawner;
    use crate::tiles::fetch::Fetcher;
    use crate::{MapError, Result};
    use async_trait::async_trait;

    struct FailingFetcher;

    #[async_trait]
    impl Fetcher for FailingFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            Err(MapError::Http {
                status: 500,
                url: url.to_string(),
            })
        }
    }

    fn source(config: ElevationConfig) -> SinglePartElevation {
        SinglePartElevation::new(
            config,
            ElevationServices {
                provider: Arc::new(ArcGisElevationProvider::default()),
                fetcher: Arc::new(FailingFetcher),
                cache: Arc::new(MemoryCache::new(4)),
                spawner: Arc::new(InlineSpawner),
            },
        )
    }

    fn corner_dataset(value: i16) -> ElevationDataset {
        let mut grid = HeightGrid::filled(32, 32, 0).unwrap();
        grid.set(0, 0, value);
        ElevationDataset::new(GeoRect::from_origin_size(10.0, 50.0, 1.0, 1.0), grid)
    }

    #[test]
    fn test_no_data_samples_zero() {
        let source = source(ElevationConfig::default());
        let bounds = GeoRect::new(0.0, 1.0, 1.0, 0.0);
        assert_eq!(source.elevation(10.0, 10.0, 1.0, &bounds), 0.0);
        assert!(!source.has_data());
    }

    #[test]
    fn test_corner_sample_is_scaled() {
        let config = ElevationConfig {
            scale: 2.0,
            tween_enabled: false,
            ..Default::default()
        };
        let mut source = source(config);
        let dataset = corner_dataset(100);
        let bounds = dataset.bounds;
        source.set_dataset(dataset);

        assert_eq!(source.elevation(0.0, 0.0, 1.5, &bounds), 100.0 * 1.5 * 2.0);
        assert_eq!(source.min_max(), Some((0, 100)));
    }

    #[test]
    fn test_dataset_box_differs_from_scene_box() {
        let config = ElevationConfig {
            tween_enabled: false,
            ..Default::default()
        };
        let mut source = source(config);
        let grid = HeightGrid::new(2, 2, vec![0, 10, 20, 30]).unwrap();
        source.set_dataset(ElevationDataset::new(GeoRect::new(0.0, 10.0, 10.0, 0.0), grid));

        // The scene shows only the eastern half of the dataset.
        let scene_box = GeoRect::new(5.0, 10.0, 10.0, 0.0);
        assert!((source.elevation(0.0, 0.0, 1.0, &scene_box) - 5.0).abs() < 1e-4);
        assert!((source.elevation(1000.0, 1000.0, 1.0, &scene_box) - 30.0).abs() < 1e-4);
    }

    #[test]
    fn test_failed_request_keeps_state_idle() {
        let mut source = source(ElevationConfig::default());
        let viewport = Viewport::default();
        source.update(&viewport, 0.016);
        assert_eq!(source.state(), SinglePartState::Requesting);

        source.update(&viewport, 0.016);
        assert!(!source.has_data());
        assert_ne!(source.state(), SinglePartState::Ready);
    }

    #[test]
    fn test_failures_stop_after_attempt_budget() {
        let config = ElevationConfig {
            download_attempts: 2,
            retry_after_secs: Some(0.0),
            ..Default::default()
        };
        let mut source = source(config);
        let viewport = Viewport::default();
        for _ in 0..6 {
            source.update(&viewport, 0.016);
        }
        assert_eq!(source.failures, 2);
        assert_eq!(source.state(), SinglePartState::Idle);
        assert!(source.pending.is_none());
        assert!(source.retry_at.is_none());
    }

    #[test]
    fn test_failed_request_waits_for_retry_delay() {
        let mut source = source(ElevationConfig::default());
        let viewport = Viewport::default();
        for _ in 0..6 {
            source.update(&viewport, 0.016);
        }
        assert_eq!(source.failures, 1);
        assert!(source.pending.is_none());
        let retry_at = source.retry_at.unwrap();
        assert!(retry_at > Instant::now());

        // Once the deadline passes the same view is requested again.
        source.retry_at = Some(Instant::now());
        source.update(&viewport, 0.016);
        source.update(&viewport, 0.016);
        assert_eq!(source.failures, 2);
    }

    #[test]
    fn test_disabled_retry_gives_up_after_first_failure() {
        let config = ElevationConfig {
            retry_after_secs: None,
            ..Default::default()
        };
        let mut source = source(config);
        let viewport = Viewport::default();
        for _ in 0..6 {
            source.update(&viewport, 0.016);
        }
        assert_eq!(source.failures, 1);
        assert!(source.retry_at.is_none());
    }

    #[test]
    fn test_cancelled_request_result_is_ignored() {
        let mut source = source(ElevationConfig::default());
        source.request_area(GeoRect::new(0.0, 1.0, 1.0, 0.0));
        source.cancel_current_request();
        assert_eq!(source.state(), SinglePartState::Idle);
        // The failure already sits in the channel; it must not count against the view.
        assert!(!source.drain_responses());
        assert_eq!(source.failures, 0);
    }
}
