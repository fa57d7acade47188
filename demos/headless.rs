use std::sync::Arc;
use std::time::Duration;

use terrascope::{
    cache::FileCache,
    core::config::{ElevationStrategy, LoadingProfile},
    drawing::{Color, DrawingElement, DrawingStyle},
    prelude::*,
};

/// Drives a map headlessly: tiles and elevation are fetched for a few cities while the
/// log shows what the scheduler does.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("🗺️ terrascope headless example");
    println!("==============================");

    let mut options = MapOptions::with_profile(LoadingProfile::Balanced);
    options.elevation.strategy = ElevationStrategy::Tiled;

    let cache_dir = std::env::temp_dir().join("terrascope-demo");
    let tile_cache = Arc::new(FileCache::new(cache_dir.join("tiles"))?);
    let elevation_cache = Arc::new(FileCache::new(cache_dir.join("elevation"))?);

    let spawner: Arc<dyn AsyncSpawner> = Arc::new(TokioSpawner::current().ok_or_else(|| {
        anyhow::anyhow!("the demo must run inside a tokio runtime")
    })?);
    let services = MapServices::new(spawner, &options)
        .with_tile_cache(tile_cache)
        .with_elevation_cache(elevation_cache);

    let viewport = Viewport::new(LatLng::new(37.7749, -122.4194), 12, Point::new(1024.0, 768.0));
    let mut map = MapContext::new(viewport, options, services)?;

    map.on("tileready", |event| log::debug!("{:?}", event));
    map.on("elevationupdated", |_| log::info!("terrain changed"));

    map.add_element(
        DrawingElement::polygon(vec![
            (-122.45, 37.76),
            (-122.40, 37.76),
            (-122.40, 37.79),
            (-122.45, 37.79),
        ])
        .with_style(DrawingStyle {
            fill_color: Some(Color::new(0, 120, 255, 96)),
            ..Default::default()
        }),
    )?;

    let locations = [
        ("San Francisco", LatLng::new(37.7749, -122.4194), 12),
        ("Zermatt", LatLng::new(46.0207, 7.7491), 11),
        ("Tokyo", LatLng::new(35.6762, 139.6503), 10),
    ];

    for (name, location, zoom) in locations {
        map.set_view(location, zoom);
        println!("\n📍 {} at zoom {}", name, zoom);

        for _ in 0..120 {
            map.update(1.0 / 60.0);
            tokio::time::sleep(Duration::from_millis(16)).await;
        }

        let counts = map.tiles().counts();
        println!(
            "   tiles: {} loaded, {} loading, {} failed",
            counts.loaded, counts.loading, counts.error
        );
        println!(
            "   elevation at view center: {:.1} m",
            map.elevation_at(500.0, 500.0, 1.0)
        );
        if let Some((min, max)) = map.elevation_mut().min_max() {
            println!("   elevation range: {} .. {} m", min, max);
        }
    }

    println!("\n✅ Done");
    Ok(())
}
