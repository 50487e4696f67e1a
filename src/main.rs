use std::path::PathBuf;

use log::info;
use serde::Serialize;

use sedconn::config::Params;
use sedconn::{render, terrain};

#[derive(Serialize)]
struct RunReport {
    seed: u64,
    width: usize,
    height: usize,
    cell_size: f32,
    unresolved_cells: usize,
    wavefront_layers: usize,
    timings_ms: Vec<(String, f64)>,
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    let seed: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(42);
    let width: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(1024);
    let height: usize = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(1024);
    let cell_size: f32 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(10.0);
    let out_dir: PathBuf = args
        .get(5)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("artifacts"));

    std::fs::create_dir_all(&out_dir).expect("failed to create output directory");

    let params = Params::default();

    info!(
        "computing SDR on a {}x{} synthetic DEM, seed={}, cell={}m",
        width, height, seed, cell_size
    );

    let dem = terrain::synthetic_dem(width, height, seed, &params);
    let weight = terrain::synthetic_weight(width, height, seed);

    let (map, timings) =
        sedconn::compute_sdr(&dem, &weight, cell_size, &params).expect("SDR pipeline failed");

    info!("timings:");
    for t in &timings {
        info!("  {:16} {:8.1} ms", t.name, t.ms);
    }

    // Diagnostic PNGs, one per pipeline stage
    let save = |name: &str, rgba: &[u8]| {
        let path = out_dir.join(name);
        image::save_buffer(&path, rgba, width as u32, height as u32, image::ColorType::Rgba8)
            .expect("failed to save image");
        info!("saved {}", path.display());
    };

    save("dem.png", &render::render_dem(&map.dem));
    save("slope.png", &render::render_slope(&map.slope_pct));
    save(
        "flowlength.png",
        &render::render_flow_length(&map.flow_length.distance),
    );
    save("ic.png", &render::render_ic(&map.ic));
    save("sdr.png", &render::render_sdr(&map.sdr, params.sdr_max));

    let report = RunReport {
        seed,
        width,
        height,
        cell_size,
        unresolved_cells: map.flow_length.unresolved,
        wavefront_layers: map.flow_length.layers,
        timings_ms: timings.iter().map(|t| (t.name.to_string(), t.ms)).collect(),
    };
    let report_path = out_dir.join("run.json");
    std::fs::write(
        &report_path,
        serde_json::to_string_pretty(&report).expect("report serialization failed"),
    )
    .expect("failed to write run report");
    info!("saved {}", report_path.display());
}
