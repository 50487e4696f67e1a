use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::{Json, Router, routing::post};
use base64::Engine;
use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;

use sedconn::config::Params;
use sedconn::render;
use sedconn::terrain;

#[derive(Deserialize)]
struct ComputeRequest {
    seed: Option<u64>,
    width: Option<usize>,
    height: Option<usize>,
    cell_size: Option<f32>,
    // Logistic transform
    sdr_max: Option<f32>,
    ic0: Option<f32>,
    k: Option<f32>,
    // Synthetic terrain
    relief: Option<f32>,
    detail_amp: Option<f32>,
    tilt: Option<f32>,
}

#[derive(Serialize)]
struct ComputeResponse {
    layers: Vec<Layer>,
    timings: Vec<TimingEntry>,
    width: usize,
    height: usize,
    unresolved_cells: usize,
    wavefront_layers: usize,
}

#[derive(Serialize)]
struct Layer {
    name: String,
    data_url: String,
}

#[derive(Serialize)]
struct TimingEntry {
    name: String,
    ms: f64,
}

fn encode_png(rgba: &[u8], w: usize, h: usize) -> String {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new(&mut buf);
    encoder
        .write_image(rgba, w as u32, h as u32, image::ExtendedColorType::Rgba8)
        .expect("PNG encode failed");
    let b64 = base64::engine::general_purpose::STANDARD.encode(&buf);
    format!("data:image/png;base64,{}", b64)
}

async fn compute_handler(
    Json(req): Json<ComputeRequest>,
) -> Result<Json<ComputeResponse>, (StatusCode, String)> {
    let seed = req.seed.unwrap_or(42);
    let width = req.width.unwrap_or(512);
    let height = req.height.unwrap_or(512);
    let cell_size = req.cell_size.unwrap_or(10.0);

    let defaults = Params::default();
    let params = Params {
        sdr_max: req.sdr_max.unwrap_or(defaults.sdr_max),
        ic0: req.ic0.unwrap_or(defaults.ic0),
        k: req.k.unwrap_or(defaults.k),
        relief: req.relief.unwrap_or(defaults.relief),
        detail_amp: req.detail_amp.unwrap_or(defaults.detail_amp),
        tilt: req.tilt.unwrap_or(defaults.tilt),
    };

    let response = tokio::task::spawn_blocking(move || {
        let dem = terrain::synthetic_dem(width, height, seed, &params);
        let weight = terrain::synthetic_weight(width, height, seed);
        let (map, timings) = sedconn::compute_sdr(&dem, &weight, cell_size, &params)?;

        let layers = vec![
            Layer {
                name: "dem".into(),
                data_url: encode_png(&render::render_dem(&map.dem), width, height),
            },
            Layer {
                name: "slope".into(),
                data_url: encode_png(&render::render_slope(&map.slope_pct), width, height),
            },
            Layer {
                name: "flowlength".into(),
                data_url: encode_png(
                    &render::render_flow_length(&map.flow_length.distance),
                    width,
                    height,
                ),
            },
            Layer {
                name: "ic".into(),
                data_url: encode_png(&render::render_ic(&map.ic), width, height),
            },
            Layer {
                name: "sdr".into(),
                data_url: encode_png(&render::render_sdr(&map.sdr, params.sdr_max), width, height),
            },
        ];

        let timing_entries = timings
            .iter()
            .map(|t| TimingEntry {
                name: t.name.to_string(),
                ms: t.ms,
            })
            .collect();

        Ok::<_, sedconn::error::GridError>(ComputeResponse {
            layers,
            timings: timing_entries,
            width,
            height,
            unresolved_cells: map.flow_length.unresolved,
            wavefront_layers: map.flow_length.layers,
        })
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
    .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    Ok(Json(response))
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let frontend = ServeDir::new("frontend");

    let app = Router::new()
        .route("/api/compute", post(compute_handler))
        .fallback_service(frontend);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    log::info!("sedconn server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.expect("bind failed");
    axum::serve(listener, app).await.expect("server failed");
}
