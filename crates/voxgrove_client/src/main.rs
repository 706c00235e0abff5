use std::env;
use std::path::PathBuf;

use glam::IVec3;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use voxgrove_client::config::EngineConfig;
use voxgrove_client::world::WorldEngine;
use voxgrove_shared::block::BlockId;
use voxgrove_shared::coords::ChunkPos;

const USAGE: &str = "Usage: voxgrove [--config <path>] [--frames <n>] [--dt <seconds>]";

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .try_init();

    let mut config_path = PathBuf::from("voxgrove.toml");
    let mut frames: u32 = 120;
    let mut dt: f32 = 1.0 / 60.0;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let Some(value) = args.next() else {
                    eprintln!("--config expects a path argument");
                    std::process::exit(2);
                };
                config_path = PathBuf::from(value);
            }
            "--frames" => {
                let Some(value) = args.next() else {
                    eprintln!("--frames expects a numeric argument");
                    std::process::exit(2);
                };
                match value.parse::<u32>() {
                    Ok(parsed) => frames = parsed,
                    Err(err) => {
                        eprintln!("invalid frame count '{value}': {err}");
                        std::process::exit(2);
                    }
                }
            }
            "--dt" => {
                let Some(value) = args.next() else {
                    eprintln!("--dt expects a number of seconds");
                    std::process::exit(2);
                };
                match value.parse::<f32>() {
                    Ok(parsed) if parsed >= 0.0 => dt = parsed,
                    Ok(parsed) => {
                        eprintln!("--dt must not be negative, got {parsed}");
                        std::process::exit(2);
                    }
                    Err(err) => {
                        eprintln!("invalid frame time '{value}': {err}");
                        std::process::exit(2);
                    }
                }
            }
            "--help" | "-h" => {
                println!("{USAGE}");
                return;
            }
            other => {
                eprintln!("unknown argument: {other}");
                eprintln!("{USAGE}");
                std::process::exit(2);
            }
        }
    }

    let config = EngineConfig::load_or_default(&config_path);
    let mut engine = match WorldEngine::new(config) {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("failed to start job system: {err}");
            std::process::exit(1);
        }
    };

    engine.generate_world();
    let first = engine.tick(dt);
    info!(
        "Initial mesh: {} chunks, {} quads",
        first.remeshed_chunks, first.quads
    );

    run_edit_script(&mut engine);

    let mut remeshed = 0usize;
    let mut rebaked = 0usize;
    for frame in 0..frames {
        let stats = engine.tick(dt);
        remeshed += stats.remeshed_chunks;
        rebaked += stats.rebaked_chunks;
        if stats.sky_changed {
            info!(
                "Frame {}: sky light now {} (sun height {:.2})",
                frame,
                engine.shadows().sky_level(),
                engine.day().sun_height()
            );
        }
        if stats.day_rolled {
            info!("Day {} begins", engine.day().days_elapsed());
        }
    }

    let total_quads: usize = engine.meshes().map(|(_, mesh)| mesh.quad_count()).sum();
    info!(
        "Ran {} frames: {} remeshes, {} shadow re-bakes, {} quads across {} chunks",
        frames,
        remeshed,
        rebaked,
        total_quads,
        engine.meshes().count()
    );
    engine.teardown();
}

/// Digs at spawn, builds a small hut with a torch inside and grows a sapling.
fn run_edit_script(engine: &mut WorldEngine) {
    let Some(surface) = engine.storage().surface_height(0, 0) else {
        warn!("Spawn column is empty, skipping edits");
        return;
    };
    let spawn = IVec3::new(0, surface, 0);

    match engine.set_block(spawn, BlockId::AIR) {
        Some(drop) => info!("Dug {} at {:?}, dropped {}", drop.source, spawn, drop.item),
        None => info!("Dug at {:?}, nothing dropped", spawn),
    }

    let floor = spawn.y;
    for dz in -2..=2 {
        for dx in -2..=2 {
            let edge = dx == -2 || dx == 2 || dz == -2 || dz == 2;
            if edge {
                for dy in 1..=3 {
                    engine.set_block(IVec3::new(dx, floor + dy, dz), BlockId::PLANKS);
                }
            }
            engine.set_block(IVec3::new(dx, floor + 4, dz), BlockId::PLANKS);
        }
    }

    let inside = IVec3::new(0, floor + 1, 0);
    let dark = engine.light_level(inside).unwrap_or(0.0);
    engine.set_block(inside, BlockId::TORCH);
    let lit = engine.light_level(inside + IVec3::X).unwrap_or(0.0);
    info!(
        "Hut interior light {:.1} before the torch, {:.1} beside it",
        dark, lit
    );

    let sapling = IVec3::new(4, floor + 1, 4);
    if engine.storage().surface_height(4, 4) == Some(floor) {
        engine.set_block(sapling, BlockId::SAPLING);
        if engine.grow_tree(sapling) {
            info!("Grew a tree at {:?}", sapling);
        }
    }

    info!(
        "Edits left {} chunks dirty; spawn chunk dirty: {}",
        engine.dirty_count(),
        engine.is_dirty(ChunkPos::new(0, 0))
    );
}
