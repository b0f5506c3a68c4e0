//! Headless wander demo
//!
//! Spawns a handful of agents on procedural hills and runs the simulation
//! for a few seconds, printing per-second summaries. Run with
//! `RUST_LOG=debug` to watch streaming and behavior transitions.

use drift_sim::{NullHooks, SimConfig, Simulation};
use drift_terrain::HeightfieldSource;
use glam::Vec3;
use std::sync::Arc;
use std::time::Duration;

fn main() {
    env_logger::init();

    let mut sim = Simulation::new(
        SimConfig::default().with_seed(42),
        Arc::new(HeightfieldSource::default()),
        NullHooks,
    );

    for i in 0..5 {
        let position = Vec3::new(i as f32 * 10.0, 8.0, 0.0);
        match sim.spawn(position, true) {
            Ok(id) => log::info!("spawned {}", id),
            Err(err) => log::error!("spawn failed: {}", err),
        }
    }

    const DT: f32 = 1.0 / 30.0;
    for tick in 0..600 {
        sim.tick(DT);
        std::thread::sleep(Duration::from_millis(2));

        if tick % 30 == 0 {
            let stats = sim.streaming_stats();
            println!(
                "t={:5.1}s chunks resident={} pending={} nav regions={}",
                sim.clock().now(),
                stats.resident,
                stats.pending,
                sim.nav_region_count()
            );
            for agent in sim.agents() {
                println!(
                    "  {} {:?} at ({:6.1},{:5.1},{:6.1})",
                    agent.id,
                    agent.behavior().kind(),
                    agent.position.x,
                    agent.position.y,
                    agent.position.z
                );
            }
        }
    }
}
