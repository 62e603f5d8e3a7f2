//! # swimraft-cli::commands::run
//!
//! Implements the `run` subcommand.

use crate::{
    args::RunOpts,
    logging::SimulationFormatter,
    wiring::{build_world, finalize_world_setup, get_seed},
};
use anyhow::Result;
use std::fs;
use swimraft_engine::{prelude::*, scenario::load_and_schedule, telemetry::tracing_layer::SimContextLayer};
use tracing_subscriber::prelude::*;

pub fn exec(opts: RunOpts) -> Result<()> {
    let content = fs::read_to_string(&opts.scenario)?;
    let scenario: Scenario = match opts.scenario.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        Some("toml") => toml::from_str(&content)?,
        _ => return Err(anyhow::anyhow!("Unsupported scenario file extension")),
    };
    scenario.validate().map_err(|e| anyhow::anyhow!(e))?;

    let seed = get_seed(opts.seed, scenario.seed);
    println!("Running scenario '{}' with seed: {}", scenario.name, seed);

    let mut world = build_world(&scenario, seed)?;
    finalize_world_setup(&mut world);
    let num_nodes = world.nodes.len();

    let (snapshot_tx, _snapshot_rx) = crossbeam_channel::unbounded();
    let telemetry = TelemetryBus::new(snapshot_tx, num_nodes);
    let sim_context_layer = SimContextLayer::new(&telemetry);

    tracing_subscriber::registry()
        .with(sim_context_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(SimulationFormatter::new())
                .with_ansi(true),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut sim = Simulation::new(seed, world, telemetry);
    sim.init();
    load_and_schedule(&mut sim, &scenario)?;

    if let Some(stop_at_ms) = opts.stop_at {
        sim.run_until(sim_from_ms(stop_at_ms));
    } else if let Some(stop_at_ns) = scenario.stop_at {
        sim.run_until(stop_at_ns);
    } else {
        sim.run();
    }

    let final_snapshot = sim.telemetry().build_snapshot(&sim.world(), sim.now());
    println!("Simulation completed.");
    println!(
        "messages_sent={} messages_delivered={} timers_fired={} faults_injected={}",
        final_snapshot.metrics.messages_sent,
        final_snapshot.metrics.messages_delivered,
        final_snapshot.metrics.timers_fired,
        final_snapshot.metrics.faults_injected,
    );
    for node_snap in final_snapshot.nodes {
        println!("node {} [{:?}]", node_snap.id, node_snap.status);
    }

    Ok(())
}
