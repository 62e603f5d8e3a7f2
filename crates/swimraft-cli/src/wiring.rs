//! # swimraft-cli::wiring
//!
//! Contains the logic for instantiating and connecting all the components
//! of the simulator (engine, world, protocols, telemetry).

use rand::Rng;
use swimraft_engine::{node::Node, prelude::*, store::MemStore, world::World};
use swimraft_proto::{api::boxed_dyn, limbo::LimboEngine, raft::RaftEngine, swim::SwimEngine, OwnershipHandle};

/// Derives a stable SWIM member identity for a node. Real deployments
/// generate this once at bootstrap and persist it; the harness derives it
/// from the node's index so scenario runs stay deterministic and
/// reproducible across seeds (§4.1).
fn member_id_for(node_id: NodeId) -> MemberId {
    MemberId(uuid::Uuid::from_u128(node_id as u128))
}

/// Constructs the initial `World` state from a scenario.
///
/// Every node always hosts SWIM membership. Raft leader election and the
/// limbo replication queue are hosted alongside it only when the scenario
/// configures them, since a pure membership cluster is a valid scenario
/// (§8 scenarios 1-3 exercise SWIM alone). When both are present on a node
/// they share one `OwnershipHandle` so limbo ownership follows whichever
/// replica Raft elects leader (§4.6).
pub fn build_world(scenario: &Scenario, seed: u64) -> anyhow::Result<World> {
    let num_nodes = scenario.initial.nodes;
    let all_ids: Vec<NodeId> = (0..num_nodes as NodeId).collect();

    let nodes = all_ids
        .iter()
        .map(|&node_id| {
            let mut protos: Vec<Box<dyn ProtocolDyn>> = Vec::new();

            let mut swim_config = scenario.initial.swim.clone();
            swim_config.uri = format!("node:{node_id}");
            let mut swim = SwimEngine::new(
                node_id,
                member_id_for(node_id),
                swim_config,
                seed.wrapping_add(node_id as u64),
            );
            for &peer_id in &all_ids {
                if peer_id != node_id {
                    swim.add_member(peer_id, member_id_for(peer_id));
                }
            }
            protos.push(Box::new(swim) as Box<dyn ProtocolDyn>);

            if let Some(raft_template) = &scenario.initial.raft {
                let mut raft_config = raft_template.clone();
                raft_config.instance_id = node_id as ReplicaId;
                raft_config.cluster_size = num_nodes;
                let ownership = OwnershipHandle::new();
                let raft = RaftEngine::new(raft_config, all_ids.clone()).with_ownership_handle(ownership.clone());
                protos.push(boxed_dyn(raft));

                if let Some(limbo_template) = &scenario.initial.limbo {
                    let mut limbo_config = limbo_template.clone();
                    limbo_config.instance_id = node_id as ReplicaId;
                    let limbo = LimboEngine::new(limbo_config).with_ownership_handle(ownership);
                    protos.push(boxed_dyn(limbo));
                }
            }

            let store = Box::new(MemStore::new());
            Node::new(node_id, protos, store)
        })
        .collect();

    let net = Net::from_topology(num_nodes, &scenario.topology);

    Ok(World { nodes, net })
}

/// Performs final setup on the world after construction, like populating
/// peer lists.
pub fn finalize_world_setup(world: &mut World) {
    let all_node_ids: Vec<NodeId> = (0..world.nodes.len() as NodeId).collect();
    for node_id in all_node_ids {
        let peers: Vec<NodeId> = world.net.peers_of(node_id).collect();
        world.nodes[node_id as usize].set_peers(peers);
    }
}

/// Generates a seed if one is not provided.
pub fn get_seed(opts_seed: Option<u64>, scenario_seed: Option<u64>) -> u64 {
    opts_seed
        .or(scenario_seed)
        .unwrap_or_else(|| rand::thread_rng().gen())
}
