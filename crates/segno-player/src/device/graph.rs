//! The flattened device graph.
//!
//! Master-level and per-unit connections are merged into one node table at
//! setup. The graph is checked for cycles and produces two execution plans:
//! the mixed order (every device, senders before receivers) and one voice
//! order per audio unit (its voice-signal processors only).

use std::collections::HashMap;

use segno_core::limits::PORTS_MAX;
use segno_core::module::{Connection, DeviceRef, Module};
use segno_core::{Result, SetupError};

/// One resolved edge between graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub send_node: usize,
    pub send_port: usize,
    pub recv_node: usize,
    pub recv_port: usize,
}

/// A node in the flattened graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub device: DeviceRef,
    /// Incoming edges, filled during build.
    pub incoming: Vec<Edge>,
}

/// The flattened, cycle-checked device graph.
#[derive(Debug, Clone)]
pub struct DeviceGraph {
    nodes: Vec<Node>,
    index: HashMap<DeviceRef, usize>,
    /// Execution order for the mixed pipeline: senders before receivers.
    mixed_order: Vec<usize>,
    /// Per audio unit: voice-signal processor nodes in execution order.
    voice_orders: Vec<Vec<usize>>,
    /// Per audio unit: edges between voice-order nodes plus edges into the
    /// unit's output interface.
    voice_edges: Vec<Vec<Edge>>,
}

impl DeviceGraph {
    /// Build and validate the graph for a module.
    pub fn build(module: &Module) -> Result<DeviceGraph> {
        let mut nodes = Vec::new();
        let mut index = HashMap::new();

        let mut add_node = |nodes: &mut Vec<Node>,
                            index: &mut HashMap<DeviceRef, usize>,
                            device: DeviceRef| {
            *index.entry(device).or_insert_with(|| {
                nodes.push(Node {
                    device,
                    incoming: Vec::new(),
                });
                nodes.len() - 1
            })
        };

        add_node(&mut nodes, &mut index, DeviceRef::Master);
        for (au_index, au) in module.audio_units.iter().enumerate() {
            add_node(&mut nodes, &mut index, DeviceRef::AuInput(au_index));
            add_node(&mut nodes, &mut index, DeviceRef::AuOutput(au_index));
            for (proc_index, _) in au.processors() {
                add_node(
                    &mut nodes,
                    &mut index,
                    DeviceRef::Proc {
                        au_index,
                        proc_index,
                    },
                );
            }
        }

        let mut graph = DeviceGraph {
            nodes,
            index,
            mixed_order: Vec::new(),
            voice_orders: vec![Vec::new(); module.audio_units.len()],
            voice_edges: vec![Vec::new(); module.audio_units.len()],
        };

        let all_connections = module
            .connections
            .iter()
            .chain(module.audio_units.iter().flat_map(|au| au.connections.iter()));
        for conn in all_connections {
            graph.add_connection(conn)?;
        }

        graph.mixed_order = graph.topological_order()?;
        graph.build_voice_plans(module);

        Ok(graph)
    }

    fn add_connection(&mut self, conn: &Connection) -> Result<()> {
        if conn.send_port >= PORTS_MAX || conn.recv_port >= PORTS_MAX {
            return Err(SetupError::PortOutOfRange {
                port: conn.send_port.max(conn.recv_port),
                max: PORTS_MAX - 1,
            });
        }
        let send_node = self.node_index(conn.send)?;
        let recv_node = self.node_index(conn.recv)?;
        if send_node == recv_node {
            return Err(SetupError::CyclicGraph(conn.send.to_string()));
        }
        self.nodes[recv_node].incoming.push(Edge {
            send_node,
            send_port: conn.send_port,
            recv_node,
            recv_port: conn.recv_port,
        });
        Ok(())
    }

    fn node_index(&self, device: DeviceRef) -> Result<usize> {
        self.index
            .get(&device)
            .copied()
            .ok_or_else(|| SetupError::UnknownDevice(device.to_string()))
    }

    /// Kahn's algorithm; a leftover node means a cycle.
    fn topological_order(&self) -> Result<Vec<usize>> {
        let n = self.nodes.len();
        let mut pending_in = vec![0usize; n];
        let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, node) in self.nodes.iter().enumerate() {
            for edge in &node.incoming {
                outgoing[edge.send_node].push(i);
                pending_in[i] += 1;
            }
        }

        let mut ready: Vec<usize> = (0..n).filter(|i| pending_in[*i] == 0).collect();
        // Deterministic order regardless of hash iteration.
        ready.sort_unstable();
        let mut order = Vec::with_capacity(n);
        while let Some(node) = ready.pop() {
            order.push(node);
            for &next in &outgoing[node] {
                pending_in[next] -= 1;
                if pending_in[next] == 0 {
                    ready.push(next);
                }
            }
        }

        if order.len() != n {
            let stuck = (0..n)
                .find(|i| pending_in[*i] > 0)
                .map(|i| self.nodes[i].device.to_string())
                .unwrap_or_default();
            return Err(SetupError::CyclicGraph(stuck));
        }
        Ok(order)
    }

    /// Collect, per audio unit, the voice-signal processors in mixed order
    /// and the edges that connect them (including edges into the output
    /// interface, which accumulate the group's contribution).
    fn build_voice_plans(&mut self, module: &Module) {
        for (au_index, au) in module.audio_units.iter().enumerate() {
            let in_voice_path = |device: DeviceRef| match device {
                DeviceRef::Proc {
                    au_index: a,
                    proc_index,
                } if a == au_index => au
                    .processor(proc_index)
                    .map(|def| def.voice_signals)
                    .unwrap_or(false),
                _ => false,
            };

            let mut order = Vec::new();
            let mut edges = Vec::new();
            for &node_index in &self.mixed_order {
                let device = self.nodes[node_index].device;
                if in_voice_path(device) {
                    order.push(node_index);
                }
                let collect_into = matches!(device, DeviceRef::AuOutput(a) if a == au_index);
                if in_voice_path(device) || collect_into {
                    for edge in &self.nodes[node_index].incoming {
                        if in_voice_path(self.nodes[edge.send_node].device) {
                            edges.push(*edge);
                        }
                    }
                }
            }
            self.voice_orders[au_index] = order;
            self.voice_edges[au_index] = edges;
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn find(&self, device: DeviceRef) -> Option<usize> {
        self.index.get(&device).copied()
    }

    pub fn mixed_order(&self) -> &[usize] {
        &self.mixed_order
    }

    pub fn voice_order(&self, au_index: usize) -> &[usize] {
        &self.voice_orders[au_index]
    }

    pub fn voice_edges(&self, au_index: usize) -> &[Edge] {
        &self.voice_edges[au_index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use segno_core::module::{
        AuType, AudioUnit, DebugParams, Module, ProcDef, ProcParams,
    };

    fn debug_instrument_module() -> Module {
        let mut module = Module::new();
        let mut au = AudioUnit::new(AuType::Instrument);
        au.set_processor(0, ProcDef::new(ProcParams::Debug(DebugParams::default())));
        au.connections.push(Connection::new(
            DeviceRef::Proc {
                au_index: 0,
                proc_index: 0,
            },
            0,
            DeviceRef::AuOutput(0),
            0,
        ));
        module.audio_units.push(au);
        module.connections.push(Connection::new(
            DeviceRef::AuOutput(0),
            0,
            DeviceRef::Master,
            0,
        ));
        module
    }

    #[test]
    fn builds_orders_for_a_simple_instrument() {
        let module = debug_instrument_module();
        let graph = DeviceGraph::build(&module).unwrap();

        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.voice_order(0).len(), 1);
        assert_eq!(graph.voice_edges(0).len(), 1);

        // The master must come after the unit output in mixed order.
        let order = graph.mixed_order();
        let master_pos = order
            .iter()
            .position(|&i| graph.node(i).device == DeviceRef::Master)
            .unwrap();
        let au_out_pos = order
            .iter()
            .position(|&i| graph.node(i).device == DeviceRef::AuOutput(0))
            .unwrap();
        assert!(au_out_pos < master_pos);
    }

    #[test]
    fn self_loop_is_rejected() {
        let mut module = debug_instrument_module();
        module.audio_units[0].connections.push(Connection::new(
            DeviceRef::Proc {
                au_index: 0,
                proc_index: 0,
            },
            0,
            DeviceRef::Proc {
                au_index: 0,
                proc_index: 0,
            },
            1,
        ));
        assert!(matches!(
            DeviceGraph::build(&module),
            Err(SetupError::CyclicGraph(_))
        ));
    }

    #[test]
    fn two_node_cycle_is_rejected() {
        let mut module = debug_instrument_module();
        module.audio_units[0].set_processor(
            1,
            ProcDef::new(ProcParams::Debug(DebugParams::default())),
        );
        let a = DeviceRef::Proc {
            au_index: 0,
            proc_index: 0,
        };
        let b = DeviceRef::Proc {
            au_index: 0,
            proc_index: 1,
        };
        module.audio_units[0]
            .connections
            .push(Connection::new(a, 0, b, 0));
        module.audio_units[0]
            .connections
            .push(Connection::new(b, 0, a, 0));
        assert!(matches!(
            DeviceGraph::build(&module),
            Err(SetupError::CyclicGraph(_))
        ));
    }

    #[test]
    fn long_feed_forward_chain_is_accepted() {
        let mut module = Module::new();
        let mut au = AudioUnit::new(AuType::Instrument);
        for i in 0..64 {
            au.set_processor(i, ProcDef::new(ProcParams::Debug(DebugParams::default())));
        }
        for i in 0..63 {
            au.connections.push(Connection::new(
                DeviceRef::Proc {
                    au_index: 0,
                    proc_index: i,
                },
                0,
                DeviceRef::Proc {
                    au_index: 0,
                    proc_index: i + 1,
                },
                0,
            ));
        }
        module.audio_units.push(au);
        let graph = DeviceGraph::build(&module);
        assert!(graph.is_ok());
    }

    #[test]
    fn unknown_device_is_rejected() {
        let mut module = debug_instrument_module();
        module.connections.push(Connection::new(
            DeviceRef::AuOutput(7),
            0,
            DeviceRef::Master,
            0,
        ));
        assert!(matches!(
            DeviceGraph::build(&module),
            Err(SetupError::UnknownDevice(_))
        ));
    }

    #[test]
    fn port_out_of_range_is_rejected() {
        let mut module = debug_instrument_module();
        module.connections.push(Connection::new(
            DeviceRef::AuOutput(0),
            99,
            DeviceRef::Master,
            0,
        ));
        assert!(matches!(
            DeviceGraph::build(&module),
            Err(SetupError::PortOutOfRange { .. })
        ));
    }
}
