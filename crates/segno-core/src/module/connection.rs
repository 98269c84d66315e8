//! Device references and connections.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Addresses one device in the signal graph.
///
/// Audio units expose two interface devices: the input side (which forwards
/// received signal into the unit's inner graph) and the output side (which
/// collects the inner graph's result). Processors are addressed through their
/// owning unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceRef {
    /// The distinguished master sink.
    Master,
    /// Input interface of an audio unit.
    AuInput(usize),
    /// Output interface of an audio unit.
    AuOutput(usize),
    /// Processor `proc_index` inside audio unit `au_index`.
    Proc {
        au_index: usize,
        proc_index: usize,
    },
}

impl fmt::Display for DeviceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceRef::Master => write!(f, "master"),
            DeviceRef::AuInput(au) => write!(f, "au {au} in"),
            DeviceRef::AuOutput(au) => write!(f, "au {au} out"),
            DeviceRef::Proc {
                au_index,
                proc_index,
            } => write!(f, "au {au_index} proc {proc_index}"),
        }
    }
}

/// A directed port-to-port edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub send: DeviceRef,
    pub send_port: usize,
    pub recv: DeviceRef,
    pub recv_port: usize,
}

impl Connection {
    pub fn new(send: DeviceRef, send_port: usize, recv: DeviceRef, recv_port: usize) -> Self {
        Connection {
            send,
            send_port,
            recv,
            recv_port,
        }
    }
}
