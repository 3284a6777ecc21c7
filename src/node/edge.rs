use std::sync::Arc;

use log::debug;

use super::TransportSession;

/// The outermost node: outbound buffers leave the chain here through the
/// externally-owned transport handle. Inbound traffic enters beside it
/// untouched (the transport already stripped its own framing).
pub struct EdgeStage {
    transport: Arc<dyn TransportSession>,
}

impl EdgeStage {
    pub fn new(transport: Arc<dyn TransportSession>) -> Self {
        Self { transport }
    }

    pub fn send(&self, data: &[u8]) -> bool {
        let sent = self.transport.send(data);
        if !sent {
            debug!("[Edge] transport refused a {} byte datagram", data.len());
        }
        sent
    }
}
