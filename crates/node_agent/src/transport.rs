//! Transporte UDP até o gateway.

use node_core::error::{NodeError, Result};
use node_core::platform::Transport;
use node_core::protocol::{FrameKind, GatewayFrame, encode_frame};
use std::net::UdpSocket;
use tracing::{debug, info};

pub struct UdpTransport {
    sock: UdpSocket,
    gateway: String,
    connected: bool,
}

impl UdpTransport {
    pub fn new(sock: UdpSocket, gateway: String) -> Self {
        Self {
            sock,
            gateway,
            connected: false,
        }
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    fn send(&mut self, kind: FrameKind, topic: &str, payload: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(NodeError::TransportUnavailable);
        }
        let frame = GatewayFrame {
            kind,
            topic: topic.to_string(),
            payload: payload.to_vec(),
        };
        let bytes = encode_frame(&frame).map_err(|e| NodeError::Transport(e.to_string()))?;
        let sent = self
            .sock
            .send_to(&bytes, &self.gateway)
            .map_err(|e| NodeError::Transport(e.to_string()))?;
        debug!("→ {sent} bytes para {} ({kind:?} {topic})", self.gateway);
        Ok(())
    }
}

impl Transport for UdpTransport {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn subscribe(&mut self, topic: &str) -> Result<()> {
        self.send(FrameKind::Subscribe, topic, &[])?;
        info!("Assinado: {topic}");
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        self.send(FrameKind::Publish, topic, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_core::protocol::decode_frame;

    fn pair() -> (UdpTransport, UdpSocket) {
        let gateway = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = gateway.local_addr().unwrap().to_string();
        let sock = UdpSocket::bind("127.0.0.1:0").unwrap();
        (UdpTransport::new(sock, addr), gateway)
    }

    #[test]
    fn publish_requires_connection() {
        let (mut transport, _gateway) = pair();
        assert_eq!(
            transport.publish("t", b"{}"),
            Err(NodeError::TransportUnavailable)
        );
    }

    #[test]
    fn publish_sends_gateway_frame() {
        let (mut transport, gateway) = pair();
        transport.set_connected(true);
        transport.publish("v2/things/node/data", b"{\"values\":[]}").unwrap();

        let mut buf = [0u8; 1024];
        let (size, _) = gateway.recv_from(&mut buf).unwrap();
        let frame = decode_frame(&buf[..size]).unwrap();
        assert_eq!(frame.kind, FrameKind::Publish);
        assert_eq!(frame.topic, "v2/things/node/data");
        assert_eq!(frame.payload, b"{\"values\":[]}");
    }
}
