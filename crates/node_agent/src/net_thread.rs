//! Thread de rede que escuta o gateway e entrega mensagens ao loop de
//! eventos via channel.

use crossbeam_channel::Sender;
use node_core::node::NodeEvent;
use node_core::protocol::{FrameKind, decode_frame};
use std::net::UdpSocket;
use tracing::{debug, warn};

/// Inicia a thread de rede sobre um clone do socket do transporte.
pub fn spawn_receiver_thread(sock: UdpSocket, tx: Sender<NodeEvent>) {
    std::thread::Builder::new()
        .name("udp-receiver".into())
        .spawn(move || receiver_loop(&sock, &tx))
        .expect("Falha ao criar thread de rede");
}

fn receiver_loop(sock: &UdpSocket, tx: &Sender<NodeEvent>) {
    let mut buf = [0u8; 65536];
    loop {
        match sock.recv_from(&mut buf) {
            Ok((size, addr)) => {
                if let Some(event) = to_event(&buf[..size], &addr.to_string()) {
                    // Non-blocking send: com o loop ocupado, descarta a mensagem
                    if tx.try_send(event).is_err() {
                        debug!("Channel cheio, descartando mensagem");
                    }
                }
            }
            Err(ref e)
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::WouldBlock =>
            {
                // Timeout normal, continua
            }
            Err(e) => {
                warn!("Erro ao receber UDP: {e}");
            }
        }
    }
}

/// Converte um datagrama do gateway em evento do nó.
fn to_event(data: &[u8], source: &str) -> Option<NodeEvent> {
    match decode_frame(data) {
        Ok(frame) if frame.kind == FrameKind::Deliver => Some(NodeEvent::Inbound {
            topic: frame.topic,
            payload: frame.payload,
        }),
        Ok(frame) => {
            debug!("Frame {:?} inesperado de {source}", frame.kind);
            None
        }
        Err(e) => {
            debug!("Pacote inválido de {source}: {e}");
            None
        }
    }
}
