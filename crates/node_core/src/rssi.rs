//! RSSI do enlace com o relay atual.
//!
//! Um único echo request por conexão; a resposta do relay atualiza o valor
//! em cache. Sem retry, sem timeout: uma resposta perdida mantém o último
//! valor indefinidamente.

use crate::platform::NetworkLayer;
use std::net::Ipv6Addr;
use tracing::{debug, info};

/// Tamanho do payload do echo request.
pub const ECHO_REQ_PAYLOAD_LEN: usize = 20;

/// Valor publicado antes da primeira resposta.
pub const RSSI_UNKNOWN: i32 = 0x0800_0000;

#[derive(Debug)]
pub struct ParentTracker {
    rssi: i32,
}

impl Default for ParentTracker {
    fn default() -> Self {
        Self { rssi: RSSI_UNKNOWN }
    }
}

impl ParentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Último RSSI conhecido.
    pub fn rssi(&self) -> i32 {
        self.rssi
    }

    /// Envia um probe ao relay, se houver. Retorna `true` se enviou.
    pub fn probe(&self, net: &mut dyn NetworkLayer) -> bool {
        if !net.has_global_address() {
            info!("Relay não disponível (sem endereço global)");
            return false;
        }
        let Some(relay) = net.preferred_relay() else {
            info!("Relay não disponível");
            return false;
        };
        debug!("Probe → {relay}");
        net.send_probe(relay, ECHO_REQ_PAYLOAD_LEN);
        true
    }

    /// Trata um echo reply; só respostas do relay atual contam.
    pub fn on_echo_reply(&mut self, source: Ipv6Addr, net: &dyn NetworkLayer) -> bool {
        if net.preferred_relay() != Some(source) {
            debug!("Echo reply de {source} ignorado (não é o relay)");
            return false;
        }
        self.rssi = net.last_rssi();
        debug!("RSSI do relay → {} dBm", self.rssi);
        true
    }
}
