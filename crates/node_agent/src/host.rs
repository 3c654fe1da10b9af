//! Colaboradores de host: LED/reset, rede mesh simulada e persistência.

use crossbeam_channel::Sender;
use node_core::config::{AppConfig, NodeConfig};
use node_core::node::NodeEvent;
use node_core::platform::{ConfigStore, DeviceControl, NetworkLayer};
use std::net::Ipv6Addr;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Código de saída usado pelo reset, para um supervisor reiniciar o processo.
pub const REBOOT_EXIT_CODE: i32 = 75;

/// LED de comando e reset do processo.
#[derive(Debug, Default)]
pub struct ConsoleDevice {
    led: bool,
}

impl ConsoleDevice {
    #[cfg(test)]
    pub fn led(&self) -> bool {
        self.led
    }
}

impl DeviceControl for ConsoleDevice {
    fn set_led(&mut self, on: bool) {
        self.led = on;
        info!("LED de comando: {}", if on { "●" } else { "○" });
    }

    fn hard_reset(&mut self) -> ! {
        warn!("Reset solicitado, encerrando processo (código {REBOOT_EXIT_CODE})");
        std::process::exit(REBOOT_EXIT_CODE)
    }
}

/// Rede mesh simulada: relay fixo e probes respondidos na hora.
pub struct SimulatedNetwork {
    relay: Option<Ipv6Addr>,
    rssi: i32,
    events: Sender<NodeEvent>,
}

impl SimulatedNetwork {
    pub fn new(relay: Option<Ipv6Addr>, rssi: i32, events: Sender<NodeEvent>) -> Self {
        Self { relay, rssi, events }
    }
}

impl NetworkLayer for SimulatedNetwork {
    fn has_global_address(&self) -> bool {
        self.relay.is_some()
    }

    fn preferred_relay(&self) -> Option<Ipv6Addr> {
        self.relay
    }

    fn send_probe(&mut self, dest: Ipv6Addr, payload_len: usize) {
        debug!("Echo request ({payload_len} bytes) → {dest}");
        if self.events.try_send(NodeEvent::EchoReply { source: dest }).is_err() {
            debug!("Channel cheio, echo reply perdido");
        }
    }

    fn last_rssi(&self) -> i32 {
        self.rssi
    }
}

/// Persiste a configuração do nó de volta no config.toml.
pub struct TomlStore {
    path: PathBuf,
    app: AppConfig,
}

impl TomlStore {
    pub fn new(path: PathBuf, app: AppConfig) -> Self {
        Self { path, app }
    }
}

impl ConfigStore for TomlStore {
    fn save(&mut self, config: &NodeConfig) -> Result<(), String> {
        self.app.node = config.clone();
        self.app.save(&self.path)
    }
}
