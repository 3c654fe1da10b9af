//! Colaboradores falsos para os testes do núcleo.

use crate::config::NodeConfig;
use crate::error::{NodeError, Result};
use crate::platform::{ConfigStore, DeviceControl, NetworkLayer, SensorSubsystem, Transport};
use crate::sensors::{CommandDescriptor, SensorDescriptor};
use std::net::Ipv6Addr;

pub fn temperature_sensor() -> SensorDescriptor {
    SensorDescriptor {
        name: "temperature".into(),
        config_key: "temperature".into(),
        min: 0,
        max: 5000,
        over_threshold: 3000,
        below_threshold: 1000,
        value: 2345,
        precision: 100,
    }
}

#[derive(Debug, Default)]
pub struct MockTransport {
    pub disconnected: bool,
    pub fail: bool,
    pub subscriptions: Vec<String>,
    pub published: Vec<(String, String)>,
}

impl Transport for MockTransport {
    fn is_connected(&self) -> bool {
        !self.disconnected
    }

    fn subscribe(&mut self, topic: &str) -> Result<()> {
        self.subscriptions.push(topic.to_string());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        if self.fail {
            return Err(NodeError::Transport("falha simulada".into()));
        }
        let text = String::from_utf8(payload.to_vec()).expect("payload UTF-8");
        self.published.push((topic.to_string(), text));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MockSensors {
    pub running: Option<bool>,
    pub sensors: Vec<SensorDescriptor>,
    pub commands: Vec<CommandDescriptor>,
}

impl MockSensors {
    pub fn with_sensors(sensors: Vec<SensorDescriptor>) -> Self {
        Self {
            sensors,
            ..Default::default()
        }
    }
}

impl SensorSubsystem for MockSensors {
    fn start(&mut self) {
        self.running = Some(true);
    }

    fn stop(&mut self) {
        self.running = Some(false);
    }

    fn sensors(&self) -> &[SensorDescriptor] {
        &self.sensors
    }

    fn sensors_mut(&mut self) -> &mut [SensorDescriptor] {
        &mut self.sensors
    }

    fn commands(&self) -> &[CommandDescriptor] {
        &self.commands
    }

    fn commands_mut(&mut self) -> &mut [CommandDescriptor] {
        &mut self.commands
    }
}

#[derive(Debug, Default)]
pub struct MockDevice {
    pub led: Option<bool>,
}

impl DeviceControl for MockDevice {
    fn set_led(&mut self, on: bool) {
        self.led = Some(on);
    }

    fn hard_reset(&mut self) -> ! {
        panic!("hard reset");
    }
}

#[derive(Debug, Default)]
pub struct MockStore {
    pub fail: bool,
    pub saves: usize,
    pub last: Option<NodeConfig>,
}

impl ConfigStore for MockStore {
    fn save(&mut self, config: &NodeConfig) -> std::result::Result<(), String> {
        if self.fail {
            return Err("flash indisponível".into());
        }
        self.saves += 1;
        self.last = Some(config.clone());
        Ok(())
    }
}

#[derive(Debug)]
pub struct MockNetwork {
    pub global: bool,
    pub relay: Option<Ipv6Addr>,
    pub rssi: i32,
    pub probes: Vec<(Ipv6Addr, usize)>,
}

impl Default for MockNetwork {
    fn default() -> Self {
        Self {
            global: true,
            relay: Some(relay_addr()),
            rssi: -67,
            probes: Vec::new(),
        }
    }
}

pub fn relay_addr() -> Ipv6Addr {
    "fd00::212:4b00:60d:b5a0".parse().expect("endereço válido")
}

impl NetworkLayer for MockNetwork {
    fn has_global_address(&self) -> bool {
        self.global
    }

    fn preferred_relay(&self) -> Option<Ipv6Addr> {
        self.relay
    }

    fn send_probe(&mut self, dest: Ipv6Addr, payload_len: usize) {
        self.probes.push((dest, payload_len));
    }

    fn last_rssi(&self) -> i32 {
        self.rssi
    }
}
