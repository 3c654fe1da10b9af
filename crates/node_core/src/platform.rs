//! Contratos dos colaboradores externos.
//!
//! O núcleo só chama estas interfaces; transporte, sensores, LEDs, rede e
//! persistência são implementados fora dele (o agente fornece versões para
//! host).

use crate::config::NodeConfig;
use crate::error::Result;
use crate::sensors::{CommandDescriptor, SensorDescriptor};
use std::net::Ipv6Addr;

/// Transporte publish/subscribe.
pub trait Transport {
    fn is_connected(&self) -> bool;
    fn subscribe(&mut self, topic: &str) -> Result<()>;
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()>;
}

/// Subsistema de sensores e seus registros.
pub trait SensorSubsystem {
    fn start(&mut self);
    fn stop(&mut self);
    fn sensors(&self) -> &[SensorDescriptor];
    fn sensors_mut(&mut self) -> &mut [SensorDescriptor];
    fn commands(&self) -> &[CommandDescriptor];
    fn commands_mut(&mut self) -> &mut [CommandDescriptor];
}

/// Controle de hardware. Ambas as operações sempre têm sucesso.
pub trait DeviceControl {
    fn set_led(&mut self, on: bool);
    /// Reset de hardware; nunca retorna.
    fn hard_reset(&mut self) -> !;
}

/// Camada de rede mesh.
pub trait NetworkLayer {
    /// `true` quando o nó já tem um endereço global preferido.
    fn has_global_address(&self) -> bool;
    /// Relay (próximo salto) atual.
    fn preferred_relay(&self) -> Option<Ipv6Addr>;
    /// Envia um echo request de `payload_len` bytes.
    fn send_probe(&mut self, dest: Ipv6Addr, payload_len: usize);
    /// RSSI do último quadro recebido.
    fn last_rssi(&self) -> i32;
}

/// Persistência best-effort da configuração.
pub trait ConfigStore {
    fn save(&mut self, config: &NodeConfig) -> std::result::Result<(), String>;
}
