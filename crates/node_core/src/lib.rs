//! # Node Core
//!
//! Núcleo de telemetria/comando de um nó sensor mesh: transforma leituras
//! em mensagens de saída limitadas e mensagens de comando/configuração em
//! mudanças de estado ou ações de hardware.
//!
//! ## Módulos
//! - [`payload`] – Payload Builder limitado e renderização em ponto fixo
//! - [`dispatcher`] – Comandos/configuração em ordem fixa de prioridade
//! - [`publisher`] – Alarmes com cooldown e telemetria periódica
//! - [`rssi`] – RSSI do relay via probe
//! - [`topics`] – Tópicos e client ID
//! - [`node`] – Loop de eventos single-threaded
//! - [`platform`] – Contratos dos colaboradores externos
//! - [`protocol`] – Envelope binário do gateway (bincode com magic byte)
//! - [`config`] – Configuração unificada via TOML

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod node;
pub mod payload;
pub mod platform;
pub mod protocol;
pub mod publisher;
pub mod rssi;
pub mod sensors;
pub mod topics;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports convenientes
pub use config::{AgentConfig, AppConfig, NodeConfig};
pub use error::NodeError;
pub use node::{Node, NodeEvent, Platform};
pub use protocol::{PROTOCOL_VERSION, decode_frame, encode_frame};
