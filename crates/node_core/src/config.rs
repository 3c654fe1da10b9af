//! Configuração unificada via TOML.
//!
//! [`NodeConfig`] é o estado mutável do nó (o dispatcher é o único dono);
//! [`AgentConfig`] descreve como o agente do host se liga ao gateway.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Intervalo padrão de publicação (em ticks de amostragem).
pub const DEFAULT_PUBLISH_INTERVAL: u16 = 45;
/// Menor intervalo aceito por `update_period`.
pub const UPDATE_PERIOD_MIN: u16 = 5;
/// Maior intervalo aceito por `update_period`.
pub const UPDATE_PERIOD_MAX: u16 = 600;
/// Tempo morto entre alarmes publicados (segundos).
pub const DEFAULT_ALARM_COOLDOWN_SECS: u64 = 30;
/// Maior cooldown aceito (um dia).
pub const ALARM_COOLDOWN_MAX_SECS: u64 = 86_400;

/// Thresholds de um sensor alterados por comando.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredThresholds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub over: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub below: Option<u16>,
}

/// Configuração do nó.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Identificador do dispositivo enviado na telemetria
    pub device_id: String,
    /// Client ID (vazio = derivado do endereço de enlace)
    pub client_id: String,
    /// Usuário de autenticação, usado na composição dos tópicos
    pub auth_user: String,
    /// Token de autenticação
    pub auth_token: String,
    /// Prefixo dos tópicos
    pub topic_prefix: String,
    /// Intervalo de publicação periódica (ticks)
    pub publish_interval: u16,
    /// Cooldown entre alarmes (segundos)
    pub alarm_cooldown_secs: u64,
    /// Thresholds por chave de configuração do sensor
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub thresholds: BTreeMap<String, StoredThresholds>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            device_id: "Mesh Node".into(),
            client_id: String::new(),
            auth_user: "node".into(),
            auth_token: String::new(),
            topic_prefix: "v2/things/".into(),
            publish_interval: DEFAULT_PUBLISH_INTERVAL,
            alarm_cooldown_secs: DEFAULT_ALARM_COOLDOWN_SECS,
            thresholds: BTreeMap::new(),
        }
    }
}

/// Configuração do agente (host).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// IP do gateway UDP
    pub gateway_ip: String,
    /// Porta do gateway
    pub gateway_port: u16,
    /// IP local para bind (vazio = todas as interfaces)
    pub bind_ip: String,
    /// Porta local onde o gateway entrega mensagens
    pub listen_port: u16,
    /// Intervalo entre amostras dos sensores (segundos)
    pub sampling_interval_secs: f64,
    /// Endereço de enlace de 8 bytes (hex separado por ':')
    pub link_address: String,
    /// Endereço IPv6 do relay (vazio = sem relay)
    pub relay_address: String,
    /// RSSI simulado do enlace com o relay (dBm)
    pub link_rssi: i32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            gateway_ip: "127.0.0.1".into(),
            gateway_port: 1884,
            bind_ip: String::new(),
            listen_port: 1885,
            sampling_interval_secs: 1.0,
            link_address: "00:12:4b:00:06:0d:b5:a3".into(),
            relay_address: "fe80::212:4b00:60d:b5a0".into(),
            link_rssi: -60,
        }
    }
}

/// Configuração raiz do aplicativo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub node: NodeConfig,
    pub agent: AgentConfig,
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        info!("Configuração carregada de {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Erro ao parsear {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Erro ao ler {}: {}", path.display(), e);
                }
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, content).map_err(|e| e.to_string())?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let interval = self.node.publish_interval;
        if !(UPDATE_PERIOD_MIN..=UPDATE_PERIOD_MAX).contains(&interval) {
            errors.push(format!(
                "Intervalo de publicação inválido: {interval} ({UPDATE_PERIOD_MIN}–{UPDATE_PERIOD_MAX})"
            ));
        }
        if self.node.alarm_cooldown_secs > ALARM_COOLDOWN_MAX_SECS {
            errors.push(format!(
                "Cooldown de alarme inválido: {} (0–{ALARM_COOLDOWN_MAX_SECS})",
                self.node.alarm_cooldown_secs
            ));
        }
        if self.node.auth_user.is_empty() {
            errors.push("Usuário de autenticação não pode ser vazio".into());
        }
        if self.agent.gateway_port == 0 {
            errors.push("Porta do gateway não pode ser 0".into());
        }
        if self.agent.sampling_interval_secs < 0.1 || self.agent.sampling_interval_secs > 60.0 {
            errors.push(format!(
                "Intervalo de amostragem inválido: {} (0.1–60.0)",
                self.agent.sampling_interval_secs
            ));
        }
        if !self.agent.relay_address.is_empty()
            && self.agent.relay_address.parse::<std::net::Ipv6Addr>().is_err()
        {
            errors.push(format!(
                "Endereço do relay inválido: {}",
                self.agent.relay_address
            ));
        }
        if crate::topics::parse_link_address(&self.agent.link_address).is_none() {
            errors.push(format!(
                "Endereço de enlace inválido: {}",
                self.agent.link_address
            ));
        }

        errors
    }
}
