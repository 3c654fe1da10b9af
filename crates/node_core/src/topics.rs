//! Tópicos de publicação/comando e identidade do cliente.
//!
//! Calculados uma única vez na inicialização e imutáveis depois.

use crate::config::NodeConfig;
use crate::error::{NodeError, Result};
use std::fmt::Write;

/// Tamanho máximo de cada tópico (bytes).
pub const TOPIC_CAPACITY: usize = 64;

const PUB_SUFFIX: &str = "/data";
const CMD_SUFFIX: &str = "/cmd";

/// Par de tópicos do nó.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    publish: String,
    command: String,
}

impl Topics {
    /// Monta `"{prefix}{user}/data"` e `"{prefix}{user}/cmd"`.
    pub fn new(config: &NodeConfig) -> Result<Self> {
        if config.auth_user.is_empty() {
            return Err(NodeError::invalid("usuário de autenticação vazio"));
        }
        let publish = bounded_topic(&config.topic_prefix, &config.auth_user, PUB_SUFFIX)?;
        let command = bounded_topic(&config.topic_prefix, &config.auth_user, CMD_SUFFIX)?;
        Ok(Self { publish, command })
    }

    pub fn publish(&self) -> &str {
        &self.publish
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

fn bounded_topic(prefix: &str, user: &str, suffix: &str) -> Result<String> {
    let len = prefix.len() + user.len() + suffix.len();
    if len > TOPIC_CAPACITY {
        return Err(NodeError::invalid(format!(
            "tópico com {len} bytes excede {TOPIC_CAPACITY}"
        )));
    }
    let mut topic = String::with_capacity(len);
    topic.push_str(prefix);
    topic.push_str(user);
    topic.push_str(suffix);
    Ok(topic)
}

/// Client ID a partir dos bytes 0,1,2,5,6,7 do endereço de enlace.
pub fn client_id_from_link_addr(addr: &[u8; 8]) -> String {
    let mut id = String::with_capacity(12);
    for b in [addr[0], addr[1], addr[2], addr[5], addr[6], addr[7]] {
        let _ = write!(id, "{b:02x}");
    }
    id
}

/// Converte `"00:12:4b:..."` em 8 bytes.
pub fn parse_link_address(text: &str) -> Option<[u8; 8]> {
    let mut out = [0u8; 8];
    let mut parts = text.split(':');
    for slot in out.iter_mut() {
        *slot = u8::from_str_radix(parts.next()?, 16).ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}
