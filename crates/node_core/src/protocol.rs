//! Protocolo binário entre o agente e o gateway UDP.
//!
//! Formato do frame:
//!
//! ```text
//! ┌──────────┬─────────┬──────────────────────────┐
//! │ Magic(1) │ Ver.(1) │ GatewayFrame bincode (N) │
//! └──────────┴─────────┴──────────────────────────┘
//! ```
//!
//! - Magic byte `0x4E` ('N') identifica pacotes do nó
//! - Versão do protocolo (1 byte)
//! - `GatewayFrame` serializado com bincode

use serde::{Deserialize, Serialize};

/// Magic byte que identifica pacotes do nó.
pub const MAGIC_BYTE: u8 = 0x4E; // 'N'

/// Versão atual do protocolo.
pub const PROTOCOL_VERSION: u8 = 1;

/// Tamanho do header (magic + version).
const HEADER_SIZE: usize = 2;

/// Tamanho máximo de pacote UDP seguro (sem fragmentação).
pub const MAX_UDP_PAYLOAD: usize = 65507;

/// Tipo de frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameKind {
    /// Nó → gateway: publica `payload` em `topic`
    Publish,
    /// Nó → gateway: assina `topic`
    Subscribe,
    /// Gateway → nó: mensagem recebida em um tópico assinado
    Deliver,
}

/// Envelope trocado com o gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayFrame {
    pub kind: FrameKind,
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Erros do protocolo.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Pacote muito curto ({0} bytes, mínimo {HEADER_SIZE})")]
    TooShort(usize),

    #[error("Magic byte inválido: 0x{0:02X} (esperado 0x{MAGIC_BYTE:02X})")]
    InvalidMagic(u8),

    #[error("Versão incompatível: {0} (suportada: {PROTOCOL_VERSION})")]
    VersionMismatch(u8),

    #[error("Frame excede {MAX_UDP_PAYLOAD} bytes ({0})")]
    TooLarge(usize),

    #[error("Erro de serialização: {0}")]
    Serialize(String),

    #[error("Erro de deserialização: {0}")]
    Deserialize(String),
}

/// Codifica um [`GatewayFrame`] para transmissão UDP.
///
/// Retorna bytes no formato: `[MAGIC][VERSION][bincode_frame...]`
pub fn encode_frame(frame: &GatewayFrame) -> Result<Vec<u8>, ProtocolError> {
    let body = bincode::serialize(frame).map_err(|e| ProtocolError::Serialize(e.to_string()))?;

    let total = HEADER_SIZE + body.len();
    if total > MAX_UDP_PAYLOAD {
        return Err(ProtocolError::TooLarge(total));
    }

    let mut out = Vec::with_capacity(total);
    out.push(MAGIC_BYTE);
    out.push(PROTOCOL_VERSION);
    out.extend_from_slice(&body);

    Ok(out)
}

/// Decodifica bytes recebidos via UDP em [`GatewayFrame`].
///
/// Valida magic byte e versão antes de deserializar.
pub fn decode_frame(data: &[u8]) -> Result<GatewayFrame, ProtocolError> {
    if data.len() < HEADER_SIZE {
        return Err(ProtocolError::TooShort(data.len()));
    }

    let magic = data[0];
    if magic != MAGIC_BYTE {
        return Err(ProtocolError::InvalidMagic(magic));
    }

    let version = data[1];
    if version != PROTOCOL_VERSION {
        return Err(ProtocolError::VersionMismatch(version));
    }

    bincode::deserialize(&data[HEADER_SIZE..]).map_err(|e| ProtocolError::Deserialize(e.to_string()))
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
