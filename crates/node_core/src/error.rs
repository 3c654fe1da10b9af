//! Erros do núcleo do nó.
//!
//! Todos são recuperados localmente: o componente que falha registra o erro
//! via `tracing` e não altera estado. A única saída fatal é o comando de
//! reboot, que não passa por aqui.

/// Erros do núcleo.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeError {
    #[error("Buffer insuficiente: necessários {needed} bytes, restam {remaining}")]
    BufferOverflow { needed: usize, remaining: usize },

    #[error("Argumento inválido: {0}")]
    InvalidArgument(String),

    #[error("Comando/configuração não reconhecido: {0}")]
    UnknownCommand(String),

    #[error("Transporte indisponível (desconectado)")]
    TransportUnavailable,

    #[error("Falha no transporte: {0}")]
    Transport(String),
}

impl NodeError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        NodeError::InvalidArgument(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, NodeError>;
