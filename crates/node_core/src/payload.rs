//! Payload Builder – escrita incremental e limitada de mensagens em lista.
//!
//! Formato produzido:
//!
//! ```text
//! {"values":[{"key":"<k>","value":<v>},{"key":"<k>","value":<v>}]}
//! ```
//!
//! Cada `append` formata o fragmento completo (abertura da lista, entrada e
//! separador/fechamento) antes de tocar no buffer. Se não couber, nada é
//! escrito além do cursor já confirmado.

use crate::error::{NodeError, Result};
use std::fmt;

/// Token de abertura da lista.
pub const LIST_OPEN: &str = "{\"values\":[";
/// Token de fechamento da lista.
pub const LIST_CLOSE: &str = "]}";
/// Separador entre entradas.
pub const SEPARATOR: &str = ",";

/// Capacidade padrão do buffer de saída (bytes).
pub const APP_BUFFER_SIZE: usize = 512;

// ──────────────────────────────────────────────
// Ponto fixo
// ──────────────────────────────────────────────

/// Valor bruto de sensor com precisão em ponto fixo.
///
/// Renderiza como `floor(v/p) "." zeroPad2(v mod p)`; com `p == 0`, `v.00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPoint {
    pub raw: u16,
    pub precision: u16,
}

impl FixedPoint {
    pub fn new(raw: u16, precision: u16) -> Self {
        Self { raw, precision }
    }
}

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.precision == 0 {
            return write!(f, "{}.00", self.raw);
        }
        write!(
            f,
            "{}.{:02}",
            self.raw / self.precision,
            self.raw % self.precision
        )
    }
}

/// Valor de uma entrada da lista.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadValue<'a> {
    /// Texto, serializado entre aspas (com escape JSON).
    Text(&'a str),
    /// Numérico em ponto fixo, sem aspas.
    Fixed(FixedPoint),
}

// ──────────────────────────────────────────────
// Buffer
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListState {
    Empty,
    Open,
    Closed,
}

/// Contexto de serialização com armazenamento próprio e limitado.
///
/// Pertence a quem publica; o acesso exclusivo vem do `&mut`.
#[derive(Debug)]
pub struct PayloadBuffer {
    buf: Vec<u8>,
    capacity: usize,
    state: ListState,
}

impl Default for PayloadBuffer {
    fn default() -> Self {
        Self::with_capacity(APP_BUFFER_SIZE)
    }
}

impl PayloadBuffer {
    /// Aloca o armazenamento uma única vez. Ainda é preciso chamar [`begin`](Self::begin).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            capacity: 0,
            state: ListState::Empty,
        }
    }

    /// Reinicia o cursor e fixa a capacidade desta mensagem.
    pub fn begin(&mut self, capacity: usize) -> Result<()> {
        self.buf.clear();
        self.state = ListState::Empty;
        self.capacity = 0;
        if capacity == 0 {
            return Err(NodeError::invalid("capacidade do buffer deve ser positiva"));
        }
        if capacity > self.buf.capacity() {
            self.buf.reserve_exact(capacity - self.buf.len());
        }
        self.capacity = capacity;
        Ok(())
    }

    /// Escreve uma entrada e retorna a nova posição do cursor.
    pub fn append(
        &mut self,
        key: &str,
        value: PayloadValue<'_>,
        is_first: bool,
        has_more: bool,
    ) -> Result<usize> {
        if self.capacity == 0 {
            return Err(NodeError::invalid("buffer não iniciado"));
        }
        match (self.state, is_first) {
            (ListState::Empty, true) | (ListState::Open, false) => {}
            (ListState::Empty, false) => {
                return Err(NodeError::invalid("primeira entrada sem abertura da lista"));
            }
            (ListState::Open, true) => {
                return Err(NodeError::invalid("lista já aberta"));
            }
            (ListState::Closed, _) => {
                return Err(NodeError::invalid("lista já fechada"));
            }
        }

        let fragment = format_entry(key, value, is_first, has_more);
        let remaining = self.remaining();
        if fragment.len() > remaining {
            return Err(NodeError::BufferOverflow {
                needed: fragment.len(),
                remaining,
            });
        }

        self.buf.extend_from_slice(fragment.as_bytes());
        self.state = if has_more {
            ListState::Open
        } else {
            ListState::Closed
        };
        Ok(self.buf.len())
    }

    /// Posição atual do cursor.
    pub fn cursor(&self) -> usize {
        self.buf.len()
    }

    /// Bytes ainda disponíveis.
    pub fn remaining(&self) -> usize {
        self.capacity - self.buf.len()
    }

    /// `true` depois que a última entrada fechou a lista.
    pub fn is_complete(&self) -> bool {
        self.state == ListState::Closed
    }

    /// Bytes confirmados até o cursor.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Conteúdo confirmado como texto.
    pub fn as_str(&self) -> &str {
        // Só fragmentos `String` são confirmados, então o conteúdo é UTF-8.
        std::str::from_utf8(&self.buf).unwrap_or_default()
    }
}

fn format_entry(key: &str, value: PayloadValue<'_>, is_first: bool, has_more: bool) -> String {
    let mut out = String::with_capacity(64);
    if is_first {
        out.push_str(LIST_OPEN);
    }
    out.push_str("{\"key\":");
    push_json_str(&mut out, key);
    out.push_str(",\"value\":");
    match value {
        PayloadValue::Text(text) => push_json_str(&mut out, text),
        PayloadValue::Fixed(fixed) => out.push_str(&fixed.to_string()),
    }
    out.push('}');
    out.push_str(if has_more { SEPARATOR } else { LIST_CLOSE });
    out
}

fn push_json_str(out: &mut String, s: &str) {
    match serde_json::to_string(s) {
        Ok(quoted) => out.push_str(&quoted),
        // Serializar &str não falha; mantém as aspas mesmo assim.
        Err(_) => {
            out.push('"');
            out.push('"');
        }
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
