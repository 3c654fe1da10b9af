//! Descritores de sensores e comandos.
//!
//! Os registros pertencem ao subsistema de sensores; o núcleo só os toma
//! emprestados (ver [`crate::platform::SensorSubsystem`]).

use std::fmt;

/// Metadados e estado atual de um sensor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorDescriptor {
    /// Nome publicado na telemetria (vazio = não publicado)
    pub name: String,
    /// Prefixo da chave de configuração dos thresholds (vazio = não configurável)
    pub config_key: String,
    /// Menor threshold aceito
    pub min: u16,
    /// Maior threshold aceito
    pub max: u16,
    /// Alarme quando `value` ultrapassa este valor
    pub over_threshold: u16,
    /// Alarme quando `value` fica abaixo deste valor
    pub below_threshold: u16,
    /// Valor bruto atual
    pub value: u16,
    /// Divisor de ponto fixo (0 = inteiro)
    pub precision: u16,
}

impl SensorDescriptor {
    /// Leitura publicável do valor atual.
    pub fn reading(&self) -> SensorReading {
        SensorReading {
            name: self.name.clone(),
            value: self.value,
            precision: self.precision,
        }
    }

    /// `true` se o valor atual está fora da janela `[below, over]`.
    pub fn is_alarming(&self) -> bool {
        self.value > self.over_threshold || self.value < self.below_threshold
    }
}

/// Valor transportado pelos eventos de amostra e de alarme.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorReading {
    pub name: String,
    pub value: u16,
    pub precision: u16,
}

/// Handler de comando com argumento inteiro.
pub type CommandHandler = Box<dyn FnMut(i32) + Send>;

/// Comando nomeado exposto pelo subsistema de sensores.
pub struct CommandDescriptor {
    pub name: String,
    pub handler: CommandHandler,
}

impl CommandDescriptor {
    pub fn new(name: impl Into<String>, handler: impl FnMut(i32) + Send + 'static) -> Self {
        Self {
            name: name.into(),
            handler: Box::new(handler),
        }
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
