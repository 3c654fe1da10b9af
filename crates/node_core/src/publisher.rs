//! Publicação de alarmes e telemetria periódica.
//!
//! Dois caminhos independentes, ambos terminando em [`PayloadBuffer`] e na
//! entrega ao transporte dentro da mesma chamada:
//!
//! - **Alarme**: uma entrada, limitado por cooldown (gatilhos durante o
//!   cooldown são descartados).
//! - **Periódico**: contador de ticks; dispara ao atingir o intervalo e zera.

use crate::config::ALARM_COOLDOWN_MAX_SECS;
use crate::error::{NodeError, Result};
use crate::payload::{APP_BUFFER_SIZE, FixedPoint, PayloadBuffer, PayloadValue};
use crate::platform::Transport;
use crate::sensors::SensorReading;
use std::net::Ipv6Addr;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Chave do identificador do dispositivo.
pub const KEY_DEVICE_ID: &str = "id";
/// Chave do uptime (segundos).
pub const KEY_UPTIME: &str = "uptime";
/// Chave do endereço do relay.
pub const KEY_PARENT: &str = "parent";
/// Chave do RSSI do relay.
pub const KEY_RSSI: &str = "rssi";

/// Dados de diagnóstico anexados à telemetria periódica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkStatus {
    pub uptime: Duration,
    pub relay: Option<Ipv6Addr>,
    pub rssi: i32,
}

#[derive(Debug)]
pub struct Publisher {
    scratch: PayloadBuffer,
    topic: String,
    device_id: String,
    cooldown: Duration,
    alarm_ready_at: Option<Instant>,
    ticks: u32,
}

impl Publisher {
    /// O cooldown é limitado a [`ALARM_COOLDOWN_MAX_SECS`].
    pub fn new(topic: impl Into<String>, device_id: impl Into<String>, cooldown: Duration) -> Self {
        let max_cooldown = Duration::from_secs(ALARM_COOLDOWN_MAX_SECS);
        if cooldown > max_cooldown {
            warn!("Cooldown de alarme {cooldown:?} acima do máximo, usando {max_cooldown:?}");
        }
        Self {
            scratch: PayloadBuffer::with_capacity(APP_BUFFER_SIZE),
            topic: topic.into(),
            device_id: device_id.into(),
            cooldown: cooldown.min(max_cooldown),
            alarm_ready_at: None,
            ticks: 0,
        }
    }

    /// Zera o contador periódico (nova conexão).
    pub fn reset_interval(&mut self) {
        self.ticks = 0;
    }

    /// Ticks contados desde o último disparo.
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Caminho de alarme. Retorna `Ok(false)` quando descartado pelo cooldown.
    ///
    /// O cooldown só é reiniciado quando o transporte aceita a mensagem: uma
    /// falha de entrega (desconectado ou erro de envio) deixa o próximo
    /// alarme livre para tentar de novo.
    pub fn on_alarm(
        &mut self,
        alarm: &SensorReading,
        now: Instant,
        transport: &mut dyn Transport,
    ) -> Result<bool> {
        if let Some(ready_at) = self.alarm_ready_at {
            if now < ready_at {
                debug!("Alarme {} descartado (cooldown)", alarm.name);
                return Ok(false);
            }
        }

        info!("Alarme! {} → {}", alarm.name, alarm.value);
        let value = FixedPoint::new(alarm.value, alarm.precision);
        self.scratch.begin(APP_BUFFER_SIZE)?;
        self.scratch
            .append(&alarm.name, PayloadValue::Fixed(value), true, false)?;
        self.hand_off(transport)?;

        self.alarm_ready_at = now.checked_add(self.cooldown);
        Ok(true)
    }

    /// Caminho periódico. Retorna `Ok(true)` quando a telemetria foi publicada.
    pub fn on_sample(
        &mut self,
        readings: &[SensorReading],
        interval: u16,
        link: &LinkStatus,
        transport: &mut dyn Transport,
    ) -> Result<bool> {
        self.ticks += 1;
        if self.ticks < u32::from(interval.max(1)) {
            return Ok(false);
        }
        self.ticks = 0;

        self.build_telemetry(readings, link)?;
        self.hand_off(transport)?;
        Ok(true)
    }

    fn build_telemetry(&mut self, readings: &[SensorReading], link: &LinkStatus) -> Result<()> {
        let buf = &mut self.scratch;
        buf.begin(APP_BUFFER_SIZE)?;
        buf.append(KEY_DEVICE_ID, PayloadValue::Text(&self.device_id), true, true)?;

        for reading in readings.iter().filter(|r| !r.name.is_empty()) {
            let value = FixedPoint::new(reading.value, reading.precision);
            buf.append(&reading.name, PayloadValue::Fixed(value), false, true)?;
        }

        let uptime = link.uptime.as_secs().to_string();
        buf.append(KEY_UPTIME, PayloadValue::Text(&uptime), false, true)?;

        let parent = link.relay.unwrap_or(Ipv6Addr::UNSPECIFIED).to_string();
        buf.append(KEY_PARENT, PayloadValue::Text(&parent), false, true)?;

        let rssi = link.rssi.to_string();
        buf.append(KEY_RSSI, PayloadValue::Text(&rssi), false, false)?;
        Ok(())
    }

    fn hand_off(&mut self, transport: &mut dyn Transport) -> Result<()> {
        if !transport.is_connected() {
            warn!("Publicação descartada: transporte desconectado");
            return Err(NodeError::TransportUnavailable);
        }
        debug!("Publicando {} ({} bytes)", self.scratch.as_str(), self.scratch.cursor());
        transport.publish(&self.topic, self.scratch.as_bytes())
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
