//! Dispatcher de comandos/configuração.
//!
//! Uma mensagem por chamada, sempre no tópico de comando:
//!
//! ```text
//! {"key":"enable_sensor","value":false}
//! {"name":"update_period","value":61}
//! ```
//!
//! A mensagem é resolvida em um [`Command`] seguindo a ordem fixa de
//! prioridade (LED, reboot, sensores, intervalo, thresholds, comandos
//! nomeados) e só então executada.

use crate::config::{NodeConfig, UPDATE_PERIOD_MAX, UPDATE_PERIOD_MIN};
use crate::error::{NodeError, Result};
use crate::platform::{ConfigStore, DeviceControl, SensorSubsystem};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Liga/desliga o LED de comando.
pub const CMD_LEDS: &str = "leds_toggle";
/// Reinicia o dispositivo.
pub const CMD_REBOOT: &str = "reboot";
/// Liga/desliga o subsistema de sensores.
pub const CMD_SENSOR: &str = "enable_sensor";
/// Altera o intervalo de publicação.
pub const CMD_UPDATE_PERIOD: &str = "update_period";

/// Sufixo do threshold superior.
pub const SUFFIX_OVER: &str = "_thresh";
/// Sufixo do threshold inferior.
pub const SUFFIX_BELOW: &str = "_thresl";

/// Qual threshold de um sensor é alterado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdKind {
    Over,
    Below,
}

/// Comando resolvido a partir de uma mensagem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Led(bool),
    Reboot,
    /// `reboot` com argumento diferente de `true`
    RebootIgnored,
    EnableSensors(bool),
    PublishInterval(u16),
    Threshold {
        sensor: usize,
        kind: ThresholdKind,
        value: u16,
    },
    Named {
        index: usize,
        arg: i32,
    },
}

#[derive(Debug, Deserialize)]
struct InboundMessage {
    #[serde(alias = "name")]
    key: String,
    value: Value,
}

/// Dispatcher; dono da [`NodeConfig`].
#[derive(Debug)]
pub struct Dispatcher {
    config: NodeConfig,
    command_topic: String,
}

impl Dispatcher {
    pub fn new(config: NodeConfig, command_topic: impl Into<String>) -> Self {
        Self {
            config,
            command_topic: command_topic.into(),
        }
    }

    /// Configuração atual (somente leitura para os demais componentes).
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Reaplica no registro de sensores os thresholds salvos na configuração.
    ///
    /// Valores fora de `[min, max]` do descritor são ignorados.
    pub fn restore_thresholds(&self, sensors: &mut dyn SensorSubsystem) {
        for descriptor in sensors.sensors_mut() {
            if descriptor.config_key.is_empty() {
                continue;
            }
            let Some(stored) = self.config.thresholds.get(&descriptor.config_key) else {
                continue;
            };
            for (kind, value) in [
                (ThresholdKind::Over, stored.over),
                (ThresholdKind::Below, stored.below),
            ] {
                let Some(value) = value else { continue };
                if !(descriptor.min..=descriptor.max).contains(&value) {
                    warn!(
                        "Threshold salvo de {} fora da faixa: {value} ({}–{})",
                        descriptor.name, descriptor.min, descriptor.max
                    );
                    continue;
                }
                match kind {
                    ThresholdKind::Over => descriptor.over_threshold = value,
                    ThresholdKind::Below => descriptor.below_threshold = value,
                }
                debug!("Threshold {kind:?} de {} restaurado → {value}", descriptor.name);
            }
        }
    }

    /// Interpreta e executa uma mensagem recebida.
    ///
    /// Falhas são registradas aqui e não alteram estado. Um `reboot` com
    /// `true` não retorna.
    pub fn dispatch(
        &mut self,
        topic: &str,
        payload: &[u8],
        device: &mut dyn DeviceControl,
        sensors: &mut dyn SensorSubsystem,
        store: &mut dyn ConfigStore,
    ) -> Result<Command> {
        debug!("Mensagem em '{topic}' ({} bytes)", payload.len());
        let result = self.try_dispatch(topic, payload, device, sensors, store);
        if let Err(e) = &result {
            warn!("Mensagem rejeitada: {e}");
        }
        result
    }

    fn try_dispatch(
        &mut self,
        topic: &str,
        payload: &[u8],
        device: &mut dyn DeviceControl,
        sensors: &mut dyn SensorSubsystem,
        store: &mut dyn ConfigStore,
    ) -> Result<Command> {
        if topic != self.command_topic {
            return Err(NodeError::invalid(format!("tópico incorreto '{topic}'")));
        }
        if payload.is_empty() {
            return Err(NodeError::invalid("payload vazio"));
        }

        let msg = parse_message(payload)?;
        let command = resolve(&msg, sensors)?;
        self.execute(&command, device, sensors, store)?;
        Ok(command)
    }

    fn execute(
        &mut self,
        command: &Command,
        device: &mut dyn DeviceControl,
        sensors: &mut dyn SensorSubsystem,
        store: &mut dyn ConfigStore,
    ) -> Result<()> {
        match *command {
            Command::Led(on) => {
                info!("Comando: LED {}", if on { "ligado" } else { "desligado" });
                device.set_led(on);
            }
            Command::Reboot => {
                warn!("Comando: reboot");
                device.hard_reset();
            }
            Command::RebootIgnored => {
                info!("Reboot ignorado (argumento esperado: true)");
            }
            Command::EnableSensors(true) => {
                info!("Comando: sensores habilitados");
                sensors.start();
            }
            Command::EnableSensors(false) => {
                info!("Comando: sensores desabilitados");
                sensors.stop();
            }
            Command::PublishInterval(interval) => {
                self.config.publish_interval = interval;
                info!("Novo intervalo de publicação → {interval}");
                self.persist(store);
            }
            Command::Threshold {
                sensor,
                kind,
                value,
            } => {
                let descriptor = sensors
                    .sensors_mut()
                    .get_mut(sensor)
                    .ok_or_else(|| NodeError::invalid(format!("sensor #{sensor} inexistente")))?;
                let stored = self
                    .config
                    .thresholds
                    .entry(descriptor.config_key.clone())
                    .or_default();
                match kind {
                    ThresholdKind::Over => {
                        descriptor.over_threshold = value;
                        stored.over = Some(value);
                    }
                    ThresholdKind::Below => {
                        descriptor.below_threshold = value;
                        stored.below = Some(value);
                    }
                }
                info!("Novo threshold {kind:?} de {} → {value}", descriptor.name);
                self.persist(store);
            }
            Command::Named { index, arg } => {
                let descriptor = sensors
                    .commands_mut()
                    .get_mut(index)
                    .ok_or_else(|| NodeError::invalid(format!("comando #{index} inexistente")))?;
                info!("Comando: {}({arg})", descriptor.name);
                (descriptor.handler)(arg);
            }
        }
        Ok(())
    }

    fn persist(&self, store: &mut dyn ConfigStore) {
        if let Err(e) = store.save(&self.config) {
            warn!("Falha ao persistir configuração: {e}");
        }
    }
}

fn parse_message(payload: &[u8]) -> Result<InboundMessage> {
    serde_json::from_slice(payload)
        .map_err(|e| NodeError::invalid(format!("payload malformado: {e}")))
}

fn resolve(msg: &InboundMessage, sensors: &dyn SensorSubsystem) -> Result<Command> {
    let key = msg.key.as_str();
    match key {
        CMD_LEDS => bool_token(&msg.value)
            .map(Command::Led)
            .ok_or_else(|| NodeError::invalid("leds_toggle espera booleano")),
        CMD_REBOOT => Ok(if bool_token(&msg.value) == Some(true) {
            Command::Reboot
        } else {
            Command::RebootIgnored
        }),
        CMD_SENSOR => bool_token(&msg.value)
            .map(Command::EnableSensors)
            .ok_or_else(|| NodeError::invalid("enable_sensor espera booleano")),
        CMD_UPDATE_PERIOD => {
            let value = bounded_int(&msg.value, UPDATE_PERIOD_MIN, UPDATE_PERIOD_MAX)
                .ok_or_else(|| {
                    NodeError::invalid(format!(
                        "intervalo deve estar entre {UPDATE_PERIOD_MIN} e {UPDATE_PERIOD_MAX}"
                    ))
                })?;
            Ok(Command::PublishInterval(value))
        }
        _ => resolve_registry(key, &msg.value, sensors),
    }
}

fn resolve_registry(key: &str, value: &Value, sensors: &dyn SensorSubsystem) -> Result<Command> {
    if let Some((base, kind)) = split_threshold_key(key) {
        let matched = sensors
            .sensors()
            .iter()
            .enumerate()
            .find(|(_, s)| !s.config_key.is_empty() && s.config_key == base);

        if let Some((index, sensor)) = matched {
            let value = bounded_int(value, sensor.min, sensor.max).ok_or_else(|| {
                NodeError::invalid(format!(
                    "threshold de {} deve estar entre {} e {}",
                    sensor.name, sensor.min, sensor.max
                ))
            })?;
            return Ok(Command::Threshold {
                sensor: index,
                kind,
                value,
            });
        }
    }

    // Chave de sensor conhecida com sufixo desconhecido
    let sensor_prefixed = sensors
        .sensors()
        .iter()
        .any(|s| !s.config_key.is_empty() && key.starts_with(s.config_key.as_str()));
    if sensor_prefixed {
        return Err(NodeError::invalid(format!(
            "'{key}' deve terminar em {SUFFIX_OVER} ou {SUFFIX_BELOW}"
        )));
    }

    if let Some(index) = sensors.commands().iter().position(|c| c.name == key) {
        let arg = int_token(value)
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| NodeError::invalid(format!("{key} espera argumento inteiro")))?;
        return Ok(Command::Named { index, arg });
    }

    Err(NodeError::UnknownCommand(key.to_string()))
}

/// Separa `<config_key><sufixo>` em chave do sensor e tipo de threshold.
fn split_threshold_key(key: &str) -> Option<(&str, ThresholdKind)> {
    key.strip_suffix(SUFFIX_OVER)
        .map(|base| (base, ThresholdKind::Over))
        .or_else(|| {
            key.strip_suffix(SUFFIX_BELOW)
                .map(|base| (base, ThresholdKind::Below))
        })
}

/// `true`/`false` em JSON ou como texto exato.
fn bool_token(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s == "true" => Some(true),
        Value::String(s) if s == "false" => Some(false),
        _ => None,
    }
}

fn int_token(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn bounded_int(value: &Value, min: u16, max: u16) -> Option<u16> {
    let v = int_token(value)?;
    if v < i64::from(min) || v > i64::from(max) {
        return None;
    }
    u16::try_from(v).ok()
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoredThresholds;
    use crate::sensors::{CommandDescriptor, SensorDescriptor};
    use crate::testing::{MockDevice, MockSensors, MockStore, temperature_sensor};
    use std::sync::{Arc, Mutex};

    const TOPIC: &str = "v2/things/node/cmd";

    struct Fixture {
        dispatcher: Dispatcher,
        device: MockDevice,
        sensors: MockSensors,
        store: MockStore,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dispatcher: Dispatcher::new(NodeConfig::default(), TOPIC),
                device: MockDevice::default(),
                sensors: MockSensors::with_sensors(vec![temperature_sensor()]),
                store: MockStore::default(),
            }
        }

        fn send(&mut self, payload: &str) -> Result<Command> {
            self.dispatcher.dispatch(
                TOPIC,
                payload.as_bytes(),
                &mut self.device,
                &mut self.sensors,
                &mut self.store,
            )
        }
    }

    #[test]
    fn led_toggle_accepts_bool_and_text() {
        let mut f = Fixture::new();
        assert_eq!(f.send(r#"{"key":"leds_toggle","value":true}"#), Ok(Command::Led(true)));
        assert_eq!(f.device.led, Some(true));
        assert_eq!(f.send(r#"{"key":"leds_toggle","value":"false"}"#), Ok(Command::Led(false)));
        assert_eq!(f.device.led, Some(false));
    }

    #[test]
    fn led_toggle_is_case_sensitive() {
        let mut f = Fixture::new();
        assert!(matches!(
            f.send(r#"{"key":"leds_toggle","value":"TRUE"}"#),
            Err(NodeError::InvalidArgument(_))
        ));
        assert_eq!(f.device.led, None);
    }

    #[test]
    #[should_panic(expected = "hard reset")]
    fn reboot_true_resets() {
        let mut f = Fixture::new();
        let _ = f.send(r#"{"key":"reboot","value":true}"#);
    }

    #[test]
    fn reboot_other_tokens_are_noop() {
        let mut f = Fixture::new();
        for token in [r#"false"#, r#""yes""#, "1", r#""True""#] {
            let payload = format!(r#"{{"key":"reboot","value":{token}}}"#);
            assert_eq!(f.send(&payload), Ok(Command::RebootIgnored));
        }
        assert_eq!(f.device.led, None);
        assert_eq!(f.store.saves, 0);
        assert_eq!(f.dispatcher.config(), &NodeConfig::default());
    }

    #[test]
    fn enable_sensor_starts_and_stops() {
        let mut f = Fixture::new();
        f.send(r#"{"key":"enable_sensor","value":false}"#).unwrap();
        assert_eq!(f.sensors.running, Some(false));
        f.send(r#"{"key":"enable_sensor","value":"true"}"#).unwrap();
        assert_eq!(f.sensors.running, Some(true));
    }

    #[test]
    fn update_period_in_range_commits() {
        let mut f = Fixture::new();
        assert_eq!(
            f.send(r#"{"key":"update_period","value":30}"#),
            Ok(Command::PublishInterval(30))
        );
        assert_eq!(f.dispatcher.config().publish_interval, 30);
        assert_eq!(f.store.saves, 1);
    }

    #[test]
    fn update_period_accepts_name_field() {
        let mut f = Fixture::new();
        f.send(r#"{"name":"update_period","value":61}"#).unwrap();
        assert_eq!(f.dispatcher.config().publish_interval, 61);
    }

    #[test]
    fn update_period_out_of_range_is_rejected() {
        let mut f = Fixture::new();
        for value in ["700", "4", "-1", "\"abc\""] {
            let payload = format!(r#"{{"key":"update_period","value":{value}}}"#);
            assert!(matches!(f.send(&payload), Err(NodeError::InvalidArgument(_))));
        }
        assert_eq!(f.dispatcher.config(), &NodeConfig::default());
        assert_eq!(f.store.saves, 0);
    }

    #[test]
    fn update_period_bounds_are_inclusive() {
        let mut f = Fixture::new();
        f.send(r#"{"key":"update_period","value":5}"#).unwrap();
        f.send(r#"{"key":"update_period","value":"600"}"#).unwrap();
        assert_eq!(f.dispatcher.config().publish_interval, 600);
    }

    #[test]
    fn persistence_failure_is_tolerated() {
        let mut f = Fixture::new();
        f.store.fail = true;
        assert!(f.send(r#"{"key":"update_period","value":30}"#).is_ok());
        assert_eq!(f.dispatcher.config().publish_interval, 30);
    }

    #[test]
    fn threshold_suffix_selects_field() {
        let mut f = Fixture::new();
        assert_eq!(
            f.send(r#"{"key":"temperature_thresh","value":3500}"#),
            Ok(Command::Threshold {
                sensor: 0,
                kind: ThresholdKind::Over,
                value: 3500
            })
        );
        f.send(r#"{"key":"temperature_thresl","value":500}"#).unwrap();
        let s = &f.sensors.sensors[0];
        assert_eq!(s.over_threshold, 3500);
        assert_eq!(s.below_threshold, 500);
        assert_eq!(f.store.saves, 2);
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let mut f = Fixture::new();
        let before = f.sensors.sensors.clone();
        assert!(matches!(
            f.send(r#"{"key":"temperature_thresh","value":6000}"#),
            Err(NodeError::InvalidArgument(_))
        ));
        assert_eq!(f.sensors.sensors, before);
    }

    #[test]
    fn threshold_unknown_suffix_does_not_mutate() {
        let mut f = Fixture::new();
        let before = f.sensors.sensors.clone();
        assert!(matches!(
            f.send(r#"{"key":"temperature_limit","value":3000}"#),
            Err(NodeError::InvalidArgument(_))
        ));
        assert_eq!(f.sensors.sensors, before);
        assert_eq!(f.store.saves, 0);
    }

    fn keyed_sensor(key: &str) -> SensorDescriptor {
        SensorDescriptor {
            name: key.into(),
            config_key: key.into(),
            max: 10000,
            ..temperature_sensor()
        }
    }

    #[test]
    fn overlapping_config_keys_resolve_exactly() {
        let mut f = Fixture::new();
        f.sensors.sensors = vec![keyed_sensor("cpu"), keyed_sensor("ram"), keyed_sensor("cpu_temp")];

        assert_eq!(
            f.send(r#"{"key":"cpu_temp_thresh","value":7000}"#),
            Ok(Command::Threshold {
                sensor: 2,
                kind: ThresholdKind::Over,
                value: 7000
            })
        );
        f.send(r#"{"key":"cpu_thresl","value":200}"#).unwrap();

        assert_eq!(f.sensors.sensors[2].over_threshold, 7000);
        assert_eq!(f.sensors.sensors[0].over_threshold, 3000);
        assert_eq!(f.sensors.sensors[0].below_threshold, 200);
        assert_eq!(f.sensors.sensors[2].below_threshold, 1000);

        assert!(matches!(
            f.send(r#"{"key":"cpu_temp_limit","value":10}"#),
            Err(NodeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn threshold_change_is_stored_in_config() {
        let mut f = Fixture::new();
        f.send(r#"{"key":"temperature_thresh","value":3500}"#).unwrap();
        f.send(r#"{"key":"temperature_thresl","value":500}"#).unwrap();

        let expected = StoredThresholds {
            over: Some(3500),
            below: Some(500),
        };
        assert_eq!(f.dispatcher.config().thresholds.get("temperature"), Some(&expected));
        let saved = f.store.last.as_ref().unwrap();
        assert_eq!(saved.thresholds.get("temperature"), Some(&expected));
    }

    #[test]
    fn stored_thresholds_are_restored_within_range() {
        let mut config = NodeConfig::default();
        config.thresholds.insert(
            "temperature".into(),
            StoredThresholds {
                over: Some(4200),
                below: Some(6000),
            },
        );
        let dispatcher = Dispatcher::new(config, TOPIC);
        let mut sensors = MockSensors::with_sensors(vec![temperature_sensor()]);
        dispatcher.restore_thresholds(&mut sensors);

        assert_eq!(sensors.sensors[0].over_threshold, 4200);
        // 6000 está fora de [0, 5000]
        assert_eq!(sensors.sensors[0].below_threshold, 1000);
    }

    #[test]
    fn named_command_invokes_handler() {
        let mut f = Fixture::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        f.sensors.commands.push(CommandDescriptor::new("relay", move |arg| {
            sink.lock().unwrap().push(arg);
        }));

        assert_eq!(
            f.send(r#"{"key":"relay","value":2}"#),
            Ok(Command::Named { index: 0, arg: 2 })
        );
        f.send(r#"{"key":"relay","value":"7"}"#).unwrap();
        assert_eq!(*calls.lock().unwrap(), vec![2, 7]);
    }

    #[test]
    fn builtin_keywords_take_priority_over_registry() {
        let mut f = Fixture::new();
        let calls = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&calls);
        f.sensors.commands.push(CommandDescriptor::new(CMD_LEDS, move |_| {
            *sink.lock().unwrap() += 1;
        }));
        f.send(r#"{"key":"leds_toggle","value":true}"#).unwrap();
        assert_eq!(*calls.lock().unwrap(), 0);
        assert_eq!(f.device.led, Some(true));
    }

    #[test]
    fn unknown_key_is_reported() {
        let mut f = Fixture::new();
        assert_eq!(
            f.send(r#"{"key":"self_destruct","value":1}"#),
            Err(NodeError::UnknownCommand("self_destruct".into()))
        );
    }

    #[test]
    fn malformed_and_empty_payloads_are_invalid() {
        let mut f = Fixture::new();
        for payload in ["", "not json", r#"{"value":true}"#, r#"{"key":"reboot"}"#, "[1,2]"] {
            assert!(
                matches!(f.send(payload), Err(NodeError::InvalidArgument(_))),
                "payload {payload:?}"
            );
        }
    }

    #[test]
    fn wrong_topic_is_ignored() {
        let mut f = Fixture::new();
        let result = f.dispatcher.dispatch(
            "v2/things/other/cmd",
            br#"{"key":"leds_toggle","value":true}"#,
            &mut f.device,
            &mut f.sensors,
            &mut f.store,
        );
        assert!(matches!(result, Err(NodeError::InvalidArgument(_))));
        assert_eq!(f.device.led, None);
    }
}
