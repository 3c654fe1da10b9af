//! Loop de eventos do nó.
//!
//! Um único dono de todo o estado; cada [`NodeEvent`] é tratado até o fim
//! antes do próximo. A thread de rede do agente nunca toca neste estado, só
//! entrega eventos por channel.

use crate::config::NodeConfig;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::platform::{ConfigStore, DeviceControl, NetworkLayer, SensorSubsystem, Transport};
use crate::publisher::{LinkStatus, Publisher};
use crate::rssi::ParentTracker;
use crate::sensors::SensorReading;
use crate::topics::Topics;
use std::net::Ipv6Addr;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Eventos entregues ao nó.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    Connected,
    Disconnected,
    /// Tick de amostragem com as leituras atuais
    Sample(Vec<SensorReading>),
    /// Cruzamento de threshold
    Alarm(SensorReading),
    /// Mensagem recebida em um tópico assinado
    Inbound { topic: String, payload: Vec<u8> },
    /// Resposta a um probe
    EchoReply { source: Ipv6Addr },
}

/// Colaboradores externos do nó.
#[derive(Debug)]
pub struct Platform<T, S, D, N, C> {
    pub transport: T,
    pub sensors: S,
    pub device: D,
    pub network: N,
    pub store: C,
}

/// Nó: dispatcher, publisher e tracker ligados aos colaboradores.
#[derive(Debug)]
pub struct Node<T, S, D, N, C> {
    pub platform: Platform<T, S, D, N, C>,
    topics: Topics,
    dispatcher: Dispatcher,
    publisher: Publisher,
    tracker: ParentTracker,
    started_at: Instant,
}

impl<T, S, D, N, C> Node<T, S, D, N, C>
where
    T: Transport,
    S: SensorSubsystem,
    D: DeviceControl,
    N: NetworkLayer,
    C: ConfigStore,
{
    /// Calcula os tópicos e monta os componentes.
    pub fn new(
        config: NodeConfig,
        mut platform: Platform<T, S, D, N, C>,
        now: Instant,
    ) -> Result<Self> {
        let topics = Topics::new(&config)?;
        let publisher = Publisher::new(
            topics.publish(),
            config.device_id.as_str(),
            Duration::from_secs(config.alarm_cooldown_secs),
        );
        let dispatcher = Dispatcher::new(config, topics.command());
        dispatcher.restore_thresholds(&mut platform.sensors);

        info!("Client ID:  {}", dispatcher.config().client_id);
        info!("Data topic: {}", topics.publish());
        info!("Cmd topic:  {}", topics.command());

        Ok(Self {
            platform,
            topics,
            dispatcher,
            publisher,
            tracker: ParentTracker::new(),
            started_at: now,
        })
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn config(&self) -> &NodeConfig {
        self.dispatcher.config()
    }

    pub fn rssi(&self) -> i32 {
        self.tracker.rssi()
    }

    /// Trata um evento até o fim.
    pub fn handle(&mut self, event: NodeEvent, now: Instant) -> Result<()> {
        match event {
            NodeEvent::Connected => self.on_connected(),
            NodeEvent::Disconnected => {
                info!("Transporte desconectado, desabilitando sensores");
                self.platform.sensors.stop();
                Ok(())
            }
            NodeEvent::Sample(readings) => {
                let link = LinkStatus {
                    uptime: now.saturating_duration_since(self.started_at),
                    relay: self.platform.network.preferred_relay(),
                    rssi: self.tracker.rssi(),
                };
                let interval = self.dispatcher.config().publish_interval;
                self.publisher
                    .on_sample(&readings, interval, &link, &mut self.platform.transport)
                    .map(|_| ())
            }
            NodeEvent::Alarm(reading) => self
                .publisher
                .on_alarm(&reading, now, &mut self.platform.transport)
                .map(|_| ()),
            NodeEvent::Inbound { topic, payload } => self
                .dispatcher
                .dispatch(
                    &topic,
                    &payload,
                    &mut self.platform.device,
                    &mut self.platform.sensors,
                    &mut self.platform.store,
                )
                .map(|_| ()),
            NodeEvent::EchoReply { source } => {
                self.tracker.on_echo_reply(source, &self.platform.network);
                Ok(())
            }
        }
    }

    fn on_connected(&mut self) -> Result<()> {
        info!("Transporte conectado");
        self.publisher.reset_interval();
        self.tracker.probe(&mut self.platform.network);

        let subscribed = self.platform.transport.subscribe(self.topics.command());
        if let Err(e) = &subscribed {
            warn!("Falha ao assinar {}: {e}", self.topics.command());
        }

        self.platform.sensors.start();
        subscribed
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
