//! # Node Agent
//!
//! Executa o núcleo do nó em um host: lê sensores via `sysinfo`, publica
//! telemetria e alarmes para um gateway UDP e aplica comandos recebidos.
//!
//! ## Uso
//! ```bash
//! node_agent                       # config.toml ao lado do executável
//! RUST_LOG=debug node_agent        # logs detalhados
//! ```

mod host;
mod monitor;
mod net_thread;
mod transport;

use crossbeam_channel::{RecvTimeoutError, bounded};
use host::{ConsoleDevice, SimulatedNetwork, TomlStore};
use monitor::HostSensors;
use node_core::config::AppConfig;
use node_core::node::{Node, NodeEvent, Platform};
use node_core::topics::{client_id_from_link_addr, parse_link_address};
use std::net::{Ipv6Addr, UdpSocket};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use transport::UdpTransport;

type HostNode = Node<UdpTransport, HostSensors, ConsoleDevice, SimulatedNetwork, TomlStore>;

fn main() {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // ── Carregar config ──
    let config_path = AppConfig::default_path();
    let mut config = AppConfig::load(&config_path);

    // Salva config padrão se não existir
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    for problem in config.validate() {
        warn!("Config: {problem}");
    }

    if config.node.client_id.is_empty() {
        if let Some(addr) = parse_link_address(&config.agent.link_address) {
            config.node.client_id = client_id_from_link_addr(&addr);
        }
    }

    let agent = config.agent.clone();
    let sampling = Duration::from_secs_f64(agent.sampling_interval_secs.clamp(0.1, 60.0));
    let relay = agent.relay_address.parse::<Ipv6Addr>().ok();

    // ── Socket UDP ──
    let bind_ip = if agent.bind_ip.is_empty() {
        "0.0.0.0"
    } else {
        agent.bind_ip.as_str()
    };
    let sock = UdpSocket::bind(format!("{bind_ip}:{}", agent.listen_port))
        .expect("Falha ao criar socket UDP");
    let recv_sock = sock.try_clone().expect("Falha ao clonar socket UDP");
    let gateway = format!("{}:{}", agent.gateway_ip, agent.gateway_port);

    // ── Channel de eventos + thread de rede ──
    let (tx, rx) = bounded::<NodeEvent>(64);
    net_thread::spawn_receiver_thread(recv_sock, tx.clone());

    let mut transport = UdpTransport::new(sock, gateway.clone());
    transport.set_connected(true);

    let platform = Platform {
        transport,
        sensors: HostSensors::new(),
        device: ConsoleDevice::default(),
        network: SimulatedNetwork::new(relay, agent.link_rssi, tx.clone()),
        store: TomlStore::new(config_path.clone(), config.clone()),
    };

    let started = Instant::now();
    let mut node = match Node::new(config.node.clone(), platform, started) {
        Ok(node) => node,
        Err(e) => {
            error!("Falha ao iniciar o nó: {e}");
            std::process::exit(1);
        }
    };

    // ── Banner ──
    println!();
    println!("══════════════════════════════════════════════");
    println!("   ⚡ MESH NODE AGENT – ATIVO");
    println!("══════════════════════════════════════════════");
    println!("  Gateway:     {gateway}");
    println!("  Client ID:   {}", node.config().client_id);
    println!("  Data topic:  {}", node.topics().publish());
    println!("  Cmd topic:   {}", node.topics().command());
    println!("  Amostragem:  {:.1}s", sampling.as_secs_f64());
    println!("  Protocolo:   bincode v{}", node_core::PROTOCOL_VERSION);
    println!("══════════════════════════════════════════════");
    println!();

    deliver(&mut node, NodeEvent::Connected);

    // ── Loop principal ──
    let mut next_tick = Instant::now() + sampling;
    loop {
        let wait = next_tick.saturating_duration_since(Instant::now());
        match rx.recv_timeout(wait) {
            Ok(event) => deliver(&mut node, event),
            Err(RecvTimeoutError::Timeout) => {
                // Tick perdido não é compensado
                next_tick = Instant::now() + sampling;
                sample(&mut node);
            }
            Err(RecvTimeoutError::Disconnected) => {
                error!("Channel de eventos fechado, encerrando");
                break;
            }
        }
    }

    deliver(&mut node, NodeEvent::Disconnected);
}

fn sample(node: &mut HostNode) {
    let Some(collected) = node.platform.sensors.collect() else {
        return;
    };
    for alarm in collected.alarms {
        deliver(node, NodeEvent::Alarm(alarm));
    }
    info!(
        "Amostra: {}",
        collected
            .readings
            .iter()
            .map(|r| format!("{}={}", r.name, r.value))
            .collect::<Vec<_>>()
            .join(" ")
    );
    deliver(node, NodeEvent::Sample(collected.readings));
}

fn deliver(node: &mut HostNode, event: NodeEvent) {
    if let Err(e) = node.handle(event, Instant::now()) {
        debug!("Evento não aplicado: {e}");
    }
}
