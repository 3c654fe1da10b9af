//! Sensores do host via `sysinfo`.
//!
//! Faz o papel do subsistema de sensores do nó: mantém o registro de
//! descritores, converte as métricas do host em valores de ponto fixo e
//! sinaliza alarmes quando um valor sai da janela `[below, over]`.

use node_core::platform::SensorSubsystem;
use node_core::sensors::{CommandDescriptor, SensorDescriptor, SensorReading};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use sysinfo::{Components, CpuRefreshKind, Disks, MemoryRefreshKind, RefreshKind, System};
use tracing::{debug, info};

/// Maior janela de média aceita pelo comando `averaging`.
pub const MAX_AVERAGING: u32 = 16;

const CPU: usize = 0;
const RAM: usize = 1;
const CPU_TEMP: usize = 2;
const DISK: usize = 3;

/// Resultado de uma amostragem.
#[derive(Debug, Default)]
pub struct Collected {
    pub readings: Vec<SensorReading>,
    pub alarms: Vec<SensorReading>,
}

/// Subsistema de sensores do host.
pub struct HostSensors {
    sys: System,
    disks: Disks,
    components: Components,
    running: bool,
    descriptors: Vec<SensorDescriptor>,
    commands: Vec<CommandDescriptor>,
    window: Arc<AtomicU32>,
    history: Vec<VecDeque<u16>>,
    alarming: Vec<bool>,
}

impl HostSensors {
    pub fn new() -> Self {
        let sys = System::new_with_specifics(
            RefreshKind::nothing()
                .with_cpu(CpuRefreshKind::everything())
                .with_memory(MemoryRefreshKind::everything()),
        );

        let descriptors = default_descriptors();
        let window = Arc::new(AtomicU32::new(1));
        let handler_window = Arc::clone(&window);
        let commands = vec![CommandDescriptor::new("averaging", move |samples| {
            let samples = samples.clamp(1, MAX_AVERAGING as i32) as u32;
            handler_window.store(samples, Ordering::Relaxed);
            info!("Média móvel dos sensores → {samples} amostras");
        })];

        Self {
            sys,
            disks: Disks::new_with_refreshed_list(),
            components: Components::new_with_refreshed_list(),
            running: false,
            history: vec![VecDeque::new(); descriptors.len()],
            alarming: vec![false; descriptors.len()],
            descriptors,
            commands,
            window,
        }
    }

    /// Atualiza os valores. Retorna `None` com o subsistema parado.
    pub fn collect(&mut self) -> Option<Collected> {
        if !self.running {
            return None;
        }

        self.sys.refresh_cpu_all();
        self.sys.refresh_memory();
        self.components.refresh(true);
        self.disks.refresh(true);

        let raw = [
            (CPU, self.sys.global_cpu_usage()),
            (RAM, self.ram_percent()),
            (CPU_TEMP, self.cpu_temp_from_components()),
            (DISK, self.disk_used_percent()),
        ];

        let window = self.window.load(Ordering::Relaxed) as usize;
        let mut collected = Collected::default();
        for (index, value) in raw {
            let descriptor = &mut self.descriptors[index];
            let sample = to_fixed(value, descriptor.precision);
            descriptor.value = moving_average(&mut self.history[index], sample, window);

            let now_alarming = descriptor.is_alarming();
            if now_alarming && !self.alarming[index] {
                debug!("{} fora da janela: {}", descriptor.name, descriptor.value);
                collected.alarms.push(descriptor.reading());
            }
            self.alarming[index] = now_alarming;
            collected.readings.push(descriptor.reading());
        }

        Some(collected)
    }

    /// Busca a temperatura da CPU nos components do sysinfo.
    fn cpu_temp_from_components(&self) -> f32 {
        let mut temp = 0.0_f32;
        for comp in self.components.iter() {
            let label = comp.label().to_lowercase();
            if label.contains("cpu")
                || label.contains("tctl")
                || label.contains("tdie")
                || label.contains("package")
                || label.contains("core")
            {
                if let Some(t) = comp.temperature() {
                    if t > temp && t < 150.0 {
                        temp = t;
                    }
                }
            }
        }
        temp
    }

    fn ram_percent(&self) -> f32 {
        let total = self.sys.total_memory() as f64;
        let used = self.sys.used_memory() as f64;
        if total > 0.0 {
            (used / total * 100.0) as f32
        } else {
            0.0
        }
    }

    fn disk_used_percent(&self) -> f32 {
        let (total, available) = self.disks.iter().fold((0u64, 0u64), |(t, a), d| {
            (t + d.total_space(), a + d.available_space())
        });
        if total > 0 {
            ((total - available) as f64 / total as f64 * 100.0) as f32
        } else {
            0.0
        }
    }
}

impl SensorSubsystem for HostSensors {
    fn start(&mut self) {
        if !self.running {
            info!("Sensores do host iniciados");
        }
        self.running = true;
    }

    fn stop(&mut self) {
        if self.running {
            info!("Sensores do host parados");
        }
        self.running = false;
    }

    fn sensors(&self) -> &[SensorDescriptor] {
        &self.descriptors
    }

    fn sensors_mut(&mut self) -> &mut [SensorDescriptor] {
        &mut self.descriptors
    }

    fn commands(&self) -> &[CommandDescriptor] {
        &self.commands
    }

    fn commands_mut(&mut self) -> &mut [CommandDescriptor] {
        &mut self.commands
    }
}

fn default_descriptors() -> Vec<SensorDescriptor> {
    let percent = |name: &str, over: u16| SensorDescriptor {
        name: name.into(),
        config_key: name.into(),
        min: 0,
        max: 10000,
        over_threshold: over,
        below_threshold: 0,
        value: 0,
        precision: 100,
    };
    vec![
        percent("cpu", 9000),
        percent("ram", 9000),
        SensorDescriptor {
            name: "cpu_temp".into(),
            config_key: "cpu_temp".into(),
            min: 0,
            max: 12000,
            over_threshold: 8500,
            below_threshold: 0,
            value: 0,
            precision: 100,
        },
        percent("disk", 9500),
    ]
}

/// Converte uma métrica em valor bruto de ponto fixo.
fn to_fixed(value: f32, precision: u16) -> u16 {
    let scale = f32::from(precision.max(1));
    (value * scale).round().clamp(0.0, f32::from(u16::MAX)) as u16
}

fn moving_average(history: &mut VecDeque<u16>, sample: u16, window: usize) -> u16 {
    history.push_back(sample);
    while history.len() > window.max(1) {
        history.pop_front();
    }
    let sum: u32 = history.iter().map(|&v| u32::from(v)).sum();
    (sum / history.len() as u32) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_conversion_clamps() {
        assert_eq!(to_fixed(23.456, 100), 2346);
        assert_eq!(to_fixed(-4.0, 100), 0);
        assert_eq!(to_fixed(1.0e9, 100), u16::MAX);
        assert_eq!(to_fixed(42.4, 0), 42);
    }

    #[test]
    fn moving_average_respects_window() {
        let mut history = VecDeque::new();
        assert_eq!(moving_average(&mut history, 100, 2), 100);
        assert_eq!(moving_average(&mut history, 300, 2), 200);
        assert_eq!(moving_average(&mut history, 500, 2), 400);
        assert_eq!(moving_average(&mut history, 10, 1), 10);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn stopped_subsystem_produces_nothing() {
        let mut sensors = HostSensors::new();
        assert!(sensors.collect().is_none());
        sensors.start();
        let collected = sensors.collect().unwrap();
        assert_eq!(collected.readings.len(), sensors.sensors().len());
    }

    #[test]
    fn averaging_command_updates_window() {
        let mut sensors = HostSensors::new();
        (sensors.commands_mut()[0].handler)(99);
        assert_eq!(sensors.window.load(Ordering::Relaxed), MAX_AVERAGING);
        (sensors.commands_mut()[0].handler)(-3);
        assert_eq!(sensors.window.load(Ordering::Relaxed), 1);
    }
}
