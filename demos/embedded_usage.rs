//! Minimal embedding example for netconverge-core
//!
//! Converges a small lab of simulated devices: an Arista leaf with a pending
//! change, a generic netmiko edge router that is already converged, and a
//! Junos core router reconciled in dry-run mode. The application owns the
//! executors, the registry and the run mode.
//!
//! Usage: `embedded_usage [config.json]`

use anyhow::Context;
use netconverge_core::traits::{CommandExecutor, ExecutorCall, ops, output_text};
use netconverge_core::{
    BackendRegistry, ConfigReconciler, DeviceMetadata, FleetJob, Monitor, MonitorConfig,
    MonitoredCall, NetConvergeConfig, ReconcileRequest, reconcile_fleet,
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::env;
use std::sync::{Arc, Mutex};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

/// Simulated CLI device speaking `configure session`
struct LabSwitch {
    rendered: String,
    running: Mutex<Vec<String>>,
    sessions: Mutex<HashMap<String, Vec<String>>>,
    current: Mutex<Option<String>>,
}

impl LabSwitch {
    fn new(running: &str, rendered: &str) -> Self {
        Self {
            rendered: rendered.to_string(),
            running: Mutex::new(running.lines().map(str::to_string).collect()),
            sessions: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
        }
    }

    fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn session_config(&self, name: &str) -> String {
        let mut lines = Self::lock(&self.running).clone();
        if let Some(pending) = Self::lock(&self.sessions).get(name) {
            for line in pending {
                if !lines.contains(line) {
                    lines.push(line.clone());
                }
            }
        }
        lines.join("\n")
    }

    fn send_config(&self, commands: Vec<String>) -> String {
        let Some(name) = Self::lock(&self.current).take() else {
            return "% Not in a configuration session".to_string();
        };

        match commands.as_slice() {
            [keyword] if keyword == "commit" => {
                let config = self.session_config(&name);
                *Self::lock(&self.running) = config.lines().map(str::to_string).collect();
                Self::lock(&self.sessions).remove(&name);
            }
            [keyword] if keyword == "abort" => {
                Self::lock(&self.sessions).remove(&name);
            }
            _ => {
                Self::lock(&self.sessions)
                    .entry(name)
                    .or_default()
                    .extend(commands.iter().cloned());
            }
        }
        commands.join("\n")
    }
}

#[async_trait::async_trait]
impl CommandExecutor for LabSwitch {
    async fn execute(&self, call: &ExecutorCall) -> netconverge_core::Result<Value> {
        let text = match call.operation.as_str() {
            ops::TEMPLATE_RENDER => self.rendered.clone(),
            ops::NETMIKO_ENTER_CONFIG_MODE => {
                let command = call.kwargs.get("config_command").map(output_text).unwrap_or_default();
                let name = command.trim_start_matches("configure session ").to_string();
                *Self::lock(&self.current) = Some(name);
                command
            }
            ops::NETMIKO_SEND_CONFIG => {
                let commands: Vec<String> = call
                    .kwargs
                    .get("config_commands")
                    .cloned()
                    .map(serde_json::from_value)
                    .transpose()?
                    .unwrap_or_default();
                self.send_config(commands)
            }
            ops::NETMIKO_SEND_COMMAND => {
                let command = call.args.first().map(output_text).unwrap_or_default();
                match command.strip_prefix("show session-config named ") {
                    Some(rest) => self.session_config(rest.trim_end_matches(" | no-more")),
                    None => Self::lock(&self.running).join("\n"),
                }
            }
            other => {
                return Err(netconverge_core::Error::execution(other, "unknown operation"));
            }
        };
        Ok(Value::String(text))
    }

    fn supports(&self, operation: &str) -> bool {
        operation == ops::TEMPLATE_RENDER || operation.starts_with("netmiko.")
    }
}

/// Simulated Junos device with a single candidate buffer
struct LabRouter {
    rendered: String,
    active: Mutex<String>,
    candidate: Mutex<Option<String>>,
}

impl LabRouter {
    fn new(active: &str, rendered: &str) -> Self {
        Self {
            rendered: rendered.to_string(),
            active: Mutex::new(active.to_string()),
            candidate: Mutex::new(None),
        }
    }
}

#[async_trait::async_trait]
impl CommandExecutor for LabRouter {
    async fn execute(&self, call: &ExecutorCall) -> netconverge_core::Result<Value> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        let mut candidate = self.candidate.lock().unwrap_or_else(|e| e.into_inner());

        let reply = match call.operation.as_str() {
            ops::TEMPLATE_RENDER => json!(self.rendered),
            ops::JUNOS_LOAD => {
                *candidate = call.args.first().map(output_text);
                json!({"out": true, "message": "Successfully loaded configuration"})
            }
            ops::JUNOS_DIFF => match candidate.as_deref() {
                Some(pending) if pending != active.as_str() => {
                    json!({"out": true, "message": format!("-  {}\n+  {}", active, pending)})
                }
                _ => json!({"out": true, "message": null}),
            },
            ops::JUNOS_COMMIT => {
                if let Some(pending) = candidate.take() {
                    *active = pending;
                }
                json!({"out": true, "message": "Commit successful"})
            }
            ops::JUNOS_ROLLBACK => {
                *candidate = None;
                json!({"out": true, "message": "Rollback successful"})
            }
            ops::JUNOS_RPC => json!({"rpc_reply": {"configuration": {"system": active.clone()}}}),
            other => {
                return Err(netconverge_core::Error::execution(other, "unknown operation"));
            }
        };
        Ok(reply)
    }
}

fn log_level() -> Level {
    match env::var("NETCONVERGE_LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(log_level()).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    println!("=== Embedded netconverge-core Example ===\n");

    let config = match env::args().nth(1) {
        Some(path) => NetConvergeConfig::from_file(&path)
            .await
            .with_context(|| format!("failed to load {}", path))?,
        None => NetConvergeConfig::default(),
    };

    let registry = BackendRegistry::new();
    netconverge_backend_netmiko::register(&registry);
    netconverge_backend_junos::register(&registry);
    info!("Registered backends: {:?}", registry.list_backends());

    let leaf: Arc<dyn CommandExecutor> = Arc::new(LabSwitch::new(
        "hostname leaf1\nntp server 10.0.0.1",
        "ntp server 10.0.0.1\nntp server 10.0.0.2",
    ));
    let edge: Arc<dyn CommandExecutor> = Arc::new(LabSwitch::new(
        "hostname edge1\nip domain-name lab",
        "ip domain-name lab",
    ));
    let core: Arc<dyn CommandExecutor> = Arc::new(LabRouter::new(
        "host-name core1;",
        "host-name core1-new;",
    ));

    let devices = vec![
        ("leaf1", DeviceMetadata::netmiko("arista_eos"), Arc::clone(&leaf), false),
        ("edge1", DeviceMetadata::netmiko("cisco_ios"), Arc::clone(&edge), false),
        ("core1", DeviceMetadata::junos(), Arc::clone(&core), true),
    ];

    for pass in 1..=2 {
        println!("{}. Reconciliation pass", pass);

        let mut jobs = Vec::new();
        for (name, device, executor, dry_run) in &devices {
            let (reconciler, mut event_rx) =
                ConfigReconciler::for_device(&registry, device, Arc::clone(executor), &config)?;
            tokio::spawn(async move {
                while let Some(event) = event_rx.recv().await {
                    tracing::debug!("[Event] {:?}", event);
                }
            });

            let request = ReconcileRequest::new(*name, device.clone(), format!("{}.j2", name))
                .with_dry_run(*dry_run);
            jobs.push(FleetJob::new(*name, reconciler, request));
        }

        for (name, result) in reconcile_fleet(jobs).await {
            match result {
                Ok(result) => println!("   {}: {:?} - {}", name, result.outcome, result.comment),
                Err(e) => println!("   {}: failed - {}", name, e),
            }
        }
        println!();
    }

    println!("3. Running configuration report\n");
    let mut backends = Vec::new();
    for (name, device, executor, _) in &devices {
        backends.push((*name, registry.create_backend(device, Arc::clone(executor), &config.backend)?));
    }
    let report = netconverge_core::report::running_config_report(
        backends.iter().map(|(name, backend)| (*name, backend.as_ref())),
    )
    .await;
    println!("{}", report);

    println!("4. Monitor poll");
    let monitor = Monitor::new(
        MonitorConfig {
            calls: vec![MonitoredCall::new(ops::NETMIKO_SEND_COMMAND).arg("show running-config")],
        },
        Arc::clone(&leaf),
    )?;
    for event in monitor.poll_once().await {
        println!("   [{}] {}", event.operation, output_text(&event.ret));
    }

    println!("\n=== Embedding Successful ===");
    Ok(())
}
