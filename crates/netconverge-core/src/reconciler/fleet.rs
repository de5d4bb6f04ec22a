//! Concurrent reconciliation across devices
//!
//! One tokio task per device. Jobs are grouped by device key; a device's
//! jobs run one after another inside its task, so its session calls stay
//! serialized while different devices progress in parallel.

use std::collections::HashMap;
use tracing::{debug, error};

use super::{ConfigReconciler, ReconcileRequest};
use crate::error::{Error, Result};
use crate::types::ReconcileResult;

/// One convergence target on one device
pub struct FleetJob {
    /// Identity of the device the job talks to
    pub device: String,
    pub reconciler: ConfigReconciler,
    pub request: ReconcileRequest,
}

impl FleetJob {
    pub fn new(
        device: impl Into<String>,
        reconciler: ConfigReconciler,
        request: ReconcileRequest,
    ) -> Self {
        Self {
            device: device.into(),
            reconciler,
            request,
        }
    }
}

/// Jobs sharing a device, with their input positions
struct DeviceQueue {
    device: String,
    jobs: Vec<(usize, FleetJob)>,
}

/// Reconcile many devices concurrently
///
/// Jobs with the same device key never overlap: they run sequentially, in
/// input order, within one task. Results are keyed by request name and come
/// back in input order.
pub async fn reconcile_fleet(jobs: Vec<FleetJob>) -> Vec<(String, Result<ReconcileResult>)> {
    let total = jobs.len();
    let mut queues: Vec<DeviceQueue> = Vec::new();
    let mut by_device: HashMap<String, usize> = HashMap::new();

    for (position, job) in jobs.into_iter().enumerate() {
        let index = *by_device.entry(job.device.clone()).or_insert_with(|| {
            queues.push(DeviceQueue {
                device: job.device.clone(),
                jobs: Vec::new(),
            });
            queues.len() - 1
        });
        queues[index].jobs.push((position, job));
    }

    let mut handles = Vec::with_capacity(queues.len());
    for queue in queues {
        let targets: Vec<(usize, String)> = queue
            .jobs
            .iter()
            .map(|(position, job)| (*position, job.request.name.clone()))
            .collect();

        debug!(
            "Spawning reconciliation task for {} ({} job(s))",
            queue.device,
            targets.len()
        );
        let handle = tokio::spawn(async move {
            let mut outcomes = Vec::with_capacity(queue.jobs.len());
            for (position, job) in queue.jobs {
                let result = job.reconciler.reconcile(&job.request).await;
                outcomes.push((position, job.request.name, result));
            }
            outcomes
        });
        handles.push((queue.device, targets, handle));
    }

    let mut slots: Vec<Option<(String, Result<ReconcileResult>)>> =
        (0..total).map(|_| None).collect();

    for (device, targets, handle) in handles {
        match handle.await {
            Ok(outcomes) => {
                for (position, name, result) in outcomes {
                    slots[position] = Some((name, result));
                }
            }
            Err(e) => {
                error!("Reconciliation task for {} did not complete: {}", device, e);
                for (position, name) in targets {
                    slots[position] = Some((
                        name,
                        Err(Error::Other(format!(
                            "reconciliation task for {} did not complete: {}",
                            device, e
                        ))),
                    ));
                }
            }
        }
    }

    slots.into_iter().flatten().collect()
}
