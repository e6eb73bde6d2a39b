//! In-process election and lock simulations
//!
//! Every participant gets its own session against one shared
//! [`MemoryEnsemble`], so the runs exercise the same protocol a set of
//! separate processes would.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};
use turnstile_coordination::{
    CoordinationClient, CoordinationConfig, CoordinationError, MemoryEnsemble, MemorySession,
};

/// One participant reaching leadership or the lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquisition {
    pub participant: usize,
    pub identity: String,
    pub node: String,
    pub waited: Duration,
}

/// Outcome of a simulation run, acquisitions in the order they happened
#[derive(Debug, Default)]
pub struct SimulationReport {
    pub acquisitions: Vec<Acquisition>,
    pub timed_out: Vec<usize>,
}

impl std::fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (rank, acquisition) in self.acquisitions.iter().enumerate() {
            writeln!(
                f,
                "{:>3}. participant {:<3} {:<24} {} (waited {:?})",
                rank + 1,
                acquisition.participant,
                acquisition.identity,
                acquisition.node,
                acquisition.waited
            )?;
        }
        if !self.timed_out.is_empty() {
            writeln!(f, "timed out: {:?}", self.timed_out)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Elect,
    Lock,
}

fn participant_session(ensemble: &Arc<MemoryEnsemble>, config: &CoordinationConfig) -> MemorySession {
    ensemble.connect_with_timeout(config.session_timeout())
}

fn participant_client(
    ensemble: &Arc<MemoryEnsemble>,
    config: &CoordinationConfig,
    participant: usize,
) -> anyhow::Result<CoordinationClient> {
    let mut config = config.clone();
    if config.identity.is_empty() {
        config.identity = format!("participant-{}", participant);
    } else {
        config.identity = format!("{}-{}", config.identity, participant);
    }
    let session = participant_session(ensemble, &config);
    Ok(CoordinationClient::new(Arc::new(session), config)?)
}

/// Run `contenders` campaigns on `path`; each leader holds for `hold` then resigns.
pub async fn run_election(
    ensemble: &Arc<MemoryEnsemble>,
    config: &CoordinationConfig,
    contenders: usize,
    path: &str,
    hold: Duration,
) -> anyhow::Result<SimulationReport> {
    run(ensemble, config, Mode::Elect, contenders, path, hold).await
}

/// Run `workers` lockers on `path`; each holder keeps the lock for `hold`.
pub async fn run_lock(
    ensemble: &Arc<MemoryEnsemble>,
    config: &CoordinationConfig,
    workers: usize,
    path: &str,
    hold: Duration,
) -> anyhow::Result<SimulationReport> {
    run(ensemble, config, Mode::Lock, workers, path, hold).await
}

async fn run(
    ensemble: &Arc<MemoryEnsemble>,
    config: &CoordinationConfig,
    mode: Mode,
    participants: usize,
    path: &str,
    hold: Duration,
) -> anyhow::Result<SimulationReport> {
    let report = Arc::new(Mutex::new(SimulationReport::default()));
    let mut handles = Vec::with_capacity(participants);

    for participant in 0..participants {
        let client = participant_client(ensemble, config, participant)?;
        let report = report.clone();
        let path = path.to_string();
        let timeout = config.campaign_timeout();

        handles.push(tokio::spawn(async move {
            let started = Instant::now();
            let acquired = match mode {
                Mode::Elect => client.campaign(&path, timeout).await,
                Mode::Lock => client.lock(&path).await,
            };

            let node = match acquired {
                Ok(node) => node,
                Err(CoordinationError::Timeout { .. }) => {
                    warn!(participant, "Gave up waiting");
                    report.lock().await.timed_out.push(participant);
                    return Ok(());
                }
                Err(e) => {
                    warn!(participant, code = e.code().code, error = %e, "Participant failed");
                    return Err(e);
                }
            };

            report.lock().await.acquisitions.push(Acquisition {
                participant,
                identity: client.identity().to_string(),
                node: node.clone(),
                waited: started.elapsed(),
            });
            info!(participant, node = %node, "Holding");
            tokio::time::sleep(hold).await;

            match mode {
                Mode::Elect => client.resign(&path).await,
                Mode::Lock => client.unlock(&path).await,
            }
        }));
    }

    for handle in handles {
        handle.await??;
    }

    let report = std::mem::take(&mut *report.lock().await);
    Ok(report)
}
