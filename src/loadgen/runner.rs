//! Simulated users.
//!
//! Users are spawned gradually (`spawn_rate` per second) up to `users`.
//! Each one loops: pick a task, GET it, record the outcome, wait a random
//! think time. The run ends when `run_time` elapses or shutdown fires; users
//! finish the request they are in and exit.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinSet;
use url::Url;

use crate::loadgen::stats::{LoadReport, TaskStats};
use crate::loadgen::task::{default_tasks, Task, TaskPicker};
use crate::loadgen::LoadError;

/// Load run parameters.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Base URL of the app under test.
    pub host: String,
    /// Number of concurrent users at full ramp.
    pub users: usize,
    /// Users started per second.
    pub spawn_rate: f64,
    pub run_time: Duration,
    /// Think time between requests, sampled uniformly from this range.
    pub wait_min: Duration,
    pub wait_max: Duration,
    pub request_timeout: Duration,
    pub tasks: Vec<Task>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:8000".to_string(),
            users: 20,
            spawn_rate: 2.0,
            run_time: Duration::from_secs(300),
            wait_min: Duration::from_secs(1),
            wait_max: Duration::from_secs(2),
            request_timeout: Duration::from_secs(10),
            tasks: default_tasks(),
        }
    }
}

impl LoadConfig {
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.users == 0 {
            return Err(LoadError::InvalidConfig("users must be at least 1".into()));
        }
        self.spawn_interval()?;
        if self.wait_min > self.wait_max {
            return Err(LoadError::InvalidConfig(format!(
                "wait_min ({:?}) exceeds wait_max ({:?})",
                self.wait_min, self.wait_max
            )));
        }
        base_url(&self.host)?;
        Ok(())
    }

    /// Delay between two user spawns.
    pub fn spawn_interval(&self) -> Result<Duration, LoadError> {
        if !(self.spawn_rate.is_finite() && self.spawn_rate > 0.0) {
            return Err(LoadError::InvalidConfig("spawn rate must be positive".into()));
        }
        Duration::try_from_secs_f64(1.0 / self.spawn_rate).map_err(|_| {
            LoadError::InvalidConfig(format!("spawn rate {} is too small", self.spawn_rate))
        })
    }
}

fn base_url(host: &str) -> Result<Url, LoadError> {
    let url = Url::parse(host).map_err(|e| LoadError::InvalidHost(format!("{}: {}", host, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(LoadError::InvalidHost(format!("{}: scheme must be http or https", host)));
    }
    Ok(url)
}

type SharedStats = Arc<Mutex<BTreeMap<String, TaskStats>>>;

/// Everything a user task needs, shared across users.
struct UserContext {
    client: reqwest::Client,
    picker: TaskPicker,
    /// Resolved URL per task, aligned with `picker.tasks()`.
    targets: Vec<Url>,
    stats: SharedStats,
    wait_min: Duration,
    wait_max: Duration,
}

/// Drive load against `config.host` until the run time elapses or
/// `shutdown` fires.
pub async fn run(config: LoadConfig, mut shutdown: broadcast::Receiver<()>) -> Result<LoadReport, LoadError> {
    config.validate()?;

    let base = base_url(&config.host)?;
    let picker = TaskPicker::new(config.tasks.clone())?;
    let targets = picker
        .tasks()
        .iter()
        .map(|task| {
            base.join(&task.path)
                .map_err(|e| LoadError::InvalidHost(format!("{}{}: {}", base, task.path, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let stats: SharedStats = Arc::new(Mutex::new(
        picker
            .tasks()
            .iter()
            .map(|task| (task.name.clone(), TaskStats::default()))
            .collect(),
    ));

    let context = Arc::new(UserContext {
        client: reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?,
        picker,
        targets,
        stats: stats.clone(),
        wait_min: config.wait_min,
        wait_max: config.wait_max,
    });

    tracing::info!(
        host = %base,
        users = config.users,
        spawn_rate = config.spawn_rate,
        run_time = ?config.run_time,
        "Starting load run"
    );

    let spawn_interval = config.spawn_interval()?;
    let started = Instant::now();
    let deadline = tokio::time::Instant::now()
        .checked_add(config.run_time)
        .ok_or_else(|| LoadError::InvalidConfig(format!("run time {:?} is too long", config.run_time)))?;
    let (stop_tx, stop_rx) = watch::channel(false);
    let mut users = JoinSet::new();

    let stop = async {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => tracing::info!("Run time elapsed"),
            _ = wait_for_shutdown(&mut shutdown) => tracing::info!("Shutdown requested, stopping users"),
        }
    };
    tokio::pin!(stop);

    loop {
        let id = users.len();
        users.spawn(user_loop(id, context.clone(), stop_rx.clone()));
        tracing::debug!(user = id, "Spawned user");

        if users.len() >= config.users {
            tracing::info!(users = users.len(), "All users spawned");
            (&mut stop).await;
            break;
        }

        tokio::select! {
            _ = &mut stop => break,
            _ = tokio::time::sleep(spawn_interval) => {}
        }
    }

    let users_spawned = users.len();
    let _ = stop_tx.send(true);
    while let Some(result) = users.join_next().await {
        if let Err(e) = result {
            tracing::warn!(error = %e, "User task failed");
        }
    }

    let tasks = std::mem::take(&mut *stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner()));

    Ok(LoadReport {
        tasks,
        users_spawned,
        elapsed: started.elapsed(),
    })
}

/// Resolves on trigger; a dropped sender means nobody will ever trigger.
async fn wait_for_shutdown(shutdown: &mut broadcast::Receiver<()>) {
    if let Err(broadcast::error::RecvError::Closed) = shutdown.recv().await {
        std::future::pending::<()>().await;
    }
}

async fn user_loop(id: usize, context: Arc<UserContext>, mut stop: watch::Receiver<bool>) {
    let mut rng = StdRng::from_entropy();

    while !*stop.borrow() {
        let index = context.picker.pick_index(&mut rng);
        let task = &context.picker.tasks()[index];

        let start = Instant::now();
        let success = match context.client.get(context.targets[index].clone()).send().await {
            Ok(response) => {
                let status = response.status();
                // Drain so the connection can be reused.
                let _ = response.bytes().await;
                status.is_success()
            }
            Err(e) => {
                tracing::debug!(user = id, task = %task.name, error = %e, "Request failed");
                false
            }
        };
        let latency = start.elapsed();

        match context.stats.lock() {
            Ok(mut stats) => stats.entry(task.name.clone()).or_default().record(latency, success),
            Err(_) => {
                tracing::error!(user = id, "Stats lock poisoned, stopping user");
                return;
            }
        }

        let wait = rng.gen_range(context.wait_min..=context.wait_max);
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = stop.changed() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(LoadConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let bad = [
            LoadConfig { users: 0, ..LoadConfig::default() },
            LoadConfig { spawn_rate: 0.0, ..LoadConfig::default() },
            LoadConfig {
                wait_min: Duration::from_secs(3),
                ..LoadConfig::default()
            },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(LoadError::InvalidConfig(_))));
        }

        let config = LoadConfig {
            host: "localhost:8000".into(),
            ..LoadConfig::default()
        };
        assert!(matches!(config.validate(), Err(LoadError::InvalidHost(_))));
    }

    #[test]
    fn test_spawn_interval() {
        let config = LoadConfig { spawn_rate: 4.0, ..LoadConfig::default() };
        assert_eq!(config.spawn_interval().unwrap(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_tiny_spawn_rate_is_rejected() {
        let config = LoadConfig { spawn_rate: 1e-20, ..LoadConfig::default() };
        assert!(matches!(config.validate(), Err(LoadError::InvalidConfig(_))));

        let shutdown = crate::lifecycle::Shutdown::new();
        let result = run(config, shutdown.subscribe()).await;
        assert!(matches!(result, Err(LoadError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_unreachable_host_counts_failures() {
        // Port 9 (discard) on loopback is closed in test environments.
        let config = LoadConfig {
            host: "http://127.0.0.1:9".into(),
            users: 2,
            spawn_rate: 100.0,
            run_time: Duration::from_millis(300),
            wait_min: Duration::from_millis(10),
            wait_max: Duration::from_millis(20),
            request_timeout: Duration::from_millis(200),
            tasks: vec![Task::new("fast", "/fast", 1)],
        };

        let shutdown = crate::lifecycle::Shutdown::new();
        let report = run(config, shutdown.subscribe()).await.unwrap();

        let total = report.total();
        assert_eq!(report.users_spawned, 2);
        assert!(total.requests > 0);
        assert_eq!(total.requests, total.failures);
    }
}
