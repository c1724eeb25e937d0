use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Owns the background monitor tasks and the shutdown signal they watch.
///
/// Monitors run until told to stop; `shutdown` flips the signal and waits
/// for every task to drain its current tick before returning.
pub struct MonitorSupervisor {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<(String, JoinHandle<()>)>,
}

impl MonitorSupervisor {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shutdown_tx,
            handles: Vec::new(),
        }
    }

    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    pub fn spawn<F>(&mut self, name: &str, fut: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let task_name = name.to_string();
        let handle = tokio::spawn(async move {
            fut.await;
            tracing::info!(monitor = %task_name, "Monitor stopped");
        });
        tracing::info!(monitor = name, "Monitor spawned");
        self.handles.push((name.to_string(), handle));
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for (name, handle) in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(monitor = %name, error = %e, "Monitor task panicked");
            }
        }
        tracing::info!("All monitors stopped");
    }
}

impl Default for MonitorSupervisor {
    fn default() -> Self {
        Self::new()
    }
}
