use super::{Component, ComponentState, PlatecamOrchestrator, ShutdownReason};
use crate::error::{PlatecamError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info};

impl PlatecamOrchestrator {
    /// Release every component and work out the process exit code.
    ///
    /// Components are stopped in reverse start order. A component that fails
    /// to stop is logged and does not keep the others from stopping.
    pub async fn shutdown(&mut self, reason: &ShutdownReason) -> i32 {
        info!("Beginning graceful shutdown");

        let mut exit_code = reason.exit_code();

        if let Some(keyboard_handler) = &self.keyboard_handler {
            let result = stop_within(Component::Keyboard, Duration::from_secs(2), keyboard_handler.stop()).await;
            if !self.finish_component(Component::Keyboard, result).await {
                exit_code = 1;
            }
        }

        let result = stop_within(Component::Display, Duration::from_secs(5), async {
            self.display.close().await;
            Ok(())
        })
        .await;
        if !self.finish_component(Component::Display, result).await {
            exit_code = 1;
        }

        let result = stop_within(Component::Source, Duration::from_secs(10), async {
            self.source.close().await.map_err(PlatecamError::from)
        })
        .await;
        if !self.finish_component(Component::Source, result).await {
            exit_code = 1;
        }

        self.set_component_state(Component::Storage, ComponentState::Stopped)
            .await;

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        exit_code
    }

    /// Record how a component stop went; `true` when it stopped cleanly
    async fn finish_component(&self, component: Component, result: Result<()>) -> bool {
        match result {
            Ok(()) => {
                self.set_component_state(component, ComponentState::Stopped)
                    .await;
                info!("{} component stopped", component);
                true
            }
            Err(e) => {
                self.set_component_state(component, ComponentState::Failed)
                    .await;
                error!("Error stopping {} component: {}", component, e);
                false
            }
        }
    }
}

async fn stop_within<F>(component: Component, limit: Duration, stop: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    info!("Stopping {} component", component);
    match timeout(limit, stop).await {
        Ok(result) => result,
        Err(_) => Err(PlatecamError::component(
            component.to_string(),
            format!("{} component stop timeout", component),
        )),
    }
}
