use super::{Component, ComponentState, PlatecamOrchestrator};
use crate::error::Result;
use tracing::{error, info, warn};

impl PlatecamOrchestrator {
    /// Create any missing plate logs and read the starting occupancy
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing platecam components");

        self.register_components().await;

        self.set_component_state(Component::Storage, ComponentState::Starting)
            .await;
        if let Err(e) = self.engine.initialize().await {
            self.set_component_state(Component::Storage, ComponentState::Failed)
                .await;
            error!("Failed to prepare plate logs: {}", e);
            return Err(e.into());
        }
        self.set_component_state(Component::Storage, ComponentState::Running)
            .await;

        match self.engine.occupancy().await {
            Ok(occupancy) => {
                info!(
                    "Lot has {} occupied and {} vacant slot(s)",
                    occupancy.occupied, occupancy.vacant
                );
                self.occupancy = occupancy;
            }
            Err(e) => warn!("Could not read starting occupancy: {}", e),
        }

        info!("All components initialized successfully");
        Ok(())
    }

    /// Open the frame source and start listening for operator keys
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting platecam in {} mode", self.mode);

        self.set_component_state(Component::Source, ComponentState::Starting)
            .await;
        if let Err(e) = self.source.open().await {
            self.set_component_state(Component::Source, ComponentState::Failed)
                .await;
            error!("Failed to open {}: {}", self.source.describe(), e);
            return Err(e.into());
        }
        self.set_component_state(Component::Source, ComponentState::Running)
            .await;
        info!("Reading frames from {}", self.source.describe());

        self.set_component_state(Component::Display, ComponentState::Running)
            .await;

        if let Some(keyboard_handler) = &self.keyboard_handler {
            self.set_component_state(Component::Keyboard, ComponentState::Starting)
                .await;

            if let Err(e) = keyboard_handler.start().await {
                self.set_component_state(Component::Keyboard, ComponentState::Failed)
                    .await;
                error!("Failed to start keyboard handler: {}", e);
                return Err(e);
            }

            self.set_component_state(Component::Keyboard, ComponentState::Running)
                .await;
        }

        info!("Platecam started successfully");
        Ok(())
    }
}
