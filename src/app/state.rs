use super::{Component, ComponentState, PlatecamOrchestrator};
use std::collections::BTreeMap;
use tracing::debug;

impl PlatecamOrchestrator {
    /// Register every component this lane uses as stopped. The keyboard is
    /// only tracked when operator input is enabled.
    pub(super) async fn register_components(&self) {
        let mut states = self.component_states.lock().await;
        states.clear();
        for component in [Component::Storage, Component::Source, Component::Display] {
            states.insert(component, ComponentState::Stopped);
        }
        if self.keyboard_handler.is_some() {
            states.insert(Component::Keyboard, ComponentState::Stopped);
        }
    }

    pub async fn set_component_state(&self, component: Component, state: ComponentState) {
        let previous = self.component_states.lock().await.insert(component, state);
        if previous != Some(state) {
            debug!("{} component: {:?} -> {:?}", component, previous, state);
        }
    }

    pub async fn component_state(&self, component: Component) -> Option<ComponentState> {
        self.component_states.lock().await.get(&component).copied()
    }

    /// Snapshot of every registered component, in start order
    pub async fn component_states(&self) -> BTreeMap<Component, ComponentState> {
        self.component_states.lock().await.clone()
    }
}
