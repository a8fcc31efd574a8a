use std::fmt;
use std::sync::Arc;

use been_core::NodeLifecycleController;

#[derive(Clone)]
pub struct AppState {
    controller: Arc<NodeLifecycleController>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("controller", &self.controller)
            .finish()
    }
}

impl AppState {
    pub fn new(controller: Arc<NodeLifecycleController>) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &Arc<NodeLifecycleController> {
        &self.controller
    }
}
