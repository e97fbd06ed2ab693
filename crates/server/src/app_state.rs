use std::sync::Arc;

use crate::agent::Agent;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) agent: Arc<dyn Agent>,
}
