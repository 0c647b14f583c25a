//! Shared application state for all routes.

use crate::auth::AuthService;
use crate::config::ResolvedModel;
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Resolved once at startup; immutable afterwards.
    pub model: Arc<ResolvedModel>,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, model: ResolvedModel, auth: AuthService) -> Self {
        AppState {
            store,
            model: Arc::new(model),
            auth,
        }
    }
}
