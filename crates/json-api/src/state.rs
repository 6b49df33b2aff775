//! State

use std::sync::Arc;

use consent_app::context::AppContext;

#[derive(Clone)]
pub(crate) struct State {
    pub(crate) app: AppContext,

    /// Key guarding the audit routes; `None` locks them.
    pub(crate) admin_api_key: Option<String>,
}

impl State {
    #[must_use]
    pub(crate) fn new(app: AppContext, admin_api_key: Option<String>) -> Self {
        Self { app, admin_api_key }
    }

    #[must_use]
    pub(crate) fn from_app_context(app: AppContext, admin_api_key: Option<String>) -> Arc<Self> {
        Arc::new(Self::new(app, admin_api_key))
    }
}
