use std::sync::Arc;

use axum::extract::FromRef;
use bookrev_auth::token::TokenManager;
use bookrev_dal::Pool;

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(app_config: AppConfig, pool: Pool, tokens: TokenManager) -> Self {
        AppState {
            state: Arc::new(AppStateInner {
                app_config,
                pool,
                tokens,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }

    pub fn pool(&self) -> &Pool {
        &self.state.pool
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.state.tokens
    }
}

struct AppStateInner {
    pool: Pool,
    app_config: AppConfig,
    tokens: TokenManager,
}

// `axum_valid::Garde` extracts the garde validation context from the state;
// all validators here use the default `()` context.
impl FromRef<AppState> for () {
    fn from_ref(_: &AppState) {}
}

pub struct AppConfig {
    pub default_page_size: u32,
}
