//! Operator session
//!
//! One engine per dashboard list, all sharing a single admin backend client
//! and credential.

use std::sync::Arc;

use anyhow::{Context, Result};
use fooddash_engine::{
    AccountStatus, Config, Credential, EntityKind, HttpCollaborator, ModerationEngine,
    ModerationError, OrderStatus,
};

pub type AccountEngine = ModerationEngine<AccountStatus, HttpCollaborator>;
pub type OrderEngine = ModerationEngine<OrderStatus, HttpCollaborator>;

pub struct Session {
    restaurants: AccountEngine,
    riders: AccountEngine,
    users: AccountEngine,
    orders: OrderEngine,
}

impl Session {
    /// Build the backend client from config and obtain a credential
    ///
    /// Env vars (see `Config::from_env`):
    /// - ADMIN_API_URL: Base URL of the admin API
    /// - ADMIN_TOKEN: Pre-issued bearer token, or
    /// - ADMIN_EMAIL / ADMIN_PASSWORD: Login pair used when no token is set
    pub async fn connect(config: &Config) -> Result<Self> {
        let collaborator = Arc::new(
            HttpCollaborator::from_config(config).context("Failed to build HTTP client")?,
        );

        let credential = match (&config.admin_token, config.login_enabled()) {
            (Some(token), _) => Credential::bearer(token.as_str()),
            (None, true) => {
                let email = config.admin_email.as_deref().unwrap_or_default();
                let password = config.admin_password.as_deref().unwrap_or_default();
                collaborator
                    .login(email, password)
                    .await
                    .context("Admin login failed")?
            }
            (None, false) => {
                tracing::warn!("No ADMIN_TOKEN or login pair set; every tool call will be refused");
                Credential::anonymous()
            }
        };

        Ok(Self::new(collaborator, credential)?)
    }

    pub fn new(
        collaborator: Arc<HttpCollaborator>,
        credential: Credential,
    ) -> Result<Self, ModerationError> {
        Ok(Self {
            restaurants: AccountEngine::new(
                EntityKind::Restaurant,
                collaborator.clone(),
                credential.clone(),
            )?,
            riders: AccountEngine::new(EntityKind::Rider, collaborator.clone(), credential.clone())?,
            users: AccountEngine::new(EntityKind::User, collaborator.clone(), credential.clone())?,
            orders: OrderEngine::new(EntityKind::Order, collaborator, credential)?,
        })
    }

    /// Engine for an account kind; orders have their own lifecycle
    pub fn accounts(&self, kind: EntityKind) -> Result<&AccountEngine, ModerationError> {
        match kind {
            EntityKind::Restaurant => Ok(&self.restaurants),
            EntityKind::Rider => Ok(&self.riders),
            EntityKind::User => Ok(&self.users),
            EntityKind::Order => Err(ModerationError::InvalidInput(
                "orders are not accounts; use the order tools".to_string(),
            )),
        }
    }

    pub fn orders(&self) -> &OrderEngine {
        &self.orders
    }
}
