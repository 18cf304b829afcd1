//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and how it is wired from ports.

use std::sync::Arc;
use std::time::Duration;

use study_guide_core::{
    AccountService, AuthorizationGuard, CompletionService, GenerationOrchestrator, GuideService,
    GuideSettings, GuideStore, IdentityProvider, ModelCascade, SessionService, UserDirectory,
    ValidationEngine,
};

use crate::config::Config;

/// Every external collaborator the services need.
#[derive(Clone)]
pub struct AppPorts {
    pub store: Arc<dyn GuideStore>,
    pub users: Arc<dyn UserDirectory>,
    pub identity: Arc<dyn IdentityProvider>,
    pub sessions: Arc<dyn SessionService>,
    pub completion: Arc<dyn CompletionService>,
}

/// The knobs of the services, independent of where they were loaded from.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub generation_models: Vec<String>,
    pub validation_models: Vec<String>,
    pub completion_timeout: Duration,
    pub guide: GuideSettings,
    pub secure_cookies: bool,
}

impl ServiceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            generation_models: config.generation_models.clone(),
            validation_models: config.validation_models.clone(),
            completion_timeout: config.completion_timeout,
            guide: GuideSettings {
                default_temperature: config.default_temperature,
                semantic_validation: config.semantic_validation,
            },
            secure_cookies: config.secure_cookies(),
        }
    }
}

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub guides: GuideService,
    pub accounts: AccountService,
    pub guard: AuthorizationGuard,
    pub validation: ValidationEngine,
    pub store: Arc<dyn GuideStore>,
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(ports: AppPorts, settings: ServiceSettings) -> Self {
        let cascade = ModelCascade::new(ports.completion, settings.completion_timeout);
        let validation = ValidationEngine::new(cascade.clone(), settings.validation_models);
        let orchestrator = GenerationOrchestrator::new(cascade, settings.generation_models);

        Self {
            guides: GuideService::new(
                ports.store.clone(),
                validation.clone(),
                orchestrator,
                settings.guide,
            ),
            accounts: AccountService::new(ports.identity, ports.sessions.clone(), ports.users),
            guard: AuthorizationGuard::new(ports.sessions),
            validation,
            store: ports.store,
            secure_cookies: settings.secure_cookies,
        }
    }
}
