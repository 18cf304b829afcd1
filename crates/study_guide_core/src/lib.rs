pub mod accounts;
pub mod auth;
pub mod domain;
pub mod error;
pub mod generation;
pub mod guides;
pub mod ports;
pub mod prompt;
pub mod validation;

pub use accounts::{AccountService, LoginOutcome};
pub use auth::AuthorizationGuard;
pub use domain::{
    AuthenticatedUser, DailyStudyUnit, Guide, GuideDraft, GuideInputs, GuideStatus, GuideSummary,
    Identity, Knowledge, NewAccount, SessionCookie, StudyProgress, TopicVerdict, UserProfile,
};
pub use error::{DomainError, DomainResult};
pub use generation::{GenerationOrchestrator, GenerationOutcome, ModelCascade};
pub use guides::{GuideService, GuideSettings};
pub use ports::{
    CompletionRequest, CompletionService, GuideStore, IdentityProvider, PortError, PortResult,
    SessionService, UserDirectory,
};
pub use validation::ValidationEngine;
