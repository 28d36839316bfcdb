// Shieldgate core
//
// Domain entities, error taxonomy and collaborator contracts for the
// workflow/step state machine. Nothing here touches storage or HTTP.
//
// Key design decisions:
// - Collaborators (ActionSource, Shield, Signer) are traits chosen once at startup
// - Request fingerprints use a canonical key-sorted JSON form hashed with SHA-256
// - Configuration is an explicit AppConfig value passed into constructors
// - Shield faults never escape as errors; they become failed verdicts

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod fixture;
pub mod shield;
pub mod signer;
pub mod traits;
pub mod workflow;

// Re-exports for convenience
pub use config::{AppConfig, ConfigError, Environment, ShieldConfig};
pub use error::{
    RateLimitInfo, Result, ShieldFailure, ShieldgateError, SignerError, UpstreamError,
};
pub use fingerprint::{canonical_json, fingerprint};
pub use fixture::FixtureActionSource;
pub use shield::{create_shield, NoopShield, PolicyShield, ShieldMode};
pub use signer::LocalSigner;
pub use traits::{
    ActionPlan, ActionRequest, ActionSource, CandidateTransaction, Shield, ShieldInput,
    ShieldVerdict, Signer,
};
pub use workflow::{
    AuditEvent, AuditEventType, IdempotencyRecord, Intent, Step, StepStatus, Workflow,
    WorkflowStatus, WorkflowWithSteps,
};
