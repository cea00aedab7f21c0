//! Review core services

pub mod concepts;
pub mod games;
pub mod match_generator;
pub mod review_queue;
pub mod workflow;

pub use concepts::{ConceptDetail, ConceptService, NewConcept};
pub use games::{GameInput, GameService, SavedGame};
pub use match_generator::{MatchGenerator, MatchRunSummary};
pub use review_queue::{ConceptTarget, PendingMatch, QueueStats, ReviewQueue};
pub use workflow::{next_status, ReviewWorkflow, WorkflowAction};
