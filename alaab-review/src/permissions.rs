//! Role capability lookup
//!
//! Every guard in the review core asks this module; no call site compares
//! role strings itself.

use alaab_common::db::Role;
use alaab_common::{Error, Result};
use serde::Serialize;
use uuid::Uuid;

/// Authenticated caller of a core operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn can(&self, capability: Capability) -> bool {
        capabilities(self.role).contains(&capability)
    }
}

/// Things an actor may be allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Create new game records
    CreateGame,
    /// Edit own games while they are drafts or rejected
    EditOwn,
    /// Edit any non-archived game
    EditAny,
    /// Submit own drafts for review
    SubmitOwn,
    /// Submit any draft for review
    SubmitAny,
    /// Approve, reject, or request revision of submissions
    Review,
    /// Archive (soft-delete) own games
    ArchiveOwn,
    /// Archive any game
    ArchiveAny,
    /// Accept, reject, or postpone similarity matches
    ResolveMatches,
    /// Create, edit, and delete concepts
    ManageConcepts,
    /// Trigger a similarity scan on demand
    RunMatching,
}

const EDITOR_CAPABILITIES: &[Capability] = &[
    Capability::CreateGame,
    Capability::EditOwn,
    Capability::SubmitOwn,
    Capability::ArchiveOwn,
];

const REVIEWER_CAPABILITIES: &[Capability] = &[
    Capability::CreateGame,
    Capability::EditOwn,
    Capability::EditAny,
    Capability::SubmitOwn,
    Capability::SubmitAny,
    Capability::Review,
    Capability::ResolveMatches,
    Capability::ManageConcepts,
    Capability::RunMatching,
];

const ADMIN_CAPABILITIES: &[Capability] = &[
    Capability::CreateGame,
    Capability::EditOwn,
    Capability::EditAny,
    Capability::SubmitOwn,
    Capability::SubmitAny,
    Capability::Review,
    Capability::ArchiveOwn,
    Capability::ArchiveAny,
    Capability::ResolveMatches,
    Capability::ManageConcepts,
    Capability::RunMatching,
];

/// Capability set of a role
pub fn capabilities(role: Role) -> &'static [Capability] {
    match role {
        Role::Editor => EDITOR_CAPABILITIES,
        Role::Reviewer => REVIEWER_CAPABILITIES,
        Role::Admin => ADMIN_CAPABILITIES,
    }
}

/// Require a capability
pub fn require(actor: &Actor, capability: Capability) -> Result<()> {
    if actor.can(capability) {
        Ok(())
    } else {
        Err(denied(actor, capability))
    }
}

/// Require `any`, or `own` when the actor owns the record
pub fn require_on_owned(
    actor: &Actor,
    any: Capability,
    own: Capability,
    owner_id: Uuid,
) -> Result<()> {
    if actor.can(any) || (actor.id == owner_id && actor.can(own)) {
        Ok(())
    } else {
        Err(denied(actor, any))
    }
}

fn denied(actor: &Actor, capability: Capability) -> Error {
    tracing::debug!(actor = %actor.id, role = %actor.role, ?capability, "Permission denied");
    Error::Unauthorized(format!(
        "Role '{}' is not permitted to perform this action",
        actor.role
    ))
}
