use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{Role, SessionIdentity};

/// What loading the stored session found.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// A usable identity is present.
    Active(SessionIdentity),
    /// Ordinary logged-out state: nothing stored, or an identifier with no
    /// profile yet.
    Absent,
    /// Corrupt data was found and the store was wiped. Callers should land
    /// the user on the logged-out entry page.
    Wiped,
}

/// Durable, role-scoped persistence of the authenticated identity.
///
/// Implementations own the key layout (`userRole`, `{role}Id`, `{role}Data`,
/// `remember{Role}`) and must survive process restarts. At most one identity
/// is current at a time; a later save for a different role wins.
///
/// Defined here so the storage crate can implement it for its store type
/// while the client crate consumes it behind `Arc<dyn SessionRepository>`.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Records the active role and its bare identifier.
    async fn save_identifier(&self, role: Role, id: &str) -> anyhow::Result<()>;

    /// Persists the full profile blob for a role. The role tag and the blob
    /// are separate entries so the role can be checked without
    /// deserializing the profile.
    async fn save_profile(&self, role: Role, profile: &Value) -> anyhow::Result<()>;

    /// Loads and normalizes the current identity. A malformed profile blob
    /// is a corrupt session: the implementation wipes the store and reports
    /// `Wiped` so the caller can route the user back to the landing page.
    async fn load(&self) -> anyhow::Result<SessionState>;

    /// Removes every stored key. This is the logout primitive and the
    /// hard-failure path of `load`.
    async fn clear(&self) -> anyhow::Result<()>;

    async fn set_remember(&self, role: Role) -> anyhow::Result<()>;

    async fn remembered(&self, role: Role) -> anyhow::Result<bool>;
}
