use crate::models::{Role, Session, UserId};

/// A permission gate a protected view asks about before mounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// The signed-in user's own storage.
    OwnStorage,
    /// Another user's storage.
    ForeignStorage,
    /// The account directory.
    AdminDirectory,
}

impl Capability {
    pub fn requires_admin(&self) -> bool {
        match self {
            Capability::OwnStorage => false,
            Capability::ForeignStorage | Capability::AdminDirectory => true,
        }
    }

    /// Capability needed to view `owner`'s storage under `session`.
    pub fn storage_of(session: &Session, owner: UserId) -> Self {
        match session.user_id() {
            Some(own) if own == owner => Capability::OwnStorage,
            _ => Capability::ForeignStorage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedirectTarget {
    SignIn,
    OwnStorage,
    AdminDirectory,
}

impl RedirectTarget {
    pub fn path(&self) -> &'static str {
        match self {
            RedirectTarget::SignIn => "/signin",
            RedirectTarget::OwnStorage => "/storage",
            RedirectTarget::AdminDirectory => "/admin",
        }
    }

    /// Where a freshly signed-in user lands.
    pub fn landing_for(role: Role) -> Self {
        match role {
            Role::Admin => RedirectTarget::AdminDirectory,
            Role::User => RedirectTarget::OwnStorage,
            Role::Guest => RedirectTarget::SignIn,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Allow,
    RedirectTo(RedirectTarget),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Decides whether `session` may use `capability`. Pure.
pub fn decide(session: &Session, capability: Capability) -> Decision {
    if !session.is_authenticated() {
        return Decision::RedirectTo(RedirectTarget::SignIn);
    }

    if capability.requires_admin() && session.role() != Role::Admin {
        return Decision::RedirectTo(RedirectTarget::OwnStorage);
    }

    Decision::Allow
}
