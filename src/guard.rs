//! Guard/gate adapters: translate an authorization decision into a
//! rendering decision. These hold no logic of their own beyond any-of /
//! all-of matching over the supplied role or permission lists.

use crate::authz::types::{PermissionAction, ResourceType, RoleType};
use crate::session::SessionService;

/// How multiple required roles/permissions combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// At least one requirement must hold.
    #[default]
    Any,
    /// Every requirement must hold.
    All,
}

/// What the caller should render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Render the protected content.
    Grant,
    /// Send the user elsewhere.
    Redirect(String),
    /// Session is still loading; render nothing yet.
    Pending,
}

/// Protects a route behind a set of roles.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    required_roles: Vec<RoleType>,
    mode: MatchMode,
    redirect_to: String,
}

impl RouteGuard {
    pub fn new(required_roles: Vec<RoleType>, redirect_to: impl Into<String>) -> Self {
        Self {
            required_roles,
            mode: MatchMode::Any,
            redirect_to: redirect_to.into(),
        }
    }

    pub fn match_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn evaluate(&self, session: &SessionService) -> GuardOutcome {
        if session.state().is_loading {
            return GuardOutcome::Pending;
        }
        if !session.state().is_authenticated {
            return GuardOutcome::Redirect(self.redirect_to.clone());
        }
        // An empty requirement list only demands authentication.
        let granted = match self.mode {
            MatchMode::Any => {
                self.required_roles.is_empty()
                    || self.required_roles.iter().any(|r| session.has_role(*r))
            }
            MatchMode::All => self.required_roles.iter().all(|r| session.has_role(*r)),
        };
        if granted {
            GuardOutcome::Grant
        } else {
            GuardOutcome::Redirect(self.redirect_to.clone())
        }
    }
}

/// Shows or hides a UI fragment behind a set of permission pairs.
#[derive(Debug, Clone)]
pub struct PermissionGate {
    required: Vec<(ResourceType, PermissionAction)>,
    mode: MatchMode,
}

impl PermissionGate {
    pub fn new(required: Vec<(ResourceType, PermissionAction)>) -> Self {
        Self {
            required,
            mode: MatchMode::Any,
        }
    }

    pub fn match_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// True when the gated fragment should render.
    pub fn evaluate(&self, session: &SessionService) -> bool {
        if session.state().is_loading || !session.state().is_authenticated {
            return false;
        }
        match self.mode {
            MatchMode::Any => {
                self.required.is_empty()
                    || self
                        .required
                        .iter()
                        .any(|(r, a)| session.can_access(*r, *a, None))
            }
            MatchMode::All => self
                .required
                .iter()
                .all(|(r, a)| session.can_access(*r, *a, None)),
        }
    }
}
