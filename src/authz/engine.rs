//! Authorization evaluator.
//!
//! Decision order, short-circuiting at each step:
//! 1. no authenticated subject -> deny
//! 2. super-admin role -> allow
//! 3. no permission matching (resource, action) -> deny
//! 4. no context supplied -> allow
//! 5. allow iff at least one matching permission's constraints all pass
//!    (permissions OR'd, constraints within one permission AND'd)
//!
//! Denials are plain boolean outcomes with the reason logged at `debug`;
//! nothing here returns an error or panics.

use tracing::debug;

use crate::authz::constraint;
use crate::authz::context::AccessContext;
use crate::authz::types::{Permission, PermissionAction, ResourceType, Role, RoleType, User};

/// Borrowed view of the authenticated subject: the canonical user plus the
/// resolved role and effective-permission sets held by the session.
#[derive(Debug, Clone, Copy)]
pub struct Subject<'a> {
    pub user: &'a User,
    pub roles: &'a [Role],
    pub permissions: &'a [Permission],
}

impl<'a> Subject<'a> {
    pub fn is_super_admin(&self) -> bool {
        self.roles.iter().any(|r| r.role_type == RoleType::SuperAdmin)
    }
}

/// May the subject perform `action` on `resource` under `context`?
pub fn check(
    subject: Option<&Subject<'_>>,
    resource: ResourceType,
    action: PermissionAction,
    context: Option<&AccessContext>,
) -> bool {
    let Some(subject) = subject else {
        debug!(%resource, %action, "access denied: no authenticated user");
        return false;
    };

    if subject.is_super_admin() {
        return true;
    }

    let matching: Vec<&Permission> = subject
        .permissions
        .iter()
        .filter(|p| p.covers(resource, action))
        .collect();

    if matching.is_empty() {
        debug!(
            user = %subject.user.id,
            %resource,
            %action,
            "access denied: no matching permission"
        );
        return false;
    }

    // Possession is sufficient when the caller supplies no situational detail.
    let Some(context) = context else {
        return true;
    };

    let allowed = matching.iter().any(|p| match &p.constraints {
        None => true,
        Some(c) => constraint::evaluate(c, subject.user, context),
    });

    if !allowed {
        debug!(
            user = %subject.user.id,
            %resource,
            %action,
            "access denied: constraints failed on every matching permission"
        );
    }

    allowed
}
