//! Server-side role reconciliation.
//!
//! The admin role is owned by configuration: a fixed allow-list of Telegram
//! ids. Each login runs one reconciliation step that compares the stored
//! role with the allow-list and returns the effective role. The caller
//! persists the result; this module never touches storage.

use std::collections::HashSet;

use crate::role::Role;

/// What reconciliation did to the stored role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChange {
    /// First login; the role was assigned.
    Assigned,
    /// The stored role was kept.
    Unchanged,
    /// The user was raised to `Admin`.
    Promoted,
    /// The user lost `Admin`.
    Demoted,
}

/// Result of a reconciliation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleDecision {
    /// The role the user holds from now on.
    pub role: Role,
    /// How it relates to the stored role.
    pub change: RoleChange,
}

/// Reconciles stored roles against the admin allow-list.
#[derive(Debug, Clone, Default)]
pub struct RoleReconciler {
    admin_ids: HashSet<String>,
}

impl RoleReconciler {
    /// Creates a reconciler from the configured admin ids.
    #[must_use]
    pub fn new<I, S>(admin_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            admin_ids: admin_ids
                .into_iter()
                .map(Into::into)
                .map(|id: String| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect(),
        }
    }

    /// Returns true if `external_id` is on the allow-list.
    #[must_use]
    pub fn is_listed(&self, external_id: &str) -> bool {
        self.admin_ids.contains(external_id)
    }

    /// Decides the effective role for a login.
    ///
    /// `current` is the stored role, or `None` for a first login. Listed
    /// users become `Admin`; unlisted admins fall back to `Student`; any
    /// other role is left alone.
    #[must_use]
    pub fn reconcile(&self, external_id: &str, current: Option<Role>) -> RoleDecision {
        let listed = self.is_listed(external_id);
        let decision = match (current, listed) {
            (None, true) => RoleDecision {
                role: Role::Admin,
                change: RoleChange::Assigned,
            },
            (None, false) => RoleDecision {
                role: Role::Student,
                change: RoleChange::Assigned,
            },
            (Some(Role::Admin), false) => RoleDecision {
                role: Role::Student,
                change: RoleChange::Demoted,
            },
            (Some(role), true) if !role.is_admin() => RoleDecision {
                role: Role::Admin,
                change: RoleChange::Promoted,
            },
            (Some(role), _) => RoleDecision {
                role,
                change: RoleChange::Unchanged,
            },
        };

        match decision.change {
            RoleChange::Promoted | RoleChange::Demoted => tracing::info!(
                external_id,
                role = %decision.role,
                change = ?decision.change,
                "role reconciled against admin allow-list"
            ),
            RoleChange::Assigned | RoleChange::Unchanged => tracing::debug!(
                external_id,
                role = %decision.role,
                change = ?decision.change,
                "role reconciled"
            ),
        }

        decision
    }
}
