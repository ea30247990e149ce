//! Account-system signals consumed by checklist aggregation

use crate::action::Action;
use serde::{Deserialize, Serialize};

/// Link status between the project and its cloud provider account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderAccountStatus {
    /// Whether the provider account is linked and in sync
    pub linked: bool,

    /// Account information if available
    #[serde(default)]
    pub account_info: Option<String>,

    /// Error message if not linked
    #[serde(default)]
    pub error: Option<String>,

    /// Remediation that re-syncs the provider account
    #[serde(default)]
    pub sync_action: Option<Action>,
}

impl ProviderAccountStatus {
    pub fn linked(account_info: impl Into<String>) -> Self {
        Self {
            linked: true,
            account_info: Some(account_info.into()),
            error: None,
            sync_action: None,
        }
    }

    pub fn unlinked(error: impl Into<String>) -> Self {
        Self {
            linked: false,
            account_info: None,
            error: Some(error.into()),
            sync_action: None,
        }
    }

    pub fn with_sync_action(mut self, action: Action) -> Self {
        self.sync_action = Some(action);
        self
    }
}

/// A local (console) user of the project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalUser {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub tenant_admin: bool,

    /// Per-user role assignment call, as supplied by the account system
    #[serde(default)]
    pub role_assignment: Option<Action>,
}

impl LocalUser {
    pub fn new(id: impl Into<String>, name: impl Into<String>, tenant_admin: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tenant_admin,
            role_assignment: None,
        }
    }

    pub fn with_role_assignment(mut self, action: Action) -> Self {
        self.role_assignment = Some(action);
        self
    }
}

/// Snapshot of account-side state for one project.
///
/// `None` means the signal was never received; aggregation then reports the
/// item as incomplete with no action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountSignals {
    #[serde(default)]
    pub provider_account: Option<ProviderAccountStatus>,

    #[serde(default)]
    pub users: Option<Vec<LocalUser>>,
}

impl AccountSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider_account(mut self, status: ProviderAccountStatus) -> Self {
        self.provider_account = Some(status);
        self
    }

    pub fn with_users(mut self, users: Vec<LocalUser>) -> Self {
        self.users = Some(users);
        self
    }
}
