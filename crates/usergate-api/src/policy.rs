//! Route access policy
//!
//! Maps each guarded operation to the roles allowed to perform it. An
//! operation with no entry, or an empty role set, only requires a valid
//! token for an active account.

use std::collections::HashMap;

use usergate_auth::Role;

/// Guarded operations, one per route and method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Profile,
    Logout,
    CreateUser,
    ListUsers,
    GetUser,
    UpdateUser,
    DeleteUser,
    DeactivateUser,
    UploadAvatar,
    CreateRole,
    ListRoles,
    GetRole,
    UpdateRole,
    DeleteRole,
}

#[derive(Debug, Clone, Default)]
pub struct RoutePolicy {
    required: HashMap<Operation, Vec<Role>>,
}

impl RoutePolicy {
    /// A policy where every operation only needs authentication
    pub fn open() -> Self {
        Self::default()
    }

    /// Builder-style: restrict `operation` to `roles`
    pub fn require(mut self, operation: Operation, roles: &[Role]) -> Self {
        self.required.insert(operation, roles.to_vec());
        self
    }

    pub fn required_roles(&self, operation: Operation) -> &[Role] {
        self.required
            .get(&operation)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether `role` may perform `operation`
    pub fn permits(&self, operation: Operation, role: Role) -> bool {
        let required = self.required_roles(operation);
        required.is_empty() || required.contains(&role)
    }

    /// The standard table: account and catalog administration is ADMIN only
    pub fn standard() -> Self {
        [
            Operation::CreateUser,
            Operation::ListUsers,
            Operation::DeleteUser,
            Operation::DeactivateUser,
            Operation::CreateRole,
            Operation::UpdateRole,
            Operation::DeleteRole,
        ]
        .into_iter()
        .fold(Self::open(), |policy, op| policy.require(op, &[Role::Admin]))
    }
}
