//! Caller identity as resolved from an auth token.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for users and resources.
pub type Id = i64;

/// User id given to unauthenticated callers on endpoints that accept them.
pub const ANONYMOUS_ID: Id = -1;

/// A caller's role, as encoded in their token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(i32);

impl Role {
    /// No role; what a failed authentication yields.
    pub const NONE: Self = Self(0);
    /// A regular application user.
    pub const APP_USER: Self = Self(1);
    /// An administrator of the web console.
    pub const WEB_ADMIN: Self = Self(2);

    /// Creates a role from its raw value.
    #[must_use]
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::NONE => f.write_str("none"),
            Self::APP_USER => f.write_str("app_user"),
            Self::WEB_ADMIN => f.write_str("web_admin"),
            Self(other) => write!(f, "role({other})"),
        }
    }
}

/// The `(user, role)` pair produced by authentication.
///
/// A zero user id means "not authenticated"; [`Identity::NONE`] is what every
/// failed authentication returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Identity {
    /// User id, `0` when unauthenticated.
    pub user: Id,
    /// Role encoded in the token.
    pub role: Role,
}

impl Identity {
    /// The failed-authentication result `(0, 0)`.
    pub const NONE: Self = Self {
        user: 0,
        role: Role::NONE,
    };

    /// Creates an identity.
    #[must_use]
    pub const fn new(user: Id, role: Role) -> Self {
        Self { user, role }
    }

    /// Returns `true` if a user was resolved.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user != 0
    }

    /// Returns `true` for an authenticated web administrator.
    #[must_use]
    pub const fn is_web_admin(&self) -> bool {
        self.user != 0 && self.role.0 == Role::WEB_ADMIN.0
    }
}
