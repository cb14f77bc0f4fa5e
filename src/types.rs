use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Account role carried by an identity.
///
/// Values the portal does not know are kept verbatim as
/// [`Role::Unrecognized`] instead of failing deserialization, so a stored
/// identity with a newer role still loads and falls back to the hospital
/// landing route.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Hospital,
    Manufacturer,
    SuperAdmin,
    Unrecognized(String),
}

impl Role {
    /// The three roles the route policy is defined over.
    pub const KNOWN: [Role; 3] = [Role::Hospital, Role::Manufacturer, Role::SuperAdmin];

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Hospital => "hospital",
            Self::Manufacturer => "manufacturer",
            Self::SuperAdmin => "superadmin",
            Self::Unrecognized(s) => s,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.as_str() {
            "hospital" => Self::Hospital,
            "manufacturer" => Self::Manufacturer,
            "superadmin" => Self::SuperAdmin,
            _ => Self::Unrecognized(s),
        }
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        Self::from(s.to_owned())
    }
}

impl From<Role> for String {
    fn from(r: Role) -> Self {
        match r {
            Role::Unrecognized(s) => s,
            known => known.as_str().to_owned(),
        }
    }
}

/// Account e-mail address, also the token subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct Email(pub String);

impl Email {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Email {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque bearer credential issued by the risk service.
///
/// `Debug` is redacted so credentials never end up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, From, Into)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(..)")
    }
}

/// The role-bearing user record stored next to the credential.
///
/// Persisted as JSON `{email, role, displayName?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Identity {
    pub email: Email,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn new(email: impl Into<Email>, role: Role) -> Self {
        Self {
            email: email.into(),
            role,
            display_name: None,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// An authenticated session. Credential and identity only exist together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub credential: Credential,
    pub identity: Identity,
}
