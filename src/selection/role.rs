use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Who is looking at the dashboard; decides how far a query may be scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Agent,
    Client,
    Tenant,
}

impl Role {
    /// Administrative roles may scope queries by agent and landlord
    pub fn is_administrative(self) -> bool {
        matches!(self, Role::Admin | Role::Agent)
    }

    /// Client roles see only their own properties and always work inside one
    pub fn is_client(self) -> bool {
        matches!(self, Role::Client)
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" | "super_admin" | "administrator" => Ok(Role::Admin),
            "agent" => Ok(Role::Agent),
            "client" | "landlord" => Ok(Role::Client),
            "tenant" => Ok(Role::Tenant),
            other => anyhow::bail!("Unknown role: {}", other),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::Agent => "agent",
            Role::Client => "client",
            Role::Tenant => "tenant",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_aliases() {
        assert_eq!("Super_Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("administrator".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("landlord".parse::<Role>().unwrap(), Role::Client);
        assert!("janitor".parse::<Role>().is_err());
    }

    #[test]
    fn test_administrative_roles() {
        assert!(Role::Admin.is_administrative());
        assert!(Role::Agent.is_administrative());
        assert!(!Role::Client.is_administrative());
        assert!(!Role::Tenant.is_administrative());
    }
}
