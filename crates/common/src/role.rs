use serde::{Deserialize, Serialize};

/// Which side of a meeting a session belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Guest,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Host => "host",
            Role::Guest => "guest",
        }
    }

    pub fn is_host(&self) -> bool {
        matches!(self, Role::Host)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0} (expected 'host' or 'guest')")]
pub struct UnknownRole(String);

impl std::str::FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "host" => Ok(Role::Host),
            "guest" => Ok(Role::Guest),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_and_display() {
        assert_eq!("host".parse::<Role>().unwrap(), Role::Host);
        assert_eq!("guest".parse::<Role>().unwrap(), Role::Guest);
        assert!("admin".parse::<Role>().is_err());
        assert_eq!(Role::Guest.to_string(), "guest");
    }

    #[test]
    fn test_role_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Host).unwrap(), "\"host\"");
        let role: Role = serde_json::from_str("\"guest\"").unwrap();
        assert_eq!(role, Role::Guest);
    }
}
