use anyhow::{Context, Result};
use std::env;
use std::fmt;

/// Login pair for the catalog. Values are never logged; Debug is redacted
/// so the struct cannot leak through tracing fields.
#[derive(Clone)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        let login = env::var("EE_LOGIN").context("EE_LOGIN is not set")?;
        let password = env::var("EE_PASSWORD").context("EE_PASSWORD is not set")?;
        Ok(Credentials { login, password })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let creds = Credentials {
            login: "operator".to_string(),
            password: "hunter2".to_string(),
        };
        let printed = format!("{:?}", creds);
        assert_eq!(printed.contains("operator"), false);
        assert_eq!(printed.contains("hunter2"), false);
    }
}
