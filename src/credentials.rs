//! Interactive credential prompting
//!
//! Credentials are only asked for when a node has none configured and a
//! real run is about to contact it. Answers are remembered per host and
//! user so a project with many nodes behind one login prompts once.

use delivery::{Connection, CredentialProvider, Credentials, Error, Result};
use dialoguer::{Input, Password};
use std::collections::HashMap;
use std::io::IsTerminal;
use std::sync::Mutex;

/// Prompts on the terminal for missing user and password
#[derive(Default)]
pub struct PromptCredentials {
    cache: Mutex<HashMap<String, Credentials>>,
}

impl PromptCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    fn prompt(connection: &Connection) -> std::io::Result<Credentials> {
        eprintln!();
        eprintln!(
            "  Bridge login required for node '{}' ({}:{})",
            connection.node, connection.host, connection.port
        );

        let user = match &connection.user {
            Some(user) => user.clone(),
            None => Input::<String>::new()
                .with_prompt("Bridge user")
                .interact_text()
                .map_err(std::io::Error::other)?,
        };

        let password = match &connection.password {
            Some(password) => password.clone(),
            None => Password::new()
                .with_prompt(format!("Password for {user}"))
                .interact()
                .map_err(std::io::Error::other)?,
        };

        Ok(Credentials { user, password })
    }
}

impl CredentialProvider for PromptCredentials {
    fn credentials(&self, connection: &Connection) -> Result<Credentials> {
        let key = format!(
            "{}:{}@{}",
            connection.host,
            connection.port,
            connection.user.as_deref().unwrap_or_default()
        );

        let mut cache = self
            .cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(known) = cache.get(&key) {
            log::debug!("reusing credentials for {key}");
            return Ok(known.clone());
        }

        if !std::io::stdin().is_terminal() {
            return Err(Error::Credentials {
                node: connection.node.clone(),
                message: "no user and password configured and stdin is not a terminal".to_string(),
            });
        }

        let credentials = Self::prompt(connection).map_err(|e| Error::Credentials {
            node: connection.node.clone(),
            message: e.to_string(),
        })?;
        cache.insert(key, credentials.clone());
        Ok(credentials)
    }
}

/// Fill in user and password from the command line or the terminal
pub fn complete(connection: Connection, provider: &dyn CredentialProvider) -> Result<Connection> {
    if connection.has_credentials() {
        return Ok(connection);
    }
    let credentials = provider.credentials(&connection)?;
    Ok(connection.with_credentials(credentials))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> Connection {
        Connection {
            node: "bridge1".into(),
            host: "localhost".into(),
            port: 8080,
            user: Some("admin".into()),
            password: None,
        }
    }

    #[test]
    fn test_cached_answer_is_reused() {
        let provider = PromptCredentials::new();
        provider.cache.lock().unwrap().insert(
            "localhost:8080@admin".into(),
            Credentials {
                user: "admin".into(),
                password: "secret".into(),
            },
        );

        let credentials = provider.credentials(&connection()).unwrap();
        assert_eq!(credentials.password, "secret");
    }

    #[test]
    fn test_complete_keeps_given_credentials() {
        struct Refuse;
        impl CredentialProvider for Refuse {
            fn credentials(&self, connection: &Connection) -> Result<Credentials> {
                Err(Error::Credentials {
                    node: connection.node.clone(),
                    message: "refused".into(),
                })
            }
        }

        let mut given = connection();
        given.password = Some("secret".into());
        let completed = complete(given.clone(), &Refuse).unwrap();
        assert_eq!(completed, given);

        assert!(complete(connection(), &Refuse).is_err());
    }
}
