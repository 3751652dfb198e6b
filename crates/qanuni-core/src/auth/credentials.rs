use secrecy::{ExposeSecret, SecretString};

/// Identity and password for a single sign-in.
///
/// Nothing here is persisted; the secret is only exposed while building the
/// login request body.
#[derive(Debug)]
pub struct Credentials {
    identity: String,
    password: SecretString,
}

impl Credentials {
    pub fn new(identity: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            password: SecretString::from(password.into()),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}
