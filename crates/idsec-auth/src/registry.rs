use std::collections::BTreeMap;
use std::fmt;

use idsec_core::AuthMethod;

use crate::{AuthError, AuthSession, Authenticator, AuthenticatorDescriptor};

type AuthenticatorFactory = Box<dyn Fn() -> Box<dyn Authenticator> + Send + Sync>;

struct RegistryEntry {
    descriptor: AuthenticatorDescriptor,
    factory: AuthenticatorFactory,
}

/// Authenticators available to this process.
///
/// Built once at startup and passed by reference to whatever needs lookup.
#[derive(Default)]
pub struct AuthenticatorRegistry {
    entries: BTreeMap<&'static str, RegistryEntry>,
}

impl AuthenticatorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an authenticator factory under `descriptor.name`.
    ///
    /// # Errors
    /// Returns [`AuthError::DuplicateAuthenticator`] when the name is taken.
    pub fn register<F>(
        &mut self,
        descriptor: AuthenticatorDescriptor,
        factory: F,
    ) -> Result<(), AuthError>
    where
        F: Fn() -> Box<dyn Authenticator> + Send + Sync + 'static,
    {
        if self.entries.contains_key(descriptor.name) {
            return Err(AuthError::DuplicateAuthenticator(
                descriptor.name.to_string(),
            ));
        }

        self.entries.insert(
            descriptor.name,
            RegistryEntry {
                descriptor,
                factory: Box::new(factory),
            },
        );
        Ok(())
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    /// Descriptors of every registered authenticator.
    pub fn descriptors(&self) -> impl Iterator<Item = &AuthenticatorDescriptor> {
        self.entries.values().map(|entry| &entry.descriptor)
    }

    /// Descriptor registered under `name`.
    pub fn descriptor(&self, name: &str) -> Option<&AuthenticatorDescriptor> {
        self.entries.get(name).map(|entry| &entry.descriptor)
    }

    /// Returns `true` when `name` is registered and accepts `method`.
    pub fn supports(&self, name: &str, method: AuthMethod) -> bool {
        self.descriptor(name)
            .is_some_and(|descriptor| descriptor.supports(method))
    }

    /// Builds a fresh authenticator instance.
    ///
    /// # Errors
    /// Returns [`AuthError::UnknownAuthenticator`] for unregistered names.
    pub fn create(&self, name: &str) -> Result<Box<dyn Authenticator>, AuthError> {
        self.entries
            .get(name)
            .map(|entry| (entry.factory)())
            .ok_or_else(|| AuthError::UnknownAuthenticator(name.to_string()))
    }

    /// Builds a session around a fresh authenticator instance.
    ///
    /// # Errors
    /// Returns [`AuthError::UnknownAuthenticator`] for unregistered names.
    pub fn create_session(&self, name: &str) -> Result<AuthSession, AuthError> {
        self.create(name).map(AuthSession::new)
    }
}

impl fmt::Debug for AuthenticatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatorRegistry")
            .field("names", &self.names())
            .finish()
    }
}
