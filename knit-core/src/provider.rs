// Provider descriptors and the token registry

use crate::container::Resolver;
use crate::logging::{debug, trace, warn};
use crate::{Error, Result, Token};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A type-erased, shareable instance produced by a provider
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Factory invoked to produce an instance. Nested dependencies are resolved
/// through the supplied [`Resolver`].
pub type Factory = Arc<dyn Fn(&mut Resolver<'_>) -> Result<Instance> + Send + Sync>;

/// How often a provider's factory runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    /// At most once per container; every resolve shares the instance
    #[default]
    Singleton,
    /// On every resolve
    Prototype,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Singleton => "singleton",
            Lifecycle::Prototype => "prototype",
        }
    }
}

/// A factory plus its lifecycle
#[derive(Clone)]
pub struct Provider {
    factory: Factory,
    lifecycle: Lifecycle,
}

impl Provider {
    pub fn new<F>(lifecycle: Lifecycle, factory: F) -> Self
    where
        F: Fn(&mut Resolver<'_>) -> Result<Instance> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            lifecycle,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub(crate) fn create(&self, resolver: &mut Resolver<'_>) -> Result<Instance> {
        (self.factory)(resolver)
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

/// Mapping from token to provider.
///
/// Registration is additive: a token maps to one provider for the lifetime of
/// the registry. [`ProviderRegistry::register_unchecked`] is the only way to
/// replace an entry.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<Token, Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider, failing if the token is already taken
    pub fn register(&self, token: Token, provider: Provider) -> Result<()> {
        trace!(token = %token, "Acquiring write lock for registration");
        let mut providers = self.providers.write();

        if providers.contains_key(&token) {
            debug!(token = %token, "Rejected duplicate registration");
            return Err(Error::DuplicateToken { token });
        }

        debug!(
            token = %token,
            lifecycle = provider.lifecycle().as_str(),
            "Provider registered"
        );
        providers.insert(token, provider);
        Ok(())
    }

    /// Register a provider, replacing any existing entry for the token.
    ///
    /// Returns the replaced provider. Ordinary application code should use
    /// [`ProviderRegistry::register`].
    pub fn register_unchecked(&self, token: Token, provider: Provider) -> Option<Provider> {
        let previous = self.providers.write().insert(token.clone(), provider);
        if previous.is_some() {
            warn!(token = %token, "Provider replaced through unchecked registration");
        } else {
            debug!(token = %token, "Provider registered (unchecked)");
        }
        previous
    }

    /// Find the provider for a token
    pub fn lookup(&self, token: &Token) -> Result<Provider> {
        let found = self.providers.read().get(token).cloned();
        found.ok_or_else(|| {
            debug!(token = %token, "No provider registered for token");
            Error::UnresolvedToken {
                token: token.clone(),
                registered: self.tokens(),
            }
        })
    }

    pub fn contains(&self, token: &Token) -> bool {
        self.providers.read().contains_key(token)
    }

    /// All registered tokens, sorted by name
    pub fn tokens(&self) -> Vec<Token> {
        let mut tokens: Vec<Token> = self.providers.read().keys().cloned().collect();
        tokens.sort_by(|a, b| a.name().cmp(b.name()));
        tokens
    }

    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }
}
