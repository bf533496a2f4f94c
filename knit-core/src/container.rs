// Dependency injection container

use crate::logging::{debug, trace};
use crate::provider::{Instance, Provider, ProviderRegistry};
use crate::resolver::DependencyResolver;
use crate::traits::{Dependencies, Injectable};
use crate::{DependencyDeclaration, Error, Lifecycle, Result, Token};
use once_cell::sync::Lazy;
use parking_lot::{Condvar, Mutex};
use std::any::{Any, type_name};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};

static GLOBAL: Lazy<Container> = Lazy::new(Container::new);

thread_local! {
    // Tokens under construction on this thread, tagged with their container
    static IN_FLIGHT: RefCell<Vec<(usize, Token)>> = const { RefCell::new(Vec::new()) };
}

enum Slot {
    Building(ThreadId),
    Ready(Instance),
}

#[derive(Default)]
struct Singletons {
    slots: HashMap<Token, Slot>,
    /// Slot each blocked thread is waiting on
    waiting: HashMap<ThreadId, Token>,
}

impl Singletons {
    /// Follow the wait-for chain starting at the thread building `token`.
    ///
    /// Returns the cycle when the chain leads back to `me`, in which case
    /// waiting would never end.
    fn wait_cycle(&self, token: &Token, owner: ThreadId, me: ThreadId) -> Option<Vec<Token>> {
        let mut path = vec![token.clone()];
        let mut owner = owner;
        for _ in 0..=self.waiting.len() {
            if owner == me {
                path.push(token.clone());
                return Some(path);
            }
            let next = self.waiting.get(&owner)?;
            match self.slots.get(next) {
                Some(Slot::Building(next_owner)) => {
                    path.push(next.clone());
                    owner = *next_owner;
                }
                _ => return None,
            }
        }
        None
    }
}

struct Inner {
    registry: ProviderRegistry,
    resolver: DependencyResolver,
    singletons: Mutex<Singletons>,
    settled: Condvar,
}

/// The dependency injection container.
///
/// Combines a [`ProviderRegistry`] with a [`DependencyResolver`] and owns the
/// singleton cache. Clones are handles to the same container; independently
/// created containers share nothing.
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

impl Container {
    pub fn new() -> Self {
        debug!("Creating new DI container");
        Self {
            inner: Arc::new(Inner {
                registry: ProviderRegistry::new(),
                resolver: DependencyResolver::new(),
                singletons: Mutex::new(Singletons::default()),
                settled: Condvar::new(),
            }),
        }
    }

    /// The process-wide default container
    pub fn global() -> &'static Container {
        &GLOBAL
    }

    /// Register `T` under its own type token, constructed from its declared
    /// dependencies.
    ///
    /// The declaration from [`Injectable::dependencies`] is recorded unless
    /// one was supplied earlier through [`Container::declare`].
    pub fn register<T: Injectable>(&self, lifecycle: Lifecycle) -> Result<&Self> {
        let token = Token::of::<T>();
        self.inner
            .resolver
            .declare_if_absent(&token, T::dependencies);
        self.inner
            .registry
            .register(token, Provider::new(lifecycle, construct::<T>))?;
        Ok(self)
    }

    /// Record the constructor declaration for `T` out-of-band
    pub fn declare<T: 'static>(&self, declaration: DependencyDeclaration) -> Result<&Self> {
        self.inner.resolver.declare(Token::of::<T>(), declaration)?;
        Ok(self)
    }

    /// Register a factory under `token` as a singleton
    pub fn provide<T, F>(&self, token: impl Into<Token>, factory: F) -> Result<&Self>
    where
        T: Send + Sync + 'static,
        F: Fn(&mut Resolver<'_>) -> Result<T> + Send + Sync + 'static,
    {
        self.provide_with(token, Lifecycle::Singleton, factory)
    }

    /// Register a factory under `token` with an explicit lifecycle
    pub fn provide_with<T, F>(
        &self,
        token: impl Into<Token>,
        lifecycle: Lifecycle,
        factory: F,
    ) -> Result<&Self>
    where
        T: Send + Sync + 'static,
        F: Fn(&mut Resolver<'_>) -> Result<T> + Send + Sync + 'static,
    {
        self.inner
            .registry
            .register(token.into(), erase(lifecycle, factory))?;
        Ok(self)
    }

    /// Register an already built value as a singleton
    pub fn provide_value<T: Send + Sync + 'static>(
        &self,
        token: impl Into<Token>,
        value: T,
    ) -> Result<&Self> {
        let instance: Instance = Arc::new(value);
        self.inner.registry.register(
            token.into(),
            Provider::new(Lifecycle::Singleton, move |_| Ok(instance.clone())),
        )?;
        Ok(self)
    }

    /// Register a factory, replacing any provider already bound to `token`.
    ///
    /// A cached singleton for the token is discarded. Meant for bindings that
    /// are re-established on every setup call, such as environment values;
    /// application code should use [`Container::provide`].
    pub fn provide_unchecked<T, F>(
        &self,
        token: impl Into<Token>,
        lifecycle: Lifecycle,
        factory: F,
    ) -> &Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut Resolver<'_>) -> Result<T> + Send + Sync + 'static,
    {
        let token = token.into();
        let replaced = self
            .inner
            .registry
            .register_unchecked(token.clone(), erase(lifecycle, factory));
        if replaced.is_some() {
            let mut singletons = self.inner.singletons.lock();
            if matches!(singletons.slots.get(&token), Some(Slot::Ready(_))) {
                singletons.slots.remove(&token);
            }
        }
        self
    }

    /// Resolve `T` by its type token
    pub fn resolve<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        Resolver::new(self).resolve()
    }

    /// Resolve the instance bound to a token as `T`
    pub fn resolve_token<T: Any + Send + Sync>(&self, token: &Token) -> Result<Arc<T>> {
        Resolver::new(self).resolve_token(token)
    }

    /// Resolve the instance bound to a named token as `T`
    pub fn resolve_named<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        self.resolve_token(&Token::named(name.to_string()))
    }

    /// Resolve the type-erased instance bound to a token
    pub fn resolve_instance(&self, token: &Token) -> Result<Instance> {
        Resolver::new(self).resolve_instance(token)
    }

    pub fn is_registered(&self, token: &Token) -> bool {
        self.inner.registry.contains(token)
    }

    pub fn has<T: 'static>(&self) -> bool {
        self.is_registered(&Token::of::<T>())
    }

    pub fn registered_tokens(&self) -> Vec<Token> {
        self.inner.registry.tokens()
    }

    /// Parameter tokens the container will resolve to construct `token`
    pub fn resolve_params(&self, token: &Token) -> Result<Vec<Token>> {
        self.inner.resolver.resolve_params(token)
    }

    fn id(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    fn instantiate(
        &self,
        token: &Token,
        provider: &Provider,
        resolver: &mut Resolver<'_>,
    ) -> Result<Instance> {
        match provider.lifecycle() {
            Lifecycle::Prototype => {
                trace!(token = %token, "Creating prototype instance");
                provider.create(resolver)
            }
            Lifecycle::Singleton => {
                let build = match self.claim_singleton(token)? {
                    Ok(instance) => return Ok(instance),
                    Err(build) => build,
                };
                debug!(token = %token, "Constructing singleton");
                let result = provider.create(resolver);
                build.finish(result.as_ref().ok().cloned());
                result
            }
        }
    }

    /// Return the cached singleton, or mark `token` as being built by this
    /// thread.
    ///
    /// Blocks while another thread builds the same token, unless that thread
    /// is itself waiting on something this thread builds.
    fn claim_singleton<'a>(
        &'a self,
        token: &'a Token,
    ) -> Result<std::result::Result<Instance, SingletonBuild<'a>>> {
        let me = thread::current().id();
        let mut singletons = self.inner.singletons.lock();
        loop {
            match singletons.slots.get(token) {
                Some(Slot::Ready(instance)) => {
                    trace!(token = %token, "Singleton cache hit");
                    return Ok(Ok(instance.clone()));
                }
                Some(Slot::Building(owner)) => {
                    let owner = *owner;
                    if let Some(path) = singletons.wait_cycle(token, owner, me) {
                        debug!(token = %token, "Dependency cycle detected across threads");
                        return Err(Error::CyclicDependency { path });
                    }
                    singletons.waiting.insert(me, token.clone());
                    self.inner.settled.wait(&mut singletons);
                    singletons.waiting.remove(&me);
                }
                None => {
                    singletons.slots.insert(token.clone(), Slot::Building(me));
                    return Ok(Err(SingletonBuild {
                        inner: &self.inner,
                        token,
                        done: false,
                    }));
                }
            }
        }
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("providers", &self.inner.registry.len())
            .field("singletons", &self.inner.singletons.lock().slots.len())
            .finish()
    }
}

/// A singleton slot claimed by the current thread.
///
/// Publishes the instance on success. A failed or unwinding factory clears
/// the slot so a later resolve may retry.
struct SingletonBuild<'a> {
    inner: &'a Inner,
    token: &'a Token,
    done: bool,
}

impl SingletonBuild<'_> {
    fn finish(mut self, instance: Option<Instance>) {
        self.settle(instance);
    }

    fn settle(&mut self, instance: Option<Instance>) {
        {
            let mut singletons = self.inner.singletons.lock();
            match instance {
                Some(instance) => {
                    singletons
                        .slots
                        .insert(self.token.clone(), Slot::Ready(instance));
                }
                None => {
                    singletons.slots.remove(self.token);
                }
            }
        }
        self.done = true;
        self.inner.settled.notify_all();
    }
}

impl Drop for SingletonBuild<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.settle(None);
        }
    }
}

/// Entry on this thread's in-flight stack, popped on drop
struct InFlight;

impl InFlight {
    fn enter(container: usize, token: &Token) -> std::result::Result<Self, Vec<Token>> {
        IN_FLIGHT.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(start) = stack
                .iter()
                .position(|(owner, entry)| *owner == container && entry == token)
            {
                let mut cycle: Vec<Token> = stack[start..]
                    .iter()
                    .filter(|(owner, _)| *owner == container)
                    .map(|(_, entry)| entry.clone())
                    .collect();
                cycle.push(token.clone());
                return Err(cycle);
            }
            stack.push((container, token.clone()));
            Ok(InFlight)
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let _ = IN_FLIGHT.try_with(|stack| stack.borrow_mut().pop());
    }
}

/// Resolution context handed to provider factories.
///
/// The chain of tokens under construction is kept per thread, so a factory
/// that resolves through a captured [`Container`] handle continues the same
/// chain. A dependency cycle fails with [`Error::CyclicDependency`] instead of
/// recursing forever.
pub struct Resolver<'c> {
    container: &'c Container,
}

impl<'c> Resolver<'c> {
    fn new(container: &'c Container) -> Self {
        Self { container }
    }

    pub(crate) fn container(&self) -> &'c Container {
        self.container
    }

    /// Tokens under construction in this container, outermost first
    pub fn path(&self) -> Vec<Token> {
        let id = self.container.id();
        IN_FLIGHT.with(|stack| {
            stack
                .borrow()
                .iter()
                .filter(|(owner, _)| *owner == id)
                .map(|(_, token)| token.clone())
                .collect()
        })
    }

    pub fn resolve<T: Any + Send + Sync>(&mut self) -> Result<Arc<T>> {
        self.resolve_token(&Token::of::<T>())
    }

    pub fn resolve_named<T: Any + Send + Sync>(&mut self, name: &str) -> Result<Arc<T>> {
        self.resolve_token(&Token::named(name.to_string()))
    }

    pub fn resolve_token<T: Any + Send + Sync>(&mut self, token: &Token) -> Result<Arc<T>> {
        self.resolve_instance(token)?
            .downcast::<T>()
            .map_err(|_| Error::TypeMismatch {
                token: token.clone(),
                expected: type_name::<T>(),
            })
    }

    pub fn resolve_instance(&mut self, token: &Token) -> Result<Instance> {
        let container = self.container;
        let _entry = InFlight::enter(container.id(), token).map_err(|path| {
            debug!(token = %token, "Dependency cycle detected");
            Error::CyclicDependency { path }
        })?;

        let provider = container.inner.registry.lookup(token)?;
        container.instantiate(token, &provider, self)
    }
}

fn erase<T, F>(lifecycle: Lifecycle, factory: F) -> Provider
where
    T: Send + Sync + 'static,
    F: Fn(&mut Resolver<'_>) -> Result<T> + Send + Sync + 'static,
{
    Provider::new(lifecycle, move |resolver| {
        factory(resolver).map(|value| Arc::new(value) as Instance)
    })
}

fn construct<T: Injectable>(resolver: &mut Resolver<'_>) -> Result<Instance> {
    let token = Token::of::<T>();
    let params = resolver.container().resolve_params(&token)?;

    let mut args = Vec::with_capacity(params.len());
    for param in params {
        let instance = resolver.resolve_instance(&param)?;
        args.push((param, instance));
    }

    let instance = T::construct(&mut Dependencies::new(args))?;
    Ok(Arc::new(instance))
}
