// Core traits for constructible types

use crate::provider::Instance;
use crate::{DependencyDeclaration, Error, Result, Token};
use std::any::{Any, type_name};
use std::collections::VecDeque;
use std::sync::Arc;

/// A type the container can construct.
///
/// `dependencies` is the type's declaration: the ordered tokens of its
/// constructor parameters. The container resolves them in that order and hands
/// the instances to `construct` through [`Dependencies`].
///
/// # Examples
///
/// ```
/// use knit_core::{Container, Dependencies, DependencyDeclaration, Injectable, Lifecycle, Result};
/// use std::sync::Arc;
///
/// struct Repository;
///
/// impl Injectable for Repository {
///     fn construct(_: &mut Dependencies) -> Result<Self> {
///         Ok(Repository)
///     }
/// }
///
/// struct UserService {
///     repository: Arc<Repository>,
/// }
///
/// impl Injectable for UserService {
///     fn dependencies() -> DependencyDeclaration {
///         DependencyDeclaration::new().param::<Repository>()
///     }
///
///     fn construct(deps: &mut Dependencies) -> Result<Self> {
///         Ok(UserService { repository: deps.next()? })
///     }
/// }
///
/// let container = Container::new();
/// container
///     .register::<Repository>(Lifecycle::Singleton)?
///     .register::<UserService>(Lifecycle::Prototype)?;
///
/// let service = container.resolve::<UserService>()?;
/// let repository = container.resolve::<Repository>()?;
/// assert!(Arc::ptr_eq(&service.repository, &repository));
/// # Ok::<(), knit_core::Error>(())
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Constructor parameter declaration; empty by default
    fn dependencies() -> DependencyDeclaration {
        DependencyDeclaration::new()
    }

    /// Build an instance from resolved dependencies
    fn construct(deps: &mut Dependencies) -> Result<Self>;
}

/// Resolved constructor arguments, handed out in declaration order
pub struct Dependencies {
    args: VecDeque<(Token, Instance)>,
    position: usize,
}

impl Dependencies {
    pub(crate) fn new(args: Vec<(Token, Instance)>) -> Self {
        Self {
            args: args.into(),
            position: 0,
        }
    }

    /// Take the next argument as `T`
    pub fn next<T: Any + Send + Sync>(&mut self) -> Result<Arc<T>> {
        let index = self.position;
        let (token, instance) = self.args.pop_front().ok_or(Error::MissingArgument {
            index,
            expected: type_name::<T>(),
        })?;
        self.position += 1;

        instance.downcast::<T>().map_err(|_| Error::TypeMismatch {
            token,
            expected: type_name::<T>(),
        })
    }

    /// Number of arguments not yet taken
    pub fn remaining(&self) -> usize {
        self.args.len()
    }
}
