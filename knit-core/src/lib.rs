// Core library for the knit dependency injection runtime
// Tokens, providers, declarations and the container that wires them together

pub mod container;
pub mod declaration;
pub mod error;
pub mod logging;
pub mod provider;
pub mod resolver;
pub mod token;
pub mod traits;

pub use container::{Container, Resolver};
pub use declaration::DependencyDeclaration;
pub use error::{Error, Result};
pub use provider::{Factory, Instance, Lifecycle, Provider, ProviderRegistry};
pub use resolver::DependencyResolver;
pub use token::Token;
pub use traits::{Dependencies, Injectable};
