// Constructor dependency declarations

use crate::Token;
use std::collections::BTreeMap;

/// Ordered constructor parameters of an injectable type.
///
/// Each slot is the positional type token of the parameter. A named override
/// supplied for an index takes precedence over the positional token at that
/// index.
///
/// # Examples
///
/// ```
/// use knit_core::{DependencyDeclaration, Token};
///
/// struct Repository;
///
/// // fn new(repo: Arc<Repository>, greeting: Arc<String>)
/// let declaration = DependencyDeclaration::new()
///     .param::<Repository>()
///     .param::<String>()
///     .inject(1, "config:greeting");
///
/// assert_eq!(declaration.len(), 2);
/// assert_eq!(declaration.override_at(1), Some(&Token::named("config:greeting")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyDeclaration {
    params: Vec<Token>,
    overrides: BTreeMap<usize, Token>,
}

impl DependencyDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional parameter of type `T`
    pub fn param<T: ?Sized + 'static>(self) -> Self {
        self.param_token(Token::of::<T>())
    }

    /// Append a positional parameter with an explicit token
    pub fn param_token(mut self, token: impl Into<Token>) -> Self {
        self.params.push(token.into());
        self
    }

    /// Bind the parameter at `index` to a named token
    pub fn inject(mut self, index: usize, token: impl Into<Token>) -> Self {
        self.overrides.insert(index, token.into());
        self
    }

    pub fn params(&self) -> &[Token] {
        &self.params
    }

    pub fn override_at(&self, index: usize) -> Option<&Token> {
        self.overrides.get(&index)
    }

    pub fn overrides(&self) -> impl Iterator<Item = (usize, &Token)> {
        self.overrides.iter().map(|(index, token)| (*index, token))
    }

    /// Number of constructor parameters, counting overrides past the last
    /// positional slot
    pub fn len(&self) -> usize {
        let past_positional = self
            .overrides
            .keys()
            .next_back()
            .map(|last| last + 1)
            .unwrap_or(0);
        self.params.len().max(past_positional)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
