// Registry keys for the DI container

use std::any::{TypeId, type_name};
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of a resolvable dependency.
///
/// A token is either the nominal identity of a Rust type or an opaque string
/// name. Two named tokens with equal strings are the same token; two type
/// tokens are equal when their `TypeId`s are.
///
/// # Examples
///
/// ```
/// use knit_core::Token;
///
/// struct Database;
///
/// let by_type = Token::of::<Database>();
/// let by_name = Token::named("env:DATABASE_URL");
///
/// assert_eq!(by_type, Token::of::<Database>());
/// assert_eq!(by_name, Token::from("env:DATABASE_URL"));
/// assert_ne!(by_type, by_name);
/// ```
#[derive(Clone)]
pub enum Token {
    /// Nominal identity of a type
    Type { id: TypeId, name: &'static str },
    /// String-keyed binding
    Name(Cow<'static, str>),
}

impl Token {
    /// Token for the type `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Token::Type {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Token for a string name
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Token::Name(name.into())
    }

    /// Human readable name, used in diagnostics
    pub fn name(&self) -> &str {
        match self {
            Token::Type { name, .. } => name,
            Token::Name(name) => name,
        }
    }

    pub fn is_type(&self) -> bool {
        matches!(self, Token::Type { .. })
    }

    pub fn is_named(&self) -> bool {
        matches!(self, Token::Name(_))
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Token::Type { id: a, .. }, Token::Type { id: b, .. }) => a == b,
            (Token::Name(a), Token::Name(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Token::Type { id, .. } => {
                state.write_u8(0);
                id.hash(state);
            }
            Token::Name(name) => {
                state.write_u8(1);
                name.hash(state);
            }
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Type { name, .. } => write!(f, "Token::Type({})", name),
            Token::Name(name) => write!(f, "Token::Name({:?})", name),
        }
    }
}

impl From<&'static str> for Token {
    fn from(name: &'static str) -> Self {
        Token::Name(Cow::Borrowed(name))
    }
}

impl From<String> for Token {
    fn from(name: String) -> Self {
        Token::Name(Cow::Owned(name))
    }
}

impl From<&Token> for Token {
    fn from(token: &Token) -> Self {
        token.clone()
    }
}
