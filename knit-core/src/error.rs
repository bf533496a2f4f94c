// Error types for the knit container

use crate::Token;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Token already registered [token={token}]")]
    DuplicateToken { token: Token },

    #[error(
        "Error resolving token [token={token} registeredTokens=[{}]]",
        join_tokens(.registered, ", ")
    )]
    UnresolvedToken {
        token: Token,
        registered: Vec<Token>,
    },

    #[error("Cyclic dependency detected: {}", join_tokens(.path, " -> "))]
    CyclicDependency { path: Vec<Token> },

    #[error("Provider for token [{token}] does not produce a value of type {expected}")]
    TypeMismatch {
        token: Token,
        expected: &'static str,
    },

    #[error("Constructor argument {index} ({expected}) was not supplied")]
    MissingArgument {
        index: usize,
        expected: &'static str,
    },

    #[error("Dependency declaration already recorded for type {type_name}")]
    DuplicateDeclaration { type_name: String },

    #[error("Invalid dependency declaration: {0}")]
    InvalidDeclaration(String),

    #[error("Provider factory failed: {0}")]
    Factory(String),
}

impl Error {
    /// Build a factory failure from any displayable cause
    pub fn factory(message: impl std::fmt::Display) -> Self {
        Error::Factory(message.to_string())
    }

    /// The token this error is about, when there is a single one
    pub fn token(&self) -> Option<&Token> {
        match self {
            Error::DuplicateToken { token }
            | Error::UnresolvedToken { token, .. }
            | Error::TypeMismatch { token, .. } => Some(token),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

fn join_tokens(tokens: &[Token], separator: &str) -> String {
    tokens
        .iter()
        .map(Token::name)
        .collect::<Vec<_>>()
        .join(separator)
}
