// Declaration table and parameter token resolution

use crate::logging::{debug, trace};
use crate::{DependencyDeclaration, Error, Result, Token};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Looks up the constructor parameter tokens of injectable types.
///
/// Holds the declaration table: one immutable [`DependencyDeclaration`] per
/// type token. Resolution here is a lookup and merge only; recursive
/// construction happens in the container.
#[derive(Default)]
pub struct DependencyResolver {
    declarations: RwLock<HashMap<Token, Arc<DependencyDeclaration>>>,
}

impl DependencyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the declaration for `token`.
    ///
    /// Recording an identical declaration again is a no-op; a different one
    /// fails with [`Error::DuplicateDeclaration`].
    pub fn declare(&self, token: Token, declaration: DependencyDeclaration) -> Result<()> {
        let mut declarations = self.declarations.write();
        match declarations.get(&token) {
            Some(existing) if **existing == declaration => Ok(()),
            Some(_) => Err(Error::DuplicateDeclaration {
                type_name: token.name().to_string(),
            }),
            None => {
                debug!(
                    token = %token,
                    params = declaration.len(),
                    "Dependency declaration recorded"
                );
                declarations.insert(token, Arc::new(declaration));
                Ok(())
            }
        }
    }

    /// Record a declaration built by `declare` unless one already exists
    pub fn declare_if_absent<F>(&self, token: &Token, declare: F)
    where
        F: FnOnce() -> DependencyDeclaration,
    {
        let mut declarations = self.declarations.write();
        if !declarations.contains_key(token) {
            let declaration = declare();
            trace!(token = %token, params = declaration.len(), "Recording default declaration");
            declarations.insert(token.clone(), Arc::new(declaration));
        }
    }

    pub fn declaration(&self, token: &Token) -> Option<Arc<DependencyDeclaration>> {
        self.declarations.read().get(token).cloned()
    }

    /// Parameter tokens for `token`, in constructor order.
    ///
    /// Named overrides replace the positional token at their index. A type
    /// without a declaration has no parameters.
    pub fn resolve_params(&self, token: &Token) -> Result<Vec<Token>> {
        let Some(declaration) = self.declaration(token) else {
            return Ok(Vec::new());
        };

        let mut slots: Vec<Option<Token>> =
            declaration.params().iter().cloned().map(Some).collect();
        for (index, named) in declaration.overrides() {
            if index >= slots.len() {
                slots.resize(index + 1, None);
            }
            slots[index] = Some(named.clone());
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| {
                    Error::InvalidDeclaration(format!(
                        "parameter {} of {} has neither a type nor a named token",
                        index, token
                    ))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    struct C;

    #[test]
    fn test_undeclared_type_has_no_params() {
        let resolver = DependencyResolver::new();
        assert!(resolver.resolve_params(&Token::of::<A>()).unwrap().is_empty());
    }

    #[test]
    fn test_override_replaces_positional_token() {
        let resolver = DependencyResolver::new();
        resolver
            .declare(
                Token::of::<C>(),
                DependencyDeclaration::new()
                    .param::<A>()
                    .param::<String>()
                    .inject(1, "token:b"),
            )
            .unwrap();

        let params = resolver.resolve_params(&Token::of::<C>()).unwrap();
        assert_eq!(params, vec![Token::of::<A>(), Token::named("token:b")]);
    }

    #[test]
    fn test_gap_in_declaration_is_invalid() {
        let resolver = DependencyResolver::new();
        resolver
            .declare(Token::of::<C>(), DependencyDeclaration::new().inject(1, "b"))
            .unwrap();

        let err = resolver.resolve_params(&Token::of::<C>()).unwrap_err();
        assert!(matches!(err, Error::InvalidDeclaration(_)));
    }

    #[test]
    fn test_declarations_are_immutable() {
        let resolver = DependencyResolver::new();
        let declaration = DependencyDeclaration::new().param::<A>();
        resolver
            .declare(Token::of::<C>(), declaration.clone())
            .unwrap();
        resolver.declare(Token::of::<C>(), declaration).unwrap();

        let err = resolver
            .declare(Token::of::<C>(), DependencyDeclaration::new())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateDeclaration { .. }));
    }

    #[test]
    fn test_declare_if_absent_keeps_existing() {
        let resolver = DependencyResolver::new();
        resolver
            .declare(
                Token::of::<C>(),
                DependencyDeclaration::new().param::<String>().inject(0, "name"),
            )
            .unwrap();
        resolver.declare_if_absent(&Token::of::<C>(), DependencyDeclaration::new);

        let params = resolver.resolve_params(&Token::of::<C>()).unwrap();
        assert_eq!(params, vec![Token::named("name")]);
    }
}
