//! Fresh-identifier generation against a known context.
//!
//! Several rewrites must invent names that collide with nothing already in
//! scope: summand variables are renamed before substitution in the
//! translator, cloned equations get `_allow_k` suffixes, and the
//! preprocessing step wraps bare formulas in a fresh fixpoint variable.
//! [`NameGenerator`] records every identifier of the context and produces
//! variants with a numeric postfix until an unused one is found.

use std::collections::HashSet;

/// Generates identifiers that do not occur in a recorded context.
///
/// Generated names are added to the context, so repeated requests for the
/// same hint yield distinct names.
#[derive(Clone, Default)]
pub struct NameGenerator {
    context: HashSet<String>,
}

impl NameGenerator {
    /// Creates a generator with an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an identifier to the context.
    pub fn add_identifier(&mut self, name: &str) {
        self.context.insert(name.to_string());
    }

    /// Adds every identifier of `names` to the context.
    pub fn add_identifiers<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        for name in names {
            self.add_identifier(name);
        }
    }

    /// Removes one identifier from the context.
    ///
    /// Used when a generated name is only needed locally and must not block
    /// later requests.
    pub fn remove_identifier(&mut self, name: &str) {
        self.context.remove(name);
    }

    /// Returns true if `name` occurs in the context.
    pub fn has_identifier(&self, name: &str) -> bool {
        self.context.contains(name)
    }

    /// Returns `hint` if it is unused, otherwise `hint` with the smallest
    /// numeric postfix that makes it unused. The result is added to the
    /// context.
    pub fn fresh(&mut self, hint: &str) -> String {
        if !self.context.contains(hint) {
            self.context.insert(hint.to_string());
            return hint.to_string();
        }
        let mut i: u64 = 0;
        loop {
            let candidate = format!("{hint}{i:02}");
            if !self.context.contains(&candidate) {
                self.context.insert(candidate.clone());
                return candidate;
            }
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unused_hint_is_returned_verbatim() {
        let mut gen = NameGenerator::new();
        assert_eq!(gen.fresh("X"), "X");
    }

    #[test]
    fn used_hint_gets_postfix() {
        let mut gen = NameGenerator::new();
        gen.add_identifier("X");
        assert_eq!(gen.fresh("X"), "X00");
        assert_eq!(gen.fresh("X"), "X01");
    }

    #[test]
    fn removed_identifier_can_be_reused() {
        let mut gen = NameGenerator::new();
        let name = gen.fresh("t");
        gen.remove_identifier(&name);
        assert_eq!(gen.fresh("t"), "t");
    }
}
