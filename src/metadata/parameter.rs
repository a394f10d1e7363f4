use crate::{
    collections::{Collection, CollectionHooks},
    metadata::token::Token,
};

/// A declared method parameter.
///
/// `method` and `index` are back-references maintained by the owning
/// [`ParameterCollection`]; a parameter that is not part of any collection has neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDefinition {
    /// Parameter name
    pub name: String,
    index: Option<usize>,
    method: Option<Token>,
}

impl ParameterDefinition {
    /// Create a detached parameter.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        ParameterDefinition {
            name: name.into(),
            index: None,
            method: None,
        }
    }

    /// Zero-based position within the owning method's parameter list.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Token of the owning method.
    #[must_use]
    pub fn method(&self) -> Option<Token> {
        self.method
    }

    fn attach(&mut self, owner: Token, index: usize) {
        self.method = Some(owner);
        self.index = Some(index);
    }

    fn detach(&mut self) {
        self.method = None;
        self.index = None;
    }
}

/// Hooks that keep each parameter's owner and index in sync with its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterHooks {
    owner: Token,
}

impl ParameterHooks {
    /// Hooks for the parameter list of the method identified by `owner`.
    #[must_use]
    pub fn new(owner: Token) -> Self {
        ParameterHooks { owner }
    }

    /// Token of the method owning the list.
    #[must_use]
    pub fn owner(&self) -> Token {
        self.owner
    }
}

impl CollectionHooks<ParameterDefinition> for ParameterHooks {
    fn on_add(&mut self, item: &mut ParameterDefinition, index: usize, _: &mut [ParameterDefinition]) {
        item.attach(self.owner, index);
    }

    fn on_insert(
        &mut self,
        item: &mut ParameterDefinition,
        index: usize,
        items: &mut [ParameterDefinition],
    ) {
        item.attach(self.owner, index);
        for (position, parameter) in items.iter_mut().enumerate().skip(index) {
            parameter.index = Some(position + 1);
        }
    }

    fn on_insert_range(
        &mut self,
        batch: &mut [ParameterDefinition],
        index: usize,
        items: &mut [ParameterDefinition],
    ) {
        for (position, item) in batch.iter_mut().enumerate() {
            item.attach(self.owner, index + position);
        }
        let shift = batch.len();
        for (position, parameter) in items.iter_mut().enumerate().skip(index) {
            parameter.index = Some(position + shift);
        }
    }

    fn on_set(&mut self, item: &mut ParameterDefinition, index: usize, items: &mut [ParameterDefinition]) {
        item.attach(self.owner, index);
        items[index].detach();
    }

    fn on_remove(
        &mut self,
        item: &mut ParameterDefinition,
        index: usize,
        items: &mut [ParameterDefinition],
    ) {
        item.detach();
        for (position, parameter) in items.iter_mut().enumerate().skip(index) {
            parameter.index = Some(position);
        }
    }

    fn on_clear(&mut self, items: &mut [ParameterDefinition]) {
        items.iter_mut().for_each(ParameterDefinition::detach);
    }
}

/// The parameter list of one method.
pub type ParameterCollection = Collection<ParameterDefinition, ParameterHooks>;

impl ParameterCollection {
    /// Empty parameter list owned by the method identified by `owner`.
    #[must_use]
    pub fn for_method(owner: Token) -> Self {
        Collection::with_hooks(ParameterHooks::new(owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: Token = Token(0x0600_0001);

    fn indices(parameters: &ParameterCollection) -> Vec<Option<usize>> {
        parameters.iter().map(ParameterDefinition::index).collect()
    }

    fn names(parameters: &ParameterCollection) -> Vec<&str> {
        parameters.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn add_attaches() {
        let mut parameters = ParameterCollection::for_method(OWNER);
        parameters.add(ParameterDefinition::new("a"));
        parameters.add_range([ParameterDefinition::new("b"), ParameterDefinition::new("c")]);

        assert_eq!(indices(&parameters), vec![Some(0), Some(1), Some(2)]);
        assert!(parameters.iter().all(|p| p.method() == Some(OWNER)));
    }

    #[test]
    fn insert_renumbers() {
        let mut parameters = ParameterCollection::for_method(OWNER);
        parameters.add_range(["a", "b", "c"].map(ParameterDefinition::new));

        parameters.insert(1, ParameterDefinition::new("x")).unwrap();
        assert_eq!(names(&parameters), vec!["a", "x", "b", "c"]);
        assert_eq!(indices(&parameters), vec![Some(0), Some(1), Some(2), Some(3)]);

        parameters
            .insert_range(0, ["y", "z"].map(ParameterDefinition::new))
            .unwrap();
        assert_eq!(names(&parameters), vec!["y", "z", "a", "x", "b", "c"]);
        assert_eq!(
            indices(&parameters),
            (0..6).map(Some).collect::<Vec<_>>()
        );
    }

    #[test]
    fn remove_detaches_and_renumbers() {
        let mut parameters = ParameterCollection::for_method(OWNER);
        parameters.add_range(["a", "b", "c"].map(ParameterDefinition::new));

        let removed = parameters.remove_at(0).unwrap();
        assert_eq!(removed.index(), None);
        assert_eq!(removed.method(), None);
        assert_eq!(names(&parameters), vec!["b", "c"]);
        assert_eq!(indices(&parameters), vec![Some(0), Some(1)]);
    }

    #[test]
    fn set_replaces() {
        let mut parameters = ParameterCollection::for_method(OWNER);
        parameters.add_range(["a", "b"].map(ParameterDefinition::new));

        let old = parameters.set(1, ParameterDefinition::new("q")).unwrap();
        assert_eq!(old.name, "b");
        assert_eq!(old.method(), None);
        assert_eq!(parameters[1].index(), Some(1));
        assert_eq!(parameters[1].method(), Some(OWNER));
    }
}
