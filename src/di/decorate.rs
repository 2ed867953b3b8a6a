use crate::di::Group;
use crate::error::BuildError;
use std::any::type_name;
use std::collections::BTreeSet;

type DecoratorFn<T> = Box<dyn FnOnce(Group<T>) -> anyhow::Result<Group<T>> + Send>;

/// A one-shot transformation of a fully assembled value group
///
/// Decorators may replace or wrap members but must return exactly the keys
/// they were given.
pub struct Decorator<T: ?Sized> {
    func: DecoratorFn<T>,
    origin: &'static str,
}

impl<T: ?Sized> Decorator<T> {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Group<T>) -> anyhow::Result<Group<T>> + Send + 'static,
    {
        Self {
            func: Box::new(f),
            origin: type_name::<F>(),
        }
    }

    /// Fully-qualified name of the decorating function
    pub fn origin(&self) -> &'static str {
        self.origin
    }

    /// Run the decorator; key preservation is checked by the caller
    pub fn apply(self, group: Group<T>) -> anyhow::Result<Group<T>> {
        (self.func)(group)
    }
}

/// Reject a decorated group whose keys differ from the input's
pub(crate) fn verify_key_set<T: ?Sized>(
    group: &str,
    origin: &str,
    before: &BTreeSet<String>,
    after: &Group<T>,
) -> Result<(), BuildError> {
    let after = after.key_set();
    if *before == after {
        return Ok(());
    }
    Err(BuildError::DecoratorKeyMismatch {
        group: group.to_string(),
        origin: origin.to_string(),
        missing: before.difference(&after).cloned().collect(),
        unexpected: after.difference(before).cloned().collect(),
    })
}
