use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// A named value group: uniquely keyed members sharing one capability
///
/// Members keep the order their producers ran in. The same group can be
/// consumed as a map ([`Group::get`], [`Group::to_map`]) or as an ordered
/// sequence ([`Group::values`], [`Group::to_vec`]); both views always hold
/// the same members.
///
/// # Example
///
/// ```rust,ignore
/// let handlers: Group<dyn Handler> = scope.group("handlers")?;
/// let health = handlers.get("health");
/// for handler in handlers.values() {
///     router.mount(handler.path(), Arc::clone(handler));
/// }
/// ```
pub struct Group<T: ?Sized> {
    entries: Vec<(String, Arc<T>)>,
}

impl<T: ?Sized> Group<T> {
    /// Create an empty group
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert a member, replacing and returning any member with the same key
    ///
    /// A replaced member keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: Arc<T>) -> Option<Arc<T>> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Look up a member by key
    pub fn get(&self, key: &str) -> Option<&Arc<T>> {
        self.entries
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in member order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Members in order
    pub fn values(&self) -> impl Iterator<Item = &Arc<T>> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// `(key, member)` pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<T>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The ordered-sequence view
    pub fn to_vec(&self) -> Vec<Arc<T>> {
        self.values().cloned().collect()
    }

    /// The map view
    pub fn to_map(&self) -> HashMap<String, Arc<T>> {
        self.entries.iter().cloned().collect()
    }

    /// The set of keys, for comparing groups regardless of order
    pub fn key_set(&self) -> BTreeSet<String> {
        self.keys().map(str::to_string).collect()
    }

    /// Replace every member through `f`, keeping keys and order
    ///
    /// This is the usual body of a decorator:
    ///
    /// ```rust,ignore
    /// builder.decorate::<dyn Handler, _>("handlers", |group| {
    ///     Ok(group.map_values(|_key, inner| Arc::new(Timed::new(inner)) as Arc<dyn Handler>))
    /// })
    /// ```
    pub fn map_values<F>(self, mut f: F) -> Self
    where
        F: FnMut(&str, Arc<T>) -> Arc<T>,
    {
        let entries = self
            .entries
            .into_iter()
            .map(|(key, value)| {
                let value = f(&key, value);
                (key, value)
            })
            .collect();
        Self { entries }
    }
}

impl<T: ?Sized> Clone for Group<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T: ?Sized> Default for Group<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Group<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("keys", &self.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<T: ?Sized, K: Into<String>> FromIterator<(K, Arc<T>)> for Group<T> {
    fn from_iter<I: IntoIterator<Item = (K, Arc<T>)>>(iter: I) -> Self {
        let mut group = Self::new();
        for (key, value) in iter {
            group.insert(key, value);
        }
        group
    }
}

impl<T: ?Sized> IntoIterator for Group<T> {
    type Item = (String, Arc<T>);
    type IntoIter = std::vec::IntoIter<(String, Arc<T>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct Plain(&'static str);

    impl Greeter for Plain {
        fn greet(&self) -> String {
            self.0.to_string()
        }
    }

    struct Loud(Arc<dyn Greeter>);

    impl Greeter for Loud {
        fn greet(&self) -> String {
            self.0.greet().to_uppercase()
        }
    }

    fn greeters() -> Group<dyn Greeter> {
        let mut group: Group<dyn Greeter> = Group::new();
        group.insert("b", Arc::new(Plain("bonjour")));
        group.insert("a", Arc::new(Plain("hello")));
        group
    }

    #[test]
    fn test_views_hold_same_members() {
        let group = greeters();
        let ordered: Vec<String> = group.to_vec().iter().map(|g| g.greet()).collect();
        assert_eq!(ordered, vec!["bonjour", "hello"]);

        let map = group.to_map();
        assert_eq!(map.len(), 2);
        assert_eq!(map["a"].greet(), "hello");
        assert!(Arc::ptr_eq(&map["b"], &group.to_vec()[0]));
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut group = greeters();
        let old = group.insert("b", Arc::new(Plain("hola")));
        assert_eq!(old.unwrap().greet(), "bonjour");
        assert_eq!(group.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(group.get("b").unwrap().greet(), "hola");
    }

    #[test]
    fn test_map_values_keeps_keys() {
        let loud = greeters().map_values(|_, inner| Arc::new(Loud(inner)) as Arc<dyn Greeter>);
        assert_eq!(loud.key_set(), greeters().key_set());
        assert_eq!(loud.get("a").unwrap().greet(), "HELLO");
    }

    #[test]
    fn test_collect() {
        let group: Group<dyn Greeter> = greeters()
            .into_iter()
            .filter(|(key, _)| key == "a")
            .collect();
        assert_eq!(group.len(), 1);
        assert!(group.contains_key("a"));
        assert!(!group.contains_key("b"));
    }
}
