use crate::di::Group;
use crate::error::BuildError;
use dashmap::DashMap;
use std::any::{Any, TypeId, type_name};
use std::sync::Arc;

/// Identifies a value group: its capability type plus its name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct GroupKey {
    capability: TypeId,
    capability_name: &'static str,
    name: String,
}

impl GroupKey {
    pub(crate) fn of<T: ?Sized + 'static>(name: &str) -> Self {
        Self {
            capability: TypeId::of::<T>(),
            capability_name: type_name::<T>(),
            name: name.to_string(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn capability_name(&self) -> &'static str {
        self.capability_name
    }
}

/// Thread-safe store of constructed singletons and sealed value groups.
pub struct Container {
    services: DashMap<TypeId, ServiceEntry>,
    groups: DashMap<GroupKey, Arc<dyn Any + Send + Sync>>,
}

#[derive(Clone)]
struct ServiceEntry {
    instance: Arc<dyn Any + Send + Sync>,
}

impl Container {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
            groups: DashMap::new(),
        }
    }

    pub fn register<T: 'static + Send + Sync>(&mut self, instance: T) -> &mut Self {
        let type_id = TypeId::of::<T>();
        let entry = ServiceEntry {
            instance: Arc::new(instance),
        };
        self.services.insert(type_id, entry);
        self
    }

    pub fn resolve<T: 'static + Send + Sync>(&self) -> Result<Arc<T>, BuildError> {
        let requested_type_id = TypeId::of::<T>();
        let entry = self.services.get(&requested_type_id).ok_or_else(|| {
            BuildError::DependencyNotFound {
                type_name: type_name::<T>().to_string(),
            }
        })?;
        entry
            .instance
            .clone()
            .downcast::<T>()
            .map_err(|_| BuildError::DowncastFailed {
                type_name: type_name::<T>().to_string(),
            })
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    /// Store a sealed group; later consumers get clones of this exact group
    pub(crate) fn insert_group<T>(&mut self, name: &str, group: Group<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.groups
            .insert(GroupKey::of::<T>(name), Arc::new(group));
    }

    /// A sealed group, or an empty one if nothing produced or decorated it
    pub fn group<T>(&self, name: &str) -> Result<Group<T>, BuildError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = GroupKey::of::<T>(name);
        match self.groups.get(&key) {
            Some(entry) => entry
                .value()
                .downcast_ref::<Group<T>>()
                .cloned()
                .ok_or_else(|| BuildError::DowncastFailed {
                    type_name: type_name::<Group<T>>().to_string(),
                }),
            None => Ok(Group::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct TestService {
        value: i32,
    }

    trait MyTrait: Send + Sync {
        fn get_value(&self) -> i32;
    }

    struct MyTraitImpl {
        value: i32,
    }

    impl MyTrait for MyTraitImpl {
        fn get_value(&self) -> i32 {
            self.value
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let mut container = Container::new();
        container.register(TestService { value: 42 });
        let service = container.resolve::<TestService>().unwrap();
        assert_eq!(service.value, 42);
        assert!(container.contains::<TestService>());
    }

    #[test]
    fn test_resolve_missing() {
        let container = Container::new();
        let err = container.resolve::<TestService>().unwrap_err();
        assert!(matches!(err, BuildError::DependencyNotFound { .. }));
    }

    #[test]
    fn test_groups_are_keyed_by_capability_and_name() {
        let mut container = Container::new();
        let mut group: Group<dyn MyTrait> = Group::new();
        group.insert("a", Arc::new(MyTraitImpl { value: 99 }));
        container.insert_group("values", group);

        let resolved = container.group::<dyn MyTrait>("values").unwrap();
        assert_eq!(resolved.get("a").unwrap().get_value(), 99);

        // Same name, different capability: a different (empty) group
        assert!(container.group::<TestService>("values").unwrap().is_empty());
        assert!(container.group::<dyn MyTrait>("other").unwrap().is_empty());
    }

    #[test]
    fn test_group_clones_share_members() {
        let mut container = Container::new();
        let mut group: Group<dyn MyTrait> = Group::new();
        group.insert("a", Arc::new(MyTraitImpl { value: 1 }));
        container.insert_group("values", group);

        let first = container.group::<dyn MyTrait>("values").unwrap();
        let second = container.group::<dyn MyTrait>("values").unwrap();
        assert!(Arc::ptr_eq(first.get("a").unwrap(), second.get("a").unwrap()));
    }
}
