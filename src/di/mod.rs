mod container;
mod decorate;
mod group;

pub use container::Container;
pub(crate) use container::GroupKey;
pub use decorate::Decorator;
pub(crate) use decorate::verify_key_set;
pub use group::Group;
