//! トポロジー（コンポーネントID）管理
//!
//! Accessor identities live in a hierarchy of root → workshop → accessor
//! nodes kept by a [`TopologyStore`].

pub mod resolver;
pub mod store;

pub use resolver::IdentityResolver;
pub use store::{InMemoryTopologyStore, TopologyStore};
