//! Shared utilities and strongly-typed common values for workspace crates.
//!
//! ```rust
//! use pcommon::{MetadataMap, SessionId, TurnId};
//!
//! let session = SessionId::from("session-1");
//! let turn = TurnId::new("turn-1");
//! let mut metadata = MetadataMap::new();
//! metadata.insert("pet".to_string(), "mochi".to_string());
//!
//! assert_eq!(session.as_str(), "session-1");
//! assert_eq!(turn.to_string(), "turn-1");
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use pcommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod context {
    //! Shared metadata and cross-crate identifier newtypes.
    //!
    //! ```rust
    //! use pcommon::{SessionId, TurnId};
    //!
    //! let session = SessionId::new("session-42");
    //! let first = TurnId::generate();
    //! let second = TurnId::generate();
    //!
    //! assert_eq!(session.to_string(), "session-42");
    //! assert_ne!(first, second);
    //! ```

    use std::collections::HashMap;
    use std::fmt::{Display, Formatter};
    use std::sync::atomic::{AtomicU64, Ordering};

    pub type MetadataMap = HashMap<String, String>;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct SessionId(String);

    impl SessionId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Display for SessionId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<String> for SessionId {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<&str> for SessionId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }

    static NEXT_TURN: AtomicU64 = AtomicU64::new(1);

    /// Identifies one conversation turn across lifecycle phases.
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct TurnId(String);

    impl TurnId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        /// Process-unique id of the form `turn-<n>`.
        pub fn generate() -> Self {
            let next = NEXT_TURN.fetch_add(1, Ordering::Relaxed);
            Self(format!("turn-{next}"))
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Display for TurnId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<&str> for TurnId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }
}

pub mod registry {
    //! Insertion-ordered registry map used by runtime registries.
    //!
    //! ```rust
    //! use pcommon::Registry;
    //!
    //! let mut registry = Registry::new();
    //! registry.insert("beta".to_string(), 2_u32);
    //! registry.insert("alpha".to_string(), 1_u32);
    //!
    //! assert_eq!(registry.get("alpha"), Some(&1));
    //! assert_eq!(registry.keys().cloned().collect::<Vec<_>>(), vec!["beta", "alpha"]);
    //! ```

    use std::borrow::Borrow;
    use std::collections::HashMap;
    use std::hash::Hash;

    #[derive(Debug, Clone)]
    pub struct Registry<K, V> {
        items: HashMap<K, V>,
        order: Vec<K>,
    }

    impl<K, V> Default for Registry<K, V>
    where
        K: Eq + Hash,
    {
        fn default() -> Self {
            Self {
                items: HashMap::new(),
                order: Vec::new(),
            }
        }
    }

    impl<K, V> Registry<K, V>
    where
        K: Eq + Hash + Clone,
    {
        pub fn new() -> Self {
            Self::default()
        }

        /// Replacing an existing key keeps its original position.
        pub fn insert(&mut self, key: K, value: V) -> Option<V> {
            let previous = self.items.insert(key.clone(), value);
            if previous.is_none() {
                self.order.push(key);
            }
            previous
        }

        pub fn get<Q>(&self, key: &Q) -> Option<&V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.get(key)
        }

        pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            let removed = self.items.remove(key)?;
            self.order
                .retain(|existing| <K as Borrow<Q>>::borrow(existing) != key);
            Some(removed)
        }

        pub fn contains_key<Q>(&self, key: &Q) -> bool
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.contains_key(key)
        }

        pub fn keys(&self) -> impl Iterator<Item = &K> {
            self.order.iter()
        }

        pub fn values(&self) -> impl Iterator<Item = &V> {
            self.order.iter().filter_map(|key| self.items.get(key))
        }

        pub fn len(&self) -> usize {
            self.items.len()
        }

        pub fn is_empty(&self) -> bool {
            self.items.is_empty()
        }
    }
}

pub use context::{MetadataMap, SessionId, TurnId};
pub use future::BoxFuture;
pub use registry::Registry;
