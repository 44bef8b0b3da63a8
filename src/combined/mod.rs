//! Combination of several configurations into one tree.
//!
//! A [`CombinedConfiguration`] holds an ordered list of child
//! configurations. Its content is built by grafting each child's tree below
//! the child's `at` path and folding the results left to right through a
//! [`NodeCombiner`]; earlier children have priority. The combined tree is
//! cached and rebuilt lazily on the first read after any change: adding or
//! removing a child, switching the combiner, or a change notification from
//! one of the children.

mod entry;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use cfgtree_node::{DefaultExpressionEngine, ExpressionEngine, Node, NodeCombiner};
use serde_json::Value;
use tracing::{debug, trace};

use crate::composite::same_configuration;
use crate::configuration::{Configuration, SharedConfiguration};
use crate::error::{Error, Result};
use crate::event::{ConfigurationEvent, ConfigurationListener, EventKind, EventSource};
use crate::tree::ops;

use entry::ConfigData;

/// A configuration merging the trees of its children.
///
/// Writes through the [`Configuration`] interface change the cached
/// combined tree only. Children are never modified, and such writes are
/// lost on the next rebuild.
pub struct CombinedConfiguration {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<State>,
    dirty: AtomicBool,
    events: EventSource,
}

struct State {
    entries: Vec<ConfigData>,
    names: HashMap<String, SharedConfiguration>,
    combiner: NodeCombiner,
    engine: Arc<dyn ExpressionEngine>,
    root: Option<Arc<Node>>,
}

/// Marks the owning combined configuration dirty when a child changes.
struct InvalidationListener {
    inner: Weak<Inner>,
}

impl ConfigurationListener for InvalidationListener {
    fn configuration_changed(&self, event: &ConfigurationEvent) {
        if event.before_update {
            return;
        }
        if let Some(inner) = self.inner.upgrade() {
            trace!(kind = ?event.kind, key = ?event.key, "child configuration changed");
            inner.invalidate();
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn invalidate(&self) {
        self.dirty.store(true, Ordering::Release);
        self.events.fire(&ConfigurationEvent::invalidate());
    }

    /// The cached tree, rebuilt first if anything changed since it was made.
    fn current_root(&self, state: &mut State) -> Result<Arc<Node>> {
        let dirty = self.dirty.swap(false, Ordering::AcqRel);
        if let (false, Some(root)) = (dirty, state.root.as_ref()) {
            return Ok(Arc::clone(root));
        }

        match state.build() {
            Ok(root) => {
                let root = Arc::new(root);
                state.root = Some(Arc::clone(&root));
                Ok(root)
            }
            Err(err) => {
                self.dirty.store(true, Ordering::Release);
                Err(err)
            }
        }
    }
}

impl State {
    fn build(&self) -> Result<Node> {
        let mut combined: Option<Node> = None;
        for entry in &self.entries {
            let root = entry.transformed_root()?;
            combined = Some(match combined {
                Some(left) => self.combiner.combine_below(&left, &root, entry.at_path()),
                None => root,
            });
        }
        debug!(
            configurations = self.entries.len(),
            combiner = ?self.combiner.kind(),
            "rebuilt combined configuration"
        );
        Ok(combined.unwrap_or_else(Node::root))
    }
}

impl Default for CombinedConfiguration {
    fn default() -> Self {
        Self::new(NodeCombiner::default())
    }
}

impl fmt::Debug for CombinedConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("CombinedConfiguration")
            .field("configurations", &state.entries.len())
            .field("combiner", &state.combiner)
            .field("dirty", &self.inner.dirty.load(Ordering::Acquire))
            .finish()
    }
}

impl CombinedConfiguration {
    pub fn new(combiner: NodeCombiner) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    entries: Vec::new(),
                    names: HashMap::new(),
                    combiner,
                    engine: Arc::new(DefaultExpressionEngine::default()),
                    root: None,
                }),
                dirty: AtomicBool::new(true),
                events: EventSource::new(),
            }),
        }
    }

    /// Engine used for keys passed to the [`Configuration`] methods.
    pub fn with_expression_engine(self, engine: Arc<dyn ExpressionEngine>) -> Self {
        self.inner.lock().engine = engine;
        self
    }

    pub fn expression_engine(&self) -> Arc<dyn ExpressionEngine> {
        Arc::clone(&self.inner.lock().engine)
    }

    /// Append a child.
    ///
    /// `name` must be unique among the children. `at` is a key naming the
    /// node below which the child's content appears; without it the content
    /// sits at the root.
    pub fn add_configuration(
        &self,
        config: SharedConfiguration,
        name: Option<&str>,
        at: Option<&str>,
    ) -> Result<()> {
        {
            let mut state = self.inner.lock();
            if let Some(name) = name {
                if state.names.contains_key(name) {
                    return Err(Error::DuplicateName(name.to_string()));
                }
            }

            let listener = Arc::new(InvalidationListener {
                inner: Arc::downgrade(&self.inner),
            });
            let id = config.event_source().add_listener(listener);
            let data = match ConfigData::new(
                Arc::clone(&config),
                name.map(str::to_string),
                at.map(str::to_string),
                id,
            ) {
                Ok(data) => data,
                Err(err) => {
                    config.event_source().remove_listener(id);
                    return Err(err);
                }
            };

            if let Some(name) = name {
                state.names.insert(name.to_string(), Arc::clone(&config));
            }
            state.entries.push(data);
            debug!(name, at, total = state.entries.len(), "added configuration");
        }
        self.invalidate();
        Ok(())
    }

    /// Remove a child by identity. Returns whether it was a child.
    pub fn remove_configuration(&self, config: &SharedConfiguration) -> bool {
        self.remove_where(|entries| {
            entries
                .iter()
                .position(|e| same_configuration(&e.config, config))
        })
        .is_some()
    }

    pub fn remove_configuration_by_name(&self, name: &str) -> Option<SharedConfiguration> {
        self.remove_where(|entries| entries.iter().position(|e| e.name.as_deref() == Some(name)))
    }

    pub fn remove_configuration_at(&self, index: usize) -> Option<SharedConfiguration> {
        self.remove_where(|entries| (index < entries.len()).then_some(index))
    }

    /// Remove the child `find` picks. Lookup and removal share one lock.
    fn remove_where(
        &self,
        find: impl FnOnce(&[ConfigData]) -> Option<usize>,
    ) -> Option<SharedConfiguration> {
        let removed = {
            let mut state = self.inner.lock();
            let index = find(&state.entries)?;
            let data = state.entries.remove(index);
            if let Some(name) = &data.name {
                state.names.remove(name);
            }
            debug!(name = ?data.name, index, "removed configuration");
            data
        };
        removed.config.event_source().remove_listener(removed.listener);
        self.invalidate();
        Some(removed.config)
    }

    /// Remove all children.
    pub fn clear(&self) -> Result<()> {
        self.inner.events.around(EventKind::Clear, None, None, || {
            let removed = {
                let mut state = self.inner.lock();
                state.names.clear();
                std::mem::take(&mut state.entries)
            };
            for data in &removed {
                data.config.event_source().remove_listener(data.listener);
            }
            Ok(())
        })?;
        self.invalidate();
        Ok(())
    }

    pub fn number_of_configurations(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn configuration(&self, index: usize) -> Option<SharedConfiguration> {
        self.inner
            .lock()
            .entries
            .get(index)
            .map(|e| Arc::clone(&e.config))
    }

    pub fn configuration_by_name(&self, name: &str) -> Option<SharedConfiguration> {
        self.inner.lock().names.get(name).cloned()
    }

    /// Names of all children in order, `None` for unnamed ones.
    pub fn configuration_names(&self) -> Vec<Option<String>> {
        self.inner
            .lock()
            .entries
            .iter()
            .map(|e| e.name.clone())
            .collect()
    }

    /// The `at` path of the child at `index`.
    pub fn configuration_at_path(&self, index: usize) -> Option<String> {
        self.inner.lock().entries.get(index)?.at.clone()
    }

    pub fn node_combiner(&self) -> NodeCombiner {
        self.inner.lock().combiner.clone()
    }

    pub fn set_node_combiner(&self, combiner: NodeCombiner) {
        self.inner.lock().combiner = combiner;
        self.invalidate();
    }

    /// Drop the cached tree and notify listeners.
    pub fn invalidate(&self) {
        trace!("invalidating combined configuration");
        self.inner.invalidate();
    }

    /// The combined tree, rebuilt if needed.
    ///
    /// A child failing to provide its tree aborts the rebuild. The error is
    /// returned as is and the next call tries again.
    pub fn combined_root(&self) -> Result<Arc<Node>> {
        let mut state = self.inner.lock();
        self.inner.current_root(&mut state)
    }

    /// Index of the first child whose content defines `key`, as seen in the
    /// combined tree (after grafting).
    pub fn source_index(&self, key: &str) -> Result<Option<usize>> {
        let state = self.inner.lock();
        for (i, entry) in state.entries.iter().enumerate() {
            let root = entry.transformed_root()?;
            if state
                .engine
                .query(&root, key)
                .iter()
                .any(|h| h.value(&root).is_some())
            {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    /// Child configuration that provides `key`.
    pub fn source(&self, key: &str) -> Result<Option<SharedConfiguration>> {
        Ok(self.source_index(key)?.and_then(|i| self.configuration(i)))
    }

    fn update<T>(&self, f: impl FnOnce(&dyn ExpressionEngine, &mut Node) -> Result<T>) -> Result<T> {
        let mut state = self.inner.lock();
        let mut root = self.inner.current_root(&mut state)?;
        state.root = None;
        let engine = Arc::clone(&state.engine);
        let result = f(&*engine, Arc::make_mut(&mut root));
        state.root = Some(root);
        result
    }

    fn read<T>(&self, f: impl FnOnce(&dyn ExpressionEngine, &Node) -> T) -> Result<T> {
        let mut state = self.inner.lock();
        let root = self.inner.current_root(&mut state)?;
        let engine = Arc::clone(&state.engine);
        drop(state);
        Ok(f(&*engine, &root))
    }
}

impl Configuration for CombinedConfiguration {
    fn get_property(&self, key: &str) -> Result<Option<Value>> {
        self.read(|engine, root| ops::get(engine, root, key))
    }

    fn set_property(&self, key: &str, value: Value) -> Result<()> {
        self.inner
            .events
            .around(EventKind::SetProperty, Some(key), Some(&value), || {
                self.update(|engine, root| ops::set(engine, root, key, value.clone()))
            })
    }

    fn add_property(&self, key: &str, value: Value) -> Result<()> {
        self.inner
            .events
            .around(EventKind::AddProperty, Some(key), Some(&value), || {
                self.update(|engine, root| ops::add(engine, root, key, value.clone()))
            })
    }

    fn clear_property(&self, key: &str) -> Result<()> {
        self.inner
            .events
            .around(EventKind::ClearProperty, Some(key), None, || {
                self.update(|engine, root| {
                    ops::clear_property(engine, root, key);
                    Ok(())
                })
            })
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.read(ops::keys)
    }

    fn root_node(&self) -> Result<Node> {
        Ok(self.combined_root()?.as_ref().clone())
    }

    fn event_source(&self) -> &EventSource {
        &self.inner.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::MapConfiguration;
    use crate::tree::TreeConfiguration;
    use cfgtree_node::OverrideGranularity;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn tree(value: Value) -> SharedConfiguration {
        Arc::new(TreeConfiguration::with_root(Node::from_json("", &value)))
    }

    fn invalidations(combined: &CombinedConfiguration) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&count);
        combined
            .event_source()
            .add_listener(Arc::new(move |e: &ConfigurationEvent| {
                if e.kind == EventKind::Invalidate {
                    sink.fetch_add(1, Ordering::SeqCst);
                }
            }));
        count
    }

    /// Fails to provide a tree until switched on.
    struct Flaky {
        healthy: AtomicBool,
        events: EventSource,
    }

    impl Configuration for Flaky {
        fn get_property(&self, _key: &str) -> Result<Option<Value>> {
            Ok(None)
        }

        fn set_property(&self, key: &str, _value: Value) -> Result<()> {
            Err(Error::ReadOnly(key.to_string()))
        }

        fn add_property(&self, key: &str, _value: Value) -> Result<()> {
            Err(Error::ReadOnly(key.to_string()))
        }

        fn clear_property(&self, key: &str) -> Result<()> {
            Err(Error::ReadOnly(key.to_string()))
        }

        fn keys(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn root_node(&self) -> Result<Node> {
            if self.healthy.load(Ordering::SeqCst) {
                Ok(Node::from_json("", &json!({"flaky": "ok"})))
            } else {
                Err(Error::Source("backend unavailable".into()))
            }
        }

        fn event_source(&self) -> &EventSource {
            &self.events
        }
    }

    #[test]
    fn test_empty_combination_has_empty_root() {
        let combined = CombinedConfiguration::default();
        let root = combined.combined_root().unwrap();
        assert!(!root.is_defined());
        assert!(combined.is_empty().unwrap());
    }

    #[test]
    fn test_union_prefers_first_child() {
        let combined = CombinedConfiguration::new(NodeCombiner::union());
        combined.add_configuration(tree(json!({"a": 1})), None, None).unwrap();
        combined
            .add_configuration(tree(json!({"a": 2, "b": 3})), None, None)
            .unwrap();

        assert_eq!(combined.get_i64("a").unwrap(), Some(1));
        assert_eq!(combined.get_i64("b").unwrap(), Some(3));
    }

    #[test]
    fn test_override_granularity() {
        let left = json!({"db": {"host": "h1"}});
        let right = json!({"db": {"host": "h2", "port": 5432}});

        let leaf = CombinedConfiguration::new(NodeCombiner::override_first());
        leaf.add_configuration(tree(left.clone()), None, None).unwrap();
        leaf.add_configuration(tree(right.clone()), None, None).unwrap();
        assert_eq!(leaf.get_string("db.host").unwrap().as_deref(), Some("h1"));
        assert_eq!(leaf.get_i64("db.port").unwrap(), Some(5432));

        let subtree =
            CombinedConfiguration::new(NodeCombiner::override_with(OverrideGranularity::Subtree));
        subtree.add_configuration(tree(left), None, None).unwrap();
        subtree.add_configuration(tree(right), None, None).unwrap();
        assert_eq!(subtree.get_string("db.host").unwrap().as_deref(), Some("h1"));
        assert!(!subtree.contains_key("db.port").unwrap());
    }

    #[test]
    fn test_duplicate_name_leaves_state_unchanged() {
        let combined = CombinedConfiguration::default();
        combined
            .add_configuration(tree(json!({"a": 1})), Some("main"), None)
            .unwrap();

        let err = combined
            .add_configuration(tree(json!({"b": 2})), Some("main"), None)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateName(name) if name == "main"));
        assert_eq!(combined.number_of_configurations(), 1);
        assert!(!combined.contains_key("b").unwrap());
    }

    #[test]
    fn test_add_and_remove_track_count() {
        let combined = CombinedConfiguration::default();
        let count = invalidations(&combined);
        let first = tree(json!({"a": 1}));
        let second = tree(json!({"b": 2}));
        combined.add_configuration(Arc::clone(&first), Some("first"), None).unwrap();
        combined.add_configuration(Arc::clone(&second), None, None).unwrap();
        combined.add_configuration(tree(json!({"c": 3})), Some("third"), None).unwrap();
        combined.add_configuration(tree(json!({"d": 4})), None, None).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 4);

        assert!(combined.remove_configuration(&second));
        assert_eq!(count.load(Ordering::SeqCst), 5);
        assert!(!combined.remove_configuration(&second));
        assert!(combined.remove_configuration_by_name("third").is_some());
        assert_eq!(count.load(Ordering::SeqCst), 6);
        assert!(combined.remove_configuration_by_name("third").is_none());
        assert!(combined.remove_configuration_at(5).is_none());
        assert!(combined.remove_configuration_at(1).is_some());
        assert_eq!(count.load(Ordering::SeqCst), 7);

        combined.set_node_combiner(NodeCombiner::override_first());
        assert_eq!(count.load(Ordering::SeqCst), 8);

        assert_eq!(combined.number_of_configurations(), 1);
        assert_eq!(combined.configuration_names(), vec![Some("first".to_string())]);
        assert_eq!(combined.keys().unwrap(), vec!["a"]);
        assert_eq!(second.event_source().listener_count(), 0);
    }

    #[test]
    fn test_child_change_invalidates() {
        let combined = CombinedConfiguration::default();
        let child = tree(json!({"a": 1}));
        combined.add_configuration(Arc::clone(&child), None, None).unwrap();
        assert_eq!(combined.get_i64("a").unwrap(), Some(1));

        let count = invalidations(&combined);
        child.set_property("a", json!(2)).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(combined.get_i64("a").unwrap(), Some(2));
    }

    #[test]
    fn test_cached_root_is_reused_while_clean() {
        let combined = CombinedConfiguration::default();
        combined.add_configuration(tree(json!({"a": 1})), None, None).unwrap();

        let first = combined.combined_root().unwrap();
        let second = combined.combined_root().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        combined.invalidate();
        let third = combined.combined_root().unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn test_at_path_grafts_content() {
        let combined = CombinedConfiguration::default();
        combined
            .add_configuration(tree(json!({"host": "h1"})), None, Some("x.y"))
            .unwrap();
        combined.add_configuration(tree(json!({"z": 1})), None, None).unwrap();

        assert_eq!(combined.get_string("x.y.host").unwrap().as_deref(), Some("h1"));
        assert_eq!(combined.keys().unwrap(), vec!["x.y.host", "z"]);
        assert_eq!(combined.configuration_at_path(0).as_deref(), Some("x.y"));
        assert_eq!(combined.source_index("z").unwrap(), Some(1));
        assert_eq!(combined.source_index("host").unwrap(), None);
    }

    #[test]
    fn test_subtree_override_keeps_sibling_grafts() {
        let combined =
            CombinedConfiguration::new(NodeCombiner::override_with(OverrideGranularity::Subtree));
        combined
            .add_configuration(tree(json!({"host": "h1"})), None, Some("x.y"))
            .unwrap();
        combined
            .add_configuration(tree(json!({"port": 5432})), None, Some("x.z"))
            .unwrap();
        combined
            .add_configuration(tree(json!({"host": "h2", "user": "u"})), None, Some("x.y"))
            .unwrap();

        assert_eq!(combined.keys().unwrap(), vec!["x.y.host", "x.y.user", "x.z.port"]);
        assert_eq!(combined.get_i64("x.z.port").unwrap(), Some(5432));
        assert_eq!(combined.get_string("x.y.host").unwrap().as_deref(), Some("h1"));
    }

    #[test]
    fn test_attribute_at_path_is_rejected() {
        let combined = CombinedConfiguration::default();
        let child = tree(json!({"a": 1}));
        assert!(combined
            .add_configuration(Arc::clone(&child), None, Some("x[@y]"))
            .is_err());
        assert_eq!(combined.number_of_configurations(), 0);
        assert_eq!(child.event_source().listener_count(), 0);
    }

    #[test]
    fn test_set_node_combiner_rebuilds() {
        let combined = CombinedConfiguration::new(NodeCombiner::union());
        combined
            .add_configuration(tree(json!({"db": {"host": "h1"}})), None, None)
            .unwrap();
        combined
            .add_configuration(tree(json!({"db": {"host": "h2", "port": 1}})), None, None)
            .unwrap();
        assert!(combined.contains_key("db.port").unwrap());

        combined.set_node_combiner(NodeCombiner::override_with(OverrideGranularity::Subtree));
        assert!(!combined.contains_key("db.port").unwrap());
    }

    #[test]
    fn test_nested_combined_configurations() {
        let inner = Arc::new(CombinedConfiguration::default());
        let leaf = tree(json!({"a": 1}));
        inner.add_configuration(Arc::clone(&leaf), None, None).unwrap();

        let outer = CombinedConfiguration::default();
        outer
            .add_configuration(Arc::clone(&inner) as SharedConfiguration, Some("inner"), Some("nested"))
            .unwrap();
        assert_eq!(outer.get_i64("nested.a").unwrap(), Some(1));

        leaf.set_property("a", json!(5)).unwrap();
        assert_eq!(outer.get_i64("nested.a").unwrap(), Some(5));
    }

    #[test]
    fn test_failed_rebuild_stays_dirty() {
        let flaky = Arc::new(Flaky {
            healthy: AtomicBool::new(false),
            events: EventSource::new(),
        });
        let combined = CombinedConfiguration::default();
        combined
            .add_configuration(Arc::clone(&flaky) as SharedConfiguration, None, None)
            .unwrap();

        assert!(matches!(combined.combined_root(), Err(Error::Source(_))));
        assert!(combined.get_property("flaky").is_err());

        flaky.healthy.store(true, Ordering::SeqCst);
        assert_eq!(combined.get_string("flaky").unwrap().as_deref(), Some("ok"));
    }

    #[test]
    fn test_writes_touch_only_the_cached_tree() {
        let child = tree(json!({"a": 1}));
        let combined = CombinedConfiguration::default();
        combined.add_configuration(Arc::clone(&child), None, None).unwrap();

        combined.set_property("a", json!(7)).unwrap();
        combined.add_property("b", json!("x")).unwrap();
        assert_eq!(combined.get_i64("a").unwrap(), Some(7));
        assert_eq!(child.get_i64("a").unwrap(), Some(1));
        assert!(!child.contains_key("b").unwrap());

        combined.invalidate();
        assert_eq!(combined.get_i64("a").unwrap(), Some(1));
        assert!(!combined.contains_key("b").unwrap());
    }

    #[test]
    fn test_clear_removes_children() {
        let child = tree(json!({"a": 1}));
        let combined = CombinedConfiguration::default();
        combined.add_configuration(Arc::clone(&child), Some("c"), None).unwrap();
        assert_eq!(combined.get_i64("a").unwrap(), Some(1));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        combined
            .event_source()
            .add_listener(Arc::new(move |e: &ConfigurationEvent| {
                sink.lock().unwrap().push((e.kind, e.before_update));
            }));
        combined.clear().unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (EventKind::Clear, true),
                (EventKind::Clear, false),
                (EventKind::Invalidate, false),
            ]
        );
        assert_eq!(combined.number_of_configurations(), 0);
        assert!(combined.configuration_by_name("c").is_none());
        assert!(combined.is_empty().unwrap());
        assert_eq!(child.event_source().listener_count(), 0);
    }

    #[test]
    fn test_list_nodes_are_concatenated() {
        let combined = CombinedConfiguration::new(NodeCombiner::union().with_list_node("table"));
        combined
            .add_configuration(tree(json!({"table": {"name": "users"}})), None, None)
            .unwrap();
        combined
            .add_configuration(tree(json!({"table": {"name": "docs"}})), None, None)
            .unwrap();

        assert_eq!(
            combined.get_property("table.name").unwrap(),
            Some(json!(["users", "docs"]))
        );
        assert_eq!(combined.get_string("table(1).name").unwrap().as_deref(), Some("docs"));
    }

    #[test]
    fn test_flat_children_are_combined_as_trees() {
        let combined = CombinedConfiguration::default();
        combined
            .add_configuration(
                Arc::new(MapConfiguration::from_pairs([("db.host", json!("h1"))])),
                None,
                None,
            )
            .unwrap();
        combined
            .add_configuration(tree(json!({"db": {"port": 5432}})), None, None)
            .unwrap();
        assert_eq!(combined.keys().unwrap(), vec!["db.host", "db.port"]);
    }
}
