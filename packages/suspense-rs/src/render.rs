//! Components, views, and the per-mount hook scope.
//!
//! A [`Component`] renders into a [`View`] through a [`RenderContext`].
//! Each mounted component owns a [`Scope`] that outlives individual
//! render passes and holds:
//!
//! - preloaded query handles (reused across retries and re-renders)
//! - the deps of the last *committed* run of each effect
//! - effects queued by the current pass, waiting for commit
//! - child scopes, keyed by child name
//!
//! Effects queued during a pass only run when the renderer commits that
//! pass. A suspended or failed pass discards its queue, so an effect tied
//! to a render runs at most once per distinct set of deps.

use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;

use crate::environment::Environment;
use crate::error::QueryError;
use crate::policy::FetchPolicy;
use crate::preload::{preload, read, read_as, FetchState, Interrupt, PreloadedQuery, Suspension};
use crate::query::{QueryDefinition, QueryKey, Variables};

/// Output of a render pass: a labelled tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Empty,
    Text(String),
    /// Placeholder shown by a suspense boundary or a loading gate.
    Fallback(String),
    Node {
        name: &'static str,
        children: Vec<View>,
    },
}

impl View {
    pub fn text(text: impl Into<String>) -> Self {
        View::Text(text.into())
    }

    pub fn fallback(text: impl Into<String>) -> Self {
        View::Fallback(text.into())
    }

    pub fn node(name: &'static str, children: Vec<View>) -> Self {
        View::Node { name, children }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, View::Fallback(_))
    }

    /// Depth-first search for a node by name.
    pub fn find(&self, name: &str) -> Option<&View> {
        match self {
            View::Node { name: own, children } => {
                if *own == name {
                    return Some(self);
                }
                children.iter().find_map(|child| child.find(name))
            }
            _ => None,
        }
    }

    /// Whether any text or fallback in the tree contains `needle`.
    pub fn contains_text(&self, needle: &str) -> bool {
        match self {
            View::Empty => false,
            View::Text(text) | View::Fallback(text) => text.contains(needle),
            View::Node { children, .. } => children.iter().any(|child| child.contains_text(needle)),
        }
    }

    /// Whether any fallback appears in the tree.
    pub fn has_fallback(&self) -> bool {
        match self {
            View::Fallback(_) => true,
            View::Node { children, .. } => children.iter().any(View::has_fallback),
            _ => false,
        }
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = "  ".repeat(depth);
        match self {
            View::Empty => Ok(()),
            View::Text(text) => writeln!(f, "{pad}{text}"),
            View::Fallback(text) => writeln!(f, "{pad}[{text}]"),
            View::Node { name, children } => {
                writeln!(f, "{pad}<{name}>")?;
                for child in children {
                    child.write_indented(f, depth + 1)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

/// A unit of UI that renders from data it reads through hooks.
///
/// `render` may be called many times for one mount: it is abandoned and
/// re-run from scratch whenever a read suspends, so it must not perform
/// side effects directly. Use [`RenderContext::use_effect`].
pub trait Component {
    /// Stable name; keys this component's scope under its parent.
    fn name(&self) -> &'static str;

    fn render(&mut self, cx: &mut RenderContext<'_>) -> Result<View, Interrupt>;
}

impl<C: Component + ?Sized> Component for Box<C> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn render(&mut self, cx: &mut RenderContext<'_>) -> Result<View, Interrupt> {
        (**self).render(cx)
    }
}

struct PendingEffect {
    key: &'static str,
    deps: Box<dyn Any + Send>,
    run: Box<dyn FnOnce() + Send>,
}

/// Hook state of one mounted component.
#[derive(Default)]
pub struct Scope {
    queries: HashMap<&'static str, PreloadedQuery>,
    committed: HashMap<&'static str, Box<dyn Any + Send>>,
    pending: Vec<PendingEffect>,
    children: HashMap<&'static str, Scope>,
    visited: bool,
    /// Set when a boundary cut this subtree's pass short. The subtree keeps
    /// its mounted children and handles until a pass reaches it again.
    abandoned: bool,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle currently held for `query`, if any.
    pub fn query(&self, query: &QueryDefinition) -> Option<&PreloadedQuery> {
        self.queries.get(query.name())
    }

    pub fn child(&self, name: &str) -> Option<&Scope> {
        self.children.get(name)
    }

    pub fn pending_effects(&self) -> usize {
        self.pending.len() + self.children.values().map(Scope::pending_effects).sum::<usize>()
    }

    fn child_mut(&mut self, name: &'static str) -> &mut Scope {
        self.children.entry(name).or_default()
    }

    pub(crate) fn begin_pass(&mut self) {
        self.abandoned = false;
        for child in self.children.values_mut() {
            child.visited = false;
            child.begin_pass();
        }
    }

    /// Run queued effects (children before parents) and unmount children
    /// the committed pass did not render. Returns the number of effects run.
    pub(crate) fn commit(&mut self) -> usize {
        if self.abandoned {
            return 0;
        }
        let mut ran = 0;

        self.children.retain(|name, child| {
            if !child.visited {
                tracing::debug!(scope = name, "unmounting scope");
                child.unmount();
            }
            child.visited
        });
        for child in self.children.values_mut() {
            ran += child.commit();
        }

        for effect in self.pending.drain(..) {
            (effect.run)();
            self.committed.insert(effect.key, effect.deps);
            ran += 1;
        }
        ran
    }

    /// Drop everything queued by an abandoned pass. Handles are kept.
    pub(crate) fn discard(&mut self) {
        self.pending.clear();
        for child in self.children.values_mut() {
            child.discard();
        }
    }

    fn unmount(&mut self) {
        for handle in self.queries.values_mut() {
            handle.dispose();
        }
        for child in self.children.values_mut() {
            child.unmount();
        }
    }
}

/// Per-pass bookkeeping shared by every context in the tree.
#[derive(Default)]
pub(crate) struct PassState {
    pub suspensions: Vec<Suspension>,
    pub observed: Vec<watch::Receiver<FetchState>>,
    pub caught: Vec<QueryError>,
}

/// Handed to [`Component::render`]; gives access to hooks and children.
pub struct RenderContext<'a> {
    scope: &'a mut Scope,
    pass: &'a mut PassState,
}

impl<'a> RenderContext<'a> {
    pub(crate) fn new(scope: &'a mut Scope, pass: &'a mut PassState) -> Self {
        Self { scope, pass }
    }

    /// Render a child component in its own scope.
    pub fn render_child<C: Component + ?Sized>(&mut self, child: &mut C) -> Result<View, Interrupt> {
        let scope = self.scope.child_mut(child.name());
        scope.visited = true;
        let mut cx = RenderContext {
            scope,
            pass: &mut *self.pass,
        };
        child.render(&mut cx)
    }

    /// Queue `effect` to run at commit if `deps` differ from the deps of
    /// the last committed run under `key`.
    pub fn use_effect<D, F>(&mut self, key: &'static str, deps: D, effect: F)
    where
        D: PartialEq + Send + 'static,
        F: FnOnce() + Send + 'static,
    {
        let unchanged = self
            .scope
            .committed
            .get(key)
            .and_then(|previous| previous.downcast_ref::<D>())
            .is_some_and(|previous| *previous == deps);

        if unchanged {
            tracing::trace!(effect = key, "effect deps unchanged, skipping");
            return;
        }

        self.scope.pending.retain(|pending| pending.key != key);
        self.scope.pending.push(PendingEffect {
            key,
            deps: Box::new(deps),
            run: Box::new(effect),
        });
    }

    /// Preload `query` once per mount and return the handle.
    ///
    /// The handle is reused by later passes (including retries after a
    /// suspension) while the variables and policy stay the same. A change
    /// of either replaces it and disposes the old one.
    pub fn use_preloaded_query(
        &mut self,
        env: &Environment,
        query: &QueryDefinition,
        variables: Variables,
        policy: FetchPolicy,
    ) -> &PreloadedQuery {
        let key = QueryKey::new(query, &variables);

        let handle = match self.scope.queries.entry(query.name()) {
            Entry::Occupied(mut entry) => {
                let current = entry.get();
                if current.key() != &key || current.policy() != policy || current.is_disposed() {
                    let mut previous = entry.insert(preload(env, query, variables, policy));
                    previous.dispose();
                }
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(preload(env, query, variables, policy)),
        };

        if let Some(mut rx) = handle.watch() {
            rx.borrow_and_update();
            self.pass.observed.push(rx);
        }
        handle
    }

    /// Preload (memoized) and read `query`: the whole protocol in one call.
    pub fn use_query(
        &mut self,
        env: &Environment,
        query: &QueryDefinition,
        variables: Variables,
        policy: FetchPolicy,
    ) -> Result<Arc<Value>, Interrupt> {
        let handle = self.use_preloaded_query(env, query, variables, policy);
        read(query, handle)
    }

    /// [`use_query`](Self::use_query) decoded into a typed response.
    pub fn use_query_as<R: DeserializeOwned>(
        &mut self,
        env: &Environment,
        query: &QueryDefinition,
        variables: Variables,
        policy: FetchPolicy,
    ) -> Result<R, Interrupt> {
        let handle = self.use_preloaded_query(env, query, variables, policy);
        read_as(query, handle)
    }

    pub(crate) fn suspend_child(&mut self, name: &'static str, suspension: Suspension) {
        self.abandon_child(name);
        self.pass.suspensions.push(suspension);
    }

    pub(crate) fn catch_child(&mut self, name: &'static str, err: QueryError) {
        self.abandon_child(name);
        self.pass.caught.push(err);
    }

    fn abandon_child(&mut self, name: &'static str) {
        let child = self.scope.child_mut(name);
        child.discard();
        child.abandoned = true;
    }
}
