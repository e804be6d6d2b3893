//! Suspense and error boundaries.
//!
//! A [`Suspense`] boundary catches suspensions raised by its child and
//! renders a fallback for that subtree while the rest of the tree commits.
//! An [`ErrorBoundary`] catches query errors and renders a fallback built
//! from the error. Anything a boundary does not handle keeps propagating.

use crate::error::QueryError;
use crate::preload::Interrupt;
use crate::render::{Component, RenderContext, View};

/// Shows `fallback` while its child is suspended.
pub struct Suspense<C> {
    fallback: String,
    child: C,
}

impl<C: Component> Suspense<C> {
    pub fn new(fallback: impl Into<String>, child: C) -> Self {
        Self {
            fallback: fallback.into(),
            child,
        }
    }

    pub fn child(&self) -> &C {
        &self.child
    }

    pub fn child_mut(&mut self) -> &mut C {
        &mut self.child
    }
}

impl<C: Component> Component for Suspense<C> {
    fn name(&self) -> &'static str {
        self.child.name()
    }

    fn render(&mut self, cx: &mut RenderContext<'_>) -> Result<View, Interrupt> {
        match cx.render_child(&mut self.child) {
            Err(Interrupt::Suspend(suspension)) => {
                tracing::debug!(
                    boundary = self.child.name(),
                    query = suspension.query(),
                    "subtree suspended, showing fallback"
                );
                cx.suspend_child(self.child.name(), suspension);
                Ok(View::Fallback(self.fallback.clone()))
            }
            other => other,
        }
    }
}

type ErrorFallback = Box<dyn Fn(&QueryError) -> View + Send>;

/// Renders a fallback built from the error when its child fails.
pub struct ErrorBoundary<C> {
    fallback: ErrorFallback,
    child: C,
}

impl<C: Component> ErrorBoundary<C> {
    pub fn new<F>(fallback: F, child: C) -> Self
    where
        F: Fn(&QueryError) -> View + Send + 'static,
    {
        Self {
            fallback: Box::new(fallback),
            child,
        }
    }

    pub fn child(&self) -> &C {
        &self.child
    }

    pub fn child_mut(&mut self) -> &mut C {
        &mut self.child
    }
}

impl<C: Component> Component for ErrorBoundary<C> {
    fn name(&self) -> &'static str {
        self.child.name()
    }

    fn render(&mut self, cx: &mut RenderContext<'_>) -> Result<View, Interrupt> {
        match cx.render_child(&mut self.child) {
            Err(Interrupt::Error(err)) => {
                tracing::warn!(boundary = self.child.name(), error = %err, "error boundary caught failure");
                let view = (self.fallback)(&err);
                cx.catch_child(self.child.name(), err);
                Ok(view)
            }
            other => other,
        }
    }
}
