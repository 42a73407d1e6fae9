use std::{borrow::Cow, collections::HashSet, mem, sync::Arc};

use axum::{Router, middleware, routing::MethodRouter};
use thiserror::Error;

use crate::guard::{self, AccessGuard, RoleGate};

/// Identifier suffix that marks a member as a route action.
pub const DEFAULT_MARKER: &str = "_action";

/// A callable route action: receives the handler and the shared route table.
pub type ActionFn<H, S> = Arc<dyn Fn(&H, &mut RouteTable<S>) + Send + Sync>;

/// Member
///
/// One entry declared directly on a level of a handler's type hierarchy.
/// Only `Method` members can be invoked during registration.
pub enum Member<H, S> {
    Method(ActionFn<H, S>),
    Field,
}

impl<H, S> Member<H, S> {
    /// The invocable action, if this member is callable.
    pub fn as_action(&self) -> Option<&ActionFn<H, S>> {
        match self {
            Member::Method(action) => Some(action),
            Member::Field => None,
        }
    }
}

impl<H, S> Clone for Member<H, S> {
    fn clone(&self) -> Self {
        match self {
            Member::Method(action) => Member::Method(action.clone()),
            Member::Field => Member::Field,
        }
    }
}

/// Layer
///
/// The own members of a single level of a handler's hierarchy (not inherited ones).
/// A handler lists its layers most-derived first; see [`RouteHandler::layers`].
pub struct Layer<H, S> {
    name: &'static str,
    members: Vec<(&'static str, Member<H, S>)>,
}

impl<H, S> Layer<H, S> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            members: Vec::new(),
        }
    }

    /// Declares a callable member on this level.
    pub fn method<F>(mut self, ident: &'static str, action: F) -> Self
    where
        F: Fn(&H, &mut RouteTable<S>) + Send + Sync + 'static,
    {
        self.members.push((ident, Member::Method(Arc::new(action))));
        self
    }

    /// Declares a non-callable member on this level.
    pub fn field(mut self, ident: &'static str) -> Self {
        self.members.push((ident, Member::Field));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn members(&self) -> impl Iterator<Item = (&'static str, &Member<H, S>)> {
        self.members.iter().map(|(ident, member)| (*ident, member))
    }

    /// project
    ///
    /// Lifts a level written for `H` into a handler `D` that embeds an `H`.
    /// This is how an ancestor's actions become part of a derived handler's hierarchy.
    pub fn project<D>(self, view: fn(&D) -> &H) -> Layer<D, S>
    where
        H: 'static,
        D: 'static,
        S: 'static,
    {
        let members = self
            .members
            .into_iter()
            .map(|(ident, member)| {
                let member = match member {
                    Member::Method(action) => Member::Method(Arc::new(
                        move |derived: &D, table: &mut RouteTable<S>| action(view(derived), table),
                    ) as ActionFn<D, S>),
                    Member::Field => Member::Field,
                };
                (ident, member)
            })
            .collect();

        Layer {
            name: self.name,
            members,
        }
    }
}

/// Declares a [`Layer`] from the handler's own methods, naming each member
/// after the method it points to.
///
/// ```rust,ignore
/// fn layers() -> Vec<Layer<Self, AppState>> {
///     vec![layer!("ProductRoutes" => [create_action, find_by_name_action])]
/// }
/// ```
#[macro_export]
macro_rules! layer {
    ($name:expr => [$($method:ident),* $(,)?]) => {
        $crate::registrar::Layer::new($name)
            $(.method(stringify!($method), Self::$method))*
    };
}

/// RouteHandler
///
/// A handler instance whose actions are discovered and mounted by the [`Registrar`].
pub trait RouteHandler<S>: Sized {
    /// The handler's type hierarchy, most-derived level first.
    fn layers() -> Vec<Layer<Self, S>>;

    /// Hook run once before any action is registered.
    fn on_init(&mut self) {}
}

/// Guarded
///
/// Implemented by handlers whose actions protect their routes. Handlers that only
/// expose public routes skip it and carry no guard.
pub trait Guarded {
    type Principal: Clone + Send + Sync + 'static;

    fn access_guard(&self) -> &AccessGuard<Self::Principal>;

    /// Builds a role gate for a route, allowing any of `roles`.
    fn restrict<I, R>(&self, roles: I) -> RoleGate<Self::Principal>
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        self.access_guard().guard(roles)
    }
}

/// RouteTable
///
/// The mutable registry actions write into. Wraps an axum [`Router`] and keeps the
/// list of registered paths for inspection.
pub struct RouteTable<S = ()> {
    router: Router<S>,
    paths: Vec<String>,
}

impl<S> RouteTable<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            paths: Vec::new(),
        }
    }

    pub fn route(&mut self, path: &str, method_router: MethodRouter<S>) -> &mut Self {
        self.router = mem::take(&mut self.router).route(path, method_router);
        self.paths.push(path.to_string());
        self
    }

    /// guarded
    ///
    /// Registers a route whose handler only runs after `gate` has authenticated and
    /// authorized the caller. The gate sits ahead of the terminal handler as route middleware.
    pub fn guarded<P>(
        &mut self,
        path: &str,
        gate: RoleGate<P>,
        method_router: MethodRouter<S>,
    ) -> &mut Self
    where
        P: Clone + Send + Sync + 'static,
    {
        let method_router =
            method_router.route_layer(middleware::from_fn_with_state(gate, guard::enforce::<P>));
        self.route(path, method_router)
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn into_router(self) -> Router<S> {
        self.router
    }
}

impl<S> Default for RouteTable<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("`{layer}::{name}` carries the route action marker but is not callable")]
    NotCallable {
        layer: &'static str,
        name: &'static str,
    },
}

/// Registrar
///
/// Discovers route actions across a handler's layers by identifier suffix and
/// invokes each unique one exactly once against a route table.
#[derive(Debug, Clone)]
pub struct Registrar {
    marker: Cow<'static, str>,
}

impl Default for Registrar {
    fn default() -> Self {
        Self {
            marker: Cow::Borrowed(DEFAULT_MARKER),
        }
    }
}

impl Registrar {
    pub fn with_marker(marker: impl Into<Cow<'static, str>>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Exact, case-sensitive suffix match.
    pub fn is_eligible(&self, ident: &str) -> bool {
        ident.ends_with(self.marker.as_ref())
    }

    /// eligible_names
    ///
    /// Unique eligible identifiers in discovery order: most-derived layer first,
    /// declaration order within a layer. A name declared on several layers appears once.
    pub fn eligible_names<H, S>(&self, layers: &[Layer<H, S>]) -> Vec<&'static str> {
        let mut seen = HashSet::new();
        layers
            .iter()
            .flat_map(|layer| layer.members())
            .map(|(ident, _)| ident)
            .filter(|ident| self.is_eligible(ident) && seen.insert(*ident))
            .collect()
    }

    /// Resolves every eligible name to its most-derived member.
    fn resolve<H, S>(
        &self,
        layers: &[Layer<H, S>],
    ) -> Result<Vec<(&'static str, ActionFn<H, S>)>, RegistrationError> {
        let mut seen = HashSet::new();
        let mut actions = Vec::new();

        for layer in layers {
            for (ident, member) in layer.members() {
                if !self.is_eligible(ident) || !seen.insert(ident) {
                    continue;
                }
                let action = member
                    .as_action()
                    .ok_or(RegistrationError::NotCallable {
                        layer: layer.name(),
                        name: ident,
                    })?;
                actions.push((ident, action.clone()));
            }
        }

        Ok(actions)
    }

    /// register
    ///
    /// Runs the handler's `on_init` hook, then invokes each eligible action once against
    /// `table`, returning how many actions ran. Neither the hook nor any action runs if an
    /// eligible member fails to resolve.
    pub fn register<H, S>(
        &self,
        mut handler: H,
        table: &mut RouteTable<S>,
    ) -> Result<usize, RegistrationError>
    where
        H: RouteHandler<S>,
        S: Clone + Send + Sync + 'static,
    {
        let handler_name = std::any::type_name::<H>();
        let actions = self.resolve(&H::layers())?;

        handler.on_init();

        for (name, action) in &actions {
            tracing::debug!(handler = handler_name, action = name, "registering route action");
            action(&handler, table);
        }

        tracing::info!(handler = handler_name, actions = actions.len(), "route handler mounted");

        Ok(actions.len())
    }

    /// mount
    ///
    /// Registers a single handler into a fresh table.
    pub fn mount<H, S>(&self, handler: H) -> Result<RouteTable<S>, RegistrationError>
    where
        H: RouteHandler<S>,
        S: Clone + Send + Sync + 'static,
    {
        let mut table = RouteTable::new();
        self.register(handler, &mut table)?;
        Ok(table)
    }
}
