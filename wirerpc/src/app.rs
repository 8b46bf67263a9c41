//! RPC application registry.
//!
//! An application is declared as services, each an ordered set of methods
//! with optional marshalling callbacks. Adding a service materializes one
//! `/service/method` route per method; handlers are then registered per
//! route. The registry is a lookup structure only: the serving transport
//! fetches the `(marshaller, unmarshaller, handler)` triple for an inbound
//! route and does the dispatching itself. Routes with no registered
//! handler are the transport's cue for an unimplemented response
//! ([`wirerpc_core::Code::Unimplemented`]).
//!
//! Configuration is single-phase: services and handlers accumulate until
//! [`RpcApp::freeze`] (called by the server when it starts serving), after
//! which mutation fails and the registry is read-only and freely shared.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use wirerpc_core::{MarshalFn, RouteCodec, UnmarshalFn, WireError};

/// Type-erased request handler stored per route.
///
/// The registry never invokes handlers; invocation, cancellation, and
/// deadline enforcement belong to the serving transport.
pub type HandlerFn =
    Arc<dyn Fn(Bytes) -> BoxFuture<'static, Result<Bytes, WireError>> + Send + Sync>;

/// Errors raised while configuring an application.
///
/// All of these are synchronous configuration-time failures and should
/// prevent the server from starting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A service with this name was already added.
    #[error("service {0:?} is already registered")]
    DuplicateService(String),

    /// A method name appears twice within one service declaration.
    #[error("method {method:?} is declared twice in service {service:?}")]
    DuplicateMethod { service: String, method: String },

    /// Two services declare the same route. Reachable with distinct
    /// service names when a name contains `/`.
    #[error("route {0:?} is declared by more than one service")]
    RouteCollision(String),

    /// The route already has a handler.
    #[error("route {0:?} already has a handler")]
    HandlerAlreadyRegistered(String),

    /// The route was never declared by any service.
    #[error("unknown route {0:?}")]
    UnknownRoute(String),

    /// The application is already serving.
    #[error("application is frozen; add services and handlers before serving")]
    Frozen,
}

/// A method declaration: a name and optional marshalling callbacks.
///
/// A method with neither callback is a raw byte-in/byte-out route.
#[derive(Clone)]
pub struct Method {
    name: String,
    marshal: Option<MarshalFn>,
    unmarshal: Option<UnmarshalFn>,
}

impl Method {
    /// Declare a method with no marshalling callbacks.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            marshal: None,
            unmarshal: None,
        }
    }

    /// Attach a marshal callback.
    pub fn with_marshal(mut self, marshal: MarshalFn) -> Self {
        self.marshal = Some(marshal);
        self
    }

    /// Attach an unmarshal callback.
    pub fn with_unmarshal(mut self, unmarshal: UnmarshalFn) -> Self {
        self.unmarshal = Some(unmarshal);
        self
    }

    /// The method name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("marshal", &self.marshal.is_some())
            .field("unmarshal", &self.unmarshal.is_some())
            .finish()
    }
}

/// An immutable service declaration: a name and its methods, in order.
#[derive(Debug, Clone)]
pub struct Service {
    name: String,
    methods: Vec<Method>,
}

impl Service {
    /// Declare a service.
    ///
    /// Method names within a service must be unique.
    pub fn new(
        name: impl Into<String>,
        methods: impl IntoIterator<Item = Method>,
    ) -> Result<Self, RegistryError> {
        let name = name.into();
        let methods: Vec<Method> = methods.into_iter().collect();

        let mut seen = HashSet::with_capacity(methods.len());
        for method in &methods {
            if !seen.insert(method.name.clone()) {
                return Err(RegistryError::DuplicateMethod {
                    service: name,
                    method: method.name.clone(),
                });
            }
        }

        Ok(Self { name, methods })
    }

    /// The service name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The methods, in declaration order.
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }
}

struct RouteEntry {
    route: String,
    marshal: Option<MarshalFn>,
    unmarshal: Option<UnmarshalFn>,
    handler: Option<HandlerFn>,
}

/// The route table of one application.
///
/// Reads (`marshaller`, `unmarshaller`, `handler`, `has_route`,
/// `missing_routes`, `is_complete`) take `&self` and are safe to share;
/// mutation is confined to the configuration phase and rejected once the
/// app is frozen.
#[derive(Default)]
pub struct RpcApp {
    entries: Vec<RouteEntry>,
    index: HashMap<String, usize>,
    services: HashSet<String>,
    frozen: bool,
}

impl RpcApp {
    /// Create an empty application.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an application pre-loaded with services.
    pub fn with_services(
        services: impl IntoIterator<Item = Service>,
    ) -> Result<Self, RegistryError> {
        let mut app = Self::new();
        for service in services {
            app.add_service(&service)?;
        }
        Ok(app)
    }

    /// Add every route of `service` to the table.
    ///
    /// Fails on a duplicate service name or a colliding route, and on a
    /// frozen application.
    pub fn add_service(&mut self, service: &Service) -> Result<(), RegistryError> {
        if self.frozen {
            return Err(RegistryError::Frozen);
        }
        if self.services.contains(service.name()) {
            return Err(RegistryError::DuplicateService(service.name().to_string()));
        }

        // Check every route before inserting any, so a rejected service
        // leaves the table untouched.
        let routes: Vec<String> = service
            .methods()
            .iter()
            .map(|m| format!("/{}/{}", service.name(), m.name()))
            .collect();
        for route in &routes {
            if self.index.contains_key(route) {
                return Err(RegistryError::RouteCollision(route.clone()));
            }
        }

        for (method, route) in service.methods().iter().zip(routes) {
            self.index.insert(route.clone(), self.entries.len());
            self.entries.push(RouteEntry {
                route,
                marshal: method.marshal.clone(),
                unmarshal: method.unmarshal.clone(),
                handler: None,
            });
        }
        self.services.insert(service.name().to_string());

        tracing::debug!(
            service = %service.name(),
            methods = service.methods().len(),
            "added service"
        );
        Ok(())
    }

    /// Register the handler for a declared route.
    ///
    /// Fails on an unknown route, a route that already has a handler, and
    /// on a frozen application.
    pub fn register(&mut self, route: &str, handler: HandlerFn) -> Result<(), RegistryError> {
        if self.frozen {
            return Err(RegistryError::Frozen);
        }
        let Some(&i) = self.index.get(route) else {
            return Err(RegistryError::UnknownRoute(route.to_string()));
        };
        let entry = &mut self.entries[i];

        if entry.handler.is_some() {
            return Err(RegistryError::HandlerAlreadyRegistered(route.to_string()));
        }
        entry.handler = Some(handler);

        tracing::debug!(%route, "registered handler");
        Ok(())
    }

    /// Whether a handler is registered for `route`.
    ///
    /// Declared-but-unhandled routes answer `false`.
    pub fn has_route(&self, route: &str) -> bool {
        self.lookup(route).is_some_and(|e| e.handler.is_some())
    }

    /// Every declared route with no handler, in declaration order.
    pub fn missing_routes(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.handler.is_none())
            .map(|e| e.route.as_str())
            .collect()
    }

    /// The route's marshal callback.
    ///
    /// `None` covers both an unknown route and a method declared without a
    /// marshaller; the two are not distinguished here.
    pub fn marshaller(&self, route: &str) -> Option<MarshalFn> {
        self.lookup(route).and_then(|e| e.marshal.clone())
    }

    /// The route's unmarshal callback, with the same `None` semantics as
    /// [`marshaller`](Self::marshaller).
    pub fn unmarshaller(&self, route: &str) -> Option<UnmarshalFn> {
        self.lookup(route).and_then(|e| e.unmarshal.clone())
    }

    /// The route's handler, if one is registered.
    pub fn handler(&self, route: &str) -> Option<HandlerFn> {
        self.lookup(route).and_then(|e| e.handler.clone())
    }

    /// The route's callback pair bundled for a streaming codec.
    ///
    /// `None` only for unknown routes; a codec-less route yields a
    /// passthrough codec.
    pub fn route_codec(&self, route: &str) -> Option<RouteCodec> {
        self.lookup(route)
            .map(|e| RouteCodec::new(e.marshal.clone(), e.unmarshal.clone()))
    }

    /// Whether every declared route has a handler.
    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|e| e.handler.is_some())
    }

    /// End the configuration phase.
    ///
    /// Later `add_service` and `register` calls fail with
    /// [`RegistryError::Frozen`]. Idempotent.
    pub fn freeze(&mut self) {
        if !self.frozen && !self.is_complete() {
            tracing::warn!(
                missing = ?self.missing_routes(),
                "application frozen with unhandled routes"
            );
        }
        self.frozen = true;
    }

    /// Whether the configuration phase has ended.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    fn lookup(&self, route: &str) -> Option<&RouteEntry> {
        self.index.get(route).map(|&i| &self.entries[i])
    }
}

impl std::fmt::Debug for RpcApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcApp")
            .field("routes", &self.entries.len())
            .field("missing", &self.missing_routes().len())
            .field("frozen", &self.frozen)
            .finish()
    }
}
