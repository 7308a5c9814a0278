//! HTTP dispatcher for a single collection.
//!
//! A [`Resource`] binds `/<name>` and `/<name>/:id` on a [`Registrar`] and maps
//! each request verb onto exactly one [`ResourceManager`] call:
//!
//! | verb        | without id        | with id        |
//! |-------------|-------------------|----------------|
//! | GET / HEAD  | `list`            | `get`          |
//! | POST / PUT  | `create`, or `update` when the body carries an id | `update` |
//! | DELETE      | 400 `Invalid Id`  | `delete`, 204  |
//! | anything else | 501             | 501            |
//!
//! Decode failures are 400, manager failures are 500; both carry the error
//! message as a plain-text body.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, PathRejection};
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::Response;
use axum::routing::{any, MethodRouter};
use axum::Router;
use serde_json::Value;
use tracing::{debug, error};

use models::Entity;
use service::{Document, ManagerError, QueryParams, ResourceManager};

use crate::observability::{method_label, RESOURCE_REQUESTS_TOTAL, RESOURCE_REQUEST_DURATION};
use crate::response::{head_ok, no_content, plain_error, write_json};

/// Anything that can bind a path pattern to a route.
pub trait Registrar {
    fn handle(&mut self, pattern: &str, route: MethodRouter);
}

/// [`Registrar`] over an axum [`Router`].
pub struct ResourceRouter {
    router: Router,
}

impl Default for ResourceRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceRouter {
    pub fn new() -> Self {
        Self { router: Router::new() }
    }

    /// Bind `manager`'s collection on this router.
    pub fn bind<M: ResourceManager>(&mut self, manager: Arc<M>) -> Resource<M> {
        Resource::new(manager, self)
    }

    pub fn into_router(self) -> Router {
        self.router
    }

    /// The collected routes mounted under `prefix` (`""` mounts at the root).
    pub fn nest_under(self, prefix: &str) -> Router {
        if prefix.is_empty() || prefix == "/" {
            self.router
        } else {
            Router::new().nest(prefix, self.router)
        }
    }
}

impl Registrar for ResourceRouter {
    fn handle(&mut self, pattern: &str, route: MethodRouter) {
        let router = std::mem::replace(&mut self.router, Router::new());
        self.router = router.route(pattern, route);
    }
}

pub struct Resource<M> {
    manager: Arc<M>,
}

impl<M> Clone for Resource<M> {
    fn clone(&self) -> Self {
        Self { manager: Arc::clone(&self.manager) }
    }
}

impl<M: ResourceManager> Resource<M> {
    /// Register `/<name>` and `/<name>/:id` on `registrar`, both served by the
    /// returned dispatcher.
    pub fn new<R: Registrar + ?Sized>(manager: Arc<M>, registrar: &mut R) -> Self {
        let resource = Self { manager };
        let collection = format!("/{}", resource.manager.name());
        registrar.handle(&collection, any(serve_collection::<M>).with_state(resource.clone()));
        registrar.handle(
            &format!("{collection}/:id"),
            any(serve_item::<M>).with_state(resource.clone()),
        );
        resource
    }

    /// Dispatch one request. `id` is the path id, if the item route matched.
    pub async fn serve(&self, method: &Method, id: Option<&str>, query: &QueryParams, body: &[u8]) -> Response {
        self.dispatch(method, id, query, Ok(body)).await
    }

    /// Like [`serve`](Self::serve), but the body may already have failed to
    /// arrive. That failure only matters to verbs that decode the body.
    async fn dispatch(
        &self,
        method: &Method,
        id: Option<&str>,
        query: &QueryParams,
        body: Result<&[u8], ManagerError>,
    ) -> Response {
        let collection = self.manager.name();
        let started = Instant::now();
        debug!(collection, %method, id = ?id, "dispatching");

        let response = match *method {
            Method::GET => match self.fetch(id, query).await {
                Ok(found) => write_json(&found),
                Err(e) => self.failure(StatusCode::INTERNAL_SERVER_ERROR, &e),
            },
            Method::HEAD => match self.fetch(id, query).await {
                Ok(_) => head_ok(),
                Err(e) => self.failure(StatusCode::INTERNAL_SERVER_ERROR, &e),
            },
            Method::POST | Method::PUT => self.save(id, query, body).await,
            Method::DELETE => self.remove(id, query).await,
            _ => plain_error(StatusCode::NOT_IMPLEMENTED, "Method Not Supported"),
        };

        RESOURCE_REQUESTS_TOTAL
            .with_label_values(&[collection, method_label(method), response.status().as_str()])
            .inc();
        RESOURCE_REQUEST_DURATION
            .with_label_values(&[collection])
            .observe(started.elapsed().as_secs_f64());
        response
    }

    async fn fetch(&self, id: Option<&str>, query: &QueryParams) -> Result<Document, ManagerError> {
        match id {
            Some(id) => self.manager.get(id, query).await,
            None => self.manager.list(query).await.map(Value::Array),
        }
    }

    async fn save(&self, id: Option<&str>, query: &QueryParams, body: Result<&[u8], ManagerError>) -> Response {
        let entity = match body.and_then(|body| self.manager.decode(body)) {
            Ok(entity) => entity,
            Err(e) => return self.failure(StatusCode::BAD_REQUEST, &e),
        };
        // The path id wins over one embedded in the body.
        let target = id.or_else(|| entity.id()).map(str::to_owned);
        let saved = match target {
            Some(id) => self.manager.update(&id, entity, query).await,
            None => self.manager.create(entity, query).await,
        };
        match saved {
            Ok(doc) => write_json(&doc),
            Err(e) => self.failure(StatusCode::INTERNAL_SERVER_ERROR, &e),
        }
    }

    async fn remove(&self, id: Option<&str>, query: &QueryParams) -> Response {
        let Some(id) = id else {
            return plain_error(StatusCode::BAD_REQUEST, "Invalid Id");
        };
        match self.manager.delete(id, query).await {
            Ok(()) => no_content(),
            Err(e) => self.failure(StatusCode::INTERNAL_SERVER_ERROR, &e),
        }
    }

    fn failure(&self, status: StatusCode, err: &ManagerError) -> Response {
        if status.is_server_error() {
            error!(collection = self.manager.name(), error = %err, "resource operation failed");
        } else {
            debug!(collection = self.manager.name(), error = %err, "rejected request");
        }
        plain_error(status, &err.to_string())
    }
}

fn read_body(body: &Result<Bytes, BytesRejection>) -> Result<&[u8], ManagerError> {
    match body {
        Ok(bytes) => Ok(bytes.as_ref()),
        Err(rejection) => Err(ManagerError::decode(rejection.body_text())),
    }
}

async fn serve_collection<M: ResourceManager>(
    State(resource): State<Resource<M>>,
    method: Method,
    Query(pairs): Query<Vec<(String, String)>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let query: QueryParams = pairs.into_iter().collect();
    resource.dispatch(&method, None, &query, read_body(&body)).await
}

async fn serve_item<M: ResourceManager>(
    State(resource): State<Resource<M>>,
    method: Method,
    uri: Uri,
    path: Result<Path<String>, PathRejection>,
    Query(pairs): Query<Vec<(String, String)>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    // An id that does not decode is handed over raw; the store judges it.
    let id = match path {
        Ok(Path(id)) => id,
        Err(_) => uri.path().rsplit('/').next().unwrap_or_default().to_string(),
    };
    let query: QueryParams = pairs.into_iter().collect();
    resource.dispatch(&method, Some(id.as_str()), &query, read_body(&body)).await
}
