use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::{CrudError, CrudResult};
use crate::item::Item;

pub mod store;

pub use store::ResourceStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        })
    }
}

/// Verb-shaped JSON transport the panel talks through.
///
/// Paths are relative to whatever base the implementation is bound to.
/// Implementations do not retry and do not translate errors.
#[async_trait]
pub trait CrudTransport: Send + Sync {
    async fn get(&self, path: &str) -> CrudResult<Value>;
    async fn post(&self, path: &str, body: &Value) -> CrudResult<Value>;
    async fn put(&self, path: &str, body: &Value) -> CrudResult<Value>;
    async fn delete(&self, path: &str) -> CrudResult<Value>;
}

#[async_trait]
impl<T: CrudTransport + ?Sized> CrudTransport for Arc<T> {
    async fn get(&self, path: &str) -> CrudResult<Value> {
        (**self).get(path).await
    }

    async fn post(&self, path: &str, body: &Value) -> CrudResult<Value> {
        (**self).post(path, body).await
    }

    async fn put(&self, path: &str, body: &Value) -> CrudResult<Value> {
        (**self).put(path, body).await
    }

    async fn delete(&self, path: &str) -> CrudResult<Value> {
        (**self).delete(path).await
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Default)]
struct CallLog {
    calls: Vec<RecordedCall>,
    failures: VecDeque<(Method, u16)>,
}

/// Transport backed by a `ResourceStore`, recording every call.
///
/// Failures can be queued per verb with `fail_next`; a queued failure is
/// consumed by the next call of that verb and leaves the store untouched.
#[derive(Clone, Default)]
pub struct InMemoryTransport {
    store: ResourceStore,
    log: Arc<Mutex<CallLog>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    pub fn seed(&self, resource: &str, items: Vec<Item>) {
        self.store.seed(resource, items);
    }

    pub fn fail_next(&self, method: Method, status: u16) {
        self.log().failures.push_back((method, status));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.log().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.log().calls.clear();
    }

    fn log(&self) -> MutexGuard<'_, CallLog> {
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, method: Method, path: &str, body: Option<&Value>) -> CrudResult<()> {
        let mut log = self.log();
        log.calls.push(RecordedCall {
            method,
            path: path.to_string(),
            body: body.cloned(),
        });
        if let Some(pos) = log.failures.iter().position(|(m, _)| *m == method) {
            if let Some((_, status)) = log.failures.remove(pos) {
                return Err(CrudError::Status {
                    status,
                    body: "injected failure".into(),
                });
            }
        }
        Ok(())
    }
}

fn status_of(err: CrudError) -> CrudError {
    match err {
        CrudError::NotFound(path) => CrudError::Status {
            status: 404,
            body: format!("not found: {path}"),
        },
        CrudError::Conflict(path) => CrudError::Status {
            status: 409,
            body: format!("already exists: {path}"),
        },
        other => other,
    }
}

#[async_trait]
impl CrudTransport for InMemoryTransport {
    async fn get(&self, path: &str) -> CrudResult<Value> {
        self.record(Method::Get, path, None)?;
        Ok(serde_json::to_value(self.store.list(path))?)
    }

    async fn post(&self, path: &str, body: &Value) -> CrudResult<Value> {
        self.record(Method::Post, path, Some(body))?;
        let item: Item = serde_json::from_value(body.clone())?;
        let created = self.store.create(path, item).map_err(status_of)?;
        Ok(serde_json::to_value(created)?)
    }

    async fn put(&self, path: &str, body: &Value) -> CrudResult<Value> {
        self.record(Method::Put, path, Some(body))?;
        let (resource, id) = store::split_member_path(path).map_err(status_of)?;
        let item: Item = serde_json::from_value(body.clone())?;
        let updated = self.store.update(&resource, &id, item).map_err(status_of)?;
        Ok(serde_json::to_value(updated)?)
    }

    async fn delete(&self, path: &str) -> CrudResult<Value> {
        self.record(Method::Delete, path, None)?;
        let (resource, id) = store::split_member_path(path).map_err(status_of)?;
        self.store.delete(&resource, &id).map_err(status_of)?;
        Ok(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn records_calls_in_order() {
        let transport = InMemoryTransport::new();
        transport.seed("/products", vec![Item::new().with("id", 1).with("sku", "A1")]);

        let listed = transport.get("/products").await.unwrap();
        assert_eq!(listed, json!([{"id": 1, "sku": "A1"}]));
        transport
            .put("/products/1", &json!({"id": 1, "sku": "B2"}))
            .await
            .unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].method, Method::Get);
        assert_eq!(calls[1].path, "/products/1");
        assert_eq!(calls[1].body, Some(json!({"id": 1, "sku": "B2"})));
    }

    #[tokio::test]
    async fn injected_failure_is_consumed_once() {
        let transport = InMemoryTransport::new();
        transport.fail_next(Method::Post, 500);

        let err = transport.post("/products", &json!({"sku": "A1"})).await;
        assert_eq!(err.unwrap_err().status(), Some(500));
        assert!(transport.store().list("products").is_empty());

        transport.post("/products", &json!({"sku": "A1"})).await.unwrap();
        assert_eq!(transport.store().list("products").len(), 1);
    }

    #[tokio::test]
    async fn duplicate_create_maps_to_409() {
        let transport = InMemoryTransport::new();
        transport.seed("/products", vec![Item::new().with("id", 1)]);
        let err = transport.post("/products", &json!({"id": 1})).await.unwrap_err();
        assert_eq!(err.status(), Some(409));
    }

    #[tokio::test]
    async fn missing_member_maps_to_404() {
        let transport = InMemoryTransport::new();
        let err = transport.delete("/products/9").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }
}
