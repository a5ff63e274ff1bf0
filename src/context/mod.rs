//! Per-request context — the request plus type-keyed extensions.
//!
//! Middleware uses [`Extensions`] to hand request-scoped values to whatever
//! runs after it (the response cache publishes a
//! [`CacheHandle`](crate::cache::CacheHandle) this way).

use std::{
    any::{Any, TypeId},
    collections::HashMap,
};

use crate::Request;

/// Type-erased request extensions map, keyed by the value's type.
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
    /// Create a new empty extensions map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value of the same type.
    pub fn insert<T>(&mut self, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.map.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Get a value from the extensions map
    pub fn get<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }
}

/// Per-request context handed down the middleware chain.
pub struct Context {
    request: Request,
    extensions: Extensions,
}

impl Context {
    /// Create a new context from a request
    pub fn new(request: Request) -> Self {
        Self {
            request,
            extensions: Extensions::new(),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Decode the request body as JSON.
    pub fn json<T>(&self) -> Result<T, serde_json::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_slice(self.request.body())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_request(raw: &str) -> Request {
        let (req, _) = Request::parse(raw.as_bytes()).unwrap();
        req
    }

    #[test]
    fn extensions_are_keyed_by_type() {
        let mut ext = Extensions::new();
        ext.insert(7u32);
        ext.insert("tag");
        ext.insert(9u32);
        assert_eq!(ext.get::<u32>(), Some(&9));
        assert_eq!(ext.get::<&str>(), Some(&"tag"));
        assert!(ext.get::<u64>().is_none());
    }

    #[test]
    fn json_body() {
        #[derive(serde::Deserialize)]
        struct Item {
            id: u32,
        }

        let ctx = Context::new(make_request(
            "POST /items HTTP/1.1\r\nContent-Length: 9\r\n\r\n{\"id\":12}",
        ));
        let item: Item = ctx.json().unwrap();
        assert_eq!(item.id, 12);
    }
}
