//! A small server whose `/time` endpoint is cached for ten seconds.
//!
//! ```text
//! RUST_LOG=debug cargo run --example cached_server
//! curl -i http://127.0.0.1:8080/time            # X-Cache: MISS
//! curl -i http://127.0.0.1:8080/time            # X-Cache: HIT, Age: n
//! curl -i -X POST http://127.0.0.1:8080/purge   # clears the cache
//! ```

use std::time::{Duration, SystemTime};

use rttp_cache::cache::{CacheConfig, CacheHandle, CacheMiddleware};
use rttp_cache::context::Context;
use rttp_cache::middleware::{LoggerMiddleware, Pipeline};
use rttp_cache::{Method, Response, Server, StatusCode};
use tracing_subscriber::EnvFilter;

async fn app(ctx: Context) -> Response {
    let request = ctx.request();
    match (request.method(), request.path()) {
        (Method::Get, "/time") => {
            let now = epoch_seconds();
            Response::new(StatusCode::Ok).body(format!("generated at {now}\n"))
        }
        (Method::Post, "/purge") => {
            if let Some(cache) = ctx.extensions().get::<CacheHandle>() {
                cache.clear();
            }
            Response::new(StatusCode::NoContent)
        }
        _ => Response::new(StatusCode::NotFound).body("Not Found"),
    }
}

fn epoch_seconds() -> String {
    let since_epoch = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}s since epoch", since_epoch.as_secs())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cache = CacheMiddleware::new(CacheConfig::new().ttl(Duration::from_secs(10)));
    let pipeline = Pipeline::new(app).layer(LoggerMiddleware).layer(cache);

    let server = Server::bind("127.0.0.1:8080").await?;
    println!("Listening on http://{}", server.local_addr());
    server.run(pipeline).await?;
    Ok(())
}
