// src/main.rs
use bookstore_recommender::{handler, init_tracing};
use lambda_runtime::{Error, service_fn};

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();
    lambda_runtime::run(service_fn(handler)).await
}
