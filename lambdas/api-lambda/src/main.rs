use lambda_http::{run, service_fn, tracing, Error, Request};
use std::sync::Arc;
use tracker_shared::AppState;

mod http_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    // Workbook and session store live for the lifetime of the execution environment
    let state = AppState::from_env();

    run(service_fn(move |event: Request| {
        let state = Arc::clone(&state);
        async move { http_handler::function_handler(event, state).await }
    }))
    .await
}
