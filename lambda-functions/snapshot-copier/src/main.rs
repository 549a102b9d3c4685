use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use snapshot_common::Response;
use snapshot_copier::{SnapshotCopierService, SnapshotEvent};

async fn function_handler(event: LambdaEvent<SnapshotEvent>) -> Result<Response<String>, Error> {
    let service = SnapshotCopierService::new().await?;

    Ok(service.handle_event(&event.payload).await?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    run(service_fn(function_handler)).await
}
