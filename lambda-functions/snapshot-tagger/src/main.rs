use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;
use snapshot_common::Response;
use snapshot_tagger::SnapshotTaggerService;

async fn function_handler(_event: LambdaEvent<Value>) -> Result<Response<String>, Error> {
    let service = SnapshotTaggerService::new().await?;

    Ok(service.run_tagging().await?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    run(service_fn(function_handler)).await
}
