use chrono::Utc;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;
use snapshot_common::Response;
use snapshot_creator::{batch_timestamp, CreatorReport, SnapshotCreatorService};

async fn function_handler(_event: LambdaEvent<Value>) -> Result<Response<CreatorReport>, Error> {
    let service = SnapshotCreatorService::new().await?;
    let timestamp = batch_timestamp(Utc::now());

    Ok(service.run_snapshots(&timestamp).await?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    run(service_fn(function_handler)).await
}
