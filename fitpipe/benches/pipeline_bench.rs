//! Benchmarks for the stage chain.

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fitpipe::prelude::*;
use std::sync::Arc;

struct OkTransport;

#[async_trait]
impl TransportExecutor for OkTransport {
    async fn execute(&self, _request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        Ok(ApiResponse::new(200))
    }
}

fn client(level: HttpLogLevel) -> ApiClient {
    let client = ApiClient::builder(
        ClientConfig::new()
            .with_log_level(level)
            .with_logout_on_connectivity_loss(false),
    )
    .with_transport(Arc::new(OkTransport))
    .build()
    .unwrap();
    client.session().save("abc", "alice", ["ROLE_USER"]);
    client
}

fn pipeline_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let _guard = runtime.enter();

    let quiet = client(HttpLogLevel::None);
    c.bench_function("execute_no_logging", |b| {
        b.iter(|| {
            runtime
                .block_on(quiet.execute(black_box(ApiRequest::get("api/entrenamientos"))))
                .unwrap()
        });
    });

    let logged = client(HttpLogLevel::Basic);
    c.bench_function("execute_basic_logging", |b| {
        b.iter(|| {
            runtime
                .block_on(logged.execute(black_box(ApiRequest::get("api/entrenamientos"))))
                .unwrap()
        });
    });
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
