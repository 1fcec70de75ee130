//! Drives the `counter_server` demo through a remote proxy.

use envhub::remote::StaticResolver;
use envhub::transport::TcpConnector;
use envhub::{CallArgs, Environment, Params, RemoteEnvironment};

#[derive(Debug, Params)]
struct Add {
    by: i64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let resolver = StaticResolver::new().route("local/counter", "127.0.0.1:7860");
    let mut env =
        RemoteEnvironment::load_with("local/counter", &resolver, &TcpConnector::default()).await?;
    println!("session {}", env.session_id());

    for op in env.view_api().await? {
        let params: Vec<_> = op.params.iter().map(|p| p.name.as_str()).collect();
        println!("  {}({})", op.name, params.join(", "));
    }

    let start = env.reset(CallArgs::new().kwarg("limit", 10)?).await?;
    println!("reset -> {start}");

    for _ in 0..3 {
        let count = env.step(CallArgs::new()).await?;
        println!("step -> {count}");
    }

    let count: i64 = env.step_with(Add { by: 5 }).await?;
    println!("step(by=5) -> {count}");

    if let Err(e) = env.step_with::<_, i64>(Add { by: 5 }).await {
        println!("step(by=5) -> {e}");
    }
    Ok(())
}
