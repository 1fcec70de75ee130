use std::net::SocketAddr;
use std::sync::Arc;

use envhub::remote::StaticResolver;
use envhub::transport::{Server, ServerConfig, TcpConnector, TcpTransport, Transport};
use envhub::{
    ApiExporter, CallArgs, EnvError, Environment, Error, Params, RemoteEnvironment,
    SessionRegistry, async_trait,
};
use serde_json::json;
use tokio::sync::oneshot;

#[derive(Debug, Default)]
struct Walker {
    position: i64,
}

#[derive(Debug, Params)]
struct Move {
    action: String,
    #[param(default = 1)]
    distance: i64,
    #[param(default)]
    note: Option<String>,
}

#[async_trait]
impl Environment for Walker {
    type ResetArgs = ();
    type Observation = String;
    type StepArgs = Move;
    type StepResult = String;

    async fn reset(&mut self, _: ()) -> Result<String, Error> {
        self.position = 0;
        Ok("ready".to_string())
    }

    async fn step(&mut self, args: Move) -> Result<String, Error> {
        match args.action.as_str() {
            "left" => self.position -= args.distance,
            "right" => self.position += args.distance,
            "jump" => {}
            other => return Err(EnvError::msg(format!("cannot {other}")).into()),
        }
        let did = format!("did {} at {}", args.action, self.position);
        Ok(match args.note {
            Some(note) => format!("{did} ({note})"),
            None => did,
        })
    }
}

async fn start() -> (SocketAddr, Arc<SessionRegistry<Walker>>, oneshot::Sender<()>) {
    let registry = Arc::new(SessionRegistry::new());
    let mut router = envhub::Router::new();
    ApiExporter::new(Arc::clone(&registry))
        .register(&mut router)
        .unwrap();

    let config = ServerConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        ..ServerConfig::default()
    };
    let server = Server::bind(Arc::new(router), config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(server.serve_with_shutdown(async {
        let _ = rx.await;
    }));
    (addr, registry, tx)
}

async fn load(addr: SocketAddr) -> RemoteEnvironment {
    let resolver = StaticResolver::new().route("acme/walker", addr.to_string());
    RemoteEnvironment::load_with("acme/walker", &resolver, &TcpConnector::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn remote_proxy_drives_a_served_environment() {
    let (addr, registry, _shutdown) = start().await;
    let mut env = load(addr).await;
    assert_eq!(registry.len(), 1);
    assert!(registry.contains(&env.session_id().parse().unwrap()));

    assert_eq!(env.reset(CallArgs::new()).await.unwrap(), json!("ready"));
    let did = env
        .step(CallArgs::new().arg("jump").unwrap())
        .await
        .unwrap();
    assert_eq!(did, json!("did jump at 0"));

    let moved = env
        .step(CallArgs::new().kwarg("action", "right").unwrap().kwarg("distance", 3).unwrap())
        .await
        .unwrap();
    assert_eq!(moved, json!("did right at 3"));

    let noted = env
        .step(CallArgs::new().arg("jump").unwrap().kwarg("note", "high").unwrap())
        .await
        .unwrap();
    assert_eq!(noted, json!("did jump at 3 (high)"));
}

#[tokio::test]
async fn unknown_session_is_rejected_over_the_wire() {
    let (addr, _registry, _shutdown) = start().await;
    let transport = TcpTransport::connect(&addr.to_string()).await.unwrap();

    let err = transport
        .call("reset", CallArgs::new().arg("bogus-id").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidSession(id) if id == "bogus-id"));
}

#[tokio::test]
async fn proxies_get_independent_sessions() {
    let (addr, registry, _shutdown) = start().await;
    let mut first = load(addr).await;
    let mut second = load(addr).await;
    assert_ne!(first.session_id(), second.session_id());
    assert_eq!(registry.len(), 2);

    first.reset(CallArgs::new()).await.unwrap();
    second.reset(CallArgs::new()).await.unwrap();
    for _ in 0..3 {
        first.step(CallArgs::new().arg("right").unwrap()).await.unwrap();
    }
    let other = second
        .step(CallArgs::new().arg("left").unwrap())
        .await
        .unwrap();
    assert_eq!(other, json!("did left at -1"));
}

#[tokio::test]
async fn argument_and_environment_errors_reach_the_caller() {
    let (addr, _registry, _shutdown) = start().await;
    let mut env = load(addr).await;

    let err = env.step(CallArgs::new()).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArguments(m) if m.contains("action")));

    let err = env
        .step(CallArgs::new().arg("fly").unwrap())
        .await
        .unwrap_err();
    assert!(err.is_environment());
    assert_eq!(err.to_string(), "environment error: cannot fly");

    // The session survives a failed step.
    let did = env
        .step(CallArgs::new().arg("jump").unwrap())
        .await
        .unwrap();
    assert_eq!(did, json!("did jump at 0"));
}

#[tokio::test]
async fn view_api_reports_session_bound_signatures() {
    let (addr, _registry, _shutdown) = start().await;
    let env = load(addr).await;

    let api = env.view_api().await.unwrap();
    let step = api.iter().find(|s| s.name == "step").unwrap();
    let names: Vec<_> = step.params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["session_id", "action", "distance", "note"]);
    assert_eq!(step.params[2].default, Some(json!(1)));
    assert_eq!(step.params[3].default, Some(serde_json::Value::Null));
    assert!(!step.params[3].is_required());

    let init = api.iter().find(|s| s.name == "init").unwrap();
    assert!(init.params.is_empty());
}
