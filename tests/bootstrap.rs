//! Bootstrap: listeners, ordering, fatal errors and the application factory.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::routing::get;
use webssh_gateway::config::{AppSettings, DefaultHandler};
use webssh_gateway::http::{AppFactory, Application, WebApplication};
use webssh_gateway::net::Scheme;
use webssh_gateway::routing::{RouteEntry, RouteTable};
use webssh_gateway::{Gateway, GatewayError, GatewayOptions, Plugins};

mod common;

fn base_url(gateway: &Gateway, index: usize) -> String {
    let server = &gateway.servers()[index];
    format!("{}://127.0.0.1:{}", server.scheme(), server.local_addr().port())
}

#[test]
fn plaintext_only_registers_one_listener() {
    let mut gateway = Gateway::new(common::local_options(), Plugins::default());
    gateway.start().unwrap();

    assert_eq!(gateway.servers().len(), 1);
    assert_eq!(gateway.servers()[0].scheme(), Scheme::Http);
    assert!(!gateway.loop_handle().unwrap().redirect().is_enabled());

    let url = format!("{}/", base_url(&gateway, 0));
    let (status, body) = gateway
        .run_until(async move {
            let response = common::http_client().get(url).send().await.unwrap();
            (response.status(), response.text().await.unwrap())
        })
        .unwrap();
    assert_eq!(status, reqwest::StatusCode::OK);
    assert!(body.contains("name=\"hostname\""));

    gateway.shutdown().unwrap();
}

#[test]
fn tls_registers_plaintext_then_https() {
    let mut gateway = Gateway::new(common::tls_options(), Plugins::default());
    gateway.start().unwrap();

    let schemes: Vec<Scheme> = gateway.servers().iter().map(|s| s.scheme()).collect();
    assert_eq!(schemes, [Scheme::Http, Scheme::Https]);

    let tls_port = gateway.servers()[1].local_addr().port();
    assert_eq!(gateway.loop_handle().unwrap().redirect().target(), Some(tls_port));

    let url = format!("{}/", base_url(&gateway, 1));
    let status = gateway
        .run_until(async move {
            common::http_client().get(url).send().await.unwrap().status()
        })
        .unwrap();
    assert_eq!(status, reqwest::StatusCode::OK);

    gateway.shutdown().unwrap();
}

#[test]
fn tls_without_redirect_leaves_target_unset() {
    let options = GatewayOptions {
        redirect: false,
        ..common::tls_options()
    };
    let mut gateway = Gateway::new(options, Plugins::default());
    gateway.start().unwrap();

    assert_eq!(gateway.servers().len(), 2);
    assert!(!gateway.loop_handle().unwrap().redirect().is_enabled());
    gateway.shutdown().unwrap();
}

#[test]
fn invalid_encoding_leaves_registry_empty() {
    let options = GatewayOptions {
        encoding: "klingon-8".into(),
        ..common::tls_options()
    };
    let mut gateway = Gateway::new(options, Plugins::default());

    let err = gateway.start().unwrap_err();
    assert!(matches!(err, GatewayError::Encoding(name) if name == "klingon-8"));
    assert!(gateway.servers().is_empty());
}

#[test]
fn plaintext_bind_failure_skips_tls() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let options = GatewayOptions {
        port: taken.local_addr().unwrap().port(),
        ..common::tls_options()
    };
    let mut gateway = Gateway::new(options, Plugins::default());

    let err = gateway.start().unwrap_err();
    assert!(matches!(err, GatewayError::Bind { .. }));
    assert!(err.is_fatal());
    assert!(gateway.servers().is_empty());
}

#[test]
fn half_configured_tls_is_fatal() {
    let options = GatewayOptions {
        keyfile: String::new(),
        ..common::tls_options()
    };
    let mut gateway = Gateway::new(options, Plugins::default());
    assert!(matches!(gateway.start(), Err(GatewayError::Config(msg)) if msg.contains("certfile")));
    assert!(gateway.servers().is_empty());
}

#[test]
fn invalid_tls_address_fails_before_any_listener() {
    let options = GatewayOptions {
        ssladdress: "nowhere".into(),
        ..common::tls_options()
    };
    let mut gateway = Gateway::new(options, Plugins::default());

    let err = gateway.start().unwrap_err();
    assert!(matches!(&err, GatewayError::Config(msg) if msg.contains("ssladdress")));
    assert!(gateway.servers().is_empty());

    // A failed start leaves nothing behind to duplicate.
    assert!(gateway.start().is_err());
    assert!(gateway.servers().is_empty());
}

#[test]
fn colliding_listener_ports_are_a_config_error() {
    let port = common::closed_port();
    let options = GatewayOptions {
        port,
        sslport: port,
        ..common::tls_options()
    };
    let mut gateway = Gateway::new(options, Plugins::default());

    assert!(matches!(gateway.start(), Err(GatewayError::Config(msg)) if msg.contains("sslport")));
    assert!(gateway.servers().is_empty());
}

#[test]
fn tls_bind_failure_drops_the_plaintext_listener() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let options = GatewayOptions {
        sslport: taken.local_addr().unwrap().port(),
        ..common::tls_options()
    };
    let mut gateway = Gateway::new(options, Plugins::default());

    let err = gateway.start().unwrap_err();
    assert!(matches!(err, GatewayError::Bind { port, .. } if port == taken.local_addr().unwrap().port()));
    assert!(gateway.servers().is_empty());
    assert!(gateway.loop_handle().is_none());
}

#[test]
fn extra_routes_win_and_unknown_paths_are_not_found() {
    let plugins = Plugins::new()
        .with_route(RouteEntry::new("/healthz", get(|| async { "ok" })))
        .with_route(RouteEntry::new("/", get(|| async { "operator index" })));
    let mut gateway = Gateway::new(common::local_options(), plugins);
    gateway.start().unwrap();

    let base = base_url(&gateway, 0);
    let (health, index, missing) = gateway
        .run_until(async move {
            let client = common::http_client();
            let get = |path: &str| client.get(format!("{base}{path}")).send();
            let health = get("/healthz").await.unwrap().text().await.unwrap();
            let index = get("/").await.unwrap().text().await.unwrap();
            let missing = get("/no/such/page").await.unwrap().status();
            (health, index, missing)
        })
        .unwrap();

    assert_eq!(health, "ok");
    assert_eq!(index, "operator index");
    assert_eq!(missing, reqwest::StatusCode::NOT_FOUND);
    gateway.shutdown().unwrap();
}

#[test]
fn app_factory_replaces_default_application() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen: Arc<Mutex<Vec<(Vec<String>, Option<DefaultHandler>)>>> = Arc::default();

    let (counter, recorder) = (Arc::clone(&calls), Arc::clone(&seen));
    let factory: AppFactory = Arc::new(move |routes: RouteTable, settings: AppSettings| -> webssh_gateway::Result<Box<dyn Application>> {
        counter.fetch_add(1, Ordering::SeqCst);
        let patterns = routes.patterns().iter().map(|p| p.to_string()).collect();
        recorder.lock().unwrap().push((patterns, settings.default_handler));
        Ok(Box::new(WebApplication::new(routes, settings)))
    });

    let plugins = Plugins::new()
        .with_route(RouteEntry::new("/healthz", get(|| async { "ok" })))
        .with_app_factory(factory);
    let mut gateway = Gateway::new(common::local_options(), plugins);
    gateway.start().unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].0, ["/healthz", "/", "/ws"]);
    assert_eq!(seen[0].1, Some(DefaultHandler::NotFound));

    let url = format!("{}/healthz", base_url(&gateway, 0));
    let body = gateway
        .run_until(async move {
            common::http_client().get(url).send().await.unwrap().text().await.unwrap()
        })
        .unwrap();
    assert_eq!(body, "ok");
    gateway.shutdown().unwrap();
}

#[test]
fn failing_app_factory_aborts_startup() {
    let factory: AppFactory = Arc::new(|_: RouteTable, _: AppSettings| -> webssh_gateway::Result<Box<dyn Application>> {
        Err(GatewayError::Extension("factory refused".into()))
    });
    let mut gateway = Gateway::new(
        common::local_options(),
        Plugins::new().with_app_factory(factory),
    );

    assert!(matches!(gateway.start(), Err(GatewayError::Extension(_))));
    assert!(gateway.servers().is_empty());
}
