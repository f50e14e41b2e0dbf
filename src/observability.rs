//! Tracing, trace propagation, and metrics wiring.
//!
//! # Purpose
//! One call from startup configures the `tracing` subscriber (with an OTLP
//! span exporter when a collector endpoint is reachable), installs the W3C
//! trace-context propagator, and returns the Prometheus render handle that
//! backs the `/metrics` listener.
//!
//! Everything here is idempotent: tests and restarts within one process hit
//! the `OnceLock`-guarded slow path exactly once.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use opentelemetry::propagation::Extractor;
use opentelemetry::trace::TracerProvider;
use opentelemetry::{global, KeyValue};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::Resource;
use std::net::SocketAddr;
use std::sync::OnceLock;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static TRACING_INIT: OnceLock<()> = OnceLock::new();
static PROPAGATOR_INIT: OnceLock<()> = OnceLock::new();

/// Deployment metadata picked up from the environment when present, keyed
/// by the OTEL resource attribute each variable maps to.
const RESOURCE_ENV_VARS: &[(&str, &str)] = &[
    ("k8s.cluster.name", "K8S_CLUSTER_NAME"),
    ("k8s.namespace.name", "K8S_NAMESPACE_NAME"),
    ("k8s.pod.name", "K8S_POD_NAME"),
    ("cloud.region", "CLOUD_REGION"),
    ("deployment.environment", "DEPLOYMENT_ENVIRONMENT"),
];

/// Initialize tracing and metrics for the process and return the Prometheus
/// handle. Safe to call more than once.
pub fn init_observability(service_name: &str) -> PrometheusHandle {
    ensure_propagator();
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));
        let otel_layer = build_tracer_provider(service_name).map(|provider| {
            tracing_opentelemetry::layer().with_tracer(provider.tracer(service_name.to_string()))
        });
        // `Option<Layer>` is itself a layer, so a missing exporter simply
        // drops the OTLP stage.
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .with(otel_layer)
            .try_init();
    });
    metrics_handle()
}

fn ensure_propagator() {
    PROPAGATOR_INIT
        .get_or_init(|| global::set_text_map_propagator(TraceContextPropagator::new()));
}

fn build_tracer_provider(service_name: &str) -> Option<opentelemetry_sdk::trace::TracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()
        .ok()?;
    let provider = opentelemetry_sdk::trace::TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_resource(Resource::new(resource_attributes(service_name)))
        .build();
    Some(provider)
}

fn resource_attributes(service_name: &str) -> Vec<KeyValue> {
    let mut attrs = vec![KeyValue::new("service.name", service_name.to_string())];
    let instance = std::env::var("TEAMGATE_SERVICE_INSTANCE_ID")
        .or_else(|_| std::env::var("HOSTNAME"));
    if let Ok(value) = instance {
        attrs.push(KeyValue::new("service.instance.id", value));
    }
    for (key, var) in RESOURCE_ENV_VARS {
        if let Ok(value) = std::env::var(var) {
            attrs.push(KeyValue::new(*key, value));
        }
    }
    attrs
}

/// Extract the upstream span context from incoming request headers.
pub fn trace_context_from_headers(headers: &axum::http::HeaderMap) -> opentelemetry::Context {
    ensure_propagator();
    global::get_text_map_propagator(|propagator| propagator.extract(&HeaderCarrier(headers)))
}

struct HeaderCarrier<'a>(&'a axum::http::HeaderMap);

impl<'a> Extractor for HeaderCarrier<'a> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|name| name.as_str()).collect()
    }
}

fn metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .expect("install metrics recorder")
        })
        .clone()
}

/// Serve `GET /metrics` on `addr` until the process exits.
pub async fn serve_metrics(handle: PrometheusHandle, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve_metrics_on(handle, listener, std::future::pending()).await
}

async fn serve_metrics_on(
    handle: PrometheusHandle,
    listener: tokio::net::TcpListener,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let router = axum::Router::new().route(
        "/metrics",
        axum::routing::get(move || async move { handle.render() }),
    );
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::{TraceContextExt, TraceId};
    use serial_test::serial;
    use std::time::Duration;
    use tokio::sync::oneshot;

    struct VarGuard {
        key: &'static str,
        prev: Option<String>,
    }

    impl VarGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let prev = std::env::var(key).ok();
            std::env::set_var(key, value);
            Self { key, prev }
        }

        fn unset(key: &'static str) -> Self {
            let prev = std::env::var(key).ok();
            std::env::remove_var(key);
            Self { key, prev }
        }
    }

    impl Drop for VarGuard {
        fn drop(&mut self) {
            match &self.prev {
                Some(value) => std::env::set_var(self.key, value),
                None => std::env::remove_var(self.key),
            }
        }
    }

    #[test]
    #[serial]
    fn resource_attributes_pick_up_deployment_env() {
        let _id = VarGuard::set("TEAMGATE_SERVICE_INSTANCE_ID", "instance-1");
        let guards: Vec<VarGuard> = RESOURCE_ENV_VARS
            .iter()
            .map(|(_, var)| VarGuard::set(var, "from-env"))
            .collect();

        let attrs = resource_attributes("teamgate");
        let lookup = |key: &str| {
            attrs
                .iter()
                .find(|attr| attr.key.as_str() == key)
                .map(|attr| attr.value.to_string())
        };
        assert_eq!(lookup("service.name"), Some("teamgate".to_string()));
        assert_eq!(lookup("service.instance.id"), Some("instance-1".to_string()));
        for (key, _) in RESOURCE_ENV_VARS {
            assert_eq!(lookup(key), Some("from-env".to_string()), "{key}");
        }
        drop(guards);
    }

    #[test]
    #[serial]
    fn instance_id_falls_back_to_hostname() {
        let _unset = VarGuard::unset("TEAMGATE_SERVICE_INSTANCE_ID");
        let _host = VarGuard::set("HOSTNAME", "host-1");

        let attrs = resource_attributes("teamgate");
        let instance = attrs
            .iter()
            .find(|attr| attr.key.as_str() == "service.instance.id")
            .map(|attr| attr.value.to_string());
        assert_eq!(instance, Some("host-1".to_string()));
    }

    #[test]
    fn header_carrier_exposes_utf8_values_only() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert("tracestate", "congo=t61rcWkgMzE".parse().unwrap());
        headers.insert(
            "traceparent",
            axum::http::HeaderValue::from_bytes(b"\xFF").unwrap(),
        );
        let carrier = HeaderCarrier(&headers);

        assert_eq!(carrier.get("tracestate"), Some("congo=t61rcWkgMzE"));
        assert!(carrier.get("traceparent").is_none());
        assert!(carrier.keys().contains(&"tracestate"));
    }

    #[test]
    fn traceparent_header_yields_the_upstream_context() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            "traceparent",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"
                .parse()
                .unwrap(),
        );
        let context = trace_context_from_headers(&headers);
        let span = context.span();
        let span_ctx = span.span_context();
        assert!(span_ctx.is_valid());
        assert_eq!(
            span_ctx.trace_id(),
            TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap()
        );
    }

    #[test]
    #[serial]
    fn metrics_handle_is_process_wide() {
        let first = metrics_handle();
        let second = metrics_handle();
        let _ = (first.render(), second.render());
    }

    #[tokio::test(flavor = "multi_thread")]
    #[serial]
    async fn init_observability_is_idempotent() {
        let first = init_observability("teamgate-test");
        let second = init_observability("teamgate-test");
        let _ = (first.render(), second.render());
    }

    #[tokio::test(flavor = "multi_thread")]
    #[serial]
    async fn metrics_endpoint_renders_over_http() {
        let handle = init_observability("teamgate-metrics-test");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let (stop_tx, stop_rx) = oneshot::channel();
        let server = tokio::spawn(serve_metrics_on(handle, listener, async move {
            let _ = stop_rx.await;
        }));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .no_proxy()
            .build()
            .expect("client");
        let response = client
            .get(format!("http://{addr}/metrics"))
            .send()
            .await
            .expect("GET /metrics");
        assert!(response.status().is_success());

        let _ = stop_tx.send(());
        tokio::time::timeout(Duration::from_secs(1), server)
            .await
            .expect("shutdown")
            .expect("join")
            .expect("serve");
    }
}
