//! HTTP probes against mock servers

use std::time::Duration;

use assert_matches::assert_matches;
use netcheck::{
    clock::Clock,
    probes::{
        LatencyProbe, LatencyTarget, Probe, ProbeError, Reachability, SpeedServer, SpeedService,
        ThroughputProbe,
        http::{HttpReachability, HttpSpeedService},
        throughput::{DOWNLOAD, UPLOAD},
    },
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Nothing listens on port 1, so connecting is refused immediately
const REFUSED: &str = "127.0.0.1:1";

async fn speed_server(discovery_status: u16, discovery_delay: Duration) -> MockServer {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/__down"))
        .and(query_param("bytes", "0"))
        .respond_with(ResponseTemplate::new(discovery_status).set_delay(discovery_delay))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/__down"))
        .and(query_param("bytes", "4096"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 4096]))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/__up"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    mock_server
}

fn service(servers: Vec<String>) -> HttpSpeedService {
    HttpSpeedService::new(servers, 4096, 2048)
        .unwrap()
        .with_discovery_timeout(Duration::from_secs(2))
}

#[tokio::test]
async fn test_reachability_times_response() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let elapsed = HttpReachability::new()
        .unwrap()
        .request(&mock_server.uri(), Duration::from_secs(1))
        .await
        .unwrap();

    assert!(elapsed < Duration::from_secs(1));
}

#[tokio::test]
async fn test_reachability_accepts_any_status() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let result = HttpReachability::new()
        .unwrap()
        .request(&mock_server.uri(), Duration::from_secs(1))
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_reachability_timeout() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&mock_server)
        .await;

    let result = HttpReachability::new()
        .unwrap()
        .request(&mock_server.uri(), Duration::from_millis(50))
        .await;

    assert_matches!(result, Err(ProbeError::Timeout(_)));
}

#[tokio::test]
async fn test_reachability_connection_refused() {
    let result = HttpReachability::new()
        .unwrap()
        .request(REFUSED, Duration::from_secs(1))
        .await;

    assert_matches!(result, Err(ProbeError::Connection(_)));
}

#[tokio::test]
async fn test_latency_probe_zero_for_unreachable_targets() {
    let fast = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&fast)
        .await;

    let slow = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&slow)
        .await;

    let probe = LatencyProbe::with_timeout(
        HttpReachability::new().unwrap(),
        vec![
            LatencyTarget::new("Fast", fast.uri()),
            LatencyTarget::new("Slow", slow.uri()),
            LatencyTarget::new("Down", REFUSED),
        ],
        Duration::from_millis(100),
    );

    let sample = probe.sample(&Clock::new()).await.unwrap();

    let fast_ms = sample.get("Fast").unwrap();
    assert!(fast_ms > 0.0 && fast_ms < 100.0, "fast target took {fast_ms}ms");
    assert_eq!(sample.get("Slow"), Some(0.0));
    assert_eq!(sample.get("Down"), Some(0.0));
}

#[tokio::test]
async fn test_discovery_picks_lowest_latency_server() {
    let slow = speed_server(200, Duration::from_millis(300)).await;
    let fast = speed_server(200, Duration::ZERO).await;

    let server = service(vec![slow.uri(), fast.uri()]).discover().await.unwrap();

    assert_eq!(server.url, fast.uri());
}

#[tokio::test]
async fn test_discovery_without_successful_answer_is_best_server_failure() {
    let broken = speed_server(500, Duration::ZERO).await;

    let result = service(vec![broken.uri(), format!("http://{REFUSED}")])
        .discover()
        .await;

    assert_matches!(result, Err(ProbeError::BestServerSelection(_)));
}

#[tokio::test]
async fn test_discovery_without_reachable_server_is_config_failure() {
    let result = service(vec![format!("http://{REFUSED}")]).discover().await;

    assert_matches!(result, Err(ProbeError::ConfigRetrieval(_)));
}

#[tokio::test]
async fn test_download_and_upload_rates() {
    let mock_server = speed_server(200, Duration::ZERO).await;
    let speed = service(vec![mock_server.uri()]);
    let server = SpeedServer {
        url: mock_server.uri(),
        latency: Duration::from_millis(1),
    };

    let download = speed.download(&server).await.unwrap();
    let upload = speed.upload(&server).await.unwrap();

    assert!(download.is_finite() && download > 0.0);
    assert!(upload.is_finite() && upload > 0.0);

    let requests = mock_server.received_requests().await.unwrap();
    let uploaded = requests
        .iter()
        .find(|r| r.url.path() == "/__up")
        .unwrap();
    assert_eq!(uploaded.body.len(), 2048);
}

#[tokio::test]
async fn test_failed_transfer_is_unexpected() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/__up"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let result = service(vec![mock_server.uri()])
        .upload(&SpeedServer {
            url: mock_server.uri(),
            latency: Duration::from_millis(1),
        })
        .await;

    let err = result.unwrap_err();
    assert_matches!(err, ProbeError::Transfer(_));
    assert!(!err.is_recoverable());
}

#[tokio::test]
async fn test_throughput_probe_over_http() {
    let mock_server = speed_server(200, Duration::ZERO).await;
    let probe = ThroughputProbe::new(service(vec![mock_server.uri()]));

    let sample = probe.sample(&Clock::new()).await.unwrap();

    assert!(sample.get(DOWNLOAD).unwrap() > 0.0);
    assert!(sample.get(UPLOAD).unwrap() > 0.0);
}

#[tokio::test]
async fn test_throughput_probe_cools_down_when_no_server_answers() {
    let broken = speed_server(500, Duration::ZERO).await;
    let probe =
        ThroughputProbe::with_cooldown(service(vec![broken.uri()]), Duration::from_millis(20));

    let started = std::time::Instant::now();
    let sample = probe.sample(&Clock::new()).await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(20));
    assert_eq!(sample.get(DOWNLOAD), Some(0.0));
    assert_eq!(sample.get(UPLOAD), Some(0.0));
}
