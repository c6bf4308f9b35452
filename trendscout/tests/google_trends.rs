mod common;

use common::*;
use std::time::Duration;
use trendscout::{
    AcquisitionClient, BatchOutcome, Configuration, KeywordBatch, PacingPolicy, RegionCode,
    TimeWindow, TrendsError,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn batch(keywords: &[&str]) -> KeywordBatch {
    KeywordBatch::new(keywords.iter().map(|k| k.to_string()).collect()).unwrap()
}

#[tokio::test]
async fn explore_then_multiline_without_partial_point() {
    let server = MockServer::start().await;
    mount_trends(&server).await;

    let client = AcquisitionClient::new(&test_config(&server)).unwrap();
    let outcome = client
        .fetch_batch(
            &batch(&["Matcha", "Pickleball"]),
            &RegionCode::parse("US").unwrap(),
            TimeWindow::PastFiveYears,
        )
        .await;

    let series = match outcome {
        BatchOutcome::Series(series) => series,
        other => panic!("expected series, got {:?}", other),
    };

    assert_eq!(series.len(), 2);
    assert_eq!(series[0].keyword, "Matcha");
    assert_eq!(series[1].keyword, "Pickleball");
    for s in &series {
        assert_eq!(s.len(), 3);
        assert_eq!(s.scores().collect::<Vec<_>>(), vec![0, 10, 20]);
        assert!(s.points.iter().all(|p| p.timestamp.timestamp() < EPOCH + 3 * WEEK));
    }

    let multiline = received(&server, MULTILINE).await;
    assert_eq!(multiline.len(), 1);
    assert!(multiline[0]
        .url
        .query_pairs()
        .any(|(k, v)| k == "token" && v == TOKEN));
}

#[tokio::test]
async fn sends_language_timezone_and_geo() {
    let server = MockServer::start().await;
    mount_trends(&server).await;

    let mut config = test_config(&server);
    config.with_language("de-DE").with_tz(-60);
    let client = AcquisitionClient::new(&config).unwrap();

    client
        .fetch_batch(&batch(&["Heat Pump"]), &RegionCode::worldwide(), TimeWindow::PastTwelveMonths)
        .await;
    client
        .fetch_batch(&batch(&["Heat Pump"]), &RegionCode::parse("de").unwrap(), TimeWindow::PastTwelveMonths)
        .await;

    let explore = received(&server, EXPLORE).await;
    assert_eq!(explore.len(), 2);

    let pairs: Vec<(String, String)> = explore[0]
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert!(pairs.contains(&("hl".into(), "de-DE".into())));
    assert!(pairs.contains(&("tz".into(), "-60".into())));

    let world = req_param(&explore[0]);
    assert_eq!(world["comparisonItem"][0]["geo"], "");
    assert_eq!(world["comparisonItem"][0]["time"], "today 12-m");
    assert_eq!(world["comparisonItem"][0]["keyword"], "Heat Pump");

    let germany = req_param(&explore[1]);
    assert_eq!(germany["comparisonItem"][0]["geo"], "DE");
}

#[tokio::test]
async fn retries_service_unavailable_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(EXPLORE))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_trends(&server).await;

    let client = AcquisitionClient::new(&test_config(&server)).unwrap();
    let outcome = client
        .fetch_batch(&batch(&["Smart Ring"]), &RegionCode::worldwide(), TimeWindow::default())
        .await;

    assert!(outcome.is_series(), "{:?}", outcome);
    assert_eq!(received(&server, EXPLORE).await.len(), 2);
}

#[tokio::test]
async fn honors_retry_after_on_too_many_requests() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(EXPLORE))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_trends(&server).await;

    let client = AcquisitionClient::new(&test_config(&server)).unwrap();
    let outcome = client
        .fetch_batch(&batch(&["E-bike"]), &RegionCode::worldwide(), TimeWindow::default())
        .await;

    assert!(outcome.is_series(), "{:?}", outcome);
    assert_eq!(received(&server, EXPLORE).await.len(), 3);
}

#[tokio::test]
async fn gives_up_after_retry_limit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(EXPLORE))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let client = AcquisitionClient::new(&test_config(&server)).unwrap();
    let outcome = client
        .fetch_batch(&batch(&["X", "Y"]), &RegionCode::worldwide(), TimeWindow::default())
        .await;

    match outcome {
        BatchOutcome::Failed(failure) => {
            assert_eq!(failure.keywords, vec!["X".to_string(), "Y".to_string()]);
            assert!(failure.error.is_retryable());
            assert!(matches!(failure.error, TrendsError::Transient(_)));
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

/// Fast retries against a bare url.
fn raw_config(uri: &str) -> Configuration {
    let mut config = Configuration::new();
    config
        .with_api_url(Some(uri))
        .with_retry(3)
        .with_backoff(Duration::from_millis(1), Duration::from_millis(5))
        .with_connect_timeout(Duration::from_secs(2))
        .with_request_timeout(Duration::from_secs(5))
        .with_pacing(PacingPolicy::none())
        .with_cache(false)
        .with_seed(Some(5));
    config
}

#[tokio::test]
async fn body_cut_short_is_retried() {
    let upstream = RawUpstream::start(1).await;

    let client = AcquisitionClient::new(&raw_config(&upstream.uri)).unwrap();
    let outcome = client
        .fetch_batch(&batch(&["Matcha"]), &RegionCode::worldwide(), TimeWindow::default())
        .await;

    match outcome {
        BatchOutcome::Series(series) => {
            assert_eq!(series.len(), 1);
            assert_eq!(series[0].keyword, "Matcha");
            assert_eq!(series[0].len(), 3);
        }
        other => panic!("expected series, got {:?}", other),
    }
    assert_eq!(upstream.explore_hits(), 2);
}

#[tokio::test]
async fn body_cut_short_every_time_is_transient() {
    let upstream = RawUpstream::start(usize::MAX).await;

    let client = AcquisitionClient::new(&raw_config(&upstream.uri)).unwrap();
    let outcome = client
        .fetch_batch(&batch(&["Matcha"]), &RegionCode::worldwide(), TimeWindow::default())
        .await;

    match outcome {
        BatchOutcome::Failed(failure) => {
            assert!(matches!(failure.error, TrendsError::Transient(_)), "{:?}", failure.error);
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(upstream.explore_hits(), 4);
}

#[tokio::test]
async fn connection_refused_is_transient() {
    let uri = closed_port().await;

    let client = AcquisitionClient::new(&raw_config(&uri)).unwrap();
    let outcome = client
        .fetch_batch(&batch(&["Matcha"]), &RegionCode::worldwide(), TimeWindow::default())
        .await;

    match outcome {
        BatchOutcome::Failed(failure) => {
            assert_eq!(failure.keywords, vec!["Matcha".to_string()]);
            assert!(matches!(failure.error, TrendsError::Transient(_)), "{:?}", failure.error);
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn read_timeout_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(EXPLORE))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_trends(&server).await;

    let mut config = test_config(&server);
    config.with_request_timeout(Duration::from_millis(300));
    let client = AcquisitionClient::new(&config).unwrap();
    let outcome = client
        .fetch_batch(&batch(&["Sauna"]), &RegionCode::worldwide(), TimeWindow::default())
        .await;

    assert!(outcome.is_series(), "{:?}", outcome);
    assert_eq!(received(&server, EXPLORE).await.len(), 2);
}

#[tokio::test]
async fn read_timeout_every_time_is_transient() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(EXPLORE))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let mut config = test_config(&server);
    config
        .with_retry(1)
        .with_request_timeout(Duration::from_millis(200));
    let client = AcquisitionClient::new(&config).unwrap();
    let outcome = client
        .fetch_batch(&batch(&["Sauna"]), &RegionCode::worldwide(), TimeWindow::default())
        .await;

    match outcome {
        BatchOutcome::Failed(failure) => {
            assert!(matches!(failure.error, TrendsError::Transient(_)), "{:?}", failure.error);
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(received(&server, EXPLORE).await.len(), 2);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(EXPLORE))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .expect(1)
        .mount(&server)
        .await;

    let client = AcquisitionClient::new(&test_config(&server)).unwrap();
    let outcome = client
        .fetch_batch(&batch(&["Tiny House"]), &RegionCode::worldwide(), TimeWindow::default())
        .await;

    match outcome {
        BatchOutcome::Failed(failure) => assert_eq!(
            failure.error,
            TrendsError::UpstreamRejection {
                status: 400,
                message: "bad request".into()
            }
        ),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn missing_timeseries_widget_is_no_data() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(EXPLORE))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "{}{}",
            GUARD,
            r#"{"widgets":[{"id":"RELATED_QUERIES","token":"t","request":{}}]}"#
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(MULTILINE))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = AcquisitionClient::new(&test_config(&server)).unwrap();
    let outcome = client
        .fetch_batch(&batch(&["qwzxv"]), &RegionCode::worldwide(), TimeWindow::default())
        .await;

    assert!(outcome.is_no_data(), "{:?}", outcome);
}

#[tokio::test]
async fn empty_timeline_is_no_data() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(EXPLORE))
        .respond_with(|request: &wiremock::Request| {
            ResponseTemplate::new(200).set_body_string(explore_body(&req_param(request)))
        })
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(MULTILINE))
        .and(query_param("token", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "{}{}",
            GUARD,
            r#"{"default":{"timelineData":[],"averages":[]}}"#
        )))
        .mount(&server)
        .await;

    let client = AcquisitionClient::new(&test_config(&server)).unwrap();
    let outcome = client
        .fetch_batch(&batch(&["X"]), &RegionCode::worldwide(), TimeWindow::default())
        .await;

    assert_eq!(outcome, BatchOutcome::NoData);
}

#[tokio::test]
async fn undecodable_body_is_decode_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(EXPLORE))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>captcha</html>"))
        .mount(&server)
        .await;

    let client = AcquisitionClient::new(&test_config(&server)).unwrap();
    let outcome = client
        .fetch_batch(&batch(&["Matcha"]), &RegionCode::worldwide(), TimeWindow::default())
        .await;

    match outcome {
        BatchOutcome::Failed(failure) => {
            assert!(matches!(failure.error, TrendsError::Decode(_)));
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn oversized_batch_rejected_before_network() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = AcquisitionClient::new(&test_config(&server)).unwrap();
    let keywords: Vec<String> = (0..6).map(|i| format!("k{}", i)).collect();
    let outcome = client
        .fetch(keywords, &RegionCode::worldwide(), TimeWindow::default())
        .await;

    match outcome {
        BatchOutcome::Failed(failure) => {
            assert_eq!(failure.keywords.len(), 6);
            assert!(matches!(failure.error, TrendsError::InvalidInput(_)));
        }
        other => panic!("expected failure, got {:?}", other),
    }
}
