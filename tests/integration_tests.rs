use async_trait::async_trait;
use live_flight::fetch::HttpClient;
use live_flight::{FailureReason, FlightQuery, Poller, ProviderName, ProviderResult, TrackerConfig};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const PRIMARY: &str = "https://primary.test/v2/callsign";
const STATES: &str = "https://states.test/api/states/all";
const SECONDARY: &str = "https://secondary.test/v2/callsign";

const AIC101: &str = r#"{"ac":[{"hex":"800123","lat":19.1,"lon":72.8,
    "track":270,"alt_baro":35000,"gs":480,"baro_rate":0}]}"#;

const EMPTY_FLEET: &str = r#"{"ac":[],"msg":"No error","total":0}"#;

/// Serves canned `(status, body)` pairs keyed by host.
struct FakeFeeds {
    replies: Vec<(&'static str, u16, &'static str)>,
    seen: Mutex<Vec<String>>,
}

impl FakeFeeds {
    fn new(replies: Vec<(&'static str, u16, &'static str)>) -> Arc<Self> {
        Arc::new(Self {
            replies,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for FakeFeeds {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let url = req.url().to_string();
        self.seen.lock().unwrap().push(url.clone());

        let (status, body) = self
            .replies
            .iter()
            .find(|(host, _, _)| req.url().host_str() == Some(*host))
            .map(|(_, status, body)| (*status, body.to_string()))
            .unwrap_or((404, String::new()));

        if status == 0 {
            // simulate a connection failure
            return Err(reqwest::Client::new().get("not a url").build().unwrap_err());
        }

        let resp = http::Response::builder().status(status).body(body).unwrap();
        Ok(reqwest::Response::from(resp))
    }
}

fn config() -> TrackerConfig {
    TrackerConfig {
        primary_fleet_url: PRIMARY.to_string(),
        state_vector_url: STATES.to_string(),
        secondary_fleet_url: SECONDARY.to_string(),
        ..TrackerConfig::default()
    }
}

fn aggregator(feeds: &Arc<FakeFeeds>) -> live_flight::Aggregator {
    config()
        .build_aggregator_with(feeds.clone(), feeds.clone())
        .expect("aggregator")
}

#[tokio::test]
async fn test_primary_fleet_only_match() {
    let feeds = FakeFeeds::new(vec![
        (
            "primary.test",
            200,
            AIC101,
        ),
        ("secondary.test", 200, EMPTY_FLEET),
    ]);
    let query = FlightQuery::new("aic101", None).unwrap();

    let result = aggregator(&feeds).aggregate(&query, Duration::from_secs(5)).await;

    let best = result.best().expect("a best observation");
    assert_eq!(result.source(), Some(ProviderName::PrimaryFleet));
    assert_eq!(best.latitude(), 19.1);
    assert_eq!(best.longitude(), 72.8);
    assert_eq!(best.track_degrees(), 270.0);
    assert_eq!(best.altitude_feet(), 35000.0);
    assert_eq!(best.speed_knots(), 480.0);
    assert_eq!(best.vertical_rate_ft_per_min(), 0.0);

    assert_eq!(result.result_for(ProviderName::StateVector), Some(&ProviderResult::Empty));
    assert_eq!(result.result_for(ProviderName::SecondaryFleet), Some(&ProviderResult::Empty));

    // no hex, so the state-vector feed is never contacted
    let seen = feeds.seen();
    assert_eq!(seen.len(), 2);
    assert!(seen.contains(&"https://primary.test/v2/callsign/AIC101".to_string()));
    assert!(seen.iter().all(|u| !u.contains("states.test")));
}

#[tokio::test]
async fn test_state_vector_wins_over_fleet_feeds() {
    let feeds = FakeFeeds::new(vec![
        (
            "primary.test",
            200,
            r#"{"ac":[{"hex":"3c66a8","lat":50.0,"lon":8.5,
                "track":91,"alt_baro":36000,"gs":470,"baro_rate":-512}]}"#,
        ),
        (
            "states.test",
            200,
            r#"{"time":1718000000,"states":[
                ["3c66a8","DLH9LP  ","Germany",1718000000,1718000000,8.55,50.03,10972.0,
                 false,250.0,90.0,-2.5,null,11000.0,"1000",false,0]
            ]}"#,
        ),
        (
            "secondary.test",
            200,
            r#"{"ac":[{"hex":"3c66a8","lat":50.01,"lon":8.51,"alt_baro":36025,"gs":471}]}"#,
        ),
    ]);
    let query = FlightQuery::new("DLH9LP", Some("3C66A8")).unwrap();

    let result = aggregator(&feeds).aggregate(&query, Duration::from_secs(5)).await;

    assert_eq!(result.source(), Some(ProviderName::StateVector));
    let best = result.best().unwrap();
    assert_eq!(best.latitude(), 50.03);
    assert_eq!(best.longitude(), 8.55);
    assert!((best.altitude_feet() - 35997.0).abs() < 1.0);
    assert!((best.speed_knots() - 485.96).abs() < 0.01);
    assert!((best.vertical_rate_ft_per_min() - -492.1).abs() < 0.1);

    // every source is still reported
    assert!(result.raw().values().all(|r| r.observation().is_some()));
    assert!(feeds.seen().contains(&"https://states.test/api/states/all?icao24=3c66a8".to_string()));
}

#[tokio::test]
async fn test_all_feeds_failing() {
    let feeds = FakeFeeds::new(vec![
        ("primary.test", 503, ""),
        ("states.test", 0, ""),
        ("secondary.test", 200, "not json"),
    ]);
    let query = FlightQuery::new("AIC101", Some("800123")).unwrap();

    let result = aggregator(&feeds).aggregate(&query, Duration::from_secs(5)).await;

    assert!(result.best().is_none());
    assert!(result.source().is_none());
    assert_eq!(result.raw().len(), 3);
    assert_eq!(
        result.result_for(ProviderName::PrimaryFleet),
        Some(&ProviderResult::Failure(FailureReason::HttpStatus(503)))
    );
    assert!(matches!(
        result.result_for(ProviderName::StateVector),
        Some(ProviderResult::Failure(FailureReason::Transport(_)))
    ));
    assert!(matches!(
        result.result_for(ProviderName::SecondaryFleet),
        Some(ProviderResult::Failure(FailureReason::Malformed(_)))
    ));
}

#[tokio::test]
async fn test_identical_responses_give_identical_results() {
    let feeds = FakeFeeds::new(vec![
        (
            "primary.test",
            200,
            AIC101,
        ),
        ("secondary.test", 502, ""),
    ]);
    let aggregator = aggregator(&feeds);
    let query = FlightQuery::new("AIC101", None).unwrap();

    let first = aggregator.aggregate(&query, Duration::from_secs(5)).await;
    let second = aggregator.aggregate(&query, Duration::from_secs(5)).await;

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test(start_paused = true)]
async fn test_poller_publishes_reconciled_updates() {
    let feeds = FakeFeeds::new(vec![
        (
            "secondary.test",
            200,
            r#"{"ac":[{"hex":"800123","lat":19.1,"lon":72.8,"alt_baro":"ground"}]}"#,
        ),
        ("primary.test", 200, EMPTY_FLEET),
    ]);
    let poller = Poller::new(Arc::new(aggregator(&feeds)), Duration::from_secs(5));
    let mut rx = poller.subscribe();

    poller
        .start(FlightQuery::new("AIC101", None).unwrap(), Duration::from_secs(5))
        .unwrap();

    for expected in 1..=2 {
        tokio::time::timeout(Duration::from_secs(30), rx.changed())
            .await
            .unwrap()
            .unwrap();
        let update = rx.borrow_and_update().clone().unwrap();
        assert_eq!(update.cycle, expected);
        assert_eq!(update.result.source(), Some(ProviderName::SecondaryFleet));
        assert_eq!(update.result.best().unwrap().altitude_feet(), 0.0);
    }

    poller.stop();
}
