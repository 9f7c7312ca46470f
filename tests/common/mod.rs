//! Shared test utilities for integration tests.
//!
//! `TestClient` drives the router in memory against a seeded working set,
//! and the dataset builders produce small hand-made hierarchies whose
//! aggregates are easy to check by hand.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use http_body_util::BodyExt;
use salesplan::config::Config;
use salesplan::date_utils::Calendar;
use salesplan::handlers;
use salesplan::models::{
    CategoryGroup, Hierarchy, LeafCategory, Region, SalesRow, StoreCountSeries,
};
use salesplan::services::generator::{self, LeafSeries};
use salesplan::state::AppState;
use salesplan::store::{SalesData, SalesStore};
use tower::ServiceExt;

pub const TEST_SEED: u64 = 42;

/// A test client that issues requests against a fresh in-memory store.
pub struct TestClient {
    pub state: AppState,
}

impl TestClient {
    /// Seeded store over the default demo window.
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let store = SalesStore::initialize(&config).expect("Failed to initialize store");
        Self {
            state: AppState::new(store, config),
        }
    }

    /// Serve a hand-built dataset instead of a generated one.
    pub fn with_data(data: SalesData) -> Self {
        Self {
            state: AppState::new(SalesStore::new(data), test_config()),
        }
    }

    pub fn router(&self) -> Router {
        handlers::routes().with_state(self.state.clone())
    }

    /// Make a GET request and return status and body.
    pub async fn get(&self, uri: &str) -> (StatusCode, String) {
        let response = self
            .router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8_lossy(&body).to_string())
    }

    /// Make a GET request and return status, headers of interest and body.
    pub async fn get_with_headers(&self, uri: &str) -> (StatusCode, Option<String>, String) {
        let response = self
            .router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, content_type, String::from_utf8_lossy(&body).to_string())
    }

    /// Get JSON from an endpoint and parse it.
    pub async fn get_json(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        let (status, body) = self.get(uri).await;
        let parsed = serde_json::from_str(&body).unwrap_or(serde_json::Value::Null);
        (status, parsed)
    }

    /// POST a JSON body and parse the JSON response.
    pub async fn post_json(
        &self,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let response = self
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let parsed = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, parsed)
    }
}

impl Default for TestClient {
    fn default() -> Self {
        Self::new()
    }
}

pub fn test_config() -> Config {
    Config {
        seed: Some(TEST_SEED),
        ..Config::default()
    }
}

pub fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Seeded dataset over the default demo window.
pub fn generated() -> SalesData {
    let config = test_config();
    let calendar = Calendar::build(config.window_start, config.window_end, config.today).unwrap();
    let mut rng = generator::seeded_rng(config.seed);
    generator::generate(calendar, Hierarchy::retail(), &mut rng).unwrap()
}

/// One group `g` with leaves `a` and `b`.
pub fn small_hierarchy() -> Hierarchy {
    Hierarchy::new(vec![CategoryGroup {
        id: "g".into(),
        name: "Group".into(),
        children: vec![
            LeafCategory {
                id: "a".into(),
                name: "Leaf A".into(),
            },
            LeafCategory {
                id: "b".into(),
                name: "Leaf B".into(),
            },
        ],
    }])
}

pub fn leaf(region: Region, id: &str, plan: &[f64], actual: &[Option<f64>]) -> LeafSeries {
    LeafSeries {
        region,
        leaf_id: id.into(),
        plan_values: plan.to_vec(),
        actual_values: actual.to_vec(),
    }
}

/// Three days, 2025-01-01..=2025-01-03, with today on the third so the
/// first two dates are elapsed.
///
/// SH: a = 10/20/30, b = 5/5/5, 80 stores.
/// JS: a = 20/20/20, b = 10/10/10, 20 stores.
pub fn small_dataset() -> SalesData {
    let calendar = Calendar::build(d("2025-01-01"), d("2025-01-03"), d("2025-01-03")).unwrap();
    let leaves = vec![
        leaf(
            Region::Sh,
            "a",
            &[10.0, 20.0, 30.0],
            &[Some(12.0), Some(18.0), None],
        ),
        leaf(Region::Sh, "b", &[5.0, 5.0, 5.0], &[Some(6.0), Some(4.0), None]),
        leaf(
            Region::Js,
            "a",
            &[20.0, 20.0, 20.0],
            &[Some(22.0), Some(19.0), None],
        ),
        leaf(
            Region::Js,
            "b",
            &[10.0, 10.0, 10.0],
            &[Some(9.0), Some(11.0), None],
        ),
    ];
    let counts = vec![
        StoreCountSeries {
            region: Region::Sh,
            counts: vec![80, 80, 80],
        },
        StoreCountSeries {
            region: Region::Js,
            counts: vec![20, 20, 20],
        },
    ];
    generator::derive(calendar, small_hierarchy(), leaves, counts).unwrap()
}

pub fn row<'a>(data: &'a SalesData, id: &str) -> &'a SalesRow {
    data.rows
        .get(id)
        .unwrap_or_else(|| panic!("row {} missing", id))
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 0.05 + 1e-9,
        "expected {} to be within 0.05 of {}",
        actual,
        expected
    );
}
