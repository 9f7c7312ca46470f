//! Integration tests for the HTTP surface.

mod common;

use axum::http::StatusCode;
use common::{small_dataset, TestClient};
use serde_json::json;

#[tokio::test]
async fn test_health() {
    let client = TestClient::new();
    let (status, body) = client.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_calendar_defaults_to_upcoming_window() {
    let client = TestClient::new();
    let (status, body) = client.get_json("/api/calendar").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["today"], "2025-01-08");
    assert_eq!(body["dates"].as_array().unwrap().len(), 90);
    assert_eq!(body["dates"][0], "2024-12-01");
    assert_eq!(body["weekdays"][0], "Su");
    assert_eq!(body["default_window"]["from"], "2025-01-01");
    assert_eq!(body["default_window"]["to"], "2025-01-22");
    assert_eq!(body["default_window"]["preset"], "upcoming");
}

#[tokio::test]
async fn test_rows_and_hierarchy() {
    let client = TestClient::new();

    let (status, rows) = client.get_json("/api/rows").await;
    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().unwrap();
    // Three regions of root + 2 groups + 13 leaves.
    assert_eq!(rows.len(), 48);
    assert_eq!(rows[0]["id"], "Total_total");
    assert_eq!(rows[16]["id"], "SH_total");
    assert_eq!(rows[16]["level"], 1);

    let (status, hierarchy) = client.get_json("/api/hierarchy").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hierarchy["groups"][0]["id"], "fresh_dept");
}

#[tokio::test]
async fn test_sales_window_with_filter() {
    let client = TestClient::with_data(small_dataset());
    let (status, view) = client
        .get_json("/api/sales?from_date=2025-01-02&to_date=2025-01-03&category=CHILD:a")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["dates"], json!(["2025-01-02", "2025-01-03"]));
    assert_eq!(view["indices"], json!([1, 2]));
    assert_eq!(view["rows"].as_array().unwrap().len(), 3);
    assert_eq!(view["rows"][1]["id"], "SH_a");
    assert_eq!(view["rows"][1]["plan_values"], json!([20.0, 30.0]));
    assert_eq!(view["rows"][1]["actual_values"], json!([18.0, null]));
}

#[tokio::test]
async fn test_sales_window_rejects_bad_input() {
    let client = TestClient::with_data(small_dataset());

    let (status, body) = client.get_json("/api/sales?category=TREE:x").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("TREE:x"));

    let (status, _) = client.get_json("/api/sales?preset=someday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = client.get_json("/api/sales?category=GROUP:nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_summary_endpoint() {
    let client = TestClient::with_data(small_dataset());
    let (status, stats) = client
        .get_json("/api/summary?ids=SH_total&from_date=2025-01-01&to_date=2025-01-03")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["has_past"], true);
    assert_eq!(stats["avg_actual"], 20.0);
    assert_eq!(stats["avg_plan_future"], 35.0);
}

#[tokio::test]
async fn test_points_endpoint() {
    let client = TestClient::with_data(small_dataset());

    let (status, points) = client
        .get_json("/api/rows/SH_a/points?preset=all")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(points.as_array().unwrap().len(), 3);
    assert_eq!(points[0]["deviation_percent"], 20.0);

    let (status, _) = client.get_json("/api/rows/SH_zz/points").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_plan_edit_returns_updated_rows() {
    let client = TestClient::with_data(small_dataset());
    let (status, rows) = client
        .post_json(
            "/api/plan",
            json!({"row_id": "SH_a", "date_index": 2, "value": 40.0}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().unwrap();
    let find = |id: &str| rows.iter().find(|r| r["id"] == id).unwrap();
    assert_eq!(find("SH_g")["plan_values"][2], 45.0);
    assert_eq!(find("Total_total")["plan_values"][2], 42.0);

    // Subsequent reads see the edit.
    let (_, view) = client.get_json("/api/sales?preset=all&category=CHILD:a").await;
    assert_eq!(view["rows"][1]["plan_values"][2], 40.0);
}

#[tokio::test]
async fn test_plan_edit_errors() {
    let client = TestClient::with_data(small_dataset());

    let (status, _) = client
        .post_json(
            "/api/plan",
            json!({"row_id": "SH_zz", "date_index": 0, "value": 1.0}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = client
        .post_json(
            "/api/plan",
            json!({"row_id": "SH_a", "date_index": 7, "value": 1.0}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_store_count_edit() {
    let client = TestClient::with_data(small_dataset());
    let (status, body) = client
        .post_json(
            "/api/store-counts",
            json!({"region": "SH", "date_index": 0, "count": 20}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store_counts"][0]["region"], "SH");
    assert_eq!(body["store_counts"][0]["counts"][0], 20);
    let total_a = body["rows"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["id"] == "Total_a")
        .unwrap();
    assert_eq!(total_a["plan_values"][0], 15.0);

    for region in ["Total", "XX"] {
        let (status, _) = client
            .post_json(
                "/api/store-counts",
                json!({"region": region, "date_index": 0, "count": 20}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", region);
    }
}

#[tokio::test]
async fn test_csv_export() {
    let client = TestClient::with_data(small_dataset());
    let (status, content_type, body) = client
        .get_with_headers("/api/sales/export.csv?preset=all&category=GROUP:g")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/csv; charset=utf-8"));
    assert!(body.starts_with("region,id,name,level,metric,2025-01-01"));
    assert_eq!(body.lines().count(), 1 + 9 * 2);
}

#[tokio::test]
async fn test_advice_without_provider() {
    let client = TestClient::new();

    let (status, body) = client
        .post_json(
            "/api/advice/planning",
            json!({"title": "Spring Festival", "period": "2025-01-28 to 2025-02-04"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["advice"].as_str().unwrap().is_empty());

    let (status, body) = client
        .post_json("/api/advice/analysis", json!({"data": "SH 120 vs plan 100"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["insights"].as_array().unwrap().len(), 1);
}
