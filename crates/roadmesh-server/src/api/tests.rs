use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use roadmesh_core::NetworkRules;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::{api, config::Config, persistence, state::AppState};

fn temp_db_path() -> String {
    std::env::temp_dir()
        .join(format!("roadmesh-test-{}.db", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .to_string()
}

async fn setup_with_db(database_path: &str) -> (axum::Router, Arc<AppState>) {
    let mut config = Config::new(NetworkRules::new(20.0));
    config.database_path = database_path.to_string();

    let db = persistence::init_database(&config.database_path, config.database_max_connections)
        .await
        .expect("init db");
    let state = AppState::new(config.rules.clone()).with_database(db);
    state.load_from_database().await.expect("load db");
    let state = Arc::new(state);

    let app = api::routes().with_state(state.clone());
    (app, state)
}

async fn setup_app() -> (axum::Router, Arc<AppState>) {
    setup_with_db(&temp_db_path()).await
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn add_point(app: &axum::Router, lat: f64, lon: f64) -> u64 {
    let res = app
        .clone()
        .oneshot(json_request("POST", "/v1/points", json!({"lat": lat, "lng": lon})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    read_json(res).await["id"].as_u64().expect("point id")
}

async fn set_equator_route(app: &axum::Router) {
    let res = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/v1/route",
            json!({"polyline": [{"lat": 0.0, "lon": 0.0}, {"lat": 0.0, "lon": 0.002}]}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn points_are_validated_and_deduplicated() {
    let (app, _state) = setup_app().await;

    let id = add_point(&app, 27.7, 85.3).await;
    assert_eq!(id, 1);

    let dup = app
        .clone()
        .oneshot(json_request("POST", "/v1/points", json!({"lat": 27.7, "lon": 85.3})))
        .await
        .unwrap();
    assert_eq!(dup.status(), StatusCode::CONFLICT);

    let bad = app
        .clone()
        .oneshot(json_request("POST", "/v1/points", json!({"lat": 95.0, "lon": 85.3})))
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

    let res = app.clone().oneshot(get_request("/v1/points/1")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let del = Request::builder()
        .method("DELETE")
        .uri("/v1/points/1")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.clone().oneshot(del).await.unwrap().status(), StatusCode::NO_CONTENT);
    let res = app.clone().oneshot(get_request("/v1/points/1")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn classification_follows_the_main_route() {
    let (app, _state) = setup_app().await;
    add_point(&app, 0.0, 0.001).await;
    add_point(&app, 0.001, 0.001).await;

    // No network yet: everything is provisionally on-network.
    let res = app.clone().oneshot(get_request("/v1/points/classified")).await.unwrap();
    let body = read_json(res).await;
    assert_eq!(body[0]["is_off_network"], json!(false));
    assert_eq!(body[1]["source_kind"], json!("none"));

    set_equator_route(&app).await;
    let res = app.clone().oneshot(get_request("/v1/points/classified")).await.unwrap();
    let body = read_json(res).await;
    assert_eq!(body[0]["is_off_network"], json!(false));
    assert_eq!(body[1]["is_off_network"], json!(true));
    assert_eq!(body[1]["source_kind"], json!("main-route"));
}

#[tokio::test]
async fn path_query_saves_and_persists_segments() {
    let db_path = temp_db_path();
    let (app, _state) = setup_with_db(&db_path).await;
    set_equator_route(&app).await;
    let a = add_point(&app, 0.0005, 0.0).await;
    let b = add_point(&app, 0.0005, 0.002).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/paths",
            json!({
                "from": {"point_id": a},
                "to": {"point_id": b},
                "save": true,
                "label": "depot run"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["found"], json!(true));
    assert!(body["details"]["segment_count"].as_u64().unwrap() >= 2);
    let added = body["saved"]["segments_added"].as_u64().unwrap();
    assert!(added >= 1);

    // A fresh server over the same database sees the saved segments.
    let (reloaded, _state) = setup_with_db(&db_path).await;
    let res = reloaded.clone().oneshot(get_request("/v1/segments")).await.unwrap();
    let segments = read_json(res).await;
    assert_eq!(segments.as_array().unwrap().len() as u64, added);
}

#[tokio::test]
async fn unknown_endpoint_is_not_found_and_no_path_is_ok() {
    let (app, _state) = setup_app().await;
    let a = add_point(&app, 10.0, 10.0).await;
    let b = add_point(&app, -10.0, -10.0).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/paths",
            json!({"from": {"point_id": a}, "to": {"node_id": "route:0"}}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/paths",
            json!({"from": {"point_id": a}, "to": {"point_id": b}}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(read_json(res).await["found"], json!(false));
}

#[tokio::test]
async fn routing_failure_leaves_no_main_route() {
    let (app, state) = setup_app().await;
    set_equator_route(&app).await;
    add_point(&app, 0.0, 0.0).await;
    add_point(&app, 0.0, 0.002).await;

    // No routing client configured: the request fails softly.
    let res = app
        .clone()
        .oneshot(json_request("POST", "/v1/route/compute", json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["applied"], json!(true));
    assert!(body["error"].is_string());
    assert!(state.main_route().is_empty());

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/route/compute",
            json!({"waypoints": [{"lat": 0.0, "lon": 0.0}]}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn custom_road_preview_and_save() {
    let (app, _state) = setup_app().await;
    set_equator_route(&app).await;
    let road = json!([{"lat": 0.0001, "lon": 0.0}, {"lat": 0.002, "lon": 0.0}]);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/segments/custom",
            json!({"label": "farm lane", "polyline": road, "preview_only": true}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["saved"], json!(false));
    assert_eq!(body["preview"]["start_candidates"][0]["node_id"], json!("route:0"));

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/segments/custom",
            json!({"label": "farm lane", "polyline": road}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = app.clone().oneshot(get_request("/v1/segments")).await.unwrap();
    let segments = read_json(res).await;
    assert_eq!(segments[0]["tag"], json!("custom"));

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/segments/custom",
            json!({"label": "dot", "polyline": [{"lat": 0.0, "lon": 0.0}]}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let clear = Request::builder()
        .method("DELETE")
        .uri("/v1/segments")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.clone().oneshot(clear).await.unwrap().status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn distances_and_graph_summary() {
    let (app, _state) = setup_app().await;
    add_point(&app, 0.0, 0.0).await;
    add_point(&app, 0.0, 0.001).await;

    let res = app.clone().oneshot(get_request("/v1/distances")).await.unwrap();
    let table = read_json(res).await;
    assert_eq!(table[0]["distance_m"], json!(111.19));

    set_equator_route(&app).await;
    let res = app.clone().oneshot(get_request("/v1/graph/summary")).await.unwrap();
    let summary = read_json(res).await;
    assert_eq!(summary["isolated_nodes"], json!(0));
    assert!(summary["node_count"].as_u64().unwrap() >= 4);
}

#[tokio::test]
async fn snap_validates_before_calling_the_routing_service() {
    let (app, _state) = setup_app().await;

    let res = app
        .clone()
        .oneshot(json_request("POST", "/v1/route/snap", json!({"lat": 91.0, "lon": 0.0})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .clone()
        .oneshot(json_request("POST", "/v1/route/snap", json!({"lat": 0.0, "lon": 0.0})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}
