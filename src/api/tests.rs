use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

use super::*;
use crate::config::HttpServerConfig;
use crate::db::test_db;
use crate::import::{run_import, ImportOptions, ImportSource};
use crate::model::{NewEntity, NewRelationship};
use crate::store::{entities, relationships};

/// garlic -contains-> allicin -found_in-> onion, plus an edge to a missing entity.
async fn seeded_app(graph: GraphConfig) -> (Router, tempfile::TempDir) {
    let (db, temp) = test_db().await;
    db.with_connection(|conn| {
        entities::insert_entity(conn, &NewEntity::new("garlic", "Garlic", "ingredient"))?;
        entities::insert_entity(conn, &NewEntity::new("allicin", "Allicin", "compound"))?;
        entities::insert_entity(conn, &NewEntity::new("onion", "Onion", "ingredient"))?;
        entities::insert_entity(conn, &NewEntity::new("salt", "Salt", "ingredient"))?;
        relationships::insert_relationship(conn, &NewRelationship::new("garlic", "allicin", "contains", 0.9))?;
        relationships::insert_relationship(conn, &NewRelationship::new("allicin", "onion", "found_in", 0.7))?;
        relationships::insert_relationship(conn, &NewRelationship::new("garlic", "ghost", "pairs_with", 0.5))?;
        Ok(())
    })
    .await
    .unwrap();

    let app = router(AppState::new(db, graph), &HttpServerConfig::default());
    (app, temp)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let (app, _temp) = seeded_app(GraphConfig::default()).await;
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "flavorgraph");
}

#[tokio::test]
async fn test_get_entity_and_missing() {
    let (app, _temp) = seeded_app(GraphConfig::default()).await;

    let (status, body) = get(&app, "/entities/garlic").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Garlic");
    assert_eq!(body["primary_classification"], "ingredient");

    let (status, body) = get(&app, "/entities/ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
    assert_eq!(body["detail"], "Entity with ID 'ghost' not found");
}

#[tokio::test]
async fn test_connections_levels_and_dangling() {
    let (app, _temp) = seeded_app(GraphConfig::default()).await;
    let (status, body) = get(&app, "/entities/garlic/connections?max_depth=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entity_name"], "Garlic");
    assert_eq!(body["max_depth"], 2);
    assert!(body["relationship_types"].is_null());

    let levels = body["levels"].as_array().unwrap();
    assert_eq!(levels.len(), 2);
    assert_eq!(levels[0]["depth"], 1);
    let first: Vec<&str> = levels[0]["entities"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    assert_eq!(first, vec!["allicin", "ghost"]);
    assert!(levels[0]["entities"][1]["name"].is_null());
    assert_eq!(levels[1]["entities"][0]["id"], "onion");
    assert_eq!(levels[1]["entities"][0]["primary_classification"], "ingredient");

    assert_eq!(body["total_connections"], 3);
    assert_eq!(body["total_edges"], 3);
    assert_eq!(body["edges"][0]["relationship_type"], "contains");
    assert_eq!(body["edges"][0]["depth"], 1);
    assert_eq!(
        body["relationship_types_found"],
        serde_json::json!(["contains", "found_in", "pairs_with"])
    );
}

#[tokio::test]
async fn test_connections_default_depth_and_filter() {
    let (app, _temp) = seeded_app(GraphConfig::default()).await;

    let (_, body) = get(&app, "/entities/garlic/connections").await;
    assert_eq!(body["max_depth"], 2);

    let (status, body) = get(
        &app,
        "/entities/garlic/connections?relationship_types=contains&relationship_types=found_in",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["relationship_types"], serde_json::json!(["contains", "found_in"]));
    assert_eq!(body["total_connections"], 2);

    let (status, body) = get(&app, "/entities/garlic/connections?relationship_types=unknown_tag").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_connections"], 0);
    assert_eq!(body["levels"], serde_json::json!([]));
}

#[tokio::test]
async fn test_connections_rejects_bad_input() {
    let (app, _temp) = seeded_app(GraphConfig::default()).await;

    for uri in [
        "/entities/garlic/connections?max_depth=0",
        "/entities/garlic/connections?max_depth=6",
        "/entities/garlic/connections?max_depth=deep",
        "/entities/garlic/connections?relationship_types=bad%20tag",
    ] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"], "invalid_parameter");
    }

    let (status, _) = get(&app, "/entities/ghost/connections").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search_limit_is_422() {
    let graph = GraphConfig {
        max_visited: 2,
        ..GraphConfig::default()
    };
    let (app, _temp) = seeded_app(graph).await;
    let (status, body) = get(&app, "/entities/garlic/connections?max_depth=2").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "search_limit_exceeded");
}

#[tokio::test]
async fn test_path_found() {
    let (app, _temp) = seeded_app(GraphConfig::default()).await;
    let (status, body) = get(&app, "/entities/garlic/path/onion?max_depth=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["found"], true);
    assert_eq!(body["path_length"], 2);
    assert_eq!(body["path"][0]["source_id"], "garlic");
    assert_eq!(body["path"][0]["direction"], "outgoing");
    assert_eq!(body["path"][1]["target_id"], "onion");
    assert!((body["total_confidence"].as_f64().unwrap() - 1.6).abs() < 1e-9);
    assert!((body["avg_confidence"].as_f64().unwrap() - 0.8).abs() < 1e-9);
    assert!(body.get("message").is_none());
}

#[tokio::test]
async fn test_path_reverse_direction() {
    let (app, _temp) = seeded_app(GraphConfig::default()).await;
    let (_, body) = get(&app, "/entities/onion/path/garlic").await;
    assert_eq!(body["found"], true);
    assert_eq!(body["path"][0]["direction"], "incoming");
}

#[tokio::test]
async fn test_path_not_found_is_ok() {
    let (app, _temp) = seeded_app(GraphConfig::default()).await;

    let (status, body) = get(&app, "/entities/garlic/path/onion?max_depth=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["found"], false);
    assert_eq!(body["path"], serde_json::json!([]));
    assert_eq!(body["path_length"], 0);
    assert_eq!(body["message"], "No relationship path found");
    assert!(body.get("total_confidence").is_none());

    let (status, body) = get(&app, "/entities/garlic/path/salt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["found"], false);
}

#[tokio::test]
async fn test_path_trivial_and_unknown() {
    let (app, _temp) = seeded_app(GraphConfig::default()).await;

    let (status, body) = get(&app, "/entities/garlic/path/garlic").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["found"], true);
    assert_eq!(body["path_length"], 0);
    assert_eq!(body["total_confidence"], 0.0);
    assert_eq!(body["avg_confidence"], 0.0);

    let (status, _) = get(&app, "/entities/garlic/path/ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get(&app, "/entities/garlic/path/onion?max_depth=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_relationship() {
    let (app, _temp) = seeded_app(GraphConfig::default()).await;

    let (status, body) = get(&app, "/relationships/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["relationship_type"], "contains");
    assert_eq!(body["confidence_score"], 0.9);

    let (status, _) = get(&app, "/relationships/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get(&app, "/relationships/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_relationship_types() {
    let (app, _temp) = seeded_app(GraphConfig::default()).await;
    let (status, body) = get(&app, "/relationships/types").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_types"], 3);
    assert_eq!(body["relationship_types"][0]["type"], "contains");
    assert_eq!(body["relationship_types"][0]["count"], 1);
}

#[tokio::test]
async fn test_direct_connections() {
    let (app, _temp) = seeded_app(GraphConfig::default()).await;

    let (status, body) = get(&app, "/relationships/entity/allicin/connections").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entity_name"], "Allicin");
    assert_eq!(body["incoming_relationships"].as_array().unwrap().len(), 1);
    assert_eq!(body["outgoing_relationships"].as_array().unwrap().len(), 1);
    assert_eq!(body["total_connections"], 2);
    assert_eq!(body["relationship_types"], serde_json::json!(["contains", "found_in"]));

    let (_, body) = get(&app, "/relationships/entity/allicin/connections?direction=outgoing").await;
    assert_eq!(body["incoming_relationships"], serde_json::json!([]));
    assert_eq!(body["total_connections"], 1);

    let (_, body) = get(&app, "/relationships/entity/garlic/connections?limit=1").await;
    assert_eq!(body["outgoing_relationships"].as_array().unwrap().len(), 1);

    let (status, _) = get(&app, "/relationships/entity/allicin/connections?direction=up").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(&app, "/relationships/entity/allicin/connections?limit=1001").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(&app, "/relationships/entity/ghost/connections").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_entity_statistics() {
    let (app, _temp) = seeded_app(GraphConfig::default()).await;
    let (status, body) = get(&app, "/entities/stats/overview").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_entities"], 4);
    assert_eq!(body["by_classification"]["ingredient"], 3);
    assert_eq!(body["by_classification"]["compound"], 1);
    assert_eq!(body["by_primary_classification"], body["by_classification"]);
    assert_eq!(body["recent_additions"], 4);
    assert!(body["last_updated"].is_string());
}

#[tokio::test]
async fn test_relationship_statistics() {
    let (app, _temp) = seeded_app(GraphConfig::default()).await;
    let (status, body) = get(&app, "/relationships/stats/overview").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_relationships"], 3);
    assert_eq!(body["by_type"]["contains"], 1);
    assert_eq!(body["by_type"]["pairs_with"], 1);
    assert_eq!(body["by_confidence"]["0.9"], 1);
    let avg = body["avg_confidence"].as_f64().unwrap();
    assert!((avg - 0.7).abs() < 1e-9, "{}", avg);
}

#[tokio::test]
async fn test_path_to_first_neighbour_of_hub_within_visit_limit() {
    let (db, _temp) = test_db().await;
    db.with_connection(|conn| {
        entities::insert_entity(conn, &NewEntity::new("hub", "Hub", "ingredient"))?;
        entities::insert_entity(conn, &NewEntity::new("t", "Target", "compound"))?;
        relationships::insert_relationship(conn, &NewRelationship::new("hub", "t", "contains", 0.8))?;
        for leaf in ["l1", "l2", "l3", "l4", "l5"] {
            entities::insert_entity(conn, &NewEntity::new(leaf, leaf, "compound"))?;
            relationships::insert_relationship(conn, &NewRelationship::new("hub", leaf, "contains", 0.5))?;
        }
        Ok(())
    })
    .await
    .unwrap();
    let graph = GraphConfig {
        max_visited: 3,
        ..GraphConfig::default()
    };
    let app = router(AppState::new(db, graph), &HttpServerConfig::default());

    let (status, body) = get(&app, "/entities/hub/path/t?max_depth=1").await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["found"], true);
    assert_eq!(body["path_length"], 1);

    let (status, body) = get(&app, "/entities/hub/connections?max_depth=1").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "search_limit_exceeded");
}

#[tokio::test]
async fn test_search_past_request_deadline_times_out() {
    let (db, _temp) = test_db().await;
    db.with_connection(|conn| {
        entities::insert_entity(conn, &NewEntity::new("garlic", "Garlic", "ingredient"))?;
        entities::insert_entity(conn, &NewEntity::new("allicin", "Allicin", "compound"))?;
        relationships::insert_relationship(conn, &NewRelationship::new("garlic", "allicin", "contains", 0.9))?;
        Ok(())
    })
    .await
    .unwrap();
    let state = AppState::new(db, GraphConfig::default()).with_request_timeout(Duration::ZERO);
    let app = router(state, &HttpServerConfig::default());

    let (status, body) = get(&app, "/entities/garlic/connections").await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body["error"], "search_timeout");

    let (status, body) = get(&app, "/entities/garlic/path/allicin").await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body["error"], "search_timeout");
}

#[tokio::test]
async fn test_imported_relationship_type_is_filterable() {
    let (db, _temp) = test_db().await;
    let source = ImportSource {
        entities: vec![
            json!({"id": "spinach", "name": "Spinach", "primary_classification": "ingredient"}),
            json!({"id": "iron", "name": "Iron", "primary_classification": "nutrient"}),
        ],
        relationships: vec![
            json!({"source_id": "spinach", "target_id": "iron", "relationship_type": "rich_in"}),
            json!({"source_id": "spinach", "target_id": "iron", "relationship_type": "rich in"}),
        ],
    };
    let report = db
        .with_connection(move |conn| run_import(conn, &source, ImportOptions { batch_size: 10, drop_existing: false }))
        .await
        .unwrap();
    assert_eq!(report.relationships.inserted, 1);
    assert_eq!(report.relationships.invalid, 1);

    let app = router(AppState::new(db, GraphConfig::default()), &HttpServerConfig::default());
    let (status, body) = get(&app, "/relationships/types").await;
    assert_eq!(status, StatusCode::OK);
    let stored_type = body["relationship_types"][0]["type"].as_str().unwrap().to_string();
    assert_eq!(stored_type, "rich_in");

    let uri = format!("/entities/spinach/connections?max_depth=1&relationship_types={}", stored_type);
    let (status, body) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["levels"][0]["entities"][0]["id"], "iron");
}
