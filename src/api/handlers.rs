use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::error::{FlavorError, Result};
use crate::graph::{find_path, get_connections, RelationshipFilter};
use crate::model::{Entity, Relationship};
use crate::store::relationships::{self, EdgeDirection, RelationshipStats};
use crate::store::{entities, SqliteGraph};

use super::types::*;
use super::AppState;

const DEFAULT_LIST_LIMIT: usize = 100;
const MAX_LIST_LIMIT: usize = 1000;

/// Raw query pairs; keys may repeat (`?relationship_types=a&relationship_types=b`).
type QueryPairs = Vec<(String, String)>;

fn values<'q>(pairs: &'q QueryPairs, key: &str) -> Vec<&'q str> {
    pairs
        .iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .collect()
}

fn last<'q>(pairs: &'q QueryPairs, key: &str) -> Option<&'q str> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Parse an integer parameter that must lie in `[min, max]`.
fn bounded(name: &str, raw: Option<&str>, default: usize, min: usize, max: usize) -> Result<usize> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let value: i64 = raw.trim().parse().map_err(|_| {
        FlavorError::InvalidParameter(format!("{} must be an integer, got '{}'", name, raw))
    })?;
    if value < min as i64 || value > max as i64 {
        return Err(FlavorError::InvalidParameter(format!(
            "{} must be between {} and {}, got {}",
            name, min, max, value
        )));
    }
    Ok(value as usize)
}

fn parse_filter(pairs: &QueryPairs) -> Result<RelationshipFilter> {
    RelationshipFilter::parse(&values(pairs, "relationship_types"))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "flavorgraph".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn get_entity(State(state): State<AppState>, Path(entity_id): Path<String>) -> Result<Json<Entity>> {
    let lookup = entity_id.clone();
    state
        .db
        .with_connection(move |conn| entities::get_entity(conn, &lookup))
        .await?
        .map(Json)
        .ok_or(FlavorError::EntityNotFound(entity_id))
}

pub async fn get_relationship(
    State(state): State<AppState>,
    Path(relationship_id): Path<String>,
) -> Result<Json<Relationship>> {
    let id: i64 = relationship_id.parse().map_err(|_| {
        FlavorError::InvalidParameter(format!("relationship id must be an integer, got '{}'", relationship_id))
    })?;
    state
        .db
        .with_connection(move |conn| relationships::get_relationship(conn, id))
        .await?
        .map(Json)
        .ok_or(FlavorError::RelationshipNotFound(id))
}

pub async fn entity_connections(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
    Query(pairs): Query<QueryPairs>,
) -> Result<Json<ConnectionsResponse>> {
    let filter = parse_filter(&pairs)?;
    let max_depth = bounded(
        "max_depth",
        last(&pairs, "max_depth"),
        state.graph.default_connection_depth,
        1,
        state.graph.max_depth,
    )?;
    let limits = state.search_limits();

    let response = state
        .db
        .with_connection(move |conn| {
            let graph = SqliteGraph::new(conn);
            let connections = get_connections(&graph, &entity_id, &filter, max_depth, &limits)?;

            let mut ids: Vec<String> = connections.entity_ids().map(str::to_string).collect();
            ids.push(entity_id.clone());
            let summaries = entities::get_summaries(conn, &ids)?;

            let requested = filter
                .types()
                .map(|types| types.into_iter().map(str::to_string).collect());
            Ok(ConnectionsResponse::new(connections, requested, &summaries))
        })
        .await?;

    Ok(Json(response))
}

pub async fn relationship_path(
    State(state): State<AppState>,
    Path((source_id, target_id)): Path<(String, String)>,
    Query(pairs): Query<QueryPairs>,
) -> Result<Json<PathResponse>> {
    let max_depth = bounded(
        "max_depth",
        last(&pairs, "max_depth"),
        state.graph.default_path_depth,
        1,
        state.graph.max_depth,
    )?;
    let limits = state.search_limits();

    let response = state
        .db
        .with_connection(move |conn| {
            let graph = SqliteGraph::new(conn);
            let response = match find_path(&graph, &source_id, &target_id, max_depth, &limits)? {
                Some(path) => PathResponse::found(path),
                None => PathResponse::not_found(source_id, target_id),
            };
            Ok(response)
        })
        .await?;

    Ok(Json(response))
}

pub async fn direct_connections(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
    Query(pairs): Query<QueryPairs>,
) -> Result<Json<DirectConnectionsResponse>> {
    let filter = parse_filter(&pairs)?;
    let direction: EdgeDirection = match last(&pairs, "direction") {
        Some(raw) => raw.parse()?,
        None => EdgeDirection::default(),
    };
    let limit = bounded("limit", last(&pairs, "limit"), DEFAULT_LIST_LIMIT, 1, MAX_LIST_LIMIT)?;

    let response = state
        .db
        .with_connection(move |conn| {
            let entity = entities::get_entity(conn, &entity_id)?
                .ok_or_else(|| FlavorError::EntityNotFound(entity_id.clone()))?;
            let edges = relationships::entity_relationships(conn, &entity_id, &filter, direction, limit)?;
            Ok(DirectConnectionsResponse::new(entity.id, entity.name, edges))
        })
        .await?;

    Ok(Json(response))
}

pub async fn relationship_types(State(state): State<AppState>) -> Result<Json<RelationshipTypesResponse>> {
    let types = state
        .db
        .with_connection(|conn| relationships::relationship_types(conn))
        .await?;
    Ok(Json(RelationshipTypesResponse {
        total_types: types.len(),
        relationship_types: types,
    }))
}

pub async fn entity_statistics(State(state): State<AppState>) -> Result<Json<EntityStatsResponse>> {
    let stats = state
        .db
        .with_connection(|conn| entities::entity_statistics(conn))
        .await?;
    Ok(Json(EntityStatsResponse::from(stats)))
}

pub async fn relationship_statistics(State(state): State<AppState>) -> Result<Json<RelationshipStats>> {
    let stats = state
        .db
        .with_connection(|conn| relationships::relationship_statistics(conn))
        .await?;
    Ok(Json(stats))
}
