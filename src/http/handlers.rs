use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::AppState;
use crate::error::KinshipError;
use crate::family::{parse_person_id, NewPerson, PersonId, PersonUpdate, Relation};
use crate::graph::describe_path;
use crate::query::{self, Algorithm, Explanation};

/// Error wrapper that renders a [`KinshipError`] as a JSON response
#[derive(Debug)]
pub struct ApiError(pub KinshipError);

impl From<KinshipError> for ApiError {
    fn from(err: KinshipError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            KinshipError::NotFound(_) | KinshipError::UnknownPerson(_) => StatusCode::NOT_FOUND,
            KinshipError::InvalidEndpoint { .. }
            | KinshipError::DuplicateRelation { .. }
            | KinshipError::TooManyParents(_) => StatusCode::CONFLICT,
            KinshipError::SelfRelation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            KinshipError::InvalidAlgorithm(_)
            | KinshipError::InvalidInput(_)
            | KinshipError::Json(_) => StatusCode::BAD_REQUEST,
            KinshipError::Database(_) | KinshipError::Io(_) | KinshipError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("Request failed: {}", self.0);
        }
        (
            status,
            Json(serde_json::json!({
                "error": self.0.kind(),
                "message": self.0.to_string(),
            })),
        )
            .into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

fn person_id(raw: &str) -> ApiResult<PersonId> {
    Ok(parse_person_id(raw)?)
}

/// Handle health check endpoint
pub async fn health(State(state): State<AppState>) -> Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "service": "kinship",
            "version": env!("CARGO_PKG_VERSION"),
            "revision": state.service().revision(),
        })),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct PersonSearch {
    q: Option<String>,
}

pub async fn list_persons(
    State(state): State<AppState>,
    Query(search): Query<PersonSearch>,
) -> Response {
    let people = match search.q {
        Some(q) => state.service().search_people(&q),
        None => state.service().people(),
    };
    Json(people).into_response()
}

pub async fn get_person(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let person = state.service().person(person_id(&id)?)?;
    Ok(Json(person).into_response())
}

pub async fn create_person(
    State(state): State<AppState>,
    Json(data): Json<NewPerson>,
) -> ApiResult<Response> {
    let person = state.service().add_person(data)?;
    state.persist().await;
    Ok((StatusCode::CREATED, Json(person)).into_response())
}

pub async fn update_person(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<PersonUpdate>,
) -> ApiResult<Response> {
    let person = state.service().update_person(person_id(&id)?, update)?;
    state.persist().await;
    Ok(Json(person).into_response())
}

pub async fn delete_person(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    state.service().remove_person(person_id(&id)?)?;
    state.persist().await;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn add_spouse(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(data): Json<NewPerson>,
) -> ApiResult<Response> {
    let (person, relation) = state.service().add_spouse(data, person_id(&id)?)?;
    state.persist().await;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "person": person, "relation": relation })),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct NewChild {
    #[serde(flatten)]
    person: NewPerson,
    parents: Vec<PersonId>,
}

pub async fn add_child(
    State(state): State<AppState>,
    Json(data): Json<NewChild>,
) -> ApiResult<Response> {
    let (person, relations) = state.service().add_child(data.person, &data.parents)?;
    state.persist().await;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "person": person, "relations": relations })),
    )
        .into_response())
}

pub async fn relatives(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let relatives = state.service().relatives(person_id(&id)?)?;
    Ok(Json(relatives).into_response())
}

pub async fn is_married(
    State(state): State<AppState>,
    Path((id, other)): Path<(String, String)>,
) -> ApiResult<Response> {
    let (id, other) = (person_id(&id)?, person_id(&other)?);
    for person in [id, other] {
        if state.service().person(person).is_err() {
            return Err(KinshipError::UnknownPerson(person).into());
        }
    }
    Ok(Json(serde_json::json!({
        "person": id,
        "other": other,
        "married": state.service().is_married(id, other),
    }))
    .into_response())
}

pub async fn list_relations(State(state): State<AppState>) -> Response {
    Json(state.service().relations()).into_response()
}

pub async fn create_relation(
    State(state): State<AppState>,
    Json(relation): Json<Relation>,
) -> ApiResult<Response> {
    let relation =
        state
            .service()
            .add_relation(relation.from, relation.to, relation.relation_type)?;
    state.persist().await;
    Ok((StatusCode::CREATED, Json(relation)).into_response())
}

pub async fn delete_relation(
    State(state): State<AppState>,
    Json(relation): Json<Relation>,
) -> ApiResult<Response> {
    state
        .service()
        .remove_relation(relation.from, relation.to, relation.relation_type)?;
    state.persist().await;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[derive(Debug, Deserialize)]
pub struct PathParams {
    from: String,
    to: String,
    algorithm: Option<String>,
}

/// Path query. Unknown ids and unreachable people both answer
/// `found: false`; only malformed parameters are errors.
pub async fn find_path(
    State(state): State<AppState>,
    Query(params): Query<PathParams>,
) -> ApiResult<Response> {
    let start = person_id(&params.from)?;
    let goal = person_id(&params.to)?;
    let algorithm = match params.algorithm.as_deref() {
        Some(name) if !name.trim().is_empty() => name.parse::<Algorithm>()?,
        _ => state.default_algorithm,
    };

    let graph = state.service().graph();
    let path = query::find_path(&graph, start, goal, algorithm).into_path();
    let steps = describe_path(&graph, &path)?;

    Ok(Json(Explanation {
        algorithm,
        found: !path.is_empty(),
        path,
        steps,
    })
    .into_response())
}

pub async fn snapshot(State(state): State<AppState>) -> Response {
    Json(state.service().snapshot()).into_response()
}
