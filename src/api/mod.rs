use axum::Json;
use axum::extract::Path;
use axum::routing::{post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde_json::{Value, json};

use crate::db::repository;
use crate::error::AppError;
use crate::models::*;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/teachers", get(list_teachers).post(create_teacher))
        .route("/api/teachers/{id}", put(update_teacher).delete(delete_teacher))
        .route("/api/classes", get(list_classes).post(create_class))
        .route("/api/classes/names", get(list_class_names))
        .route("/api/classes/{id}", put(update_class).delete(delete_class))
        .route("/api/classes/{id}/requirements", post(set_requirements))
        .route("/api/schedule", get(list_schedule).post(replace_schedule))
        .route("/api/schedule/save", post(save_schedule))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn list_teachers(State(state): State<AppState>) -> Result<Json<Vec<Teacher>>, AppError> {
    let teachers = repository::fetch_teachers(state.storage.as_ref()).await?;
    Ok(Json(teachers))
}

async fn create_teacher(
    State(state): State<AppState>,
    Json(req): Json<NewTeacherRequest>
) -> Result<Json<Value>, AppError> {
    let teacher = repository::insert_teacher(state.storage.as_ref(), req).await?;
    Ok(Json(json!({ "success": true, "id": teacher.id })))
}

async fn update_teacher(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<NewTeacherRequest>
) -> Result<Json<Value>, AppError> {
    repository::update_teacher(state.storage.as_ref(), &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(json!({ "success": true })))
}

async fn delete_teacher(
    State(state): State<AppState>,
    Path(id): Path<String>
) -> Result<Json<Value>, AppError> {
    let ok = repository::delete_teacher(state.storage.as_ref(), &id).await?;
    if ok {
        Ok(Json(json!({ "success": true })))
    } else {
        Err(AppError::NotFound)
    }
}

async fn list_classes(State(state): State<AppState>) -> Result<Json<Vec<Class>>, AppError> {
    let classes = repository::fetch_classes(state.storage.as_ref()).await?;
    Ok(Json(classes))
}

async fn list_class_names(
    State(state): State<AppState>
) -> Result<Json<Vec<ClassName>>, AppError> {
    let names = repository::fetch_class_names(state.storage.as_ref()).await?;
    Ok(Json(names))
}

async fn create_class(
    State(state): State<AppState>,
    Json(req): Json<NewClassRequest>
) -> Result<Json<Value>, AppError> {
    let class = repository::insert_class(state.storage.as_ref(), req).await?;
    Ok(Json(json!({ "success": true, "id": class.id })))
}

async fn update_class(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateClassRequest>
) -> Result<Json<Class>, AppError> {
    let class = repository::update_class(state.storage.as_ref(), &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(class))
}

async fn set_requirements(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RequirementsRequest>
) -> Result<Json<Class>, AppError> {
    let class =
        repository::replace_requirements(state.storage.as_ref(), &id, req.subject_requirements)
            .await?
            .ok_or(AppError::NotFound)?;
    Ok(Json(class))
}

async fn delete_class(
    State(state): State<AppState>,
    Path(id): Path<String>
) -> Result<Json<Value>, AppError> {
    let ok = repository::delete_class(state.storage.as_ref(), &id).await?;
    if ok {
        Ok(Json(json!({ "success": true })))
    } else {
        Err(AppError::NotFound)
    }
}

async fn list_schedule(
    State(state): State<AppState>
) -> Result<Json<Vec<ScheduleEntry>>, AppError> {
    let entries = repository::fetch_schedule(state.storage.as_ref()).await?;
    Ok(Json(entries))
}

async fn replace_schedule(
    State(state): State<AppState>,
    Json(entries): Json<Vec<ScheduleEntry>>
) -> Result<Json<Value>, AppError> {
    repository::replace_schedule(state.storage.as_ref(), &entries).await?;
    Ok(Json(json!({ "success": true })))
}

async fn save_schedule(
    State(state): State<AppState>,
    Json(entries): Json<Vec<ScheduleEntry>>
) -> Result<Json<Value>, AppError> {
    let saved = repository::save_schedule(state.storage.as_ref(), &entries).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Saved {} schedule entries", saved)
    })))
}
