// HTTP surface for the directory. Authorization context arrives as trusted
// x-viewer-* headers set by the session layer in front of this service; every
// failure is one of the typed AppError kinds, never a raw store error.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    app_state::AppState,
    directory::announcements::{AnnouncementPage, CreatedAnnouncement},
    directory::schools::{CreatedSchool, SchoolDetails, SchoolPage},
    error::AppResult,
    models::{Announcement, Notification, Program, Review, School, SchoolProfile, Semester, User},
    viewer::ViewerContext,
};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub admin_code: Option<String>,
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub rating: f64,
    pub body: String,
}

#[derive(Deserialize)]
pub struct ProgramRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct SemesterRequest {
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
}

#[derive(Deserialize)]
pub struct AnnouncementRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
}

// ---- users / follow / notifications ----

async fn register_user(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<User>> {
    let user = state
        .directory
        .users
        .register(req.email, req.name, req.admin_code)
        .await?;
    Ok(Json(user))
}

async fn get_user(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<User>> {
    Ok(Json(state.directory.users.get(id).await?))
}

async fn follow_user(
    State(state): State<AppState>,
    viewer: ViewerContext,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    state.directory.follows.follow(viewer.user_id, id).await?;
    Ok(Json(json!({"following": id})))
}

async fn list_notifications(
    State(state): State<AppState>,
    viewer: ViewerContext,
) -> AppResult<Json<Vec<Notification>>> {
    Ok(Json(state.directory.inbox.list(&viewer).await?))
}

async fn mark_notification_read(
    State(state): State<AppState>,
    viewer: ViewerContext,
    Path(id): Path<i64>,
) -> AppResult<Json<Notification>> {
    Ok(Json(state.directory.inbox.mark_read(&viewer, id).await?))
}

// ---- schools ----

async fn list_schools(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<SchoolPage>> {
    let page = state
        .directory
        .schools
        .list(
            query.search.as_deref(),
            query.page.unwrap_or(1),
            state.config.listing.per_page,
        )
        .await?;
    Ok(Json(page))
}

async fn create_school(
    State(state): State<AppState>,
    viewer: ViewerContext,
    Json(profile): Json<SchoolProfile>,
) -> AppResult<Json<CreatedSchool>> {
    Ok(Json(state.directory.schools.create(&viewer, profile).await?))
}

async fn get_school(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<SchoolDetails>> {
    Ok(Json(state.directory.schools.get(id).await?))
}

async fn update_school(
    State(state): State<AppState>,
    viewer: ViewerContext,
    Path(id): Path<i64>,
    Json(profile): Json<SchoolProfile>,
) -> AppResult<Json<School>> {
    Ok(Json(
        state.directory.schools.update(&viewer, id, profile).await?,
    ))
}

async fn delete_school(
    State(state): State<AppState>,
    viewer: ViewerContext,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    state.directory.schools.delete(&viewer, id).await?;
    Ok(Json(json!({"id": id, "deleted": true})))
}

// ---- reviews ----

async fn list_reviews(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<Review>>> {
    Ok(Json(state.directory.reviews.list(id).await?))
}

async fn create_review(
    State(state): State<AppState>,
    viewer: ViewerContext,
    Path(id): Path<i64>,
    Json(req): Json<ReviewRequest>,
) -> AppResult<Json<Review>> {
    Ok(Json(
        state
            .directory
            .reviews
            .create(&viewer, id, req.rating, req.body)
            .await?,
    ))
}

async fn update_review(
    State(state): State<AppState>,
    viewer: ViewerContext,
    Path((id, review_id)): Path<(i64, i64)>,
    Json(req): Json<ReviewRequest>,
) -> AppResult<Json<Review>> {
    Ok(Json(
        state
            .directory
            .reviews
            .update(&viewer, id, review_id, req.rating, req.body)
            .await?,
    ))
}

async fn delete_review(
    State(state): State<AppState>,
    viewer: ViewerContext,
    Path((id, review_id)): Path<(i64, i64)>,
) -> AppResult<Json<Value>> {
    state
        .directory
        .reviews
        .delete(&viewer, id, review_id)
        .await?;
    Ok(Json(json!({"id": review_id, "deleted": true})))
}

// ---- programs ----

async fn list_programs(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<Program>>> {
    Ok(Json(state.directory.programs.list(id).await?))
}

async fn create_program(
    State(state): State<AppState>,
    _viewer: ViewerContext,
    Path(id): Path<i64>,
    Json(req): Json<ProgramRequest>,
) -> AppResult<Json<Program>> {
    Ok(Json(
        state
            .directory
            .programs
            .create(id, req.name, req.description)
            .await?,
    ))
}

async fn update_program(
    State(state): State<AppState>,
    _viewer: ViewerContext,
    Path((id, program_id)): Path<(i64, i64)>,
    Json(req): Json<ProgramRequest>,
) -> AppResult<Json<Program>> {
    Ok(Json(
        state
            .directory
            .programs
            .update(id, program_id, req.name, req.description)
            .await?,
    ))
}

async fn delete_program(
    State(state): State<AppState>,
    _viewer: ViewerContext,
    Path((id, program_id)): Path<(i64, i64)>,
) -> AppResult<Json<Value>> {
    state.directory.programs.delete(id, program_id).await?;
    Ok(Json(json!({"id": program_id, "deleted": true})))
}

// ---- semesters ----

async fn list_semesters(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<Semester>>> {
    Ok(Json(state.directory.semesters.list(id).await?))
}

async fn create_semester(
    State(state): State<AppState>,
    _viewer: ViewerContext,
    Path(id): Path<i64>,
    Json(req): Json<SemesterRequest>,
) -> AppResult<Json<Semester>> {
    Ok(Json(
        state
            .directory
            .semesters
            .create(id, req.name, req.description, req.start_date, req.end_date)
            .await?,
    ))
}

async fn update_semester(
    State(state): State<AppState>,
    _viewer: ViewerContext,
    Path((id, semester_id)): Path<(i64, i64)>,
    Json(req): Json<SemesterRequest>,
) -> AppResult<Json<Semester>> {
    Ok(Json(
        state
            .directory
            .semesters
            .update(
                id,
                semester_id,
                req.name,
                req.description,
                req.start_date,
                req.end_date,
            )
            .await?,
    ))
}

async fn delete_semester(
    State(state): State<AppState>,
    _viewer: ViewerContext,
    Path((id, semester_id)): Path<(i64, i64)>,
) -> AppResult<Json<Value>> {
    state.directory.semesters.delete(id, semester_id).await?;
    Ok(Json(json!({"id": semester_id, "deleted": true})))
}

// ---- announcements ----

async fn list_announcements(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<AnnouncementPage>> {
    let page = state
        .directory
        .announcements
        .list(
            query.search.as_deref(),
            query.page.unwrap_or(1),
            state.config.listing.per_page,
        )
        .await?;
    Ok(Json(page))
}

async fn create_announcement(
    State(state): State<AppState>,
    viewer: ViewerContext,
    Json(req): Json<AnnouncementRequest>,
) -> AppResult<Json<CreatedAnnouncement>> {
    Ok(Json(
        state
            .directory
            .announcements
            .create(&viewer, req.name, req.description)
            .await?,
    ))
}

async fn get_announcement(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Announcement>> {
    Ok(Json(state.directory.announcements.get(id).await?))
}

async fn update_announcement(
    State(state): State<AppState>,
    _viewer: ViewerContext,
    Path(id): Path<i64>,
    Json(req): Json<AnnouncementRequest>,
) -> AppResult<Json<Announcement>> {
    Ok(Json(
        state
            .directory
            .announcements
            .update(id, req.name, req.description)
            .await?,
    ))
}

async fn delete_announcement(
    State(state): State<AppState>,
    _viewer: ViewerContext,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    state.directory.announcements.delete(id).await?;
    Ok(Json(json!({"id": id, "deleted": true})))
}

pub fn create_directory_router(state: AppState) -> Router {
    Router::new()
        .route("/users", post(register_user))
        .route("/users/{id}", get(get_user))
        .route("/users/{id}/follow", post(follow_user))
        .route("/notifications", get(list_notifications))
        .route("/notifications/{id}/read", post(mark_notification_read))
        .route("/schools", get(list_schools).post(create_school))
        .route(
            "/schools/{id}",
            get(get_school).put(update_school).delete(delete_school),
        )
        .route(
            "/schools/{id}/reviews",
            get(list_reviews).post(create_review),
        )
        .route(
            "/schools/{id}/reviews/{review_id}",
            axum::routing::put(update_review).delete(delete_review),
        )
        .route(
            "/schools/{id}/programs",
            get(list_programs).post(create_program),
        )
        .route(
            "/schools/{id}/programs/{program_id}",
            axum::routing::put(update_program).delete(delete_program),
        )
        .route(
            "/programs/{id}/semesters",
            get(list_semesters).post(create_semester),
        )
        .route(
            "/programs/{id}/semesters/{semester_id}",
            axum::routing::put(update_semester).delete(delete_semester),
        )
        .route(
            "/announcements",
            get(list_announcements).post(create_announcement),
        )
        .route(
            "/announcements/{id}",
            get(get_announcement)
                .put(update_announcement)
                .delete(delete_announcement),
        )
        .with_state(state)
}
