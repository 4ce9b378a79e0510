use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery},
    recipes::{
        dto::{parse_ids, RecipeAction, RecipeListQuery, RecipePatch, RecipeView, RecipeWrite},
        images::{discard_image, image_url, store_image, UploadItem},
        repo::RecipeRepo,
        repo_types::{Recipe, RecipeChanges, RecipeFilter, RecipeWithLinks},
    },
    state::AppState,
};

const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes/", get(list_recipes).post(create_recipe))
        .route(
            "/recipes/:id/",
            get(get_recipe)
                .put(update_recipe)
                .patch(partial_update_recipe)
                .delete(delete_recipe),
        )
        .route(
            "/recipes/:id/upload-image/",
            post(upload_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )
}

async fn render(
    state: &AppState,
    action: RecipeAction,
    full: RecipeWithLinks,
) -> Result<RecipeView, ApiError> {
    let url = match action {
        RecipeAction::List => None,
        _ => image_url(state, full.recipe.image.as_deref()).await?,
    };
    Ok(action.render(full, url))
}

#[instrument(skip_all)]
pub async fn list_recipes(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(q): ApiQuery<RecipeListQuery>,
) -> Result<Json<Vec<RecipeView>>, ApiError> {
    let filter = RecipeFilter {
        tag_ids: parse_ids(q.tags.as_deref(), "tags")?,
        ingredient_ids: parse_ids(q.ingredients.as_deref(), "ingredients")?,
    };
    let recipes = state.store.list_recipes(user.id, &filter).await?;
    let items = recipes
        .into_iter()
        .map(|recipe| {
            RecipeAction::List.render(
                RecipeWithLinks {
                    recipe,
                    tags: Vec::new(),
                    ingredients: Vec::new(),
                },
                None,
            )
        })
        .collect();
    Ok(Json(items))
}

#[instrument(skip_all)]
pub async fn get_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<RecipeView>, ApiError> {
    let full = state
        .store
        .get_recipe(user.id, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(render(&state, RecipeAction::Retrieve, full).await?))
}

#[instrument(skip_all)]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(body): ApiJson<RecipeWrite>,
) -> Result<(StatusCode, HeaderMap, Json<RecipeView>), ApiError> {
    let new = body.into_new()?;
    // owner always comes from the token
    let full = state.store.create_recipe(user.id, new).await?;
    info!(user_id = user.id, recipe_id = full.recipe.id, "recipe created");

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/recipes/{}/", full.recipe.id).parse() {
        headers.insert(axum::http::header::LOCATION, location);
    }
    let view = render(&state, RecipeAction::Create, full).await?;
    Ok((StatusCode::CREATED, headers, Json(view)))
}

async fn apply_changes(
    state: &AppState,
    owner: i64,
    id: i64,
    changes: RecipeChanges,
    action: RecipeAction,
) -> Result<Json<RecipeView>, ApiError> {
    let full = state
        .store
        .update_recipe(owner, id, changes)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(render(state, action, full).await?))
}

#[instrument(skip_all)]
pub async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<RecipeWrite>,
) -> Result<Json<RecipeView>, ApiError> {
    apply_changes(&state, user.id, id, body.into_changes()?, RecipeAction::Update).await
}

#[instrument(skip_all)]
pub async fn partial_update_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<RecipePatch>,
) -> Result<Json<RecipeView>, ApiError> {
    apply_changes(
        &state,
        user.id,
        id,
        body.into_changes()?,
        RecipeAction::PartialUpdate,
    )
    .await
}

#[instrument(skip_all)]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let removed = state
        .store
        .delete_recipe(user.id, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    if let Some(key) = removed.image.as_deref() {
        discard_image(&state, key).await;
    }
    info!(user_id = user.id, recipe_id = id, "recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct ImageUploaded {
    pub id: i64,
    pub image: Option<String>,
}

/// Points the recipe at the stored object, or removes the object again if that fails.
async fn attach_image(state: &AppState, owner: i64, id: i64, key: &str) -> Result<Recipe, ApiError> {
    match state.store.set_recipe_image(owner, id, key).await {
        Ok(Some(recipe)) => Ok(recipe),
        Ok(None) => {
            discard_image(state, key).await;
            Err(ApiError::NotFound)
        }
        Err(e) => {
            discard_image(state, key).await;
            Err(e.into())
        }
    }
}

/// POST /recipes/:id/upload-image/ (multipart, field `image`)
#[instrument(skip_all)]
pub async fn upload_image(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<i64>,
    mut mp: Multipart,
) -> Result<Json<ImageUploaded>, ApiError> {
    let previous = state
        .store
        .get_recipe(user.id, id)
        .await?
        .ok_or(ApiError::NotFound)?
        .recipe
        .image;

    let mut upload = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        upload = Some(UploadItem {
            body,
            file_name,
            content_type,
        });
        break;
    }

    let item = upload
        .filter(|u| !u.body.is_empty())
        .ok_or_else(|| ApiError::bad_request("image: No file was submitted."))?;

    let key = store_image(&state, item).await?;
    let recipe = attach_image(&state, user.id, id, &key).await?;
    if let Some(old) = previous.as_deref() {
        discard_image(&state, old).await;
    }

    info!(user_id = user.id, recipe_id = id, key = %key, "recipe image uploaded");
    Ok(Json(ImageUploaded {
        id: recipe.id,
        image: image_url(&state, recipe.image.as_deref()).await?,
    }))
}
