use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use tracing::{info, instrument};

use crate::{
    attributes::{
        dto::{clean_name, AttributePatch, AttributeView, AttributeWrite, ListQuery},
        repo::AttributeRepo,
        repo_types::AttributeKind,
    },
    auth::extractors::AuthUser,
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery},
    state::AppState,
};

/// `/{plural}/` and `/{plural}/:id/` for one attribute kind.
pub fn routes(kind: AttributeKind) -> Router<AppState> {
    Router::new()
        .route(
            &format!("/{}/", kind.plural()),
            get(list_attributes).post(create_attribute),
        )
        .route(
            &format!("/{}/:id/", kind.plural()),
            get(get_attribute)
                .put(update_attribute)
                .patch(partial_update_attribute)
                .delete(delete_attribute),
        )
        .layer(Extension(kind))
}

#[instrument(skip_all, fields(kind = kind.label()))]
pub async fn list_attributes(
    State(state): State<AppState>,
    Extension(kind): Extension<AttributeKind>,
    AuthUser(user): AuthUser,
    ApiQuery(q): ApiQuery<ListQuery>,
) -> Result<Json<Vec<AttributeView>>, ApiError> {
    let rows = state
        .store
        .list_attributes(kind, user.id, q.assigned_only())
        .await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[instrument(skip_all, fields(kind = kind.label()))]
pub async fn get_attribute(
    State(state): State<AppState>,
    Extension(kind): Extension<AttributeKind>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<AttributeView>, ApiError> {
    let row = state
        .store
        .get_attribute(kind, user.id, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(row.into()))
}

#[instrument(skip_all, fields(kind = kind.label()))]
pub async fn create_attribute(
    State(state): State<AppState>,
    Extension(kind): Extension<AttributeKind>,
    AuthUser(user): AuthUser,
    ApiJson(body): ApiJson<AttributeWrite>,
) -> Result<(StatusCode, Json<AttributeView>), ApiError> {
    let name = clean_name(&body.name)?;
    let row = state.store.create_attribute(kind, user.id, &name).await?;
    info!(user_id = user.id, id = row.id, "{} created", kind.label());
    Ok((StatusCode::CREATED, Json(row.into())))
}

#[instrument(skip_all, fields(kind = kind.label()))]
pub async fn update_attribute(
    State(state): State<AppState>,
    Extension(kind): Extension<AttributeKind>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<AttributeWrite>,
) -> Result<Json<AttributeView>, ApiError> {
    let name = clean_name(&body.name)?;
    rename(&state, kind, user.id, id, &name).await
}

#[instrument(skip_all, fields(kind = kind.label()))]
pub async fn partial_update_attribute(
    State(state): State<AppState>,
    Extension(kind): Extension<AttributeKind>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<AttributePatch>,
) -> Result<Json<AttributeView>, ApiError> {
    match body.name {
        Some(raw) => rename(&state, kind, user.id, id, &clean_name(&raw)?).await,
        None => get_attribute(State(state), Extension(kind), AuthUser(user), ApiPath(id)).await,
    }
}

async fn rename(
    state: &AppState,
    kind: AttributeKind,
    owner: i64,
    id: i64,
    name: &str,
) -> Result<Json<AttributeView>, ApiError> {
    let row = state
        .store
        .rename_attribute(kind, owner, id, name)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(row.into()))
}

#[instrument(skip_all, fields(kind = kind.label()))]
pub async fn delete_attribute(
    State(state): State<AppState>,
    Extension(kind): Extension<AttributeKind>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    if !state.store.delete_attribute(kind, user.id, id).await? {
        return Err(ApiError::NotFound);
    }
    info!(user_id = user.id, id, "{} deleted", kind.label());
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use rust_decimal::Decimal;
    use serde_json::json;

    use crate::attributes::repo::AttributeRepo;
    use crate::attributes::repo_types::AttributeKind;
    use crate::recipes::repo::RecipeRepo;
    use crate::recipes::repo_types::NewRecipe;
    use crate::test_support::{bearer, make_user, send, TestApp};

    fn sample_recipe(title: &str, tags: &[&str], ingredients: &[&str]) -> NewRecipe {
        NewRecipe {
            title: title.into(),
            description: String::new(),
            time_minutes: 10,
            price: Decimal::new(500, 2),
            link: String::new(),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn auth_required() {
        let app = TestApp::new();
        for uri in ["/api/tags/", "/api/ingredients/"] {
            let (status, _) = send(&app, Method::GET, uri, None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn retrieve_tags_ordered_by_name_desc() {
        let app = TestApp::new();
        let user = make_user(&app, "user@example.com").await;
        for name in ["Dessert", "Vegan", "Breakfast"] {
            app.state.store.create_attribute(AttributeKind::Tag, user.id, name).await.unwrap();
        }

        let (status, body) =
            send(&app, Method::GET, "/api/tags/", Some(&bearer(&app, &user)), None).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["Vegan", "Dessert", "Breakfast"]);
    }

    #[tokio::test]
    async fn tags_limited_to_user() {
        let app = TestApp::new();
        let user = make_user(&app, "user@example.com").await;
        let other = make_user(&app, "other@example.com").await;
        app.state.store.create_attribute(AttributeKind::Tag, other.id, "Fruity").await.unwrap();
        let mine = app
            .state
            .store
            .create_attribute(AttributeKind::Tag, user.id, "Comfort Food")
            .await
            .unwrap();

        let (status, body) =
            send(&app, Method::GET, "/api/tags/", Some(&bearer(&app, &user)), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([{"id": mine.id, "name": "Comfort Food"}]));
    }

    #[tokio::test]
    async fn ingredient_crud_roundtrip() {
        let app = TestApp::new();
        let user = make_user(&app, "user@example.com").await;
        let token = bearer(&app, &user);

        let (status, created) = send(
            &app,
            Method::POST,
            "/api/ingredients/",
            Some(&token),
            Some(json!({"name": " Kale "})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["name"], "Kale");
        let url = format!("/api/ingredients/{}/", created["id"]);

        let (status, body) = send(
            &app,
            Method::PATCH,
            &url,
            Some(&token),
            Some(json!({"name": "Coriander"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Coriander");

        let (status, body) =
            send(&app, Method::PUT, &url, Some(&token), Some(json!({"name": "Salt"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Salt");

        let (status, _) = send(&app, Method::DELETE, &url, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(app
            .state
            .store
            .list_attributes(AttributeKind::Ingredient, user.id, false)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn blank_name_rejected() {
        let app = TestApp::new();
        let user = make_user(&app, "user@example.com").await;
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/tags/",
            Some(&bearer(&app, &user)),
            Some(json!({"name": "  "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn other_users_items_are_invisible() {
        let app = TestApp::new();
        let user = make_user(&app, "user@example.com").await;
        let other = make_user(&app, "other@example.com").await;
        let theirs = app
            .state
            .store
            .create_attribute(AttributeKind::Ingredient, other.id, "Pepper")
            .await
            .unwrap();
        let token = bearer(&app, &user);
        let url = format!("/api/ingredients/{}/", theirs.id);

        for method in [Method::GET, Method::DELETE] {
            let (status, _) = send(&app, method, &url, Some(&token), None).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }
        let (status, _) =
            send(&app, Method::PUT, &url, Some(&token), Some(json!({"name": "Mine"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let still = app
            .state
            .store
            .get_attribute(AttributeKind::Ingredient, other.id, theirs.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(still.name, "Pepper");
    }

    #[tokio::test]
    async fn filter_assigned_only_unique() {
        let app = TestApp::new();
        let user = make_user(&app, "user@example.com").await;
        let store = &app.state.store;
        store
            .create_recipe(user.id, sample_recipe("Eggs Benedict", &[], &["Eggs"]))
            .await
            .unwrap();
        store
            .create_recipe(user.id, sample_recipe("Herb Eggs", &[], &["Eggs"]))
            .await
            .unwrap();
        store
            .create_attribute(AttributeKind::Ingredient, user.id, "Lentils")
            .await
            .unwrap();

        let token = bearer(&app, &user);
        let (_, all) = send(&app, Method::GET, "/api/ingredients/", Some(&token), None).await;
        assert_eq!(all.as_array().unwrap().len(), 2);

        let (status, assigned) = send(
            &app,
            Method::GET,
            "/api/ingredients/?assigned_only=1",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let assigned = assigned.as_array().unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0]["name"], "Eggs");
    }

    #[tokio::test]
    async fn bad_query_or_body_is_bad_request_with_detail() {
        let app = TestApp::new();
        let user = make_user(&app, "user@example.com").await;
        let token = bearer(&app, &user);

        let (status, body) =
            send(&app, Method::GET, "/api/tags/?assigned_only=true", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());

        let (status, body) =
            send(&app, Method::POST, "/api/ingredients/", Some(&token), Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("name"));
    }
}
