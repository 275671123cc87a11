//! Category endpoints.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State, rejection::JsonRejection},
    http::{HeaderName, StatusCode, header::LOCATION},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::AuthUser,
    category::{
        Category, CategoryId, CategoryName, CategoryWithSpending, create_category,
        delete_category, get_categories, get_categories_with_spending, update_category,
    },
    db::lock_connection,
    endpoints::{self, format_endpoint},
};

/// The state needed for the category endpoints.
#[derive(Debug, Clone)]
pub struct CategoryState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The body of a request to create or rename a category.
#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    #[serde(default)]
    name: Option<String>,
}

impl CategoryForm {
    fn into_name(self) -> Result<CategoryName, Error> {
        CategoryName::new(self.name.as_deref().unwrap_or_default())
    }
}

/// List the user's categories.
pub async fn get_categories_endpoint(
    State(state): State<CategoryState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Category>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_categories(user.user_id, &connection).map(Json)
}

/// List the user's categories with the total of their transactions.
pub async fn get_categories_with_spending_endpoint(
    State(state): State<CategoryState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<CategoryWithSpending>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_categories_with_spending(user.user_id, &connection).map(Json)
}

/// Create a category.
pub async fn create_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user): Extension<AuthUser>,
    form: Result<Json<CategoryForm>, JsonRejection>,
) -> Result<(StatusCode, [(HeaderName, String); 1], Json<Category>), Error> {
    let Json(form) = form?;
    let name = form.into_name()?;
    let connection = lock_connection(&state.db_connection)?;

    let category = create_category(name, user.user_id, &connection)?;
    let location = format_endpoint(endpoints::CATEGORY, category.id);

    Ok((StatusCode::CREATED, [(LOCATION, location)], Json(category)))
}

/// Rename a category.
pub async fn update_category_endpoint(
    Path(category_id): Path<CategoryId>,
    State(state): State<CategoryState>,
    Extension(user): Extension<AuthUser>,
    form: Result<Json<CategoryForm>, JsonRejection>,
) -> Result<Json<Category>, Error> {
    let Json(form) = form?;
    let name = form.into_name()?;
    let connection = lock_connection(&state.db_connection)?;

    update_category(category_id, user.user_id, name, &connection).map(Json)
}

/// Delete a category.
pub async fn delete_category_endpoint(
    Path(category_id): Path<CategoryId>,
    State(state): State<CategoryState>,
    Extension(user): Extension<AuthUser>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_category(category_id, user.user_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
