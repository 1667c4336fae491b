//! User entity and profile endpoints.
//!
//! Authentication inserts the matching `Model` as a request extension, so
//! every handler downstream of the auth layer can rely on it.

use api_types::user::{PhoneSearch, UserView};
use axum::{Extension, Json, extract::State};
use sea_orm::entity::prelude::*;

use crate::{ServerError, server::ServerState};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,
    pub password: String,
    pub display_name: String,
    pub phone_number: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

fn view(model: Model) -> UserView {
    UserView {
        username: model.username,
        display_name: model.display_name,
        phone_number: model.phone_number,
    }
}

/// The authenticated user's own profile.
pub async fn me(Extension(user): Extension<Model>) -> Json<UserView> {
    Json(view(user))
}

/// Looks a user up by exact phone number, for adding friends from the
/// device's contact list.
pub async fn search_by_phone(
    _: Extension<Model>,
    State(state): State<ServerState>,
    Json(payload): Json<PhoneSearch>,
) -> Result<Json<UserView>, ServerError> {
    let found = Entity::find()
        .filter(Column::PhoneNumber.eq(payload.phone_number.trim()))
        .one(&state.db)
        .await
        .map_err(|err| ServerError::Generic(err.to_string()))?
        .ok_or_else(|| {
            ServerError::Engine(engine::EngineError::KeyNotFound("user not exists".to_string()))
        })?;

    Ok(Json(view(found)))
}
