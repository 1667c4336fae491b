//! Friendship primitives.
//!
//! A friendship row is a directed (requester, recipient) pair. An
//! `accepted` friendship always exists in both directions; the accept
//! operation writes the reciprocal row in the same DB transaction so
//! neither party can observe a one-sided acceptance.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendStatus {
    Pending,
    Accepted,
    Blocked,
}

impl FriendStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Blocked => "blocked",
        }
    }
}

impl TryFrom<&str> for FriendStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "blocked" => Ok(Self::Blocked),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid friendship status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friendship {
    pub id: Uuid,
    pub requester: String,
    pub recipient: String,
    pub status: FriendStatus,
    pub created_at: DateTime<Utc>,
}

impl Friendship {
    pub fn new(requester: String, recipient: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            requester,
            recipient,
            status: FriendStatus::Pending,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "friendships")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub requester: String,
    pub recipient: String,
    pub status: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Friendship> for ActiveModel {
    fn from(friendship: &Friendship) -> Self {
        Self {
            id: ActiveValue::Set(friendship.id.to_string()),
            requester: ActiveValue::Set(friendship.requester.clone()),
            recipient: ActiveValue::Set(friendship.recipient.clone()),
            status: ActiveValue::Set(friendship.status.as_str().to_string()),
            created_at: ActiveValue::Set(friendship.created_at),
        }
    }
}

impl TryFrom<Model> for Friendship {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("friendship not exists".to_string()))?,
            requester: model.requester,
            recipient: model.recipient,
            status: FriendStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
        })
    }
}
