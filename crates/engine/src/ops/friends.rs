use chrono::{DateTime, Utc};
use sea_orm::{Condition, QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};

use crate::{EngineError, FriendStatus, Friendship, ResultEngine, friendships};

use super::{Engine, with_tx};

impl Engine {
    /// Sends a friend request from `requester` to `recipient`.
    ///
    /// A pair may hold at most one friendship in either direction; a second
    /// request, a reversed one, or one towards an existing friend all fail
    /// with `ExistingKey`.
    pub async fn request_friendship(
        &self,
        requester: &str,
        recipient: &str,
        at: DateTime<Utc>,
    ) -> ResultEngine<Friendship> {
        if requester == recipient {
            return Err(EngineError::InvalidAmount(
                "cannot befriend yourself".to_string(),
            ));
        }

        let friendship = Friendship::new(requester.to_string(), recipient.to_string(), at);
        with_tx!(self, |db_tx| {
            let existing = friendships::Entity::find()
                .filter(pair_condition(requester, recipient))
                .one(&db_tx)
                .await?;
            if existing.is_some() {
                return Err(EngineError::ExistingKey(format!(
                    "friendship {requester} - {recipient}"
                )));
            }

            friendships::ActiveModel::from(&friendship)
                .insert(&db_tx)
                .await?;
            Ok(friendship.clone())
        })
    }

    /// Accepts a pending request addressed to `recipient`.
    ///
    /// Accepted friendships are symmetric: the original row flips to
    /// `accepted` and the reciprocal row is written in the same DB
    /// transaction, so no reader ever sees a one-sided acceptance.
    pub async fn accept_friendship(
        &self,
        recipient: &str,
        requester: &str,
        at: DateTime<Utc>,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let updated = friendships::Entity::update_many()
                .col_expr(
                    friendships::Column::Status,
                    Expr::value(FriendStatus::Accepted.as_str()),
                )
                .filter(friendships::Column::Requester.eq(requester))
                .filter(friendships::Column::Recipient.eq(recipient))
                .filter(friendships::Column::Status.eq(FriendStatus::Pending.as_str()))
                .exec(&db_tx)
                .await?;
            if updated.rows_affected == 0 {
                return Err(EngineError::KeyNotFound(format!(
                    "no pending request from {requester}"
                )));
            }

            let reciprocal = friendships::Entity::find()
                .filter(friendships::Column::Requester.eq(recipient))
                .filter(friendships::Column::Recipient.eq(requester))
                .one(&db_tx)
                .await?;
            match reciprocal {
                Some(_) => {
                    friendships::Entity::update_many()
                        .col_expr(
                            friendships::Column::Status,
                            Expr::value(FriendStatus::Accepted.as_str()),
                        )
                        .filter(friendships::Column::Requester.eq(recipient))
                        .filter(friendships::Column::Recipient.eq(requester))
                        .exec(&db_tx)
                        .await?;
                }
                None => {
                    let mut mirror =
                        Friendship::new(recipient.to_string(), requester.to_string(), at);
                    mirror.status = FriendStatus::Accepted;
                    friendships::ActiveModel::from(&mirror).insert(&db_tx).await?;
                }
            }

            Ok(())
        })
    }

    /// Blocks a user, overwriting any friendship row from `user` to `other`.
    pub async fn block_user(
        &self,
        user_id: &str,
        other: &str,
        at: DateTime<Utc>,
    ) -> ResultEngine<()> {
        if user_id == other {
            return Err(EngineError::InvalidAmount(
                "cannot block yourself".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let updated = friendships::Entity::update_many()
                .col_expr(
                    friendships::Column::Status,
                    Expr::value(FriendStatus::Blocked.as_str()),
                )
                .filter(friendships::Column::Requester.eq(user_id))
                .filter(friendships::Column::Recipient.eq(other))
                .exec(&db_tx)
                .await?;
            if updated.rows_affected == 0 {
                let mut block = Friendship::new(user_id.to_string(), other.to_string(), at);
                block.status = FriendStatus::Blocked;
                friendships::ActiveModel::from(&block).insert(&db_tx).await?;
            }
            Ok(())
        })
    }

    /// Accepted friends of a user, either direction.
    ///
    /// A `blocked` row in either direction hides the pair entirely.
    pub async fn friends_of(&self, user_id: &str) -> ResultEngine<Vec<String>> {
        let models = friendships::Entity::find()
            .filter(
                Condition::any()
                    .add(friendships::Column::Requester.eq(user_id))
                    .add(friendships::Column::Recipient.eq(user_id)),
            )
            .all(&self.database)
            .await?;

        let mut friends: Vec<String> = Vec::new();
        let mut blocked: Vec<String> = Vec::new();
        for model in models {
            let status = FriendStatus::try_from(model.status.as_str())?;
            let other = if model.requester == user_id {
                model.recipient
            } else {
                model.requester
            };
            match status {
                FriendStatus::Accepted if !friends.contains(&other) => friends.push(other),
                FriendStatus::Blocked => blocked.push(other),
                _ => {}
            }
        }
        friends.retain(|f| !blocked.contains(f));
        Ok(friends)
    }

    /// Pending requests addressed to a user.
    pub async fn requests_for(&self, user_id: &str) -> ResultEngine<Vec<Friendship>> {
        let models = friendships::Entity::find()
            .filter(friendships::Column::Recipient.eq(user_id))
            .filter(friendships::Column::Status.eq(FriendStatus::Pending.as_str()))
            .all(&self.database)
            .await?;
        models.into_iter().map(Friendship::try_from).collect()
    }
}

fn pair_condition(a: &str, b: &str) -> Condition {
    Condition::any()
        .add(
            Condition::all()
                .add(friendships::Column::Requester.eq(a))
                .add(friendships::Column::Recipient.eq(b)),
        )
        .add(
            Condition::all()
                .add(friendships::Column::Requester.eq(b))
                .add(friendships::Column::Recipient.eq(a)),
        )
}
