//! User repository implementation.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::PgPool;

use nota_core::{FieldState, Result, UserEntity, UserRepository};

use crate::statement::{BindValue, FieldMap};
use crate::table::{field_from_row, Table};

/// The `app_user` relation.
pub const USER_TABLE: &str = "app_user";

/// Writable columns; the primary key is server-assigned.
pub(crate) fn user_set_map(user: &UserEntity) -> FieldMap {
    FieldMap::new()
        .field("discord_id", &user.discord_id)
        .field("avatar_url", &user.avatar_url)
}

pub(crate) fn user_from_row(row: &PgRow) -> Result<UserEntity> {
    Ok(UserEntity {
        id: field_from_row(row, "id")?,
        discord_id: field_from_row(row, "discord_id")?,
        avatar_url: field_from_row(row, "avatar_url")?,
    })
}

/// PostgreSQL implementation of [`UserRepository`].
pub struct PgUserRepository {
    table: Table,
}

impl PgUserRepository {
    /// Create a new repository over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            table: Table::new(pool, USER_TABLE, &["id"]),
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, user: &UserEntity) -> Result<UserEntity> {
        let row = self.table.insert(&user_set_map(user)).await?;
        user_from_row(&row)
    }

    async fn update(&self, user: &UserEntity) -> Result<UserEntity> {
        let filter = FieldMap::new().field("id", &user.id);
        let row = self.table.update(&user_set_map(user), &filter).await?;
        user_from_row(&row)
    }

    async fn select(&self, id: i64) -> Result<Option<UserEntity>> {
        let row = self
            .table
            .select_by_key(&[BindValue::BigInt(Some(id))])
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn select_by_discord_id(&self, discord_id: i64) -> Result<Option<UserEntity>> {
        let filter = FieldMap::new().field("discord_id", &FieldState::Value(discord_id));
        let rows = self.table.select(&filter).await?;
        rows.first().map(user_from_row).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_map_excludes_primary_key() {
        let user = UserEntity {
            id: FieldState::Value(1),
            discord_id: FieldState::Value(123455),
            avatar_url: FieldState::Value("http://somewhere".to_string()),
        };
        let columns: Vec<&str> = user_set_map(&user).columns().collect();
        assert_eq!(columns, vec!["discord_id", "avatar_url"]);
    }
}
