//! User identity lookup

use alaab_common::db::User;
use alaab_common::{time, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::parse_guid;

/// Save user (insert or update display name and role)
pub async fn save_user(pool: &SqlitePool, user: &User) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (guid, display_name, role, created_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(guid) DO UPDATE SET
            display_name = excluded.display_name,
            role = excluded.role
        "#,
    )
    .bind(user.id.to_string())
    .bind(&user.display_name)
    .bind(user.role.as_str())
    .bind(time::to_db(&user.created_at))
    .execute(pool)
    .await?;

    Ok(())
}

/// Load user by id
pub async fn load_user(pool: &SqlitePool, id: Uuid) -> Result<Option<User>> {
    let row = sqlx::query("SELECT guid, display_name, role, created_at FROM users WHERE guid = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => {
            let guid: String = row.get("guid");
            let role: String = row.get("role");
            let created_at: String = row.get("created_at");
            Ok(Some(User {
                id: parse_guid(&guid)?,
                display_name: row.get("display_name"),
                role: role.parse()?,
                created_at: time::from_db(&created_at)?,
            }))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alaab_common::db::{init_memory_database, Role};

    #[tokio::test]
    async fn test_save_and_load_user() {
        let pool = init_memory_database().await.unwrap();
        let mut user = User {
            id: Uuid::new_v4(),
            display_name: "مراجع".to_string(),
            role: Role::Reviewer,
            created_at: time::now(),
        };
        save_user(&pool, &user).await.unwrap();

        user.role = Role::Admin;
        save_user(&pool, &user).await.unwrap();

        let loaded = load_user(&pool, user.id).await.unwrap().unwrap();
        assert_eq!(loaded.role, Role::Admin);
        assert_eq!(loaded.display_name, "مراجع");
        assert!(load_user(&pool, Uuid::new_v4()).await.unwrap().is_none());
    }
}
