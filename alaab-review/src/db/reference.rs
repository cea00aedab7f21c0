//! Reference data: countries, heritage fields and tags

use alaab_common::db::{Country, HeritageField, Tag};
use alaab_common::Result;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

pub async fn save_country(pool: &SqlitePool, country: &Country) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO countries (guid, name, name_en, region)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(guid) DO UPDATE SET
            name = excluded.name,
            name_en = excluded.name_en,
            region = excluded.region
        "#,
    )
    .bind(country.id.to_string())
    .bind(&country.name)
    .bind(&country.name_en)
    .bind(&country.region)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn save_heritage_field(pool: &SqlitePool, field: &HeritageField) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO heritage_fields (guid, name, name_en)
        VALUES (?, ?, ?)
        ON CONFLICT(guid) DO UPDATE SET
            name = excluded.name,
            name_en = excluded.name_en
        "#,
    )
    .bind(field.id.to_string())
    .bind(&field.name)
    .bind(&field.name_en)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn save_tag(pool: &SqlitePool, tag: &Tag) -> Result<()> {
    sqlx::query("INSERT INTO tags (guid, name) VALUES (?, ?) ON CONFLICT(guid) DO UPDATE SET name = excluded.name")
        .bind(tag.id.to_string())
        .bind(&tag.name)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn country_exists(conn: &mut SqliteConnection, id: Uuid) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM countries WHERE guid = ?)")
        .bind(id.to_string())
        .fetch_one(conn)
        .await?;
    Ok(exists)
}

pub async fn heritage_field_exists(conn: &mut SqliteConnection, id: Uuid) -> Result<bool> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM heritage_fields WHERE guid = ?)")
            .bind(id.to_string())
            .fetch_one(conn)
            .await?;
    Ok(exists)
}

/// Return the tag ids from `ids` that do not exist
pub async fn missing_tags(conn: &mut SqliteConnection, ids: &[Uuid]) -> Result<Vec<Uuid>> {
    let mut missing = Vec::new();
    for id in ids {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tags WHERE guid = ?)")
            .bind(id.to_string())
            .fetch_one(&mut *conn)
            .await?;
        if !exists {
            missing.push(*id);
        }
    }
    Ok(missing)
}
