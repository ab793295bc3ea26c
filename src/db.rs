use std::{str::FromStr, time::Duration};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    types::Json,
    SqlitePool,
};
use uuid::Uuid;

use crate::{
    errors::AppError,
    structs::{Hostel, HostelImage, HostelInput, NewImage, OwnerHostelStat},
    utils,
};

/// Hostel columns plus the cover image picked from `hostel_images`.
const HOSTEL_SELECT: &str = r#"
    SELECT h.id, h.owner_id, h.name, h.location, h.address, h.postal_code,
           h.price_min, h.price_max, h.currency, h.max_capacity, h.description,
           h.amenities, h.availability, h.phone, h.email, h.website,
           h.created_at, h.updated_at,
           (SELECT i.image_url FROM hostel_images i
             WHERE i.hostel_id = h.id
             ORDER BY CASE WHEN i.image_type = 'exterior' THEN 0 ELSE 1 END, i.id
             LIMIT 1) AS cover_image
    FROM hostels h
"#;

pub async fn connect(database_url: &str) -> Result<SqlitePool, AppError> {
    let opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .read_only(false)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new().connect_with(opts).await?;
    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::migrate!().run(pool).await?;
    log::info!("Database migrated successfully");
    Ok(())
}

pub async fn get_all_hostels(pool: &SqlitePool) -> Result<Vec<Hostel>, sqlx::Error> {
    let query = format!("{HOSTEL_SELECT} ORDER BY h.created_at DESC, h.rowid DESC");
    let hostels = sqlx::query_as::<_, Hostel>(&query)
        .fetch_all(pool)
        .await?;
    log::debug!("Fetched {} hostels", hostels.len());
    Ok(hostels)
}

pub async fn get_owner_hostels(
    pool: &SqlitePool,
    owner_id: &str,
) -> Result<Vec<Hostel>, sqlx::Error> {
    let query =
        format!("{HOSTEL_SELECT} WHERE h.owner_id = $1 ORDER BY h.created_at DESC, h.rowid DESC");
    sqlx::query_as::<_, Hostel>(&query)
        .bind(owner_id)
        .fetch_all(pool)
        .await
}

/// Loads a hostel together with all of its images.
pub async fn get_hostel_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Hostel>, sqlx::Error> {
    let query = format!("{HOSTEL_SELECT} WHERE h.id = $1");
    let hostel = sqlx::query_as::<_, Hostel>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match hostel {
        Some(mut hostel) => {
            hostel.images = get_hostel_images(pool, id).await?;
            Ok(Some(hostel))
        }
        None => {
            log::warn!("No hostel found with id: {}", id);
            Ok(None)
        }
    }
}

pub async fn get_hostel_images(
    pool: &SqlitePool,
    hostel_id: &str,
) -> Result<Vec<HostelImage>, sqlx::Error> {
    sqlx::query_as::<_, HostelImage>(
        "SELECT id, hostel_id, image_url, image_type, created_at FROM hostel_images WHERE hostel_id = $1 ORDER BY id",
    )
    .bind(hostel_id)
    .fetch_all(pool)
    .await
}

pub async fn create_hostel(
    pool: &SqlitePool,
    owner_id: &str,
    input: &HostelInput,
) -> Result<String, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let created_at = utils::now();
    sqlx::query(
        r#"
        INSERT INTO hostels (
            id, owner_id, name, location, address, postal_code, price_min, price_max,
            currency, max_capacity, description, amenities, availability,
            phone, email, website, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        "#,
    )
    .bind(&id)
    .bind(owner_id)
    .bind(&input.name)
    .bind(&input.location)
    .bind(&input.address)
    .bind(&input.postal_code)
    .bind(input.price_min)
    .bind(input.price_max)
    .bind(&input.currency)
    .bind(input.max_capacity)
    .bind(&input.description)
    .bind(Json(&input.amenities))
    .bind(input.availability)
    .bind(&input.phone)
    .bind(&input.email)
    .bind(&input.website)
    .bind(&created_at)
    .bind(&created_at)
    .execute(pool)
    .await?;
    log::info!("Hostel created: {} owned by {}", id, owner_id);
    Ok(id)
}

/// Updates a hostel only when `owner_id` owns it. Returns whether a row changed.
pub async fn update_hostel(
    pool: &SqlitePool,
    id: &str,
    owner_id: &str,
    input: &HostelInput,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE hostels SET
            name = $1, location = $2, address = $3, postal_code = $4,
            price_min = $5, price_max = $6, currency = $7, max_capacity = $8,
            description = $9, amenities = $10, availability = $11,
            phone = $12, email = $13, website = $14, updated_at = $15
        WHERE id = $16 AND owner_id = $17
        "#,
    )
    .bind(&input.name)
    .bind(&input.location)
    .bind(&input.address)
    .bind(&input.postal_code)
    .bind(input.price_min)
    .bind(input.price_max)
    .bind(&input.currency)
    .bind(input.max_capacity)
    .bind(&input.description)
    .bind(Json(&input.amenities))
    .bind(input.availability)
    .bind(&input.phone)
    .bind(&input.email)
    .bind(&input.website)
    .bind(utils::now())
    .bind(id)
    .bind(owner_id)
    .execute(pool)
    .await?;

    let updated = result.rows_affected() > 0;
    if updated {
        log::info!("Hostel updated: {}", id);
    }
    Ok(updated)
}

pub async fn add_hostel_images(
    pool: &SqlitePool,
    hostel_id: &str,
    images: &[NewImage],
) -> Result<(), sqlx::Error> {
    let created_at = utils::now();
    let mut tx = pool.begin().await?;
    for image in images {
        sqlx::query(
            "INSERT INTO hostel_images (hostel_id, image_url, image_type, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(hostel_id)
        .bind(&image.image_url)
        .bind(image.image_type)
        .bind(&created_at)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    log::info!("Linked {} images to hostel {}", images.len(), hostel_id);
    Ok(())
}

/// Deletes a hostel and its images when `owner_id` owns it.
pub async fn delete_hostel(pool: &SqlitePool, id: &str, owner_id: &str) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let deleted = sqlx::query("DELETE FROM hostels WHERE id = $1 AND owner_id = $2")
        .bind(id)
        .bind(owner_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if deleted == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    sqlx::query("DELETE FROM hostel_images WHERE hostel_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM saved_hostels WHERE hostel_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    log::info!("Hostel with id {} deleted", id);
    Ok(true)
}

pub async fn get_owner_hostel_stats(
    pool: &SqlitePool,
    owner_id: &str,
) -> Result<Vec<OwnerHostelStat>, sqlx::Error> {
    sqlx::query_as::<_, OwnerHostelStat>(
        "SELECT id, name, location, created_at FROM hostels WHERE owner_id = $1 ORDER BY created_at DESC",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await
}

pub async fn save_hostel(pool: &SqlitePool, user_id: &str, hostel_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT OR IGNORE INTO saved_hostels (user_id, hostel_id, created_at) VALUES ($1, $2, $3)",
    )
    .bind(user_id)
    .bind(hostel_id)
    .bind(utils::now())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn unsave_hostel(pool: &SqlitePool, user_id: &str, hostel_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM saved_hostels WHERE user_id = $1 AND hostel_id = $2")
        .bind(user_id)
        .bind(hostel_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn is_hostel_saved(
    pool: &SqlitePool,
    user_id: &str,
    hostel_id: &str,
) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM saved_hostels WHERE user_id = $1 AND hostel_id = $2")
            .bind(user_id)
            .bind(hostel_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}

pub async fn get_saved_hostels(pool: &SqlitePool, user_id: &str) -> Result<Vec<Hostel>, sqlx::Error> {
    let query = format!(
        "{HOSTEL_SELECT} JOIN saved_hostels s ON s.hostel_id = h.id WHERE s.user_id = $1 ORDER BY s.created_at DESC, s.rowid DESC"
    );
    sqlx::query_as::<_, Hostel>(&query)
        .bind(user_id)
        .fetch_all(pool)
        .await
}
