//! Listing workflows that span the pinning service and the database.

use std::collections::HashMap;

use sqlx::SqlitePool;

use crate::{
    analytics::{self, AnalyticsReport},
    auth::CurrentUser,
    db,
    errors::AppError,
    pinning::{PendingImage, PinningClient},
    structs::{Hostel, HostelImage, HostelInput, ImageCategory, NewImage, MAX_IMAGES_PER_CATEGORY},
    AppState,
};

fn check_image_limits(existing: &[HostelImage], pending: &[PendingImage]) -> Result<(), AppError> {
    let mut counts: HashMap<ImageCategory, usize> = HashMap::new();
    for category in existing
        .iter()
        .map(|img| img.image_type)
        .chain(pending.iter().map(|img| img.category))
    {
        *counts.entry(category).or_default() += 1;
    }
    for category in ImageCategory::ALL {
        if counts.get(&category).copied().unwrap_or(0) > MAX_IMAGES_PER_CATEGORY {
            return Err(AppError::BadRequest(format!(
                "You can only have up to {MAX_IMAGES_PER_CATEGORY} {category} images in total"
            )));
        }
    }
    Ok(())
}

async fn upload_images(pinning: &PinningClient, images: Vec<PendingImage>) -> Vec<NewImage> {
    let attempted = images.len();
    let uploaded = pinning.pin_all(images).await;
    if attempted > 0 && uploaded.is_empty() {
        log::warn!("No images were uploaded, continuing with the listing");
    } else if uploaded.len() < attempted {
        log::warn!("Only {} of {} images were uploaded", uploaded.len(), attempted);
    }
    uploaded
}

/// Image rows are best effort: the listing stands even if linking fails.
async fn link_images(pool: &SqlitePool, hostel_id: &str, images: &[NewImage]) {
    if images.is_empty() {
        return;
    }
    if let Err(e) = db::add_hostel_images(pool, hostel_id, images).await {
        log::error!("Error adding hostel images: {}", e);
        log::warn!("Hostel {} saved but some images may not have been linked", hostel_id);
    }
}

pub async fn create_listing(
    state: &AppState,
    user: &CurrentUser,
    mut input: HostelInput,
    images: Vec<PendingImage>,
) -> Result<String, AppError> {
    input.validate().map_err(AppError::BadRequest)?;
    check_image_limits(&[], &images)?;
    let owner_id = user.owner_id();

    let uploaded = upload_images(&state.pinning, images).await;
    let id = db::create_hostel(&state.db_pool, &owner_id, &input)
        .await
        .map_err(|e| {
            log::error!("Error creating hostel: {}", e);
            AppError::DatabaseError(e)
        })?;
    link_images(&state.db_pool, &id, &uploaded).await;
    Ok(id)
}

/// Loads a hostel the user owns. Someone else's hostel is reported as missing.
pub async fn get_owned_listing(
    pool: &SqlitePool,
    user: &CurrentUser,
    id: &str,
) -> Result<Hostel, AppError> {
    let owner_id = user.owner_id();
    match db::get_hostel_by_id(pool, id).await? {
        Some(hostel) if hostel.owner_id == owner_id => Ok(hostel),
        Some(_) => {
            log::warn!("User {} tried to access hostel {} they do not own", owner_id, id);
            Err(AppError::NotFound)
        }
        None => Err(AppError::NotFound),
    }
}

pub async fn update_listing(
    state: &AppState,
    user: &CurrentUser,
    id: &str,
    mut input: HostelInput,
    images: Vec<PendingImage>,
) -> Result<String, AppError> {
    let existing = get_owned_listing(&state.db_pool, user, id).await?;
    input.validate().map_err(AppError::BadRequest)?;
    check_image_limits(&existing.images, &images)?;

    let uploaded = upload_images(&state.pinning, images).await;
    let updated = db::update_hostel(&state.db_pool, id, &user.owner_id(), &input)
        .await
        .map_err(|e| {
            log::error!("Error updating hostel: {}", e);
            AppError::DatabaseError(e)
        })?;
    if !updated {
        return Err(AppError::NotFound);
    }
    link_images(&state.db_pool, id, &uploaded).await;
    Ok(id.to_string())
}

pub async fn delete_listing(state: &AppState, user: &CurrentUser, id: &str) -> Result<(), AppError> {
    if db::delete_hostel(&state.db_pool, id, &user.owner_id()).await? {
        Ok(())
    } else {
        Err(AppError::NotFound)
    }
}

pub async fn save_listing(state: &AppState, user: &CurrentUser, id: &str) -> Result<(), AppError> {
    if db::get_hostel_by_id(&state.db_pool, id).await?.is_none() {
        return Err(AppError::NotFound);
    }
    db::save_hostel(&state.db_pool, &user.owner_id(), id).await?;
    Ok(())
}

pub async fn unsave_listing(state: &AppState, user: &CurrentUser, id: &str) -> Result<(), AppError> {
    db::unsave_hostel(&state.db_pool, &user.owner_id(), id).await?;
    Ok(())
}

pub async fn owner_analytics(state: &AppState, user: &CurrentUser) -> Result<AnalyticsReport, AppError> {
    let stats = db::get_owner_hostel_stats(&state.db_pool, &user.owner_id()).await?;
    let today = chrono::Utc::now().date_naive();
    Ok(analytics::sample_report(&mut rand::thread_rng(), &stats, today))
}
