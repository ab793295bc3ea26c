use md5::{Digest, Md5};
use uuid::Uuid;

/// Maps an identity-provider user id onto the UUID stored in `owner_id`.
///
/// Hyphenated UUIDs pass through untouched. Any other id is hashed with MD5 and
/// the digest is laid out as a UUID, so the same provider id always lands on
/// the same owner.
pub fn owner_uuid(user_id: &str) -> String {
    if user_id.len() == 36 && Uuid::try_parse(user_id).is_ok() {
        return user_id.to_string();
    }
    let digest = Md5::digest(user_id.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest);
    let owner = Uuid::from_bytes(bytes).hyphenated().to_string();
    log::debug!("Converted user id {:?} to owner id {}", user_id, owner);
    owner
}

pub fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
