/// Entity ids are opaque strings supplied by the surrounding application
/// (or generated as UUID v4 strings by [`new_id`]).
pub type EntityId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a fresh entity id.
pub fn new_id() -> EntityId {
    uuid::Uuid::new_v4().to_string()
}
