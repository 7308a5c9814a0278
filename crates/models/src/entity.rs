use serde::Serialize;

/// A storable value with an optional, backend-assigned identity.
///
/// `None` means the entity has not been persisted yet. An empty string is a
/// legitimate id for some backends and therefore counts as present.
pub trait Entity: Serialize + Send + Sync + 'static {
    fn id(&self) -> Option<&str>;

    fn has_id(&self) -> bool {
        self.id().is_some()
    }
}
