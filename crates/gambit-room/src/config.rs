//! Registry configuration.

/// Settings for a [`RoomRegistry`](crate::RoomRegistry) and the room
/// actors it spawns.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// How many codes `create_room` tries before giving up with
    /// `CapacityExhausted`.
    pub max_code_attempts: usize,

    /// Most rooms that may be live at once. Rooms that are created but
    /// never joined count against it until deleted.
    pub max_rooms: usize,

    /// Command channel capacity for each room actor. Senders wait when a
    /// room falls this far behind.
    pub channel_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_code_attempts: 64,
            max_rooms: 10_000,
            channel_size: 64,
        }
    }
}
