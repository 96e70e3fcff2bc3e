//! Diesel schema for message persistence.

diesel::table! {
    /// Dispatched messages and their delivery state.
    messages (id) {
        /// Message identifier.
        id -> Uuid,
        /// Routing type.
        #[max_length = 255]
        message_type -> Varchar,
        /// Producer payload.
        body -> Jsonb,
        /// Lifecycle state.
        #[max_length = 50]
        state -> Varchar,
        /// Number of restarts preceding this message.
        restart_count -> Int4,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Latest state change timestamp.
        updated_at -> Timestamptz,
        /// Claim timestamp.
        started_at -> Nullable<Timestamptz>,
        /// Completion timestamp.
        completed_at -> Nullable<Timestamptz>,
    }
}
