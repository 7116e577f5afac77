//! Diesel table definitions. Keep in sync with `backend/migrations`.

diesel::table! {
    /// User accounts.
    ///
    /// A non-null `deleted_at` marks the row as soft deleted; the row stays
    /// until purged.
    users (id) {
        id -> Uuid,
        /// Unique login email.
        email -> Varchar,
        /// Argon2 PHC string; never returned by the API.
        password -> Varchar,
        first_name -> Varchar,
        last_name -> Varchar,
        profile_picture -> Nullable<Varchar>,
        /// `ADMIN` or `USER`.
        role -> Varchar,
        is_active -> Bool,
        email_verified_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}
