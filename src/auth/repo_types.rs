use sqlx::FromRow;
use uuid::Uuid;

/// Account row in `users`. Never sent to clients; see `PublicUser`.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String, // argon2 PHC string
}
