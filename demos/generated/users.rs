// Generated by sqlgen. DO NOT EDIT.
// Source: demos/queries/users.sql

/// Fetch a single user by primary key.
pub const GET_USER: &str = "SELECT id, name, email, created_at FROM users WHERE id = $1";

#[derive(Debug, Clone)]
pub struct GetUserParams {
    pub id: i64,
}

#[derive(Debug, Clone)]
pub struct GetUserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub const CREATE_USER: &str = "INSERT INTO users (name, email, bio) VALUES ($1, $2, $3) RETURNING id, created_at";

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub name: String,
    pub email: String,
    pub bio: String,
}

#[derive(Debug, Clone)]
pub struct CreateUserRow {
    pub id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub const DELETE_USER: &str = "DELETE FROM users WHERE id = $1";

#[derive(Debug, Clone)]
pub struct DeleteUserParams {
    pub id: i64,
}
