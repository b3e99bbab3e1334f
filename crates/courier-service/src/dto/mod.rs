//! Data transfer objects for the API surface

mod requests;
mod responses;

pub use requests::{LoginRequest, RegisterRequest, SendMessageRequest};
pub use responses::{
    ActiveUsersResponse, AuthResponse, CurrentUserResponse, GoogleStatusResponse, HealthResponse,
    MessageHistoryResponse, UserResponse,
};
