//! # courier-service
//!
//! Application layer: authentication (including Google OAuth), message
//! sending/delivery, and user lookups, behind a shared `ServiceContext`.

pub mod dto;
pub mod services;

pub use dto::{
    ActiveUsersResponse, AuthResponse, CurrentUserResponse, GoogleStatusResponse, HealthResponse,
    LoginRequest, MessageHistoryResponse, RegisterRequest, SendMessageRequest, UserResponse,
};
pub use services::{
    AuthService, AuthSession, GoogleOAuthClient, GoogleUserInfo, MessageService, ServiceContext,
    ServiceError, ServiceResult, UserService,
};
