pub mod health;
pub mod savings;
pub mod transactions;
pub mod users;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};

pub use health::health_check;
pub use savings::{
    create_saving, delete_saving, list_savings, login_saving, show_saving, update_saving,
};
pub use transactions::create_transaction;
pub use users::{change_password, login_user, register_user};

use crate::AppState;

/// Build the application router
///
/// `public` routes are reachable without a session; every `protected`
/// handler takes an `AuthUser` and rejects requests without a valid token.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/register", post(register_user))
        .route("/login", post(login_user));

    let protected = Router::new()
        .route("/profile/change-password", patch(change_password))
        .route("/s", get(list_savings))
        .route("/s/create", post(create_saving))
        .route("/s/login/{id}", post(login_saving))
        .route("/s/{id}", get(show_saving))
        .route("/s/update/{id}", patch(update_saving))
        .route("/s/delete/{id}", delete(delete_saving))
        .route("/t/add", post(create_transaction));

    Router::new()
        .route("/health", get(health_check))
        .nest("/v1/public", public)
        .nest("/v1/protected", protected)
        .with_state(state)
}
