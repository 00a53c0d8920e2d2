use axum::response::IntoResponse;

// Undocumented landing route; everything real lives under /v1.
pub async fn root() -> impl IntoResponse {
    concat!(env!("CARGO_PKG_NAME"), " - ", env!("CARGO_PKG_DESCRIPTION"))
}
