/// GET / — liveness check
pub async fn index() -> &'static str {
    "inkwell is running"
}
