/// Example demonstrating error chaining with httperr::HttpError
///
/// Each layer wraps the error of the layer below. Nothing is copied on wrap:
/// the handler reads the response code, retriability and stack trace back from
/// the chain.
///
/// Run with `RUST_LOG=debug cargo run --example error_chaining` to also see
/// the events emitted by the library.
use http::StatusCode;
use httperr::{response_status_from_error, HttpError, ResultExt};
use tracing_subscriber::EnvFilter;

/// Simulate a database driver that knows nothing about HTTP
fn connect_to_database() -> Result<(), std::io::Error> {
    Err(std::io::Error::new(
        std::io::ErrorKind::TimedOut,
        "connection timeout after 5000ms",
    ))
}

/// Repository layer: the driver error enters the chain here and the stack
/// trace is captured here
fn fetch_user_from_db(user_id: &str) -> httperr::Result<String> {
    connect_to_database().wrap_err_with(|| format!("failed to fetch user {user_id}"))?;

    Ok(format!("User data for {}", user_id))
}

/// Service layer: wraps again, no new stack trace
fn get_user_profile(user_id: &str) -> httperr::Result<String> {
    fetch_user_from_db(user_id).map_err(|repo_err| {
        HttpError::wrap(repo_err, "user profile retrieval failed")
            .with_status(StatusCode::SERVICE_UNAVAILABLE)
            .with_error_code("profile_unavailable")
    })
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Error Chaining Example ===\n");

    match get_user_profile("user-789") {
        Ok(profile) => println!("Success: {}", profile),
        Err(error) => {
            println!("Complete error with full chain:\n");
            println!("{}", error);
            println!("\n{}", "=".repeat(80));

            println!("\nResolved attributes:");
            println!("  Message: {}", error.message());
            println!("  Inner message: {}", error.inner_message());
            println!("  Response code: {}", error.response_code());
            println!("  Status: {}", response_status_from_error(&error));
            println!("  Error code: {}", error.error_code());
            println!("  Retriable: {}", error.retriable());
            println!("\nStack trace:\n{}", error.stack_trace());

            error.report();
        }
    }
}
