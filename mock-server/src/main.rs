use mock_server::{Credentials, DEFAULT_API_KEY, DEFAULT_LOGIN};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let credentials = Credentials {
        login: std::env::var("MOCK_LOGIN").unwrap_or_else(|_| DEFAULT_LOGIN.to_string()),
        api_key: std::env::var("MOCK_API_KEY").unwrap_or_else(|_| DEFAULT_API_KEY.to_string()),
    };
    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    mock_server::run_with(listener, credentials).await
}
