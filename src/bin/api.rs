use dotenvy::dotenv;
use tracing::error;

use smart_crud::{config::ServerConfig, logging::init_tracing, server, services::ResourceStore};

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_tracing();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid server configuration");
            std::process::exit(2);
        }
    };

    if let Err(err) = server::serve(config, ResourceStore::new()).await {
        error!(error = %err, "server exited with error");
        std::process::exit(1);
    }
}
