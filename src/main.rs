use telegram_extractor_backend::{logging, server, Config};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let config = Config::from_env().map_err(std::io::Error::other)?;
    server::run(config).await
}
