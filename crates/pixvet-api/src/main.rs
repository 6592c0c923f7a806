use pixvet_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();

    pixvet_api::telemetry::init_telemetry();

    let config = Config::from_env()?;
    config.validate()?;

    let state = pixvet_api::setup::build_state(config.clone()).await?;
    let router = pixvet_api::setup::build_router(state);

    pixvet_api::setup::start_server(&config, router).await?;

    Ok(())
}
