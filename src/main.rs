// src/main.rs
use shadowbox::GameConfig;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = GameConfig::from_env();
    log::info!("starting {} at {}x{}", config.title, config.width, config.height);

    if let Err(error) = shadowbox::run(config) {
        log::error!("fatal: {:#}", error);
        std::process::exit(1);
    }
}
