//! `parley config`: Configuration management commands.

use parley_config::AppConfig;

use super::CmdResult;

pub fn show() -> CmdResult {
    let config = super::load_config()?;
    println!("{config:#?}");
    Ok(())
}

pub fn validate() -> CmdResult {
    println!("Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   Config parsed and validated");
            if !config.has_api_key() {
                println!("   Warning: no API key set (PARLEY_API_KEY or OPENAI_API_KEY)");
            }
            println!();
            println!("   Endpoint:   {}", config.api_url);
            println!("   Model:      {}", config.generation.model);
            println!("   Embeddings: {}", config.embedding.model);
            println!(
                "   Budget:     {} prompt tokens ({} total, {} reserved)",
                config.context.prompt_budget(),
                config.context.max_tokens,
                config.context.reserved_tokens
            );
            println!("   Sessions:   {}", config.session.dir.display());
            Ok(())
        }
        Err(e) => {
            println!("   Config error: {e}");
            Err(e.into())
        }
    }
}

pub fn init() -> CmdResult {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    if config_path.exists() {
        println!("Config already exists at: {}", config_path.display());
        println!("Edit it manually or delete it and re-run init.");
        return Ok(());
    }

    std::fs::create_dir_all(&config_dir)?;
    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Created {}", config_path.display());
    Ok(())
}
