//! `daycoach config` — Configuration management commands.

use daycoach_config::AppConfig;

pub fn print_default() {
    println!("{}", AppConfig::default_toml());
}

pub fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let mut warnings = Vec::new();
            if !config.has_api_key() {
                warnings.push("No API key set (set DAYCOACH_API_KEY or OPENROUTER_API_KEY)");
            }
            if config.cache.max_response_entries.is_none() {
                warnings.push("Response cache is unbounded (cache.max_response_entries unset)");
            }
            match &config.curriculum_path {
                Some(path) if !path.exists() => warnings.push("curriculum_path does not exist"),
                _ => {}
            }

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Provider:  {} ({})", config.provider.name, config.provider.api_url);
            println!("   Free:      {}", config.models.free.model);
            println!("   Premium:   {}", config.models.premium.model);
            println!("   Pro+:      {}", config.models.pro_plus.model);
            println!(
                "   Cache:     context {}s, responses {}s",
                config.cache.context_ttl_secs, config.cache.response_ttl_secs
            );
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub fn show() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if config.provider.api_key.is_some() {
        config.provider.api_key = Some("[REDACTED]".into());
    }
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

pub fn path() {
    println!("{}", AppConfig::config_dir().join("config.toml").display());
}

#[cfg(test)]
mod tests {
    #[test]
    fn config_path_is_valid() {
        let path = daycoach_config::AppConfig::config_dir().join("config.toml");
        assert!(path.to_str().unwrap().contains(".daycoach"));
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let parsed: daycoach_config::AppConfig =
            toml::from_str(&daycoach_config::AppConfig::default_toml()).unwrap();
        assert!(parsed.validate().is_ok());
    }
}
