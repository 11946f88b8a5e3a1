//! `docuroute config` — show the effective or default configuration.

use docuroute_config::AppConfig;

use super::setup::CliResult;

pub async fn run(default: bool) -> CliResult<()> {
    if default {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    let path = AppConfig::config_dir().join("config.toml");
    match AppConfig::load() {
        Ok(config) => {
            println!("# {}", path.display());
            if !config.has_api_key() {
                println!("# warning: no API key set (DOCUROUTE_API_KEY, OPENROUTER_API_KEY or OPENAI_API_KEY)");
            }
            println!();
            print!("{}", toml::to_string_pretty(&redacted(config))?);
        }
        Err(e) => {
            eprintln!("  Config error: {e}");
            return Err(e.into());
        }
    }
    Ok(())
}

/// Replace every secret with a marker so the output is safe to share.
fn redacted(mut config: AppConfig) -> AppConfig {
    const MARKER: &str = "[REDACTED]";
    if config.api_key.is_some() {
        config.api_key = Some(MARKER.into());
    }
    for provider in config.providers.values_mut() {
        if provider.api_key.is_some() {
            provider.api_key = Some(MARKER.into());
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use docuroute_config::ProviderConfig;

    #[test]
    fn secrets_are_redacted() {
        let mut config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("sk-other".into()),
                api_url: None,
                default_model: None,
            },
        );

        let text = toml::to_string_pretty(&redacted(config)).unwrap();
        assert!(!text.contains("sk-secret"));
        assert!(!text.contains("sk-other"));
        assert!(text.contains("[REDACTED]"));
    }

    #[test]
    fn config_path_is_valid() {
        let path = AppConfig::config_dir().join("config.toml");
        assert!(path.to_str().unwrap().contains("config.toml"));
    }
}
