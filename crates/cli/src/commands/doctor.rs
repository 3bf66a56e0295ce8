//! `papertrail doctor`: diagnose configuration, store and provider.

use papertrail_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Papertrail Doctor: System Diagnostics");
    println!("========================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    let config = if config_path.exists() {
        match AppConfig::load() {
            Ok(config) => {
                println!("  ✅ Config file valid");
                config
            }
            Err(e) => {
                println!("  ❌ Config file invalid: {e}");
                println!("\n  ⚠️  1 issue(s) found. Fix the config before running other checks.");
                return Ok(());
            }
        }
    } else {
        println!("  ⚠️  No config file, using defaults. Run `papertrail onboard`");
        issues += 1;
        AppConfig::default()
    };

    // Store
    match papertrail_store::open_from_config(&config.store).await {
        Ok(store) => match store.count().await {
            Ok(n) => println!("  ✅ Paper store ({}): {n} paper(s)", store.name()),
            Err(e) => {
                println!("  ❌ Paper store unreadable: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Paper store unavailable: {e}");
            issues += 1;
        }
    }

    // Provider
    let router = papertrail_providers::build_from_config(&config);
    match router.default() {
        Some(provider) => match provider.health_check().await {
            Ok(true) => println!("  ✅ Provider '{}' reachable", provider.name()),
            Ok(false) => {
                println!("  ⚠️  Provider '{}' answered but reports unhealthy", provider.name());
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Provider '{}' unreachable: {e}", provider.name());
                issues += 1;
            }
        },
        None => {
            println!("  ❌ No provider named '{}'", router.default_name());
            issues += 1;
        }
    }

    if config.default_provider != "ollama" && !config.has_api_key() {
        println!("  ⚠️  No API key configured for '{}'", config.default_provider);
        issues += 1;
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
