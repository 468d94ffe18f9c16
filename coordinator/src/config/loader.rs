//! Reading `powerlan.toml`.

use std::path::Path;

use eyre::WrapErr as _;
use tokio::fs;

use crate::config::PowerlanConfig;

/// Reads the config at `path`. Keys left out take their defaults.
///
/// # Errors
///
/// Fails if the file can't be read, isn't valid TOML, or sets a zero timeout or port.
pub async fn load(path: &Path) -> eyre::Result<PowerlanConfig> {
    let content = fs::read_to_string(path)
        .await
        .wrap_err(format!("Failed to read config file at: {}", path.display()))?;
    let config: PowerlanConfig = toml::from_str(&content)
        .wrap_err(format!("Failed to parse config as TOML at: {}", path.display()))?;
    check(&config).wrap_err(format!("Invalid config at: {}", path.display()))?;
    Ok(config)
}

/// A zero wait would fail every probe and command without trying.
fn check(config: &PowerlanConfig) -> eyre::Result<()> {
    let t = &config.timeouts;
    for (key, ms) in [
        ("timeouts.probe_ms", t.probe_ms),
        ("timeouts.resolve_probe_ms", t.resolve_probe_ms),
        ("timeouts.command_ms", t.command_ms),
        ("timeouts.neighbor_dump_ms", t.neighbor_dump_ms),
    ] {
        if ms == 0 {
            eyre::bail!("{key} must be greater than zero");
        }
    }
    if config.wol.port == 0 {
        eyre::bail!("wol.port must not be zero");
    }
    Ok(())
}
