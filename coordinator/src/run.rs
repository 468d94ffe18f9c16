//! Dispatch of CLI commands onto the engine, and the terminal rendering of results.

use alloc::sync::Arc;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use tracing::info;

use crate::{
    app::{
        PingProbe, PipelineSettings, PipelineState, ShellRunner, SystemNeighbors, apply_updates,
        channel, power_off, power_on, refresh, resolve_single,
    },
    cli::{AddArgs, Cli, Command, EditArgs},
    config::{PowerlanConfig, load, resolve_config_relative_path},
    roster::{HostEdit, HostRecord, Roster, validate_ip},
    wol::BroadcastWake,
};

/// Config file picked up from the working directory when `--config` is not given.
const DEFAULT_CONFIG: &str = "powerlan.toml";

/// Loads the config and works out which roster file to use.
async fn resolve_paths(cli: &Cli) -> eyre::Result<(PowerlanConfig, PathBuf)> {
    let config_path = match cli.config {
        Some(ref path) => Some(path.clone()),
        None if Path::new(DEFAULT_CONFIG).is_file() => Some(PathBuf::from(DEFAULT_CONFIG)),
        None => None,
    };
    let config = match config_path {
        Some(ref path) => load(path).await?,
        None => PowerlanConfig::default(),
    };
    let roster_path = match (&cli.roster, &config_path) {
        (&Some(ref roster), _) => roster.clone(),
        (&None, &Some(ref config_path)) => resolve_config_relative_path(config_path, &config.roster),
        (&None, &None) => PathBuf::from(&config.roster),
    };
    Ok((config, roster_path))
}

fn neighbors(config: &PowerlanConfig) -> SystemNeighbors {
    SystemNeighbors::new(
        config.commands.neighbor_dump.clone(),
        config.timeouts.neighbor_dump(),
    )
}

/// Executes one CLI invocation.
///
/// # Errors
///
/// Returns an error for unreadable config or roster files, invalid input, or a
/// failure to save the roster. Per-host failures are reported as statuses instead.
pub async fn run(cli: Cli) -> eyre::Result<()> {
    let (config, roster_path) = resolve_paths(&cli).await?;
    let mut roster = Roster::load(&roster_path).await?;
    info!(path = ?roster_path, hosts = roster.len(), "Roster loaded");

    match cli.command {
        Command::List => print_roster(&roster),
        Command::Add(args) => {
            let index = add_host(args, &mut roster, &config).await?;
            roster.save(&roster_path).await?;
            println!("added host {index}");
        }
        Command::Edit(EditArgs {
            index,
            ip,
            user,
            secret,
        }) => {
            let edit = HostEdit {
                ip,
                username: user,
                secret: secret.map(SecretString::from),
            };
            let host = roster.edit(index, edit)?;
            println!("updated host {index}: {}", host.ip);
            roster.save(&roster_path).await?;
        }
        Command::Remove { indices } => {
            let removed = roster.remove(&indices)?;
            roster.save(&roster_path).await?;
            println!("removed {} host(s)", removed.len());
        }
        Command::Clear => {
            roster.clear();
            roster.save(&roster_path).await?;
            println!("roster cleared");
        }
        Command::Wake(args) => {
            let targets = roster.select(&args.selection())?;
            let sender = BroadcastWake::new(config.wol.target());
            let (sink, rx) = channel();
            let wake = async move { power_on(&targets, &sender, &sink).await };
            let (sent, ()) = tokio::join!(wake, apply_updates(rx, &mut roster, print_update));
            info!(sent, "Power-on finished");
            print_roster(&roster);
        }
        Command::Shutdown(args) => {
            let targets = roster.select(&args.selection())?;
            let settings = Arc::new(PipelineSettings::new(&config.timeouts, &config.commands));
            let (sink, rx) = channel();
            let shutdown = power_off(
                targets,
                Arc::new(PingProbe),
                Arc::new(ShellRunner),
                settings,
                sink,
            );
            let (finished, ()) =
                tokio::join!(shutdown, apply_updates(rx, &mut roster, print_update));
            let done = finished
                .iter()
                .filter(|&&(_, state)| state == PipelineState::Dispatched)
                .count();
            info!(done, total = finished.len(), "Shutdown finished");
            print_roster(&roster);
        }
        Command::Refresh => {
            let updated = refresh(&mut roster, &neighbors(&config)).await;
            roster.save(&roster_path).await?;
            println!("refresh complete, updated {updated} IP address(es)");
        }
        Command::Resolve { ip } => {
            validate_ip(&ip)?;
            match resolve_single(
                &ip,
                &PingProbe,
                &neighbors(&config),
                config.timeouts.resolve_probe(),
            )
            .await
            {
                Some(mac) => println!("{mac}"),
                None => println!("unknown"),
            }
        }
    }
    Ok(())
}

/// Adds a host, resolving its MAC from the neighbor table when none was given.
/// Returns the new index.
async fn add_host(args: AddArgs, roster: &mut Roster, config: &PowerlanConfig) -> eyre::Result<usize> {
    let AddArgs {
        ip,
        mac,
        user,
        secret,
    } = args;
    validate_ip(&ip)?;
    let mac = match mac.filter(|m| !m.trim().is_empty()) {
        Some(mac) => mac,
        None => match resolve_single(
            &ip,
            &PingProbe,
            &neighbors(config),
            config.timeouts.resolve_probe(),
        )
        .await
        {
            Some(mac) => {
                println!("resolved MAC address {mac}");
                mac.to_string()
            }
            None => {
                println!("could not resolve the MAC address of {ip}; it cannot be powered on");
                String::new()
            }
        },
    };
    roster.push(HostRecord::new(ip, mac, user, SecretString::from(secret))?);
    Ok(roster.len() - 1)
}

fn print_update(index: usize, host: &HostRecord) {
    println!("[{index}] {:<15} {}", host.ip, host.status);
}

fn print_roster(roster: &Roster) {
    if roster.is_empty() {
        println!("roster is empty");
        return;
    }
    println!("{:>3}  {:<15}  {:<17}  {:<12}  STATUS", "#", "IP", "MAC", "USER");
    for (index, host) in roster.iter().enumerate() {
        let mac = if host.mac.is_empty() { "-" } else { host.mac.as_str() };
        let user = if host.username.is_empty() {
            "-"
        } else {
            host.username.as_str()
        };
        println!(
            "{index:>3}  {:<15}  {mac:<17}  {user:<12}  {}",
            host.ip, host.status
        );
    }
}
