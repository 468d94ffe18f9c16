//! Uses the single integration test approach.
//!
//! This improves parallelism when running the tests, and reduces the number of binaries that have to be built (and linked)

mod common;

use common::{Scratch, run_powerlan, stdout};

#[test]
fn wake_without_mac_reports_and_sends_nothing() {
    let scratch = Scratch::new("wake_no_mac");
    scratch.write("computers.csv", "10.0.0.5,,,\n");

    let output = run_powerlan(&scratch.0, &["wake", "--all"]);
    assert!(output.status.success(), "wake failed: {output:?}");
    let out = stdout(&output);
    assert!(
        out.contains("[0] 10.0.0.5") && out.contains("power-on-failed-no-mac"),
        "unexpected output: {out}"
    );
    assert!(!out.contains("power-on-sent"), "unexpected output: {out}");
}

#[test]
fn add_list_remove_round_trip() {
    let scratch = Scratch::new("roster_edit");

    let output = run_powerlan(
        &scratch.0,
        &[
            "add",
            "10.0.0.9",
            "--mac",
            "aa:bb:cc:dd:ee:ff",
            "--user",
            "admin",
            "--secret",
            "hunter2",
        ],
    );
    assert!(output.status.success(), "add failed: {output:?}");
    assert_eq!(
        scratch.read("computers.csv"),
        "10.0.0.9,aa:bb:cc:dd:ee:ff,admin,hunter2\n"
    );

    let listed = stdout(&run_powerlan(&scratch.0, &["list"]));
    assert!(listed.contains("10.0.0.9"), "unexpected list: {listed}");
    assert!(listed.contains("unknown"), "unexpected list: {listed}");
    assert!(!listed.contains("hunter2"), "secret leaked: {listed}");

    let output = run_powerlan(&scratch.0, &["remove", "0"]);
    assert!(output.status.success(), "remove failed: {output:?}");
    assert_eq!(scratch.read("computers.csv"), "");
}

#[test]
fn invalid_input_is_rejected_before_anything_runs() {
    let scratch = Scratch::new("invalid_input");
    scratch.write("computers.csv", "10.0.0.5,,,\n");

    let output = run_powerlan(&scratch.0, &["add", "10.0.0.256", "--mac", "aa:bb:cc:dd:ee:ff"]);
    assert!(!output.status.success(), "bad IP accepted");

    let output = run_powerlan(&scratch.0, &["add", "10.0.0.6", "--mac", "aa:bb:cc"]);
    assert!(!output.status.success(), "bad MAC accepted");

    let output = run_powerlan(&scratch.0, &["shutdown", "3"]);
    assert!(!output.status.success(), "unknown index accepted");
    assert!(!stdout(&output).contains("checking"));

    assert_eq!(scratch.read("computers.csv"), "10.0.0.5,,,\n");
}

#[test]
fn credentials_with_commas_are_refused() {
    let scratch = Scratch::new("comma_secret");
    scratch.write("computers.csv", "10.0.0.5,,,\n");

    let output = run_powerlan(
        &scratch.0,
        &["add", "10.0.0.6", "--mac", "aa:bb:cc:dd:ee:ff", "--user", "admin", "--secret", "a,b"],
    );
    assert!(!output.status.success(), "comma in secret accepted");
    assert_eq!(scratch.read("computers.csv"), "10.0.0.5,,,\n");

    let listed = stdout(&run_powerlan(&scratch.0, &["list"]));
    assert!(listed.contains("10.0.0.5"), "host lost: {listed}");
}

#[test]
fn edit_updates_host_in_place() {
    let scratch = Scratch::new("edit_host");
    scratch.write(
        "computers.csv",
        "10.0.0.5,aa:bb:cc:dd:ee:ff,admin,pw\n10.0.0.6,,,\n",
    );

    let output = run_powerlan(&scratch.0, &["edit", "0", "--ip", "10.0.0.50", "--user", "ops"]);
    assert!(output.status.success(), "edit failed: {output:?}");
    assert_eq!(
        scratch.read("computers.csv"),
        "10.0.0.50,aa:bb:cc:dd:ee:ff,ops,pw\n10.0.0.6,,,\n"
    );

    let output = run_powerlan(&scratch.0, &["edit", "1", "--ip", "10.0.0.600"]);
    assert!(!output.status.success(), "bad IP accepted");
    let output = run_powerlan(&scratch.0, &["edit", "7", "--user", "x"]);
    assert!(!output.status.success(), "unknown index accepted");
    assert_eq!(
        scratch.read("computers.csv"),
        "10.0.0.50,aa:bb:cc:dd:ee:ff,ops,pw\n10.0.0.6,,,\n"
    );
}

#[test]
fn roster_path_follows_config_file() {
    let scratch = Scratch::new("config_roster");
    let config = scratch.write("powerlan.toml", "roster = \"./lab/hosts.csv\"\n");
    scratch.write("computers.csv", "10.9.9.9,,,\n");

    let output = run_powerlan(
        &scratch.0,
        &["--config", config.to_str().unwrap(), "add", "10.1.1.1", "--mac", "001122334455"],
    );
    assert!(output.status.success(), "add failed: {output:?}");
    assert_eq!(scratch.read("lab/hosts.csv"), "10.1.1.1,001122334455,,\n");
    assert_eq!(scratch.read("computers.csv"), "10.9.9.9,,,\n");
}

#[cfg(unix)]
#[test]
fn refresh_updates_stale_ips_from_neighbor_dump() {
    let scratch = Scratch::new("refresh");
    scratch.write(
        "arp.txt",
        "  192.168.1.77   aa-bb-cc-dd-ee-ff   dynamic\n  192.168.1.78   11-22-33-44-55-66   dynamic\n",
    );
    scratch.write("powerlan.toml", "[commands]\nneighbor_dump = \"cat arp.txt\"\n");
    scratch.write(
        "computers.csv",
        "10.0.0.1,AA:BB:CC:DD:EE:FF,admin,pw\n192.168.1.78,11:22:33:44:55:66,,\n10.0.0.3,,,\n",
    );

    let output = run_powerlan(&scratch.0, &["refresh"]);
    assert!(output.status.success(), "refresh failed: {output:?}");
    assert!(
        stdout(&output).contains("updated 1 IP address"),
        "unexpected output: {}",
        stdout(&output)
    );
    assert_eq!(
        scratch.read("computers.csv"),
        "192.168.1.77,AA:BB:CC:DD:EE:FF,admin,pw\n192.168.1.78,11:22:33:44:55:66,,\n10.0.0.3,,,\n"
    );
}

#[cfg(unix)]
#[test]
fn resolve_prints_cached_mac() {
    let scratch = Scratch::new("resolve");
    scratch.write("arp.txt", "127.0.0.1 0a-0b-0c-0d-0e-0f dynamic\n");
    scratch.write("powerlan.toml", "[commands]\nneighbor_dump = \"cat arp.txt\"\n");

    let output = run_powerlan(&scratch.0, &["resolve", "127.0.0.1"]);
    assert!(output.status.success(), "resolve failed: {output:?}");
    assert_eq!(stdout(&output).trim(), "0A:0B:0C:0D:0E:0F");

    let output = run_powerlan(&scratch.0, &["resolve", "127.0.0.2"]);
    assert_eq!(stdout(&output).trim(), "unknown");
}
