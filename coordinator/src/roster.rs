//! The managed list of hosts and its CSV persistence.
//!
//! Each line of the roster file is `ip,mac,username,secret`. Records are
//! identified only by their position in the list.

use core::net::Ipv4Addr;
use std::path::Path;

use eyre::WrapErr as _;
use secrecy::{ExposeSecret as _, SecretString};
use thiserror::Error as ThisError;
use tokio::fs;
use tracing::{debug, warn};

use powerlan_common::{HostStatus, is_valid_mac};

use crate::app::StatusUpdate;

/// Rejections of caller-supplied addresses or selections, raised before any operation starts.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ValidationError {
    #[error("invalid IP address {0:?}")]
    InvalidIp(String),
    #[error("invalid MAC address {0:?}")]
    InvalidMac(String),
    #[error("no host at index {0}")]
    NoSuchHost(usize),
    #[error("no hosts selected")]
    EmptySelection,
    #[error("{0} must not contain commas or line breaks")]
    UnstorableField(&'static str),
}

/// Characters the roster file cannot carry inside a field.
const FIELD_BREAKERS: [char; 3] = [',', '\n', '\r'];

/// One managed machine.
#[derive(Debug, Clone)]
pub struct HostRecord {
    pub ip: String,
    /// May be empty; hosts without a MAC cannot be woken.
    pub mac: String,
    /// May be empty; the credential check is skipped then.
    pub username: String,
    pub secret: SecretString,
    pub status: HostStatus,
}

impl HostRecord {
    /// Creates a record after checking the address fields.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if `ip` is not a dotted quad, a non-empty `mac` is
    /// malformed, or `username` or `secret` could not be stored in the roster file.
    pub fn new(
        ip: impl Into<String>,
        mac: impl Into<String>,
        username: impl Into<String>,
        secret: SecretString,
    ) -> Result<Self, ValidationError> {
        let record = Self {
            ip: ip.into(),
            mac: mac.into(),
            username: username.into(),
            secret,
            status: HostStatus::Unknown,
        };
        record.validate()?;
        Ok(record)
    }

    /// Checks the invariants on every field. `ip` and `mac` are not cross-checked.
    ///
    /// # Errors
    ///
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_ip(&self.ip)?;
        if !self.mac.is_empty() && !is_valid_mac(&self.mac) {
            return Err(ValidationError::InvalidMac(self.mac.clone()));
        }
        if self.username.contains(FIELD_BREAKERS) {
            return Err(ValidationError::UnstorableField("username"));
        }
        if self.secret.expose_secret().contains(FIELD_BREAKERS) {
            return Err(ValidationError::UnstorableField("secret"));
        }
        Ok(())
    }

    fn from_csv_line(line: &str) -> Option<Result<Self, ValidationError>> {
        let fields: Vec<&str> = line.split(',').collect();
        let [ip, mac, username, secret] = *fields.as_slice() else {
            return None;
        };
        Some(Self::new(ip, mac, username, SecretString::from(secret)))
    }

    fn to_csv_line(&self) -> String {
        [
            self.ip.as_str(),
            self.mac.as_str(),
            self.username.as_str(),
            self.secret.expose_secret(),
        ]
        .join(",")
    }
}

/// Checks that `ip` is a dotted-quad IPv4 address.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidIp`] otherwise.
pub fn validate_ip(ip: &str) -> Result<Ipv4Addr, ValidationError> {
    ip.parse()
        .map_err(|_| ValidationError::InvalidIp(ip.to_owned()))
}

/// Field changes for one record. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct HostEdit {
    pub ip: Option<String>,
    pub username: Option<String>,
    pub secret: Option<SecretString>,
}

/// Which roster entries an operation applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Indices(Vec<usize>),
}

/// Read-only snapshot of one record handed to a power operation.
#[derive(Debug, Clone)]
pub struct HostTarget {
    pub index: usize,
    pub ip: String,
    pub mac: String,
    pub username: String,
    pub secret: SecretString,
}

/// The ordered list of managed hosts.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    hosts: Vec<HostRecord>,
}

impl Roster {
    #[must_use]
    pub const fn new(hosts: Vec<HostRecord>) -> Self {
        Self { hosts }
    }

    /// Parses roster file content. Blank lines, lines without exactly four fields
    /// and invalid records are skipped.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut hosts = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match HostRecord::from_csv_line(line) {
                Some(Ok(record)) => hosts.push(record),
                Some(Err(e)) => warn!(line = line_no + 1, "Skipping roster entry: {e}"),
                None => debug!(line = line_no + 1, "Skipping malformed roster line"),
            }
        }
        Self { hosts }
    }

    /// Loads the roster from `path`. A missing file yields an empty roster.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub async fn load(path: &Path) -> eyre::Result<Self> {
        if !fs::try_exists(path).await.unwrap_or(false) {
            debug!(?path, "No roster file yet");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .await
            .wrap_err(format!("Failed to read roster at: {}", path.display()))?;
        Ok(Self::parse(&content))
    }

    /// Serializes the roster to its CSV form. Status is not persisted.
    #[must_use]
    pub fn to_csv(&self) -> String {
        self.hosts
            .iter()
            .map(|host| host.to_csv_line() + "\n")
            .collect()
    }

    /// Writes the roster to `path`, creating the parent directory if needed.
    ///
    /// On unix the file is restricted to its owner, since it holds credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn save(&self, path: &Path) -> eyre::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .wrap_err(format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(path, self.to_csv())
            .await
            .wrap_err(format!("Failed to write roster at: {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::fs::Permissions;
            use std::os::unix::fs::PermissionsExt as _;
            fs::set_permissions(path, Permissions::from_mode(0o600))
                .await
                .wrap_err(format!("Failed to restrict permissions of: {}", path.display()))?;
        }
        Ok(())
    }

    pub fn push(&mut self, record: HostRecord) {
        self.hosts.push(record);
    }

    /// Removes the entries at `indices` and returns them.
    ///
    /// # Errors
    ///
    /// Fails without removing anything if any index is out of range.
    pub fn remove(&mut self, indices: &[usize]) -> Result<Vec<HostRecord>, ValidationError> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.hosts.len()) {
            return Err(ValidationError::NoSuchHost(bad));
        }
        let mut sorted = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        Ok(sorted
            .into_iter()
            .rev()
            .map(|i| self.hosts.remove(i))
            .collect())
    }

    /// Changes the record at `index` and returns it.
    ///
    /// # Errors
    ///
    /// Fails without changing anything if the index is unknown or the edited
    /// record would be invalid.
    pub fn edit(&mut self, index: usize, edit: HostEdit) -> Result<&HostRecord, ValidationError> {
        let host = self
            .hosts
            .get_mut(index)
            .ok_or(ValidationError::NoSuchHost(index))?;
        let mut edited = host.clone();
        if let Some(ip) = edit.ip {
            edited.ip = ip;
        }
        if let Some(username) = edit.username {
            edited.username = username;
        }
        if let Some(secret) = edit.secret {
            edited.secret = secret;
        }
        edited.validate()?;
        *host = edited;
        Ok(host)
    }

    pub fn clear(&mut self) {
        self.hosts.clear();
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&HostRecord> {
        self.hosts.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HostRecord> {
        self.hosts.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut HostRecord> {
        self.hosts.iter_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Applies a status update. Returns the updated record, or `None` for a stale index.
    pub fn apply(&mut self, update: StatusUpdate) -> Option<&HostRecord> {
        let host = self.hosts.get_mut(update.index)?;
        host.status = update.status;
        Some(host)
    }

    /// Snapshots the selected records for a power operation.
    ///
    /// All selected records are validated up front, so an invalid entry rejects
    /// the whole request before any host is contacted.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for an empty selection, an unknown index or an invalid record.
    pub fn select(&self, selection: &Selection) -> Result<Vec<HostTarget>, ValidationError> {
        let indices: Vec<usize> = match *selection {
            Selection::All => (0..self.hosts.len()).collect(),
            Selection::Indices(ref indices) => indices.clone(),
        };
        if indices.is_empty() {
            return Err(ValidationError::EmptySelection);
        }
        indices
            .into_iter()
            .map(|index| {
                let host = self
                    .hosts
                    .get(index)
                    .ok_or(ValidationError::NoSuchHost(index))?;
                host.validate()?;
                Ok(HostTarget {
                    index,
                    ip: host.ip.clone(),
                    mac: host.mac.clone(),
                    username: host.username.clone(),
                    secret: host.secret.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use secrecy::ExposeSecret as _;

    use super::*;

    fn record(ip: &str, mac: &str) -> HostRecord {
        HostRecord::new(ip, mac, "", SecretString::from("")).unwrap()
    }

    #[test]
    fn parse_skips_malformed_lines() {
        let content = "\
10.0.0.1,aa:bb:cc:dd:ee:ff,admin,hunter2

10.0.0.2,,,
only,two
10.0.0.5,,ops
1.2.3.4,5,6,7,8
300.0.0.1,,,
10.0.0.4,not-a-mac,,
10.0.0.3,,ops,
";
        let roster = Roster::parse(content);
        let ips: Vec<&str> = roster.iter().map(|h| h.ip.as_str()).collect();
        assert_eq!(ips, ["10.0.0.1", "10.0.0.2", "10.0.0.3"]);

        let first = roster.get(0).unwrap();
        assert_eq!(first.mac, "aa:bb:cc:dd:ee:ff");
        assert_eq!(first.username, "admin");
        assert_eq!(first.secret.expose_secret(), "hunter2");
        assert_eq!(first.status, HostStatus::Unknown);

        let third = roster.get(2).unwrap();
        assert_eq!(third.username, "ops");
        assert_eq!(third.secret.expose_secret(), "");
    }

    #[test]
    fn csv_keeps_field_order() {
        let mut roster = Roster::default();
        roster.push(
            HostRecord::new("10.0.0.9", "AABBCCDDEEFF", "root", SecretString::from("pw"))
                .unwrap(),
        );
        roster.push(record("10.0.0.10", ""));
        assert_eq!(roster.to_csv(), "10.0.0.9,AABBCCDDEEFF,root,pw\n10.0.0.10,,,\n");
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = env::temp_dir().join("powerlan_roster_test").join("nested");
        let path = dir.join("computers.csv");
        drop(std::fs::remove_file(&path));

        let mut roster = Roster::default();
        roster.push(
            HostRecord::new("192.168.0.2", "00-11-22-33-44-55", "u", SecretString::from("s"))
                .unwrap(),
        );
        roster.save(&path).await.unwrap();

        let loaded = Roster::load(&path).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.to_csv(), roster.to_csv());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt as _;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn missing_file_is_empty_roster() {
        let path = env::temp_dir().join("powerlan_no_such_roster.csv");
        let roster = Roster::load(&path).await.unwrap();
        assert!(roster.is_empty());
    }

    #[test]
    fn new_rejects_bad_addresses() {
        assert_eq!(
            HostRecord::new("10.0.0", "", "", SecretString::from("")).unwrap_err(),
            ValidationError::InvalidIp("10.0.0".to_owned())
        );
        assert_eq!(
            HostRecord::new("10.0.0.1", "aa:bb", "", SecretString::from("")).unwrap_err(),
            ValidationError::InvalidMac("aa:bb".to_owned())
        );
    }

    #[test]
    fn new_rejects_fields_the_file_cannot_hold() {
        assert_eq!(
            HostRecord::new("10.0.0.1", "", "admin", SecretString::from("pa,ss")).unwrap_err(),
            ValidationError::UnstorableField("secret")
        );
        assert_eq!(
            HostRecord::new("10.0.0.1", "", "ad\nmin", SecretString::from("")).unwrap_err(),
            ValidationError::UnstorableField("username")
        );
        assert_eq!(
            HostRecord::new("10.0.0.1", "", "a,b", SecretString::from("")).unwrap_err(),
            ValidationError::UnstorableField("username")
        );
    }

    #[tokio::test]
    async fn every_accepted_record_survives_a_reload() {
        let path = env::temp_dir().join("powerlan_roster_reload_test.csv");
        let mut roster = Roster::default();
        roster.push(
            HostRecord::new("10.0.0.1", "", "admin", SecretString::from("p;a'ss \"w%rd\""))
                .unwrap(),
        );
        roster.save(&path).await.unwrap();

        let loaded = Roster::load(&path).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded.get(0).unwrap().secret.expose_secret(),
            "p;a'ss \"w%rd\""
        );
        drop(std::fs::remove_file(&path));
    }

    #[test]
    fn remove_is_all_or_nothing() {
        let mut roster = Roster::new(vec![
            record("10.0.0.1", ""),
            record("10.0.0.2", ""),
            record("10.0.0.3", ""),
        ]);
        assert_eq!(roster.remove(&[0, 7]).unwrap_err(), ValidationError::NoSuchHost(7));
        assert_eq!(roster.len(), 3);

        let removed = roster.remove(&[2, 0, 2]).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(roster.get(0).unwrap().ip, "10.0.0.2");
    }

    #[test]
    fn edit_changes_only_given_fields() {
        let mut roster = Roster::new(vec![
            HostRecord::new("10.0.0.1", "aa:bb:cc:dd:ee:ff", "admin", SecretString::from("pw"))
                .unwrap(),
        ]);
        let edited = roster
            .edit(
                0,
                HostEdit {
                    ip: Some("10.0.0.9".to_owned()),
                    ..HostEdit::default()
                },
            )
            .unwrap();
        assert_eq!(edited.ip, "10.0.0.9");
        assert_eq!(edited.mac, "aa:bb:cc:dd:ee:ff");
        assert_eq!(edited.username, "admin");
        assert_eq!(edited.secret.expose_secret(), "pw");

        roster
            .edit(
                0,
                HostEdit {
                    username: Some(String::new()),
                    secret: Some(SecretString::from("")),
                    ..HostEdit::default()
                },
            )
            .unwrap();
        assert_eq!(roster.to_csv(), "10.0.0.9,aa:bb:cc:dd:ee:ff,,\n");
    }

    #[test]
    fn invalid_edit_leaves_record_untouched() {
        let mut roster = Roster::new(vec![record("10.0.0.1", "")]);
        let bad_ip = HostEdit {
            ip: Some("10.0.0.256".to_owned()),
            username: Some("ops".to_owned()),
            ..HostEdit::default()
        };
        assert_eq!(
            roster.edit(0, bad_ip).unwrap_err(),
            ValidationError::InvalidIp("10.0.0.256".to_owned())
        );
        let bad_user = HostEdit {
            username: Some("a,b".to_owned()),
            ..HostEdit::default()
        };
        assert_eq!(
            roster.edit(0, bad_user).unwrap_err(),
            ValidationError::UnstorableField("username")
        );
        assert_eq!(
            roster.edit(3, HostEdit::default()).unwrap_err(),
            ValidationError::NoSuchHost(3)
        );
        assert_eq!(roster.to_csv(), "10.0.0.1,,,\n");
    }

    #[test]
    fn select_validates_before_anything_runs() {
        let mut roster = Roster::new(vec![record("10.0.0.1", ""), record("10.0.0.2", "")]);
        assert_eq!(
            roster.select(&Selection::Indices(vec![])).unwrap_err(),
            ValidationError::EmptySelection
        );
        assert_eq!(
            Roster::default().select(&Selection::All).unwrap_err(),
            ValidationError::EmptySelection
        );
        assert_eq!(
            roster.select(&Selection::Indices(vec![1, 5])).unwrap_err(),
            ValidationError::NoSuchHost(5)
        );

        let targets = roster.select(&Selection::All).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[1].index, 1);
        assert_eq!(targets[1].ip, "10.0.0.2");

        roster.iter_mut().next().unwrap().ip = "not an ip".to_owned();
        assert_eq!(
            roster.select(&Selection::All).unwrap_err(),
            ValidationError::InvalidIp("not an ip".to_owned())
        );
    }

    #[test]
    fn apply_ignores_stale_index() {
        let mut roster = Roster::new(vec![record("10.0.0.1", "")]);
        let updated = roster.apply(StatusUpdate {
            index: 0,
            status: HostStatus::Checking,
        });
        assert_eq!(updated.unwrap().status, HostStatus::Checking);
        assert!(
            roster
                .apply(StatusUpdate {
                    index: 3,
                    status: HostStatus::Checking,
                })
                .is_none()
        );
    }
}
