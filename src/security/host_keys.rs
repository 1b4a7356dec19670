//! Host key settings and the missing-host-key policy.
//!
//! # Responsibilities
//! - Locate and parse the gateway's and the system's known_hosts files
//! - Resolve the configured policy and check it is usable
//! - Decide whether a connection to an unknown host may proceed

use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::GatewayOptions;
use crate::error::{GatewayError, Result};

/// What to do when the remote host is not in any known_hosts file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKeyPolicy {
    /// Refuse the connection.
    Reject,
    /// Accept the host and log it at info level. Keys are not recorded by
    /// the gateway, which only relays bytes.
    AutoAdd,
    /// Accept and log a warning.
    Warning,
}

impl FromStr for HostKeyPolicy {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "autoadd" => Ok(Self::AutoAdd),
            "warning" => Ok(Self::Warning),
            other => Err(GatewayError::Config(format!("unknown policy {other:?}"))),
        }
    }
}

impl fmt::Display for HostKeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Reject => "reject",
            Self::AutoAdd => "autoadd",
            Self::Warning => "warning",
        })
    }
}

/// One known_hosts line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownHost {
    /// Host patterns, as written (`host`, `[host]:port` or hashed).
    pub hosts: Vec<String>,
    pub key_type: String,
    pub key: String,
}

impl KnownHost {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let mut fields = line.split_whitespace().peekable();
        if fields.peek().is_some_and(|f| f.starts_with('@')) {
            fields.next();
        }
        let hosts = fields.next()?.split(',').map(str::to_string).collect();
        let key_type = fields.next()?.to_string();
        let key = fields.next()?.to_string();
        Some(Self {
            hosts,
            key_type,
            key,
        })
    }

    fn matches(&self, hostname: &str, port: u16) -> bool {
        let wanted = if port == 22 {
            hostname.to_lowercase()
        } else {
            format!("[{}]:{}", hostname.to_lowercase(), port)
        };
        self.hosts.iter().any(|h| h.to_lowercase() == wanted)
    }
}

/// Known hosts available to the gateway.
#[derive(Debug, Clone, Default)]
pub struct HostKeySettings {
    pub host_keys_path: PathBuf,
    pub host_keys: Vec<KnownHost>,
    pub system_host_keys_path: PathBuf,
    pub system_host_keys: Vec<KnownHost>,
}

impl HostKeySettings {
    pub fn is_empty(&self) -> bool {
        self.host_keys.is_empty() && self.system_host_keys.is_empty()
    }

    /// Find the entry for `hostname:port` in either file.
    pub fn lookup(&self, hostname: &str, port: u16) -> Option<&KnownHost> {
        self.host_keys
            .iter()
            .chain(self.system_host_keys.iter())
            .find(|known| known.matches(hostname, port))
    }
}

fn load_known_hosts(path: &Path) -> Result<Vec<KnownHost>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)?;
    Ok(content.lines().filter_map(KnownHost::parse).collect())
}

/// Resolve the known_hosts files named in `options`.
pub fn get_host_keys_settings(options: &GatewayOptions) -> Result<HostKeySettings> {
    let host_keys_path = if options.hostfile.is_empty() {
        PathBuf::from("known_hosts")
    } else {
        PathBuf::from(&options.hostfile)
    };
    let system_host_keys_path = if options.syshostfile.is_empty() {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".ssh").join("known_hosts"))
            .unwrap_or_default()
    } else {
        PathBuf::from(&options.syshostfile)
    };

    let host_keys = load_known_hosts(&host_keys_path)?;
    let system_host_keys = if system_host_keys_path.as_os_str().is_empty() {
        Vec::new()
    } else {
        load_known_hosts(&system_host_keys_path)?
    };

    tracing::debug!(
        host_keys = host_keys.len(),
        system_host_keys = system_host_keys.len(),
        "Host keys loaded"
    );

    Ok(HostKeySettings {
        host_keys_path,
        host_keys,
        system_host_keys_path,
        system_host_keys,
    })
}

/// Resolve the configured policy and check it can work with `settings`.
pub fn get_policy_setting(options: &GatewayOptions, settings: &HostKeySettings) -> Result<HostKeyPolicy> {
    let policy: HostKeyPolicy = options.policy.parse()?;
    tracing::info!(policy = %policy, "Host key policy");
    check_policy_setting(policy, settings)?;
    Ok(policy)
}

fn check_policy_setting(policy: HostKeyPolicy, settings: &HostKeySettings) -> Result<()> {
    match policy {
        HostKeyPolicy::Reject if settings.is_empty() => Err(GatewayError::Config(
            "reject policy could not be used without host keys".into(),
        )),
        HostKeyPolicy::AutoAdd => OpenOptions::new()
            .create(true)
            .append(true)
            .open(&settings.host_keys_path)
            .map(|_| ())
            .map_err(|e| {
                GatewayError::Config(format!(
                    "host keys file {} is not writable: {e}",
                    settings.host_keys_path.display()
                ))
            }),
        _ => Ok(()),
    }
}

impl HostKeyPolicy {
    /// Decide whether a connection to `hostname:port` may proceed.
    pub fn admit(&self, settings: &HostKeySettings, hostname: &str, port: u16) -> Result<()> {
        if settings.lookup(hostname, port).is_some() {
            return Ok(());
        }
        match self {
            Self::Reject => Err(GatewayError::Forbidden(format!(
                "host {hostname}:{port} is not a known host"
            ))),
            Self::AutoAdd => {
                tracing::info!(hostname, port, "Unknown host accepted by autoadd policy");
                Ok(())
            }
            Self::Warning => {
                tracing::warn!(hostname, port, "Connecting to unknown host");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN_HOSTS: &str = "\
# comment line
bastion,10.0.0.5 ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIBastion
[db.internal]:2222 ecdsa-sha2-nistp256 AAAAE2VjZHNhDb
@cert-authority *.corp ssh-rsa AAAAB3NzaCA

broken-line
";

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("webssh-{}-{}", name, std::process::id()));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn parses_known_hosts_lines() {
        let hosts: Vec<KnownHost> = KNOWN_HOSTS.lines().filter_map(KnownHost::parse).collect();
        assert_eq!(hosts.len(), 3);
        assert_eq!(hosts[0].hosts, ["bastion", "10.0.0.5"]);
        assert_eq!(hosts[2].key_type, "ssh-rsa");
    }

    #[test]
    fn lookup_honours_non_default_ports() {
        let settings = HostKeySettings {
            host_keys: KNOWN_HOSTS.lines().filter_map(KnownHost::parse).collect(),
            ..Default::default()
        };
        assert!(settings.lookup("BASTION", 22).is_some());
        assert!(settings.lookup("db.internal", 2222).is_some());
        assert!(settings.lookup("db.internal", 22).is_none());
    }

    #[test]
    fn policy_names() {
        assert_eq!("AutoAdd".parse::<HostKeyPolicy>().unwrap(), HostKeyPolicy::AutoAdd);
        assert!("trust-me".parse::<HostKeyPolicy>().is_err());
    }

    #[test]
    fn reject_requires_host_keys() {
        let options = GatewayOptions {
            policy: "reject".into(),
            ..Default::default()
        };
        let empty = HostKeySettings::default();
        assert!(get_policy_setting(&options, &empty).is_err());

        let path = temp_file("reject-known-hosts", KNOWN_HOSTS);
        let options = GatewayOptions {
            policy: "reject".into(),
            hostfile: path.display().to_string(),
            syshostfile: "/nonexistent/known_hosts".into(),
            ..Default::default()
        };
        let settings = get_host_keys_settings(&options).unwrap();
        assert_eq!(get_policy_setting(&options, &settings).unwrap(), HostKeyPolicy::Reject);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn autoadd_requires_writable_host_keys_file() {
        let settings = HostKeySettings {
            host_keys_path: PathBuf::from("/nonexistent-dir/known_hosts"),
            ..Default::default()
        };
        assert!(check_policy_setting(HostKeyPolicy::AutoAdd, &settings).is_err());
    }

    #[test]
    fn admit_applies_policy_to_unknown_hosts() {
        let settings = HostKeySettings {
            host_keys: KNOWN_HOSTS.lines().filter_map(KnownHost::parse).collect(),
            ..Default::default()
        };
        assert!(HostKeyPolicy::Reject.admit(&settings, "bastion", 22).is_ok());
        assert!(matches!(
            HostKeyPolicy::Reject.admit(&settings, "stranger", 22),
            Err(GatewayError::Forbidden(_))
        ));
        assert!(HostKeyPolicy::Warning.admit(&settings, "stranger", 22).is_ok());
        assert!(HostKeyPolicy::AutoAdd.admit(&settings, "stranger", 22).is_ok());
        assert!(settings.lookup("stranger", 22).is_none());
    }
}
