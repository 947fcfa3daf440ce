//! Startup configuration.
//!
//! Parses the command line into a [`ServerConfig`]: listen port, snapshot
//! location, and the server's role. Passing `--replicaof "<host> <port>"`
//! makes the server a replica of that master; otherwise it is a master.

use std::net::Ipv4Addr;
use std::str::FromStr;

use rand::Rng;
use thiserror::Error;

/// Errors raised while parsing command-line arguments.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum CliError {
    #[error("invalid command line flag")]
    InvalidCommandLineFlag,
    #[error("invalid port flag value")]
    InvalidPortFlagValue,
    #[error("invalid master address")]
    InvalidMasterAddress,
    #[error("invalid master port")]
    InvalidMasterPort,
}

/// The role a server runs in.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ServerRole {
    Master,
    Replica { host: String, port: u16 },
}

impl ServerRole {
    /// The role name used by INFO. Replicas report the historical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerRole::Master => "master",
            ServerRole::Replica { .. } => "slave",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub role: ServerRole,
    /// Directory holding the snapshot file.
    pub dir: String,
    /// Snapshot filename inside `dir`.
    pub dbfilename: String,
}

impl ServerConfig {
    /// Parses command-line arguments, skipping the program name.
    ///
    /// Supported flags: `--port <n>`, `--dir <path>`,
    /// `--dbfilename <name>`, `--replicaof "<host> <port>"`.
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Result<Self, CliError> {
        let mut iter = args.into_iter().skip(1);

        let mut port: Option<u16> = None;
        let mut role: Option<ServerRole> = None;
        let mut dir: Option<String> = None;
        let mut dbfilename: Option<String> = None;

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--port" => {
                    let Some(value) = iter.next() else {
                        return Err(CliError::InvalidCommandLineFlag);
                    };
                    port = Some(validate_port(&value, CliError::InvalidPortFlagValue)?);
                }
                "--replicaof" => {
                    let Some(value) = iter.next() else {
                        return Err(CliError::InvalidCommandLineFlag);
                    };
                    let (host, master_port) = validate_master_address(&value)?;
                    role = Some(ServerRole::Replica {
                        host,
                        port: master_port,
                    });
                }
                "--dir" => {
                    let Some(value) = iter.next() else {
                        return Err(CliError::InvalidCommandLineFlag);
                    };
                    dir = Some(value);
                }
                "--dbfilename" => {
                    let Some(value) = iter.next() else {
                        return Err(CliError::InvalidCommandLineFlag);
                    };
                    dbfilename = Some(value);
                }
                _ => return Err(CliError::InvalidCommandLineFlag),
            }
        }

        Ok(ServerConfig {
            port: port.unwrap_or(6379),
            role: role.unwrap_or(ServerRole::Master),
            dir: dir.unwrap_or_else(|| ".".to_string()),
            dbfilename: dbfilename.unwrap_or_else(|| "dump.rdb".to_string()),
        })
    }
}

/// The alphabet and length of a replication ID: 40 hex characters.
const REPL_ID_ALPHABET: &[u8] = b"0123456789abcdef";
pub const REPL_ID_LEN: usize = 40;

/// Generates a fresh lowercase hex replication ID.
pub fn generate_repl_id() -> String {
    let mut rng = rand::rng();

    (0..REPL_ID_LEN)
        .map(|_| REPL_ID_ALPHABET[rng.random_range(0..REPL_ID_ALPHABET.len())] as char)
        .collect()
}

/// Checks that a replication ID received from a peer has the shape this
/// server generates: [`REPL_ID_LEN`] characters of hex, either case.
pub fn is_repl_id(candidate: &str) -> bool {
    candidate.len() == REPL_ID_LEN && candidate.bytes().all(|b| b.is_ascii_hexdigit())
}

fn validate_port(port: &str, error: CliError) -> Result<u16, CliError> {
    let port = port.parse::<u16>().map_err(|_| error.clone())?;

    if port == 0 {
        return Err(error);
    }

    Ok(port)
}

/// Validates a `"<host> <port>"` master address.
///
/// A host made only of digits and dots must parse as a real IPv4 address;
/// anything else is taken as a hostname and limited to alphanumerics,
/// hyphens, and dots.
fn validate_master_address(master_address: &str) -> Result<(String, u16), CliError> {
    let mut tokens = master_address.split_whitespace();
    let (Some(host), Some(port), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        return Err(CliError::InvalidMasterAddress);
    };

    let dotted_quad = host.chars().all(|c| c.is_ascii_digit() || c == '.');
    let host_ok = if dotted_quad {
        Ipv4Addr::from_str(host).is_ok()
    } else {
        host.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    };

    if !host_ok {
        return Err(CliError::InvalidMasterAddress);
    }

    let port = validate_port(port, CliError::InvalidMasterPort)?;

    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        let mut all = vec!["cinder".to_string()];
        all.extend(parts.iter().map(|p| p.to_string()));
        all
    }

    #[test]
    fn test_validate_port() {
        let test_cases = vec![
            ("7001", Ok(7001)),
            ("1", Ok(1)),
            ("65535", Ok(65535)),
            ("0", Err(CliError::InvalidPortFlagValue)),
            ("90000", Err(CliError::InvalidPortFlagValue)),
            ("seven", Err(CliError::InvalidPortFlagValue)),
            ("7001.0", Err(CliError::InvalidPortFlagValue)),
            (" 7001", Err(CliError::InvalidPortFlagValue)),
            ("", Err(CliError::InvalidPortFlagValue)),
        ];

        for (input, expected) in test_cases {
            assert_eq!(
                validate_port(input, CliError::InvalidPortFlagValue),
                expected,
                "validating port {:?}",
                input
            );
        }
    }

    #[test]
    fn test_validate_master_address() {
        let test_cases = vec![
            ("10.0.0.5 7001", Ok(("10.0.0.5".to_string(), 7001))),
            (
                "cache-01.prod.internal 6379",
                Ok(("cache-01.prod.internal".to_string(), 6379)),
            ),
            ("master 1", Ok(("master".to_string(), 1))),
            // A digits-and-dots host must be a complete IPv4 address.
            ("10.0.0 7001", Err(CliError::InvalidMasterAddress)),
            ("300.1.1.1 7001", Err(CliError::InvalidMasterAddress)),
            ("10..0.5 7001", Err(CliError::InvalidMasterAddress)),
            ("under_score 7001", Err(CliError::InvalidMasterAddress)),
            ("10.0.0.5", Err(CliError::InvalidMasterAddress)),
            ("10.0.0.5 7001 tail", Err(CliError::InvalidMasterAddress)),
            ("", Err(CliError::InvalidMasterAddress)),
            ("master 0", Err(CliError::InvalidMasterPort)),
            ("master 90000", Err(CliError::InvalidMasterPort)),
            ("master seven", Err(CliError::InvalidMasterPort)),
        ];

        for (input, expected) in test_cases {
            assert_eq!(
                validate_master_address(input),
                expected,
                "validating address {:?}",
                input
            );
        }
    }

    #[test]
    fn test_is_repl_id() {
        let generated = generate_repl_id();
        assert!(is_repl_id(&generated));
        // Either hex case is accepted.
        assert!(is_repl_id(&"C0FFEE".repeat(10)[..40]));

        assert!(!is_repl_id(""));
        assert!(!is_repl_id(&"a".repeat(39)));
        assert!(!is_repl_id(&"a".repeat(41)));
        assert!(!is_repl_id(&"g".repeat(40)));
    }

    #[test]
    fn test_config_defaults() {
        let config = ServerConfig::from_args(args(&[])).unwrap();
        assert_eq!(config.port, 6379);
        assert_eq!(config.role, ServerRole::Master);
        assert_eq!(config.dir, ".");
        assert_eq!(config.dbfilename, "dump.rdb");
    }

    #[test]
    fn test_config_success_cases() {
        let test_cases = vec![
            (args(&["--port", "6677"]), 6677, ServerRole::Master),
            (
                args(&["--replicaof", "127.0.0.1 6380"]),
                6379,
                ServerRole::Replica {
                    host: "127.0.0.1".to_string(),
                    port: 6380,
                },
            ),
            (
                args(&["--port", "7000", "--replicaof", "localhost 6381"]),
                7000,
                ServerRole::Replica {
                    host: "localhost".to_string(),
                    port: 6381,
                },
            ),
        ];

        for (input, expected_port, expected_role) in test_cases {
            let config = ServerConfig::from_args(input).unwrap();
            assert_eq!(config.port, expected_port);
            assert_eq!(config.role, expected_role);
        }
    }

    #[test]
    fn test_config_snapshot_flags() {
        let config =
            ServerConfig::from_args(args(&["--dir", "/tmp/data", "--dbfilename", "snap.rdb"]))
                .unwrap();
        assert_eq!(config.dir, "/tmp/data");
        assert_eq!(config.dbfilename, "snap.rdb");
    }

    #[test]
    fn test_config_error_cases() {
        let test_cases = vec![
            (args(&["--port"]), CliError::InvalidCommandLineFlag),
            (args(&["--port", "invalid"]), CliError::InvalidPortFlagValue),
            (args(&["--port", "70000"]), CliError::InvalidPortFlagValue),
            (args(&["unexpected"]), CliError::InvalidCommandLineFlag),
            (args(&["--replicaof"]), CliError::InvalidCommandLineFlag),
            (
                args(&["--replicaof", "invalid"]),
                CliError::InvalidMasterAddress,
            ),
            (
                args(&["--replicaof", "127.0.0.1 invalid"]),
                CliError::InvalidMasterPort,
            ),
            (
                args(&["--replicaof", "127.0.0.1"]),
                CliError::InvalidMasterAddress,
            ),
        ];

        for (input, expected) in test_cases {
            assert_eq!(ServerConfig::from_args(input), Err(expected));
        }
    }
}
