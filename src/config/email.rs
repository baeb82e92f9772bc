// src/config/email.rs
use anyhow::{anyhow, bail, Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const DEFAULT_EMAIL_CONFIG_PATH: &str = "config/email.toml";
pub const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;

const KEYS: [&str; 5] = [
    "EMAIL_FROM",
    "EMAIL_TO",
    "EMAIL_PASSWORD",
    "EMAIL_SMTP_SERVER",
    "EMAIL_SMTP_PORT",
];
const REQUIRED: [&str; 3] = ["EMAIL_FROM", "EMAIL_TO", "EMAIL_PASSWORD"];

#[derive(Clone)]
pub struct EmailConfig {
    pub from: String,
    pub to: String,
    pub password: String,
    pub smtp_server: String,
    pub smtp_port: u16,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .finish_non_exhaustive()
    }
}

impl EmailConfig {
    /// Environment first; `file` fills whatever is still missing.
    pub fn resolve(file: &Path) -> Result<Self> {
        let mut cfg: BTreeMap<String, String> = BTreeMap::new();
        for key in KEYS {
            if let Ok(v) = std::env::var(key) {
                if !v.trim().is_empty() {
                    cfg.insert(key.to_string(), v);
                }
            }
        }

        if !REQUIRED.iter().all(|k| cfg.contains_key(*k)) {
            if !file.exists() {
                bail!(
                    "email settings incomplete: set EMAIL_FROM / EMAIL_TO / EMAIL_PASSWORD or provide {}",
                    file.display()
                );
            }
            for (k, v) in read_file(file)? {
                cfg.entry(k).or_insert(v);
            }
        }

        Self::from_map(cfg)
    }

    fn from_map(mut cfg: BTreeMap<String, String>) -> Result<Self> {
        let mut take = |k: &str| cfg.remove(k);
        let (Some(from), Some(to), Some(raw_password)) =
            (take("EMAIL_FROM"), take("EMAIL_TO"), take("EMAIL_PASSWORD"))
        else {
            bail!("EMAIL_FROM / EMAIL_TO / EMAIL_PASSWORD not set in environment or email config");
        };
        let smtp_server = take("EMAIL_SMTP_SERVER").unwrap_or_else(|| DEFAULT_SMTP_SERVER.to_string());
        let smtp_port = match take("EMAIL_SMTP_PORT") {
            Some(p) => p
                .trim()
                .parse::<u16>()
                .map_err(|_| anyhow!("EMAIL_SMTP_PORT is not a port number: {p:?}"))?,
            None => DEFAULT_SMTP_PORT,
        };

        // app passwords are often pasted in 4-char groups
        let password: String = raw_password.split_whitespace().collect();
        let from = from.trim().to_string();

        if !from.is_ascii() || !password.is_ascii() {
            bail!(
                "EMAIL_FROM or EMAIL_PASSWORD contains non-ASCII characters (smart quotes, full-width spaces?); current EMAIL_FROM={from:?}"
            );
        }

        Ok(Self {
            from,
            to: to.trim().to_string(),
            password,
            smtp_server: smtp_server.trim().to_string(),
            smtp_port,
        })
    }
}

fn read_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let table: toml::Table = toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    Ok(table
        .into_iter()
        .filter_map(|(k, v)| {
            let s = match v {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                _ => return None,
            };
            Some((k.to_ascii_uppercase(), s))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn clear_env() {
        for k in KEYS {
            env::remove_var(k);
        }
    }

    #[serial_test::serial]
    #[test]
    fn env_wins_and_file_fills_gaps() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("email.toml");
        fs::write(
            &p,
            "EMAIL_FROM = \"file@example.com\"\nEMAIL_TO = \"me@example.com\"\nEMAIL_PASSWORD = \"abcd efgh ijkl mnop\"\nEMAIL_SMTP_PORT = 465\n",
        )
        .unwrap();
        env::set_var("EMAIL_FROM", "env@example.com");

        let cfg = EmailConfig::resolve(&p).unwrap();
        assert_eq!(cfg.from, "env@example.com");
        assert_eq!(cfg.to, "me@example.com");
        assert_eq!(cfg.password, "abcdefghijklmnop");
        assert_eq!(cfg.smtp_port, 465);
        assert_eq!(cfg.smtp_server, DEFAULT_SMTP_SERVER);
        assert!(!format!("{cfg:?}").contains("abcdefgh"));
        clear_env();
    }

    #[serial_test::serial]
    #[test]
    fn missing_everything_is_an_error() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        assert!(EmailConfig::resolve(&dir.path().join("nope.toml")).is_err());
    }

    #[serial_test::serial]
    #[test]
    fn non_ascii_sender_is_rejected() {
        clear_env();
        env::set_var("EMAIL_FROM", "\u{201C}me@example.com\u{201D}");
        env::set_var("EMAIL_TO", "me@example.com");
        env::set_var("EMAIL_PASSWORD", "x");
        let dir = tempfile::tempdir().unwrap();
        assert!(EmailConfig::resolve(&dir.path().join("nope.toml")).is_err());
        clear_env();
    }
}
