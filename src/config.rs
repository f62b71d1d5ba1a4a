use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};

pub(crate) const API_KEY: &str = "API_KEY";
pub(crate) const API_SECRET: &str = "API_SECRET";
const CONFIG_PATH_VAR: &str = "FRAPPE_CLIENT_CONFIG";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// API key/secret pair used for HTTP Basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Loads credentials from `API_KEY` / `API_SECRET`, falling back to a
    /// `settings.ini` or `.env` file.
    ///
    /// Equivalent to `Credentials::load(None, None)`.
    pub fn from_env() -> Result<Self> {
        Self::load(None, None)
    }

    /// Resolves credentials using (in order of precedence):
    /// - explicit `api_key`/`api_secret` arguments
    /// - environment variables `API_KEY` / `API_SECRET`
    /// - the file named by `FRAPPE_CLIENT_CONFIG`, or the first `settings.ini`
    ///   or `.env` found walking up from the current directory, or
    ///   `<config dir>/frappe-client/settings.ini`
    pub fn load(api_key: Option<String>, api_secret: Option<String>) -> Result<Self> {
        load_credentials(
            api_key,
            api_secret,
            |name| std::env::var(name).ok(),
            &config_candidates(),
        )
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Basic token: `base64("<api_key>:<api_secret>")`.
    pub fn token(&self) -> String {
        STANDARD.encode(format!("{}:{}", self.api_key, self.api_secret))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Site URL, e.g. `https://erp.example.com`. `/api/resource/` is appended.
    pub url: String,
    pub credentials: Credentials,
    /// Whether to verify TLS certificates.
    pub verify: bool,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            url: url.into(),
            credentials,
            verify: true,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Builds a config for `url` with credentials from [`Credentials::from_env`].
    pub fn from_env(url: impl Into<String>) -> Result<Self> {
        Ok(Self::new(url, Credentials::from_env()?))
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Dotenv,
    Ini,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct FileConfig {
    api_key: Option<String>,
    api_secret: Option<String>,
}

pub(crate) fn load_credentials<F>(
    api_key: Option<String>,
    api_secret: Option<String>,
    env: F,
    candidates: &[PathBuf],
) -> Result<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    let mut api_key = non_empty(api_key).or_else(|| non_empty(env(API_KEY)));
    let mut api_secret = non_empty(api_secret).or_else(|| non_empty(env(API_SECRET)));

    if api_key.is_none() || api_secret.is_none() {
        if let Some(path) = candidates.iter().find(|p| p.is_file()) {
            debug!(path = %path.display(), "reading credentials file");
            let cfg = read_config_file(path)?;
            if api_key.is_none() {
                api_key = non_empty(cfg.api_key);
            }
            if api_secret.is_none() {
                api_secret = non_empty(cfg.api_secret);
            }
        }
    }

    let api_key = api_key.ok_or_else(|| missing(API_KEY, candidates))?;
    let api_secret = api_secret.ok_or_else(|| missing(API_SECRET, candidates))?;

    Ok(Credentials { api_key, api_secret })
}

fn missing(name: &str, candidates: &[PathBuf]) -> Error {
    if candidates.is_empty() {
        return Error::Config(format!(
            "missing {} (set the {} environment variable)",
            name, name
        ));
    }
    Error::Config(format!(
        "missing {} (set the {} environment variable or add it to one of: {})",
        name,
        name,
        candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    ))
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn read_config_file(path: &Path) -> Result<FileConfig> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;
    Ok(parse_config(&text, file_format(path)))
}

fn file_format(path: &Path) -> FileFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("ini") => FileFormat::Ini,
        _ => FileFormat::Dotenv,
    }
}

fn parse_config(text: &str, format: FileFormat) -> FileConfig {
    let mut cfg = FileConfig::default();
    // `.env` files have no sections; ini files are only read inside [settings].
    let mut in_settings = format == FileFormat::Dotenv;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (k, v) = match format {
            FileFormat::Dotenv => {
                let line = line.strip_prefix("export ").unwrap_or(line);
                match line.split_once('=') {
                    Some(kv) => kv,
                    None => continue,
                }
            }
            FileFormat::Ini => {
                if line.starts_with(';') {
                    continue;
                }
                if line.starts_with('[') && line.ends_with(']') {
                    in_settings = line[1..line.len() - 1].trim() == "settings";
                    continue;
                }
                if !in_settings {
                    continue;
                }
                match split_ini(line) {
                    Some(kv) => kv,
                    None => continue,
                }
            }
        };

        let k = k.trim();
        let v = strip_quotes(v.trim()).to_string();
        let matches = |name: &str| match format {
            FileFormat::Dotenv => k == name,
            FileFormat::Ini => k.eq_ignore_ascii_case(name),
        };

        if matches(API_KEY) {
            cfg.api_key = Some(v);
        } else if matches(API_SECRET) {
            cfg.api_secret = Some(v);
        }
    }

    cfg
}

fn split_ini(line: &str) -> Option<(&str, &str)> {
    // Either delimiter is accepted; the first one on the line wins.
    let idx = line.find(['=', ':'])?;
    Some((&line[..idx], &line[idx + 1..]))
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn config_candidates() -> Vec<PathBuf> {
    if let Ok(p) = std::env::var(CONFIG_PATH_VAR) {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        for dir in cwd.ancestors() {
            v.push(dir.join("settings.ini"));
            v.push(dir.join(".env"));
        }
    }
    if let Some(dir) = dirs::config_dir() {
        v.push(dir.join("frappe-client").join("settings.ini"));
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn token_is_base64_of_key_and_secret() {
        let creds = Credentials::new("abc", "xyz");
        assert_eq!(creds.token(), "YWJjOnh5eg==");
    }

    #[test]
    fn debug_redacts_secret() {
        let creds = Credentials::new("abc", "super-secret");
        let dbg = format!("{creds:?}");
        assert!(dbg.contains("abc"));
        assert!(!dbg.contains("super-secret"));
    }

    #[test]
    fn explicit_values_win_over_env() {
        let creds = load_credentials(
            Some("k1".into()),
            Some("s1".into()),
            env_from(&[(API_KEY, "k2"), (API_SECRET, "s2")]),
            &[],
        )
        .unwrap();
        assert_eq!(creds, Credentials::new("k1", "s1"));
    }

    #[test]
    fn env_used_when_not_explicit() {
        let creds = load_credentials(
            None,
            Some("s1".into()),
            env_from(&[(API_KEY, "k2"), (API_SECRET, "s2")]),
            &[],
        )
        .unwrap();
        assert_eq!(creds, Credentials::new("k2", "s1"));
    }

    #[test]
    fn file_fills_missing_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "# site creds\nexport API_KEY=\"file-key\"\nAPI_SECRET='file-secret'\n")
            .unwrap();

        let creds = load_credentials(
            None,
            None,
            env_from(&[(API_SECRET, "env-secret")]),
            &[dir.path().join("settings.ini"), path],
        )
        .unwrap();
        assert_eq!(creds, Credentials::new("file-key", "env-secret"));
    }

    #[test]
    fn first_existing_candidate_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let ini = dir.path().join("settings.ini");
        let env = dir.path().join(".env");
        std::fs::write(&ini, "[settings]\nAPI_KEY = ini-key\nAPI_SECRET = ini-secret\n").unwrap();
        std::fs::write(&env, "API_KEY=env-key\nAPI_SECRET=env-secret\n").unwrap();

        let creds = load_credentials(None, None, env_from(&[]), &[ini, env]).unwrap();
        assert_eq!(creds, Credentials::new("ini-key", "ini-secret"));
    }

    #[test]
    fn missing_key_is_config_error() {
        let err = load_credentials(None, None, env_from(&[(API_SECRET, "s")]), &[]).unwrap_err();
        match err {
            Error::Config(msg) => assert!(msg.contains("missing API_KEY"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_values_count_as_missing() {
        let err = load_credentials(
            Some("  ".into()),
            None,
            env_from(&[(API_KEY, ""), (API_SECRET, "s")]),
            &[PathBuf::from("/nonexistent/.env")],
        )
        .unwrap_err();
        match err {
            Error::Config(msg) => {
                assert!(msg.contains("missing API_KEY"));
                assert!(msg.contains("/nonexistent/.env"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn ini_only_reads_settings_section() {
        let text = "\
; comment
[other]
API_KEY = wrong

[settings]
api_key: right-key
API_SECRET = 'right-secret'
# trailing comment
";
        let cfg = parse_config(text, FileFormat::Ini);
        assert_eq!(cfg.api_key.as_deref(), Some("right-key"));
        assert_eq!(cfg.api_secret.as_deref(), Some("right-secret"));
    }

    #[test]
    fn dotenv_keys_are_case_sensitive() {
        let cfg = parse_config("api_key=lower\nAPI_SECRET=s=with=equals\n", FileFormat::Dotenv);
        assert_eq!(cfg.api_key, None);
        assert_eq!(cfg.api_secret.as_deref(), Some("s=with=equals"));
    }

    #[test]
    fn config_defaults() {
        let cfg = ClientConfig::new("https://erp.example.com", Credentials::new("k", "s"));
        assert!(cfg.verify);
        assert_eq!(cfg.timeout, Duration::from_secs(60));

        let cfg = cfg.with_verify(false).with_timeout(Duration::from_secs(5));
        assert!(!cfg.verify);
        assert_eq!(cfg.timeout, Duration::from_secs(5));
    }
}
