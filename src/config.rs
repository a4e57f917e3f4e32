use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub(crate) const DEFAULT_API_URL: &str = "https://api.weatherxm.com/api/v1";
pub(crate) const DEFAULT_OUTPUT_DIR: &str = "data";
const RC_FILE_NAME: &str = ".wxmrc";

#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Base API URL, typically `https://api.weatherxm.com/api/v1`.
    pub url: String,
    /// Directory receiving one `<station_id>.json` per station.
    pub output_dir: PathBuf,
    /// Whether to verify TLS certificates.
    pub verify: bool,
    /// Whether to draw a progress bar while fetching history.
    pub progress: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_URL.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            verify: true,
            progress: true,
        }
    }
}

impl ExportConfig {
    /// Resolves configuration from environment variables and/or `.wxmrc`.
    ///
    /// This is equivalent to `ExportConfig::new(None, None, None)`.
    pub fn from_env() -> Result<Self> {
        Self::new(None, None, None)
    }

    /// Resolves configuration using (in order of precedence):
    /// - explicit `url`/`output_dir`/`verify` arguments
    /// - environment variables `WXM_API_URL` / `WXM_OUTPUT_DIR` / `WXM_PROGRESS`
    /// - config file from `WXM_RC` or `.wxmrc`
    /// - built-in defaults
    pub fn new(
        url: Option<String>,
        output_dir: Option<PathBuf>,
        verify: Option<bool>,
    ) -> Result<Self> {
        let env = |name: &str| std::env::var(name).ok();
        resolve(url, output_dir, verify, env, &rc_candidates())
    }
}

#[derive(Debug, Default, PartialEq)]
struct RcConfig {
    url: Option<String>,
    output: Option<String>,
    verify: Option<bool>,
    progress: Option<bool>,
}

fn resolve<E>(
    url: Option<String>,
    output_dir: Option<PathBuf>,
    verify: Option<bool>,
    env: E,
    rc_candidates: &[PathBuf],
) -> Result<ExportConfig>
where
    E: Fn(&str) -> Option<String>,
{
    let url = url.or_else(|| env("WXM_API_URL"));
    let output_dir = output_dir.or_else(|| env("WXM_OUTPUT_DIR").map(PathBuf::from));
    let progress = env("WXM_PROGRESS").map(|v| flag(&v));

    let mut rc = RcConfig::default();
    for rc_path in rc_candidates {
        if rc_path.exists() {
            rc = read_rc(rc_path).with_context(|| {
                format!("failed to read configuration file {}", rc_path.display())
            })?;
            tracing::debug!(path = %rc_path.display(), "loaded configuration file");
            break;
        }
    }

    let defaults = ExportConfig::default();
    Ok(ExportConfig {
        url: url.or(rc.url).unwrap_or(defaults.url),
        output_dir: output_dir
            .or_else(|| rc.output.map(PathBuf::from))
            .unwrap_or(defaults.output_dir),
        verify: verify.or(rc.verify).unwrap_or(defaults.verify),
        progress: progress.or(rc.progress).unwrap_or(defaults.progress),
    })
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_rc(&text))
}

fn parse_rc(text: &str) -> RcConfig {
    let mut cfg = RcConfig::default();

    // Support formatting where `url:` is on one line and the value is on the next line.
    let mut pending_key: Option<&str> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(pk) = pending_key.take() {
            // URLs carry a colon, so only a recognised `key:` ends the continuation.
            if !starts_with_key(line) {
                cfg.set(pk, strip_quotes(line));
                continue;
            }
        }

        if let Some((k, v)) = line.split_once(':') {
            let k = k.trim();
            let v = strip_quotes(v.trim());
            if v.is_empty() {
                pending_key = Some(k);
            } else {
                cfg.set(k, v);
            }
        }
    }

    cfg
}

impl RcConfig {
    fn set(&mut self, key: &str, value: &str) {
        match key {
            "url" => self.url = Some(value.to_string()),
            "output" => self.output = Some(value.to_string()),
            "verify" => self.verify = Some(flag(value)),
            "progress" => self.progress = Some(flag(value)),
            _ => {}
        }
    }
}

fn starts_with_key(line: &str) -> bool {
    line.split_once(':')
        .is_some_and(|(k, _)| matches!(k.trim(), "url" | "output" | "verify" | "progress"))
}

fn flag(v: &str) -> bool {
    !matches!(v.trim(), "0" | "false" | "no" | "off")
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

fn rc_candidates() -> Vec<PathBuf> {
    // 1) WXM_RC (explicit)
    // 2) ./.wxmrc
    // 3) ~/.wxmrc
    if let Ok(p) = std::env::var("WXM_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(RC_FILE_NAME));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(RC_FILE_NAME));
    }
    v
}
