use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

pub const RC_ENV_VAR: &str =
  "TIMELINERC";
pub const API_URL_ENV_VAR: &str =
  "TIMELINE_API_URL";
pub const DEFAULT_API_URL: &str =
  "http://localhost:8000";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    for (key, value) in [
      ("api.timeout", "30"),
      ("data.location", "~/.timeline"),
      ("layout.month_width", "90"),
      ("layout.row_height", "54"),
      ("render.column_width", "15"),
      ("render.sidebar_width", "28"),
      ("color", "on"),
      ("default.command", "show"),
      ("add.group", "Professions")
    ] {
      map.insert(
        key.to_string(),
        value.to_string()
      );
    }

    let api_url =
      std::env::var(API_URL_ENV_VAR)
        .ok()
        .filter(|raw| {
          !raw.trim().is_empty()
        })
        .unwrap_or_else(|| {
          DEFAULT_API_URL.to_string()
        });
    map.insert(
      "api.url".to_string(),
      api_url
    );

    Config {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rc =
      resolve_rc_path(rc_override)?;
    if let Some(path) = rc {
      info!(timelinerc = %path.display(), "loading timelinerc");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no timelinerc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_f64(
    &self,
    key: &str
  ) -> anyhow::Result<Option<f64>> {
    let Some(raw) = self.map.get(key)
    else {
      return Ok(None);
    };
    let value: f64 = raw
      .trim()
      .parse()
      .with_context(|| {
        format!(
          "config key {key} is not a \
           number: {raw}"
        )
      })?;
    Ok(Some(value))
  }

  pub fn get_u64(
    &self,
    key: &str
  ) -> anyhow::Result<Option<u64>> {
    let Some(raw) = self.map.get(key)
    else {
      return Ok(None);
    };
    let value: u64 = raw
      .trim()
      .parse()
      .with_context(|| {
        format!(
          "config key {key} is not a \
           whole number: {raw}"
        )
      })?;
    Ok(Some(value))
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;
    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(Path::to_path_buf)
      .unwrap_or_default();

    for (idx, raw_line) in
      text.lines().enumerate()
    {
      let parsed = parse_rc_line(
        raw_line
      )
      .with_context(|| {
        format!(
          "{}:{}",
          path.display(),
          idx + 1
        )
      })?;

      match parsed {
        | RcLine::Blank => {}
        | RcLine::Setting(key, value) => {
          trace!(%key, %value, "rc setting");
          self.map.insert(key, value);
        }
        | RcLine::Include(raw) => {
          let target = resolve_include_path(
            &base_dir, &raw
          )?;
          if self
            .loaded_files
            .contains(&target)
          {
            warn!(include = %target.display(), "include already loaded; skipping");
          } else if target.exists() {
            self.load_file(&target)?;
          } else {
            warn!(include = %target.display(), "include file does not exist; skipping");
          }
        }
      }
    }

    Ok(())
  }
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(path) =
    override_dir
  {
    path.to_path_buf()
  } else if let Some(cfg_value) =
    cfg.get("data.location")
  {
    expand_tilde(Path::new(&cfg_value))
  } else {
    default_data_dir()?
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV_VAR)
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping \
       ~/.timelinerc"
    );
    return Ok(None);
  };
  let candidate =
    home.join(".timelinerc");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn default_data_dir()
-> anyhow::Result<PathBuf> {
  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  Ok(home.join(".timeline"))
}

#[derive(Debug, PartialEq, Eq)]
enum RcLine {
  Blank,
  Include(String),
  Setting(String, String)
}

/// One rc line: `key = value`,
/// `include <path>`, or nothing once
/// `#` comments are stripped.
fn parse_rc_line(
  raw: &str
) -> anyhow::Result<RcLine> {
  let line = raw
    .split_once('#')
    .map_or(raw, |(before, _)| before)
    .trim();
  if line.is_empty() {
    return Ok(RcLine::Blank);
  }

  if let Some(rest) =
    line.strip_prefix("include ")
  {
    return Ok(RcLine::Include(
      rest.trim().to_string()
    ));
  }

  let (key, value) = line
    .split_once('=')
    .ok_or_else(|| {
      anyhow!(
        "expected `key = value` or \
         `include <path>`, got: {raw}"
      )
    })?;
  let key = key.trim();
  if key.is_empty() {
    return Err(anyhow!(
      "missing key before `=`"
    ));
  }
  Ok(RcLine::Setting(
    key.to_string(),
    value.trim().to_string()
  ))
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}
