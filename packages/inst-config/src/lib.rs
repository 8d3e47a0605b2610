mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Hierarchy, Postgres, Search, Security, Service, Storage};

use std::{fs, path::Path};

const MAX_EXPAND_CONCURRENCY: u32 = 64;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.search.max_limit == 0 {
		return Err(Error::Validation {
			message: "search.max_limit must be greater than zero.".to_string(),
		});
	}
	if cfg.search.default_limit == 0 {
		return Err(Error::Validation {
			message: "search.default_limit must be greater than zero.".to_string(),
		});
	}
	if cfg.search.default_limit > cfg.search.max_limit {
		return Err(Error::Validation {
			message: "search.default_limit must not exceed search.max_limit.".to_string(),
		});
	}
	if cfg.search.request_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "search.request_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.hierarchy.children_page_size == 0 {
		return Err(Error::Validation {
			message: "hierarchy.children_page_size must be greater than zero.".to_string(),
		});
	}
	if cfg.hierarchy.max_nodes == 0 {
		return Err(Error::Validation {
			message: "hierarchy.max_nodes must be greater than zero.".to_string(),
		});
	}
	if !(1..=MAX_EXPAND_CONCURRENCY).contains(&cfg.hierarchy.expand_concurrency) {
		return Err(Error::Validation {
			message: format!(
				"hierarchy.expand_concurrency must be in the range 1-{MAX_EXPAND_CONCURRENCY}."
			),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.security.api_auth_token.as_deref().map(|token| token.trim().is_empty()).unwrap_or(false)
	{
		cfg.security.api_auth_token = None;
	}
}
