use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub hierarchy: Hierarchy,
	pub security: Security,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

/// Pagination bounds and the per-request deadline for institution search.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Search {
	/// Page size used when a request does not carry a limit.
	pub default_limit: u32,
	/// Largest page size a request may ask for.
	pub max_limit: u32,
	pub request_timeout_ms: u64,
}
impl Default for Search {
	fn default() -> Self {
		Self { default_limit: 100, max_limit: 1_000, request_timeout_ms: 10_000 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Hierarchy {
	/// Page size requested from the children lookup while expanding one node.
	pub children_page_size: u32,
	/// Upper bound on distinct descendants collected for a single root.
	pub max_nodes: u32,
	/// Number of base institutions expanded at the same time.
	pub expand_concurrency: u32,
}
impl Default for Hierarchy {
	fn default() -> Self {
		Self { children_page_size: 200, max_nodes: 50_000, expand_concurrency: 4 }
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
	pub api_auth_token: Option<String>,
}
