pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("INST_PG_DSN is not a valid Postgres DSN: {0}")]
	InvalidDsn(#[source] sqlx::Error),

	#[error("No admin database ({tried}) accepted a connection.")]
	AdminUnavailable {
		tried: String,
		#[source]
		source: sqlx::Error,
	},

	#[error("Failed to create test database {name}.")]
	Create {
		name: String,
		#[source]
		source: sqlx::Error,
	},

	#[error("Failed to drop test database {name}.")]
	Drop {
		name: String,
		#[source]
		source: sqlx::Error,
	},
}
