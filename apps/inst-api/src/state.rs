use std::sync::Arc;

use inst_service::InstitutionService;
use inst_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<InstitutionService>,
}
impl AppState {
	pub async fn new(config: inst_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		Ok(Self::from_service(InstitutionService::new(config, db)))
	}

	pub fn from_service(service: InstitutionService) -> Self {
		Self { service: Arc::new(service) }
	}
}
