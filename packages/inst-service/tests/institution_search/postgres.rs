use serde_json::json;

use crate::institution_search::support;
use inst_service::{ChildrenLookup, Field, InstitutionService, PgDirectory, SearchRequest};
use inst_storage::{db::Db, models::NewInstitution, queries};
use inst_testkit::TestDatabase;

async fn seed(db: &Db) {
	for (institution_id, name, country, parent_id) in [
		(60, "International School of Beijing", "China", None),
		(61, "International School of Beijing Child", "China", Some(60)),
		(62, "Test Institution", "United States", None),
		(70, "Beijing Outsider", "China", None),
	] {
		let row = NewInstitution {
			institution_id,
			name: name.to_string(),
			country: country.to_string(),
			parent_id,
			active: true,
		};

		queries::insert_institution(db, &row).await.expect("Failed to insert institution.");
	}

	queries::grant_owner(db, support::COORDINATOR, 60).await.expect("Failed to grant owner.");
	queries::grant_owner(db, support::COORDINATOR, 62).await.expect("Failed to grant owner.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set INST_PG_DSN to run."]
async fn restricted_search_against_postgres() {
	let Some(base_dsn) = inst_testkit::env_dsn() else {
		eprintln!("Skipping restricted_search_against_postgres; set INST_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = Db::connect(&test_db.postgres(2))
		.await
		.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");
	seed(&db).await;

	let service = InstitutionService::new(support::test_config(), db.clone());
	let request = SearchRequest {
		criteria: json!("beijing"),
		fields: json!(["name", "parentId"]),
		..Default::default()
	};
	let restricted =
		service.search(&request, &support::restricted()).await.expect("Search failed.");

	assert_eq!(restricted.ids, vec![60, 61]);
	assert_eq!(restricted.total, 2);
	assert_eq!(restricted.institution_info[&61].parent_id, Some(60));

	let unrestricted =
		service.search(&request, &support::full_access()).await.expect("Search failed.");

	assert_eq!(unrestricted.ids, vec![70, 60, 61]);
	assert_eq!(unrestricted.total, 3);

	db.pool.close().await;
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set INST_PG_DSN to run."]
async fn children_pages_carry_projected_details() {
	let Some(base_dsn) = inst_testkit::env_dsn() else {
		eprintln!("Skipping children_pages_carry_projected_details; set INST_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = Db::connect(&test_db.postgres(2))
		.await
		.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");
	seed(&db).await;

	let directory = PgDirectory::new(db.clone());
	let ctx = support::restricted();
	let page = directory
		.children(&ctx, 60, Some(&[Field::Name, Field::Active]), 0, 10)
		.await
		.expect("Children lookup failed.");

	assert_eq!(page.ids, vec![61]);
	assert_eq!(page.total, 1);
	assert_eq!(page.info[&61].parent_id, Some(60));
	assert_eq!(page.info[&61].active, Some(true));

	let page = directory.children(&ctx, 60, None, 0, 10).await.expect("Children lookup failed.");

	assert_eq!(page.info[&61].active, None);

	db.pool.close().await;
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
