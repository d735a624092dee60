//! State must survive closing and reopening the database file

use rentscout_core::{ListingFields, ListingId, Stage};
use rentscout_db::{checkpoints, failures, listings, Database, Outcome};

#[tokio::test]
async fn test_records_and_checkpoints_survive_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("rentscout.db");
    let id = ListingId::new("12345").expect("id");

    {
        let db = Database::open(&path).await.expect("open");
        listings::upsert(
            db.pool(),
            &id,
            &ListingFields {
                base_rent: Some(18_000),
                ..ListingFields::default()
            },
        )
        .await
        .expect("upsert");
        db.checkpoints(Stage::Extract)
            .mark_done(id.as_str(), Outcome::Done, None)
            .await
            .expect("mark");
        failures::record_failure(db.pool(), Stage::Extract, "777", "timeout")
            .await
            .expect("failure");
        db.close().await;
    }

    let db = Database::open(&path).await.expect("reopen");
    let record = listings::require(db.pool(), &id).await.expect("record");
    assert_eq!(record.fields.base_rent, Some(18_000));
    assert!(checkpoints::is_done(db.pool(), Stage::Extract, id.as_str())
        .await
        .expect("check"));
    assert_eq!(
        failures::attempts(db.pool(), Stage::Extract, "777")
            .await
            .expect("attempts"),
        1
    );
    assert_eq!(db.get_schema_version().await.expect("version"), 3);
}
