//! Listing record store.
//!
//! Records are keyed by listing ID and only ever grow: `upsert` merges a
//! partial field set into the stored one inside a transaction, so fields not
//! named in the patch survive. Rows are never deleted here.

use crate::error::{DatabaseError, Result};
use rentscout_core::{ListingFields, ListingId, ListingRecord};
use sqlx::{Pool, Sqlite, SqliteConnection};

/// Merge `patch` into the record for `id`, creating it if absent.
pub async fn upsert(pool: &Pool<Sqlite>, id: &ListingId, patch: &ListingFields) -> Result<()> {
    let mut tx = pool.begin().await?;
    upsert_in(&mut tx, id, patch).await?;
    tx.commit().await?;
    Ok(())
}

/// Upsert several records in one transaction.
pub async fn upsert_many(pool: &Pool<Sqlite>, patches: &[(ListingId, ListingFields)]) -> Result<()> {
    if patches.is_empty() {
        return Ok(());
    }
    let mut tx = pool.begin().await?;
    for (id, patch) in patches {
        upsert_in(&mut tx, id, patch).await?;
    }
    tx.commit().await?;
    tracing::debug!(count = patches.len(), "upserted listings");
    Ok(())
}

async fn upsert_in(conn: &mut SqliteConnection, id: &ListingId, patch: &ListingFields) -> Result<()> {
    let existing: Option<(String,)> = sqlx::query_as("SELECT data FROM listings WHERE id = ?")
        .bind(id.as_str())
        .fetch_optional(&mut *conn)
        .await?;

    let mut fields = match existing {
        Some((data,)) => decode_fields(id, &data)?,
        None => ListingFields::default(),
    };
    fields.merge(patch.clone());

    let data = serde_json::to_string(&fields)
        .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

    sqlx::query(
        r"
        INSERT INTO listings (id, data, created_at, updated_at)
        VALUES (?, ?, datetime('now'), datetime('now'))
        ON CONFLICT(id) DO UPDATE SET
            data = excluded.data,
            updated_at = datetime('now')
        ",
    )
    .bind(id.as_str())
    .bind(data)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Fetch one record.
pub async fn get(pool: &Pool<Sqlite>, id: &ListingId) -> Result<Option<ListingRecord>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT data FROM listings WHERE id = ?")
        .bind(id.as_str())
        .fetch_optional(pool)
        .await?;

    row.map(|(data,)| {
        Ok(ListingRecord {
            id: id.clone(),
            fields: decode_fields(id, &data)?,
        })
    })
    .transpose()
}

/// Fetch one record, failing when it does not exist.
pub async fn require(pool: &Pool<Sqlite>, id: &ListingId) -> Result<ListingRecord> {
    get(pool, id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("listing {id}")))
}

/// All records in discovery order.
pub async fn get_all(pool: &Pool<Sqlite>) -> Result<Vec<ListingRecord>> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT id, data FROM listings ORDER BY seq ASC")
            .fetch_all(pool)
            .await?;

    rows.into_iter()
        .map(|(id, data)| {
            let id = parse_id(&id)?;
            let fields = decode_fields(&id, &data)?;
            Ok(ListingRecord { id, fields })
        })
        .collect()
}

/// All listing IDs in discovery order.
pub async fn ids(pool: &Pool<Sqlite>) -> Result<Vec<ListingId>> {
    let rows: Vec<String> = sqlx::query_scalar("SELECT id FROM listings ORDER BY seq ASC")
        .fetch_all(pool)
        .await?;
    rows.iter().map(|id| parse_id(id)).collect()
}

/// Number of stored records.
pub async fn count(pool: &Pool<Sqlite>) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM listings")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

fn parse_id(raw: &str) -> Result<ListingId> {
    ListingId::new(raw).map_err(|e| DatabaseError::Decode(e.to_string()))
}

fn decode_fields(id: &ListingId, data: &str) -> Result<ListingFields> {
    serde_json::from_str(data)
        .map_err(|e| DatabaseError::Decode(format!("listing {id}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use rentscout_core::{Amenities, FactorScore, ListingScore, ListingStatus};
    use std::collections::BTreeMap;

    async fn create_test_db() -> Database {
        let db = Database::new(":memory:").await.expect("create test database");
        db.run_migrations().await.expect("run migrations");
        db
    }

    fn id(raw: &str) -> ListingId {
        ListingId::new(raw).expect("valid id")
    }

    #[tokio::test]
    async fn test_upsert_creates_record() {
        let db = create_test_db().await;
        let patch = ListingFields {
            url: Some("https://rent.591.com.tw/123".to_string()),
            ..ListingFields::default()
        };
        upsert(db.pool(), &id("123"), &patch).await.expect("upsert");

        let record = get(db.pool(), &id("123")).await.expect("get").expect("exists");
        assert_eq!(record.fields, patch);
        assert!(get(db.pool(), &id("999")).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn test_upsert_twice_is_idempotent() {
        let db = create_test_db().await;
        let patch = ListingFields {
            base_rent: Some(22_000),
            deposit_months: Some(2),
            ..ListingFields::default()
        };
        upsert(db.pool(), &id("1"), &patch).await.expect("first");
        let once = require(db.pool(), &id("1")).await.expect("get");
        upsert(db.pool(), &id("1"), &patch).await.expect("second");
        let twice = require(db.pool(), &id("1")).await.expect("get");

        assert_eq!(once, twice);
        assert_eq!(count(db.pool()).await.expect("count"), 1);
    }

    #[tokio::test]
    async fn test_merge_keeps_cost_and_amenities() {
        let db = create_test_db().await;
        let cost = ListingFields {
            base_rent: Some(20_000),
            total_monthly: Some(25_000),
            ..ListingFields::default()
        };
        let amenities = ListingFields {
            amenities: Amenities {
                washing_machine: Some(true),
                ..Amenities::default()
            },
            ..ListingFields::default()
        };
        upsert(db.pool(), &id("7"), &cost).await.expect("cost");
        upsert(db.pool(), &id("7"), &amenities).await.expect("amenities");

        let record = require(db.pool(), &id("7")).await.expect("get");
        assert_eq!(record.fields.base_rent, Some(20_000));
        assert_eq!(record.fields.total_monthly, Some(25_000));
        assert_eq!(record.fields.amenities.washing_machine, Some(true));
    }

    #[tokio::test]
    async fn test_identity_rewrite_keeps_later_stage_fields() {
        let db = create_test_db().await;
        let identity = ListingFields {
            url: Some("https://rent.591.com.tw/42".to_string()),
            district: Some("Xinyi".to_string()),
            ..ListingFields::default()
        };
        upsert(db.pool(), &id("42"), &identity).await.expect("stage 1");
        upsert(
            db.pool(),
            &id("42"),
            &ListingFields {
                base_rent: Some(30_000),
                status: Some(ListingStatus::Active),
                ..ListingFields::default()
            },
        )
        .await
        .expect("stage 2");
        upsert(db.pool(), &id("42"), &identity).await.expect("stage 1 again");

        let record = require(db.pool(), &id("42")).await.expect("get");
        assert_eq!(record.fields.base_rent, Some(30_000));
        assert_eq!(record.fields.status, Some(ListingStatus::Active));
    }

    #[tokio::test]
    async fn test_rescore_replaces_breakdown() {
        let db = create_test_db().await;
        let mut breakdown = BTreeMap::new();
        breakdown.insert(rentscout_core::Factor::Commute, FactorScore::Scored(80.0));
        let scored = ListingFields {
            score: Some(ListingScore {
                composite: 80.0,
                breakdown,
                complete: true,
            }),
            ..ListingFields::default()
        };
        upsert(db.pool(), &id("5"), &scored).await.expect("score");

        let mut breakdown = BTreeMap::new();
        breakdown.insert(rentscout_core::Factor::Commute, FactorScore::Unknown);
        let rescored = ListingFields {
            score: Some(ListingScore {
                composite: 0.0,
                breakdown,
                complete: false,
            }),
            ..ListingFields::default()
        };
        upsert(db.pool(), &id("5"), &rescored).await.expect("rescore");

        let record = require(db.pool(), &id("5")).await.expect("get");
        assert_eq!(record.fields.score, rescored.score);
    }

    #[tokio::test]
    async fn test_get_all_in_discovery_order() {
        let db = create_test_db().await;
        for raw in ["300", "100", "200"] {
            upsert(db.pool(), &id(raw), &ListingFields::default())
                .await
                .expect("upsert");
        }
        // re-touching an old record must not move it
        upsert(
            db.pool(),
            &id("300"),
            &ListingFields {
                title: Some("updated".to_string()),
                ..ListingFields::default()
            },
        )
        .await
        .expect("update");

        let order: Vec<String> = get_all(db.pool())
            .await
            .expect("get all")
            .into_iter()
            .map(|r| r.id.to_string())
            .collect();
        assert_eq!(order, vec!["300", "100", "200"]);

        let ids: Vec<String> = ids(db.pool())
            .await
            .expect("ids")
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(ids, order);
    }

    #[tokio::test]
    async fn test_upsert_many_single_transaction() {
        let db = create_test_db().await;
        let patches: Vec<(ListingId, ListingFields)> = (1..=5)
            .map(|n| (id(&n.to_string()), ListingFields::default()))
            .collect();
        upsert_many(db.pool(), &patches).await.expect("upsert many");
        assert_eq!(count(db.pool()).await.expect("count"), 5);
        upsert_many(db.pool(), &[]).await.expect("empty batch");
    }

    #[tokio::test]
    async fn test_require_missing_is_not_found() {
        let db = create_test_db().await;
        let result = require(db.pool(), &id("404")).await;
        assert!(matches!(result, Err(DatabaseError::NotFound(_))));
    }
}
