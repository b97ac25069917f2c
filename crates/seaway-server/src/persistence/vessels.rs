//! Vessel and position persistence operations.

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use seaway_core::VesselSnapshot;
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::state::{PositionUpdate, VesselRecord};

fn timestamp_text(ts: DateTime<Utc>) -> String {
    // Fixed-width UTC so lexical order matches time order.
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Upsert the vessel row and append the position, inside a transaction.
pub async fn record_position_tx(tx: &mut Transaction<'_, Sqlite>, update: &PositionUpdate) -> Result<()> {
    let timestamp = timestamp_text(update.timestamp.unwrap_or_else(Utc::now));

    sqlx::query(
        r#"
        INSERT INTO vessels (mmsi, name, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(mmsi) DO UPDATE SET
            name = COALESCE(?2, name),
            updated_at = MAX(updated_at, ?3)
        "#,
    )
    .bind(&update.vessel_id)
    .bind(&update.name)
    .bind(&timestamp)
    .execute(&mut **tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO vessel_positions (mmsi, latitude, longitude, course, heading, speed, timestamp)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&update.vessel_id)
    .bind(update.latitude)
    .bind(update.longitude)
    .bind(update.course_deg)
    .bind(update.heading_deg)
    .bind(update.speed_knots)
    .bind(&timestamp)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Record a single position outside any batch.
pub async fn record_position(pool: &SqlitePool, update: &PositionUpdate) -> Result<()> {
    let mut tx = pool.begin().await?;
    record_position_tx(&mut tx, update).await?;
    tx.commit().await?;
    Ok(())
}

/// Latest position of every vessel that has one.
pub async fn load_latest_positions(pool: &SqlitePool) -> Result<Vec<VesselRecord>> {
    let rows = sqlx::query_as::<_, LatestPositionRow>(
        r#"
        SELECT p.mmsi, v.name, p.latitude, p.longitude, p.course, p.heading, p.speed, p.timestamp
        FROM vessel_positions p
        JOIN vessels v ON v.mmsi = p.mmsi
        WHERE p.id = (
            SELECT p2.id FROM vessel_positions p2
            WHERE p2.mmsi = p.mmsi
            ORDER BY p2.timestamp DESC, p2.id DESC
            LIMIT 1
        )
        ORDER BY p.mmsi
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Number of stored positions for one vessel.
pub async fn count_positions(pool: &SqlitePool, mmsi: &str) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vessel_positions WHERE mmsi = ?1")
        .bind(mmsi)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[derive(sqlx::FromRow)]
struct LatestPositionRow {
    mmsi: String,
    name: Option<String>,
    latitude: f64,
    longitude: f64,
    course: Option<f64>,
    heading: Option<f64>,
    speed: Option<f64>,
    timestamp: String,
}

impl From<LatestPositionRow> for VesselRecord {
    fn from(row: LatestPositionRow) -> Self {
        let updated_at = DateTime::parse_from_rfc3339(&row.timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        VesselRecord {
            snapshot: VesselSnapshot {
                id: row.mmsi,
                latitude: row.latitude,
                longitude: row.longitude,
                course_deg: row.course,
                heading_deg: row.heading,
                speed_knots: row.speed,
            },
            name: row.name,
            updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::init_database;
    use chrono::Duration;

    fn update(lat: f64, ts: DateTime<Utc>) -> PositionUpdate {
        PositionUpdate {
            vessel_id: "273350000".to_string(),
            name: Some("ZARYA".to_string()),
            latitude: lat,
            longitude: 131.9,
            course_deg: Some(45.0),
            heading_deg: None,
            speed_knots: Some(7.5),
            timestamp: Some(ts),
        }
    }

    #[tokio::test]
    async fn history_is_kept_and_latest_is_loaded() {
        let db = init_database(":memory:", 1).await.unwrap();
        let now = Utc::now();

        record_position(db.pool(), &update(43.0, now - Duration::seconds(60))).await.unwrap();
        record_position(db.pool(), &update(43.1, now)).await.unwrap();
        let mut unnamed = update(42.9, now - Duration::seconds(120));
        unnamed.name = None;
        record_position(db.pool(), &unnamed).await.unwrap();

        assert_eq!(count_positions(db.pool(), "273350000").await.unwrap(), 3);

        let latest = load_latest_positions(db.pool()).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].snapshot.latitude, 43.1);
        assert_eq!(latest[0].snapshot.heading_deg, None);
        assert_eq!(latest[0].name.as_deref(), Some("ZARYA"));
    }
}
