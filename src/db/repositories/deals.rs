use crate::db::{StoreError, format_timestamp, parse_timestamp};
use crate::domain::{DealsSnapshot as Snapshot, Listing};
use crate::entities::{deals_snapshot, prelude::*};
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};

const SNAPSHOT_ID: i32 = 1;

pub struct DealsRepository {
    conn: DatabaseConnection,
}

impl DealsRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn load(&self) -> Result<Option<Snapshot>, StoreError> {
        let Some(row) = DealsSnapshot::find_by_id(SNAPSHOT_ID).one(&self.conn).await? else {
            return Ok(None);
        };

        let listings: Vec<Listing> = serde_json::from_str(&row.deals_json)?;
        Ok(Some(Snapshot {
            listings,
            fetched_at: parse_timestamp(&row.fetched_at)?,
            expires_at: row.expires_at.as_deref().map(parse_timestamp).transpose()?,
        }))
    }

    /// Replaces the single snapshot row.
    pub async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let deals_json = serde_json::to_string(&snapshot.listings)?;

        let active_model = deals_snapshot::ActiveModel {
            id: Set(SNAPSHOT_ID),
            deals_json: Set(deals_json),
            fetched_at: Set(format_timestamp(snapshot.fetched_at)),
            expires_at: Set(snapshot.expires_at.map(format_timestamp)),
        };

        DealsSnapshot::insert(active_model)
            .on_conflict(
                OnConflict::column(deals_snapshot::Column::Id)
                    .update_columns([
                        deals_snapshot::Column::DealsJson,
                        deals_snapshot::Column::FetchedAt,
                        deals_snapshot::Column::ExpiresAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;

        Ok(())
    }
}
