use chrono::{SubsecRound, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::channel::ChannelHandle;
use crate::domain::errors::DomainError;
use crate::domain::ports::ChannelOpener;
use crate::schema::chat_channels;

use super::models::ChannelRow;

pub struct DieselChannelOpener {
    pool: DbPool,
}

impl DieselChannelOpener {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ChannelOpener for DieselChannelOpener {
    fn open_or_resume(
        &self,
        client_id: &str,
        artist_id: &str,
    ) -> Result<ChannelHandle, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let inserted = diesel::insert_into(chat_channels::table)
                .values(&ChannelRow {
                    id: Uuid::new_v4(),
                    client_id: client_id.to_string(),
                    artist_id: artist_id.to_string(),
                    created_at: Utc::now().trunc_subsecs(6),
                })
                .on_conflict((chat_channels::client_id, chat_channels::artist_id))
                .do_nothing()
                .execute(conn)?;

            let row = chat_channels::table
                .filter(chat_channels::client_id.eq(client_id))
                .filter(chat_channels::artist_id.eq(artist_id))
                .select(ChannelRow::as_select())
                .first(conn)?;

            if inserted == 1 {
                log::info!("opened chat channel {} for {} and {}", row.id, client_id, artist_id);
            }

            Ok(ChannelHandle {
                id: row.id,
                client_id: row.client_id,
                artist_id: row.artist_id,
                created_at: row.created_at,
                resumed: inserted == 0,
            })
        })
    }
}
