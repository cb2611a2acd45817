use chrono::{SubsecRound, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::catalog::{CatalogSnapshot, Gig, ServiceItem};
use crate::domain::errors::DomainError;
use crate::domain::ports::CatalogRepository;
use crate::schema::{gig_items, gigs};

use super::models::{GigItemRow, GigRow};

fn to_gig(row: GigRow, items: Vec<GigItemRow>) -> Gig {
    Gig {
        id: row.id,
        artist_id: row.artist_id,
        title: row.title,
        category: row.category,
        description: row.description,
        items: items
            .into_iter()
            .map(|i| ServiceItem {
                id: i.item_key,
                title: i.title,
                price: i.price,
            })
            .collect(),
        created_at: row.created_at,
    }
}

fn load_gigs(conn: &mut PgConnection, rows: Vec<GigRow>) -> Result<Vec<Gig>, DomainError> {
    let items = GigItemRow::belonging_to(&rows)
        .select(GigItemRow::as_select())
        .order(gig_items::position.asc())
        .load(conn)?;

    Ok(items
        .grouped_by(&rows)
        .into_iter()
        .zip(rows)
        .map(|(items, row)| to_gig(row, items))
        .collect())
}

/// Read side of the gig catalog. Writes exist only to seed listings; editing
/// them belongs to the provider tooling.
pub struct DieselCatalogRepository {
    pool: DbPool,
}

impl DieselCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn insert_gig(&self, gig: &Gig) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            diesel::insert_into(gigs::table)
                .values(&GigRow {
                    id: gig.id,
                    artist_id: gig.artist_id.clone(),
                    title: gig.title.clone(),
                    category: gig.category.clone(),
                    description: gig.description.clone(),
                    created_at: gig.created_at,
                })
                .execute(conn)?;

            let rows = gig
                .items
                .iter()
                .zip(0..)
                .map(|(item, position)| GigItemRow {
                    id: Uuid::new_v4(),
                    gig_id: gig.id,
                    item_key: item.id.clone(),
                    title: item.title.clone(),
                    price: item.price.clone(),
                    position,
                })
                .collect::<Vec<_>>();

            if !rows.is_empty() {
                diesel::insert_into(gig_items::table)
                    .values(&rows)
                    .execute(conn)?;
            }
            Ok(())
        })
    }
}

impl CatalogRepository for DieselCatalogRepository {
    fn fetch_catalog(&self) -> Result<CatalogSnapshot, DomainError> {
        let mut conn = self.pool.get()?;

        let gigs = conn.transaction::<_, DomainError, _>(|conn| {
            let rows = gigs::table
                .order(gigs::created_at.desc())
                .select(GigRow::as_select())
                .load(conn)?;
            load_gigs(conn, rows)
        })?;

        log::debug!("fetched catalog with {} gigs", gigs.len());
        Ok(CatalogSnapshot::new(gigs, Utc::now().trunc_subsecs(6)))
    }

    fn fetch_gig(&self, id: Uuid) -> Result<Option<Gig>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = gigs::table
            .filter(gigs::id.eq(id))
            .select(GigRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = GigItemRow::belonging_to(&row)
            .select(GigItemRow::as_select())
            .order(gig_items::position.asc())
            .load(&mut conn)?;

        Ok(Some(to_gig(row, items)))
    }
}
