//! Multi-row writes.
//!
//! Creates are written in chunks of `batch_size`, one transaction per chunk.
//! Updates run one at a time in the order given. Either way a failure stops
//! the batch and reports what was already committed.

use rusqlite::params_from_iter;
use tracing::{debug, warn};

use super::{SqliteVersionStore, Transform, VersionStore};
use crate::entity::Entity;
use crate::error::{ScdError, ScdResult};
use crate::row::{self, entity_to_values};

impl<T: Entity> SqliteVersionStore<T> {
    pub(super) fn create_chunked(&self, mut entities: Vec<T>) -> ScdResult<Vec<T>> {
        if entities.is_empty() {
            return Ok(entities);
        }

        let now = row::now();
        for entity in entities.iter_mut() {
            entity.set_created_at(now);
            entity.set_updated_at(now);
        }

        // Reject malformed input before the first chunk is written.
        let mut rows = Vec::with_capacity(entities.len());
        for entity in &entities {
            let values = Self::validate_identity(entity)
                .and_then(|_| entity_to_values(entity))
                .map_err(|source| ScdError::Batch {
                    committed: Vec::new(),
                    failed_key: entity.version_uid(),
                    source: Box::new(source),
                })?;
            rows.push(values);
        }

        let sql = Self::insert_sql();
        let mut committed = Vec::with_capacity(entities.len());

        for (chunk, values) in entities
            .chunks(self.batch_size)
            .zip(rows.chunks(self.batch_size))
        {
            let result = self.db.with_conn(|conn| {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(&sql)?;
                    for (entity, row) in chunk.iter().zip(values) {
                        // Earlier rows of this chunk are visible inside the transaction.
                        Self::check_predecessor(&tx, entity)?;
                        stmt.execute(params_from_iter(row.iter()))
                            .map_err(|e| Self::classify_write_error(e, entity))?;
                    }
                }
                tx.commit()?;
                Ok(())
            });

            if let Err(source) = result {
                let failed_key = chunk
                    .first()
                    .map(|e| e.version_uid())
                    .unwrap_or_default();
                warn!(
                    table = T::TABLE,
                    committed = committed.len(),
                    failed_key = %failed_key,
                    error = %source,
                    "Batch create aborted"
                );
                return Err(ScdError::Batch {
                    committed,
                    failed_key,
                    source: Box::new(source),
                });
            }

            committed.extend(chunk.iter().map(|e| e.version_uid()));
            debug!(table = T::TABLE, rows = chunk.len(), "Committed batch chunk");
        }

        Ok(entities)
    }

    pub(super) fn update_sequential(
        &self,
        updates: Vec<(String, Transform<T>)>,
    ) -> ScdResult<Vec<T>> {
        let mut written = Vec::with_capacity(updates.len());

        for (uid, transform) in updates {
            match self.update(&uid, transform) {
                Ok(entity) => written.push(entity),
                Err(source) => {
                    let committed: Vec<String> = written.iter().map(|e| e.version_uid()).collect();
                    warn!(
                        table = T::TABLE,
                        committed = committed.len(),
                        failed_key = %uid,
                        error = %source,
                        "Batch update aborted"
                    );
                    return Err(ScdError::Batch {
                        committed,
                        failed_key: uid,
                        source: Box::new(source),
                    });
                }
            }
        }

        Ok(written)
    }
}
