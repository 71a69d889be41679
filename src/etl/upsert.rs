use std::collections::HashMap;

use crate::store::{NaturalKey, NewRow, Store, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upserted {
    pub id: i64,
    pub created: bool,
}

/// Get-or-create by natural key with a run-local id cache.
///
/// Ids seen while a row is in flight are staged; [`Upserter::confirm`] moves
/// them into the cache once the row's savepoint is released and
/// [`Upserter::discard`] drops them when the row is rolled back, so the cache
/// never points at rows the store no longer has.
#[derive(Debug, Default)]
pub struct Upserter {
    cache: HashMap<NaturalKey, i64>,
    staged: Vec<(NaturalKey, i64)>,
}

impl Upserter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lookup<S>(&mut self, store: &mut S, key: &NaturalKey) -> Result<Option<i64>, StoreError>
    where
        S: Store + ?Sized,
    {
        if let Some(id) = self.cached(key) {
            return Ok(Some(id));
        }
        let found = store.find_id(key).await?;
        if let Some(id) = found {
            self.staged.push((key.clone(), id));
        }
        Ok(found)
    }

    /// Returns the id of the row with `row`'s natural key, inserting `row`
    /// when there is none. Existing rows are never updated.
    pub async fn get_or_create<S>(&mut self, store: &mut S, row: NewRow) -> Result<Upserted, StoreError>
    where
        S: Store + ?Sized,
    {
        let key = row.key();
        if let Some(id) = self.lookup(store, &key).await? {
            return Ok(Upserted { id, created: false });
        }

        let upserted = match store.insert(&row).await? {
            Some(id) => Upserted { id, created: true },
            // Someone else inserted the key between our lookup and insert.
            None => {
                let id = store.find_id(&key).await?.ok_or_else(|| {
                    StoreError::invalid_state(format!("{key} conflicted on insert but cannot be found"))
                })?;
                Upserted { id, created: false }
            }
        };
        self.staged.push((key, upserted.id));
        Ok(upserted)
    }

    pub fn confirm(&mut self) {
        self.cache.extend(self.staged.drain(..));
    }

    pub fn discard(&mut self) {
        self.staged.clear();
    }

    /// Forgets everything, e.g. after a batch commit failed.
    pub fn reset(&mut self) {
        self.cache.clear();
        self.staged.clear();
    }

    fn cached(&self, key: &NaturalKey) -> Option<i64> {
        self.cache.get(key).copied().or_else(|| {
            self.staged
                .iter()
                .rev()
                .find(|(staged, _)| staged == key)
                .map(|(_, id)| *id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, NewBrand};

    #[tokio::test]
    async fn second_call_returns_the_same_row() {
        let mut store = MemoryStore::new();
        let mut upserter = Upserter::new();
        store.begin().await.unwrap();

        let first = upserter
            .get_or_create(&mut store, NewRow::Brand(NewBrand::named("Chanel")))
            .await
            .unwrap();
        let second = upserter
            .get_or_create(&mut store, NewRow::Brand(NewBrand::named("Chanel")))
            .await
            .unwrap();
        store.commit().await.unwrap();

        assert!(first.created);
        assert_eq!(second, Upserted { id: first.id, created: false });
        assert_eq!(store.brands().len(), 1);
        assert_eq!(store.brands()[0].row.description.as_deref(), Some("Brand: Chanel"));
    }

    #[tokio::test]
    async fn discarded_ids_are_not_cached() {
        let mut store = MemoryStore::new();
        let mut upserter = Upserter::new();
        store.begin().await.unwrap();

        store.savepoint().await.unwrap();
        upserter
            .get_or_create(&mut store, NewRow::Brand(NewBrand::named("Gucci")))
            .await
            .unwrap();
        store.rollback_to_savepoint().await.unwrap();
        upserter.discard();

        let key = NaturalKey::Brand("Gucci".into());
        assert_eq!(upserter.lookup(&mut store, &key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn existing_store_rows_are_found() {
        let mut store = MemoryStore::new();
        store.begin().await.unwrap();
        let id = store
            .insert(&NewRow::Brand(NewBrand::named("Prada")))
            .await
            .unwrap()
            .unwrap();

        let mut upserter = Upserter::new();
        let found = upserter
            .get_or_create(&mut store, NewRow::Brand(NewBrand::named("Prada")))
            .await
            .unwrap();
        assert_eq!(found, Upserted { id, created: false });
    }
}
