use serde::Serialize;
use tracing::{debug, info};

use super::brand::BrandResolver;
use super::upsert::Upserter;
use crate::store::{NewBrand, NewRow, Store, StoreError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub brands_created: usize,
    pub products_updated: usize,
}

/// Links products that have no brand to one resolved from their name,
/// creating brands as needed. All or nothing: any store error rolls back.
pub async fn backfill_brands<S>(
    store: &mut S,
    resolver: &BrandResolver,
) -> Result<BackfillReport, StoreError>
where
    S: Store + ?Sized,
{
    let products = store.unbranded_products().await?;
    info!(products = products.len(), "Backfilling brands");

    store.begin().await?;
    let mut upserter = Upserter::new();
    let mut report = BackfillReport::default();

    for product in products {
        let Some(label) = resolver.resolve(Some(&product.name)) else {
            debug!(product_id = product.id, name = %product.name, "No brand in product name");
            continue;
        };

        let linked = async {
            let brand = upserter
                .get_or_create(&mut *store, NewRow::Brand(NewBrand::named(label)))
                .await?;
            store.set_product_brand(product.id, brand.id).await?;
            Ok::<_, StoreError>(brand.created)
        }
        .await;

        match linked {
            Ok(created) => {
                upserter.confirm();
                if created {
                    report.brands_created += 1;
                }
                report.products_updated += 1;
            }
            Err(e) => {
                store.rollback().await?;
                return Err(e);
            }
        }
    }

    store.commit().await?;
    info!(
        brands_created = report.brands_created,
        products_updated = report.products_updated,
        "Brand backfill complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, NewProduct};

    async fn seed(store: &mut MemoryStore, items: &[(&str, &str)]) {
        store.begin().await.unwrap();
        for (item, name) in items {
            let product = NewProduct {
                item_inventory_number: item.to_string(),
                name: name.to_string(),
                description: None,
                brand_id: None,
                category_id: None,
            };
            store.insert(&NewRow::Product(product)).await.unwrap();
        }
        store.commit().await.unwrap();
    }

    #[tokio::test]
    async fn links_resolvable_products_only() {
        let mut store = MemoryStore::new();
        seed(
            &mut store,
            &[("1", "Prada Galleria"), ("2", "prada nylon pouch"), ("3", "a scarf")],
        )
        .await;

        let report = backfill_brands(&mut store, &BrandResolver::default()).await.unwrap();
        assert_eq!(report, BackfillReport { brands_created: 1, products_updated: 2 });

        let brand_id = store.brands()[0].id;
        let linked: Vec<_> = store.products().iter().map(|p| p.row.brand_id).collect();
        assert_eq!(linked, vec![Some(brand_id), Some(brand_id), None]);

        let again = backfill_brands(&mut store, &BrandResolver::default()).await.unwrap();
        assert_eq!(again, BackfillReport::default());
    }
}
