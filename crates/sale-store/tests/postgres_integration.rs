//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p sale-store --test postgres_integration -- --test-threads=1
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{BranchId, CustomerId, ProductId, SaleId, SaleItemId};
use domain::{
    BranchReference, CancelSaleItem, CreateSale, CustomerReference, DiscountPolicy, GetSale,
    LoggingEventPublisher, Money, ProductReference, QuantityDiscountPolicy, Sale, SaleItem,
    SaleItemInput, SaleNumber, SaleRepository, SaleService, StoreError,
};
use rust_decimal::Decimal;
use sale_store::PostgresSaleRepository;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_sales_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh repository with its own pool and cleared tables
async fn get_test_repository() -> PostgresSaleRepository {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE sale_items, sales, sale_number_counters")
        .execute(&pool)
        .await
        .unwrap();

    PostgresSaleRepository::new(pool)
}

fn priced_item(name: &str, quantity: i32, unit_price: Money) -> SaleItem {
    let pricing = QuantityDiscountPolicy.price_line(quantity, unit_price).unwrap();
    SaleItem::new(
        SaleItemId::new(),
        ProductReference::new(ProductId::new(), name),
        quantity,
        unit_price,
        pricing,
    )
}

fn create_test_sale(sale_number: SaleNumber, days_ago: i64, items: Vec<SaleItem>) -> Sale {
    Sale::new(
        SaleId::new(),
        sale_number,
        Utc::now() - Duration::days(days_ago),
        CustomerReference::new(CustomerId::new(), "Jane Doe"),
        BranchReference::new(BranchId::new(), "Downtown"),
        items,
    )
}

fn simple_sale(sequence: u32, days_ago: i64) -> Sale {
    create_test_sale(
        SaleNumber::new(2025, sequence),
        days_ago,
        vec![priced_item("Beer", 2, Money::from_cents(1000))],
    )
}

async fn item_rows(repository: &PostgresSaleRepository, sale_id: SaleId) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM sale_items WHERE sale_id = $1")
        .bind(sale_id.as_uuid())
        .fetch_one(repository.pool())
        .await
        .unwrap()
}

mod round_trip {
    use super::*;

    #[tokio::test]
    async fn insert_and_load_by_id() {
        let repository = get_test_repository().await;
        let mut sale = create_test_sale(
            SaleNumber::new(2025, 1),
            0,
            vec![
                priced_item("Beer", 2, Money::from_cents(1000)),
                priced_item("Wine", 7, Money::new(Decimal::new(333, 2))),
                priced_item("Water", 12, Money::from_cents(150)),
            ],
        );

        repository.insert(&mut sale).await.unwrap();
        assert_eq!(sale.version(), 1);

        let loaded = repository.load_by_id(sale.id()).await.unwrap().unwrap();
        assert_eq!(loaded.id(), sale.id());
        assert_eq!(loaded.sale_number(), sale.sale_number());
        assert_eq!(loaded.customer(), sale.customer());
        assert_eq!(loaded.branch(), sale.branch());
        assert_eq!(loaded.version(), 1);
        assert!(!loaded.is_cancelled());

        let names: Vec<&str> = loaded
            .items()
            .iter()
            .map(|item| item.product().name.as_str())
            .collect();
        assert_eq!(names, vec!["Beer", "Wine", "Water"]);

        // 7 x 3.33 at 10% keeps its third decimal place
        let wine = &loaded.items()[1];
        assert_eq!(wine.discount_percent(), Decimal::TEN);
        assert_eq!(wine.line_total(), Money::new(Decimal::new(20979, 3)));
        assert_eq!(loaded.total_amount(), sale.total_amount());
    }

    #[tokio::test]
    async fn load_by_number() {
        let repository = get_test_repository().await;
        let mut sale = simple_sale(7, 0);
        repository.insert(&mut sale).await.unwrap();

        let loaded = repository
            .load_by_number(&SaleNumber::new(2025, 7))
            .await
            .unwrap();
        let missing = repository
            .load_by_number(&SaleNumber::new(2025, 8))
            .await
            .unwrap();

        assert_eq!(loaded.map(|s| s.id()), Some(sale.id()));
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn load_missing_returns_none() {
        let repository = get_test_repository().await;

        let loaded = repository.load_by_id(SaleId::new()).await.unwrap();

        assert!(loaded.is_none());
    }
}

mod writes {
    use super::*;

    #[tokio::test]
    async fn duplicate_sale_number_rejected() {
        let repository = get_test_repository().await;
        let mut first = simple_sale(1, 0);
        let mut second = simple_sale(1, 0);

        repository.insert(&mut first).await.unwrap();
        let result = repository.insert(&mut second).await;

        assert!(matches!(
            result,
            Err(StoreError::DuplicateSaleNumber { .. })
        ));
        assert_eq!(item_rows(&repository, second.id()).await, 0);
    }

    #[tokio::test]
    async fn save_persists_changes_and_bumps_version() {
        let repository = get_test_repository().await;
        let mut sale = create_test_sale(
            SaleNumber::new(2025, 1),
            0,
            vec![priced_item("Beer", 10, Money::from_cents(1000))],
        );
        repository.insert(&mut sale).await.unwrap();

        let item_id = sale.items()[0].id();
        let pricing = QuantityDiscountPolicy
            .price_line(5, Money::from_cents(1000))
            .unwrap();
        sale.reduce_item_quantity(item_id, 5, pricing.discount_percent, pricing.line_total);
        repository.save(&mut sale).await.unwrap();

        assert_eq!(sale.version(), 2);
        let loaded = repository.load_by_id(sale.id()).await.unwrap().unwrap();
        assert_eq!(loaded.version(), 2);
        assert_eq!(loaded.items()[0].quantity(), 5);
        assert_eq!(loaded.items()[0].discount_percent(), Decimal::TEN);
        assert_eq!(loaded.total_amount(), Money::from_cents(4500));
        assert!(loaded.updated_at().is_some());
    }

    #[tokio::test]
    async fn stale_save_is_a_conflict() {
        let repository = get_test_repository().await;
        let mut sale = simple_sale(1, 0);
        repository.insert(&mut sale).await.unwrap();

        let mut first = repository.load_by_id(sale.id()).await.unwrap().unwrap();
        let mut second = repository.load_by_id(sale.id()).await.unwrap().unwrap();

        first.cancel();
        repository.save(&mut first).await.unwrap();

        second.cancel();
        let result = repository.save(&mut second).await;

        assert!(matches!(
            result,
            Err(StoreError::ConcurrencyConflict {
                expected: 1,
                actual: 2,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn save_unknown_sale_fails() {
        let repository = get_test_repository().await;
        let mut sale = simple_sale(1, 0);

        let result = repository.save(&mut sale).await;

        assert!(matches!(result, Err(StoreError::NotStored { .. })));
    }

    #[tokio::test]
    async fn removed_items_are_deleted() {
        let repository = get_test_repository().await;
        let mut sale = create_test_sale(
            SaleNumber::new(2025, 1),
            0,
            vec![
                priced_item("Beer", 2, Money::from_cents(1000)),
                priced_item("Wine", 3, Money::from_cents(2000)),
            ],
        );
        repository.insert(&mut sale).await.unwrap();
        assert_eq!(item_rows(&repository, sale.id()).await, 2);

        let keep: HashSet<SaleItemId> = [sale.items()[0].id()].into_iter().collect();
        sale.retain_items(&keep).unwrap();
        sale.add_item(priced_item("Chips", 4, Money::from_cents(300)))
            .unwrap();
        repository.save(&mut sale).await.unwrap();

        let loaded = repository.load_by_id(sale.id()).await.unwrap().unwrap();
        let names: Vec<&str> = loaded
            .items()
            .iter()
            .map(|item| item.product().name.as_str())
            .collect();
        assert_eq!(names, vec!["Beer", "Chips"]);
        assert_eq!(item_rows(&repository, sale.id()).await, 2);
        assert_eq!(
            loaded.total_amount(),
            Money::from_cents(2000) + Money::from_cents(1080)
        );
    }

    #[tokio::test]
    async fn cancellation_round_trips() {
        let repository = get_test_repository().await;
        let mut sale = simple_sale(1, 0);
        repository.insert(&mut sale).await.unwrap();

        sale.cancel();
        repository.save(&mut sale).await.unwrap();

        let loaded = repository.load_by_id(sale.id()).await.unwrap().unwrap();
        assert!(loaded.is_cancelled());
        assert!(loaded.cancelled_at().is_some());
        assert!(loaded.items().iter().all(SaleItem::is_cancelled));
        assert_eq!(loaded.total_amount(), Money::zero());
    }

    #[tokio::test]
    async fn delete_cascades_to_items() {
        let repository = get_test_repository().await;
        let mut sale = simple_sale(1, 0);
        repository.insert(&mut sale).await.unwrap();

        assert!(repository.delete(sale.id()).await.unwrap());
        assert!(!repository.delete(sale.id()).await.unwrap());
        assert!(repository.load_by_id(sale.id()).await.unwrap().is_none());
        assert_eq!(item_rows(&repository, sale.id()).await, 0);
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn pages_most_recent_first() {
        let repository = get_test_repository().await;
        for (sequence, days_ago) in [(1, 3), (2, 1), (3, 2), (4, 0), (5, 4)] {
            let mut sale = simple_sale(sequence, days_ago);
            repository.insert(&mut sale).await.unwrap();
        }

        let (first_page, total) = repository.list_page(1, 2).await.unwrap();
        let (last_page, _) = repository.list_page(3, 2).await.unwrap();
        let (beyond, _) = repository.list_page(4, 2).await.unwrap();

        assert_eq!(total, 5);
        let sequences: Vec<u32> = first_page
            .iter()
            .map(|s| s.sale_number().sequence())
            .collect();
        assert_eq!(sequences, vec![4, 2]);
        assert_eq!(first_page[0].items().len(), 1);
        assert_eq!(last_page.len(), 1);
        assert_eq!(last_page[0].sale_number().sequence(), 5);
        assert!(beyond.is_empty());
    }

    #[tokio::test]
    async fn empty_table() {
        let repository = get_test_repository().await;

        let (sales, total) = repository.list_page(1, 10).await.unwrap();

        assert!(sales.is_empty());
        assert_eq!(total, 0);
    }
}

mod numbering {
    use super::*;

    #[tokio::test]
    async fn allocation_continues_after_stored_numbers() {
        let repository = get_test_repository().await;
        let mut sale = simple_sale(41, 0);
        repository.insert(&mut sale).await.unwrap();

        assert_eq!(
            repository.allocate_number_for_year(2025).await.unwrap(),
            SaleNumber::new(2025, 42)
        );
        assert_eq!(
            repository.allocate_number_for_year(2025).await.unwrap(),
            SaleNumber::new(2025, 43)
        );
        assert_eq!(
            repository.allocate_number_for_year(2026).await.unwrap(),
            SaleNumber::new(2026, 1)
        );
    }

    #[tokio::test]
    async fn concurrent_allocations_are_unique() {
        let repository = get_test_repository().await;

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let repository = repository.clone();
                tokio::spawn(async move { repository.allocate_number_for_year(2025).await })
            })
            .collect();

        let mut sequences = Vec::new();
        for handle in handles {
            sequences.push(handle.await.unwrap().unwrap().sequence());
        }
        sequences.sort_unstable();

        assert_eq!(sequences, (1..=20).collect::<Vec<u32>>());
    }
}

mod service {
    use super::*;

    #[tokio::test]
    async fn create_and_partially_cancel() {
        let repository = get_test_repository().await;
        let service = SaleService::new(repository.clone(), LoggingEventPublisher);

        let created = service
            .create_sale(CreateSale::new(
                CustomerId::new(),
                "Jane Doe",
                BranchId::new(),
                "Downtown",
                vec![SaleItemInput::new(
                    ProductId::new(),
                    "Beer",
                    10,
                    Money::from_cents(1000),
                )],
            ))
            .await
            .unwrap();
        assert_eq!(created.sale_number.sequence(), 1);

        let view = service.get_sale(GetSale::new(created.id)).await.unwrap();
        assert_eq!(view.total_amount, Money::from_cents(8000));

        service
            .cancel_sale_item(CancelSaleItem::partial(created.id, view.items[0].id, 5))
            .await
            .unwrap();

        let view = service.get_sale(GetSale::new(created.id)).await.unwrap();
        assert_eq!(view.items[0].quantity, 5);
        assert_eq!(view.items[0].discount_percent, Decimal::TEN);
        assert_eq!(view.total_amount, Money::from_cents(4500));

        let stored = repository.load_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.version(), 2);
    }
}
