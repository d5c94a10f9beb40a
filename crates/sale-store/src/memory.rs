use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use common::SaleId;
use domain::{Sale, SaleNumber, SaleRepository, StoreError, StoreResult};
use tokio::sync::RwLock;

/// In-memory sale repository.
///
/// This implementation keeps all sales in memory and provides the same
/// interface and concurrency checks as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemorySaleRepository {
    state: Arc<RwLock<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    sales: HashMap<SaleId, Sale>,
    counters: HashMap<i32, u32>,
}

impl InMemorySaleRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored sales.
    pub async fn sale_count(&self) -> usize {
        self.state.read().await.sales.len()
    }

    /// Removes all sales and resets the number counters.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.sales.clear();
        state.counters.clear();
    }

    /// Reserves the next sale number within `year`.
    ///
    /// The first allocation for a year continues after the highest number
    /// already stored for it.
    pub async fn allocate_number_for_year(&self, year: i32) -> SaleNumber {
        let mut state = self.state.write().await;
        let MemoryState { sales, counters } = &mut *state;

        let last = counters.entry(year).or_insert_with(|| {
            SaleNumber::next_in(year, sales.values().map(Sale::sale_number)).sequence() - 1
        });
        *last += 1;
        SaleNumber::new(year, *last)
    }
}

#[async_trait]
impl SaleRepository for InMemorySaleRepository {
    async fn load_by_id(&self, id: SaleId) -> StoreResult<Option<Sale>> {
        Ok(self.state.read().await.sales.get(&id).cloned())
    }

    async fn load_by_number(&self, sale_number: &SaleNumber) -> StoreResult<Option<Sale>> {
        let state = self.state.read().await;
        Ok(state
            .sales
            .values()
            .find(|sale| sale.sale_number() == sale_number)
            .cloned())
    }

    async fn insert(&self, sale: &mut Sale) -> StoreResult<()> {
        let mut state = self.state.write().await;

        if state
            .sales
            .values()
            .any(|stored| stored.sale_number() == sale.sale_number())
        {
            tracing::debug!(sale_number = %sale.sale_number(), "sale number already taken");
            return Err(StoreError::DuplicateSaleNumber {
                sale_number: sale.sale_number().clone(),
            });
        }

        if let Some(stored) = state.sales.get(&sale.id()) {
            return Err(StoreError::ConcurrencyConflict {
                sale_id: sale.id(),
                expected: 0,
                actual: stored.version(),
            });
        }

        sale.set_version(1);
        state.sales.insert(sale.id(), sale.clone());
        Ok(())
    }

    async fn save(&self, sale: &mut Sale) -> StoreResult<()> {
        let mut state = self.state.write().await;

        let stored_version = state
            .sales
            .get(&sale.id())
            .map(Sale::version)
            .ok_or(StoreError::NotStored { sale_id: sale.id() })?;

        if stored_version != sale.version() {
            return Err(StoreError::ConcurrencyConflict {
                sale_id: sale.id(),
                expected: sale.version(),
                actual: stored_version,
            });
        }

        sale.set_version(stored_version + 1);
        state.sales.insert(sale.id(), sale.clone());
        Ok(())
    }

    async fn delete(&self, id: SaleId) -> StoreResult<bool> {
        Ok(self.state.write().await.sales.remove(&id).is_some())
    }

    async fn list_page(&self, page: u32, page_size: u32) -> StoreResult<(Vec<Sale>, u64)> {
        let state = self.state.read().await;

        let mut sales: Vec<&Sale> = state.sales.values().collect();
        sales.sort_by(|a, b| {
            b.sale_date()
                .cmp(&a.sale_date())
                .then_with(|| number_key(b).cmp(&number_key(a)))
        });

        let offset = page.saturating_sub(1) as usize * page_size as usize;
        let items = sales
            .into_iter()
            .skip(offset)
            .take(page_size as usize)
            .cloned()
            .collect();

        Ok((items, state.sales.len() as u64))
    }

    async fn allocate_next_number(&self) -> StoreResult<SaleNumber> {
        Ok(self.allocate_number_for_year(Utc::now().year()).await)
    }
}

fn number_key(sale: &Sale) -> (i32, u32) {
    (sale.sale_number().year(), sale.sale_number().sequence())
}
