//! Dining tables.

use waiterdesk_core::prelude::*;
use waiterdesk_core::{require_id, DiningTable, NewTable, TableUpdate};

use crate::http::{path_segment, ApiClient, HttpBackend, ReqwestBackend};

pub struct TableService<B = ReqwestBackend> {
    api: ApiClient<B>,
}

impl<B: HttpBackend + Sync> TableService<B> {
    pub fn new(api: ApiClient<B>) -> Self {
        Self { api }
    }

    pub async fn list(&self, restaurant_id: &str) -> Result<Vec<DiningTable>> {
        require_id("restaurantId", restaurant_id)?;
        self.api
            .get(&format!("restaurants/{}/tables", path_segment(restaurant_id)))
            .await
            .with_context(|| format!("Failed to list tables for restaurant {restaurant_id}"))
    }

    pub async fn create(&self, restaurant_id: &str, table: &NewTable) -> Result<DiningTable> {
        require_id("restaurantId", restaurant_id)?;
        table.validate()?;
        self.api
            .post(
                &format!("restaurants/{}/tables", path_segment(restaurant_id)),
                table,
            )
            .await
            .with_context(|| format!("Failed to create table '{}'", table.name))
    }

    pub async fn update(&self, table_id: &str, changes: &TableUpdate) -> Result<DiningTable> {
        require_id("tableId", table_id)?;
        changes.validate()?;
        self.api
            .put(&format!("tables/{}", path_segment(table_id)), changes)
            .await
            .with_context(|| format!("Failed to update table {table_id}"))
    }

    pub async fn delete(&self, table_id: &str) -> Result<()> {
        require_id("tableId", table_id)?;
        self.api
            .delete(&format!("tables/{}", path_segment(table_id)))
            .await
            .with_context(|| format!("Failed to delete table {table_id}"))
    }
}
