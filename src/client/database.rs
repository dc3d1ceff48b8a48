//! Row CRUD and RPC through PostgREST (`/rest/v1`).

use reqwest::{Method, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{SupabaseClient, require_name};
use crate::error::{Error, Result};
use crate::query::Filter;

const RETURN_REPRESENTATION: &str = "return=representation";
const UPSERT_PREFERENCE: &str = "resolution=merge-duplicates,return=representation";

impl SupabaseClient {
    fn table_url(&self, table: &str, filter: &Filter) -> Result<Url> {
        require_name("table", table)?;
        let mut url = self.endpoint(&["rest", "v1", table])?;
        if !filter.is_empty() {
            url.query_pairs_mut().extend_pairs(filter.to_params());
        }
        Ok(url)
    }

    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
        filter: &Filter,
    ) -> Result<Vec<T>> {
        let _loading = self.loading.begin(&format!("Loading {}", table));
        require_name("table", table)?;

        let mut url = self.endpoint(&["rest", "v1", table])?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", if columns.is_empty() { "*" } else { columns });
            pairs.extend_pairs(filter.to_params());
        }

        self.send_json(self.request(Method::GET, url)).await
    }

    /// Insert one row or an array of rows; returns the stored rows.
    pub async fn insert<B, T>(&self, table: &str, rows: &B) -> Result<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let _loading = self.loading.begin(&format!("Saving {}", table));
        let url = self.table_url(table, &Filter::new())?;
        let builder = self
            .request(Method::POST, url)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(rows);
        self.send_json(builder).await
    }

    /// Insert, merging into existing rows that collide on the primary key.
    pub async fn upsert<B, T>(&self, table: &str, rows: &B) -> Result<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let _loading = self.loading.begin(&format!("Saving {}", table));
        let url = self.table_url(table, &Filter::new())?;
        let builder = self
            .request(Method::POST, url)
            .header("Prefer", UPSERT_PREFERENCE)
            .json(rows);
        self.send_json(builder).await
    }

    pub async fn update<B, T>(&self, table: &str, values: &B, filter: &Filter) -> Result<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let _loading = self.loading.begin(&format!("Updating {}", table));
        ensure_row_filter("update", filter)?;
        let url = self.table_url(table, filter)?;
        let builder = self
            .request(Method::PATCH, url)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(values);
        self.send_json(builder).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        table: &str,
        filter: &Filter,
    ) -> Result<Vec<T>> {
        let _loading = self.loading.begin(&format!("Deleting from {}", table));
        ensure_row_filter("delete", filter)?;
        let url = self.table_url(table, filter)?;
        let builder = self
            .request(Method::DELETE, url)
            .header("Prefer", RETURN_REPRESENTATION);
        self.send_json(builder).await
    }

    /// Call a Postgres function exposed by PostgREST.
    pub async fn rpc<P, T>(&self, function: &str, params: &P) -> Result<T>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let _loading = self.loading.begin(&format!("Running {}", function));
        require_name("function", function)?;
        let url = self.endpoint(&["rest", "v1", "rpc", function])?;
        self.send_json(self.request(Method::POST, url).json(params)).await
    }
}

// PATCH/DELETE without a row filter would hit the whole table
fn ensure_row_filter(action: &str, filter: &Filter) -> Result<()> {
    if filter.has_row_filter() {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "{} requires at least one eq/in filter",
            action
        )))
    }
}
