//! Edge function calls (`/functions/v1`), guarded per function name.

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::{SupabaseClient, require_name};
use crate::error::Result;

impl SupabaseClient {
    /// Invoke `name` with the client's default call window.
    ///
    /// Fails with [`Rejection::Throttled`](crate::guard::Rejection) when the
    /// previous call to `name` started less than the window ago, or
    /// [`Rejection::InFlight`](crate::guard::Rejection) while it is still
    /// running. Backend failures are returned as they are.
    pub async fn invoke<B, T>(&self, name: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.invoke_with_window(name, body, self.guard.default_window()).await
    }

    pub async fn invoke_with_window<B, T>(
        &self,
        name: &str,
        body: &B,
        window: Duration,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let _loading = self.loading.begin(&format!("Calling {}", name));
        // the guard key must be exactly the function that gets called
        require_name("function", name)?;

        self.guard
            .attempt(name, window, || async move {
                let url = self.endpoint(&["functions", "v1", name])?;
                self.send_json(self.request(Method::POST, url).json(body)).await
            })
            .await
    }
}
