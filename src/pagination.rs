use std::collections::VecDeque;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::{OpenStackClient, decode_json, ensure_success};
use crate::error::Error;

/// Single-pass cursor over a paginated listing.
///
/// Pages are fetched on demand: a page request is only issued once every item
/// of the previous page has been yielded, and dropping the cursor early stops
/// all further requests. The cursor follows the `next` link in each page body
/// and terminates when a page carries none. It is not restartable; a fresh
/// listing call starts over from the first page.
pub struct Paginated<'a, T> {
    client: &'a OpenStackClient,
    operation: &'static str,
    /// JSON field holding the page's items (`servers`, `images`, `volumes`).
    collection: &'static str,
    next_url: Option<String>,
    buffered: VecDeque<T>,
}

impl<T> std::fmt::Debug for Paginated<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginated")
            .field("operation", &self.operation)
            .field("collection", &self.collection)
            .field("next_url", &self.next_url)
            .field("buffered_len", &self.buffered.len())
            .finish_non_exhaustive()
    }
}

impl<'a, T: DeserializeOwned> Paginated<'a, T> {
    pub(crate) fn new(
        client: &'a OpenStackClient,
        operation: &'static str,
        collection: &'static str,
        url: String,
    ) -> Self {
        Self {
            client,
            operation,
            collection,
            next_url: Some(url),
            buffered: VecDeque::new(),
        }
    }

    /// Yield the next item, fetching the next page when the buffer runs dry.
    ///
    /// Returns `Ok(None)` once the final page is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] on a non-2xx page response and
    /// [`Error::Decode`] when a page body lacks the expected shape. Either
    /// aborts the listing; the cursor yields nothing afterwards.
    pub async fn try_next(&mut self) -> Result<Option<T>, Error> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Ok(Some(item));
            }
            let Some(url) = self.next_url.take() else {
                return Ok(None);
            };
            self.fetch_page(&url).await?;
        }
    }

    /// Drain the remaining pages into a `Vec`.
    ///
    /// # Errors
    ///
    /// Same as [`try_next`](Self::try_next).
    pub async fn try_collect(mut self) -> Result<Vec<T>, Error> {
        let mut items = Vec::new();
        while let Some(item) = self.try_next().await? {
            items.push(item);
        }
        Ok(items)
    }

    async fn fetch_page(&mut self, url: &str) -> Result<(), Error> {
        let response = self.client.get(url).await?;
        let response = ensure_success(response, self.operation).await?;
        let page: Value = decode_json(response, self.operation).await?;

        let Some(items) = page.get(self.collection) else {
            return Err(Error::Decode {
                operation: self.operation,
                detail: format!("missing `{}` array", self.collection),
            });
        };
        self.buffered = serde_json::from_value::<Vec<T>>(items.clone())
            .map_err(|e| Error::Decode {
                operation: self.operation,
                detail: e.to_string(),
            })?
            .into();
        self.next_url = page.get("next").and_then(Value::as_str).map(str::to_owned);
        Ok(())
    }
}
