//! Data-provider operations of the content store.
//!
//! Rows live in one [`DataBook`] per `(screen, provider)`. A modal popup
//! reading a provider owned by another screen shares the owner's book:
//! writes land there. A write through either screen notifies the owner and
//! every open popup reading the book.

use thinview_core::{owner_screen, MetaData, Row, SelectedRow, SortDefinition, CURRENT_PAGE};

use super::{BookKey, ContentStore};
use crate::data_book::DataBook;
use crate::subscription::{StoreEvent, Topic};

impl ContentStore {
    fn is_popup(&self, screen: &str) -> bool {
        self.component_by_name(screen)
            .and_then(|c| c.screen().map(|s| s.modal))
            .unwrap_or(false)
    }

    /// Screen whose book stores `provider` when accessed from `screen`.
    pub fn book_screen(&self, screen: &str, provider: &str) -> String {
        match owner_screen(provider) {
            Some(owner) if owner != screen && self.is_popup(screen) => owner.to_string(),
            _ => screen.to_string(),
        }
    }

    /// Screens to notify for a change to the book stored under `storage`
    /// made through `screen`. Open popups reading that book are included.
    fn audience(&self, screen: &str, storage: &str, provider: &str) -> Vec<String> {
        let mut targets = vec![storage.to_string()];
        if screen != storage {
            targets.push(screen.to_string());
        }
        for popup in self.screens() {
            let name = &popup.name;
            if targets.contains(name) || !popup.screen().is_some_and(|s| s.modal) {
                continue;
            }
            if self.book_screen(name, provider) == storage {
                targets.push(name.clone());
            }
        }
        targets
    }

    fn book_mut(&mut self, screen: &str, provider: &str) -> (String, &mut DataBook) {
        let storage = self.book_screen(screen, provider);
        let book = self
            .data_books
            .entry(BookKey::new(&storage, provider))
            .or_default();
        (storage, book)
    }

    /// Snapshot of the book `screen` sees for `provider`.
    pub fn data_book(&self, screen: &str, provider: &str) -> Option<DataBook> {
        let storage = self.book_screen(screen, provider);
        self.data_books.get(&BookKey::new(&storage, provider)).cloned()
    }

    /// Providers with a book stored under `screen`.
    pub fn data_providers(&self, screen: &str) -> Vec<String> {
        let mut providers: Vec<String> = self
            .data_books
            .keys()
            .filter(|key| key.screen == screen)
            .map(|key| key.provider.clone())
            .collect();
        providers.sort();
        providers
    }

    // ─────────────────────────────────────────────────────────
    // Rows
    // ─────────────────────────────────────────────────────────

    pub fn update_data_provider_data(
        &mut self,
        screen: &str,
        provider: &str,
        page: Option<&str>,
        from: usize,
        rows: Vec<Row>,
        all_fetched: bool,
    ) {
        let page = page.unwrap_or(CURRENT_PAGE);
        let (storage, book) = self.book_mut(screen, provider);
        let selection = book.selected_row().clone();
        book.update_rows(page, from, rows, all_fetched);
        let selection_changed = *book.selected_row() != selection;

        tracing::debug!(
            "{} rows in page {} of {} ({})",
            book.page(page).map_or(0, <[Row]>::len),
            page,
            provider,
            storage
        );
        self.notify_rows(screen, &storage, provider, page);
        if selection_changed {
            self.notify_selection(screen, &storage, provider);
        }
    }

    pub fn insert_data_provider_data(
        &mut self,
        screen: &str,
        provider: &str,
        page: Option<&str>,
        index: usize,
        row: Row,
    ) {
        let page = page.unwrap_or(CURRENT_PAGE);
        let (storage, book) = self.book_mut(screen, provider);
        let selection = book.selected_row().clone();
        book.insert_row(page, index, row);
        let selection_changed = *book.selected_row() != selection;

        self.notify_rows(screen, &storage, provider, page);
        if selection_changed {
            self.notify_selection(screen, &storage, provider);
        }
    }

    pub fn delete_data_provider_data(
        &mut self,
        screen: &str,
        provider: &str,
        page: Option<&str>,
        index: usize,
    ) -> Option<Row> {
        let page = page.unwrap_or(CURRENT_PAGE);
        let (storage, book) = self.book_mut(screen, provider);
        let selection = book.selected_row().clone();
        let removed = book.delete_row(page, index)?;
        let selection_changed = *book.selected_row() != selection;

        self.notify_rows(screen, &storage, provider, page);
        if selection_changed {
            self.notify_selection(screen, &storage, provider);
        }
        Some(removed)
    }

    /// Merge changed column values into one existing row.
    pub fn patch_data_provider_row(
        &mut self,
        screen: &str,
        provider: &str,
        page: Option<&str>,
        index: usize,
        values: Row,
    ) -> bool {
        let page = page.unwrap_or(CURRENT_PAGE);
        let (storage, book) = self.book_mut(screen, provider);
        if !book.patch_row(page, index, values) {
            tracing::debug!("No row {} in page {} of {} to patch", index, page, provider);
            return false;
        }
        self.notify_rows(screen, &storage, provider, page);
        true
    }

    /// Clear one page, or all pages when `page` is `None`.
    pub fn clear_data_provider_data(&mut self, screen: &str, provider: &str, page: Option<&str>) {
        let (storage, book) = self.book_mut(screen, provider);
        let selection = book.selected_row().clone();
        book.clear(page);
        let selection_changed = *book.selected_row() != selection;

        self.notify_rows(screen, &storage, provider, page.unwrap_or(CURRENT_PAGE));
        if selection_changed {
            self.notify_selection(screen, &storage, provider);
        }
    }

    // ─────────────────────────────────────────────────────────
    // Selection, sort, metadata
    // ─────────────────────────────────────────────────────────

    pub fn set_selected_row(&mut self, screen: &str, provider: &str, selection: SelectedRow) {
        let (storage, book) = self.book_mut(screen, provider);
        book.set_selected_row(selection);
        self.notify_selection(screen, &storage, provider);
    }

    pub fn clear_selected_row(&mut self, screen: &str, provider: &str) {
        let (storage, book) = self.book_mut(screen, provider);
        book.clear_selected_row();
        self.notify_selection(screen, &storage, provider);
    }

    pub fn set_sort_definition(&mut self, screen: &str, provider: &str, sort: Vec<SortDefinition>) {
        let (storage, book) = self.book_mut(screen, provider);
        book.set_sorted_columns(sort.clone());
        for target in self.audience(screen, &storage, provider) {
            self.subscriptions.publish(
                &Topic::sort_definition(&target, provider),
                &StoreEvent::SortDefinition {
                    screen: target.clone(),
                    provider: provider.to_string(),
                    sort: sort.clone(),
                },
            );
        }
    }

    pub fn set_meta_data(&mut self, screen: &str, meta_data: MetaData) {
        let provider = meta_data.data_provider.clone();
        let (storage, book) = self.book_mut(screen, &provider);
        book.set_meta_data(meta_data);
        let Some(shared) = book.meta_data().cloned() else {
            return;
        };
        for target in self.audience(screen, &storage, &provider) {
            self.subscriptions.publish(
                &Topic::meta_data(&target, &provider),
                &StoreEvent::MetaData {
                    screen: target.clone(),
                    provider: provider.clone(),
                    meta_data: shared.clone(),
                },
            );
        }
    }

    // ─────────────────────────────────────────────────────────
    // Notification
    // ─────────────────────────────────────────────────────────

    fn notify_rows(&self, screen: &str, storage: &str, provider: &str, page: &str) {
        let rows = self
            .data_books
            .get(&BookKey::new(storage, provider))
            .and_then(|book| book.page(page))
            .map(<[Row]>::to_vec)
            .unwrap_or_default();
        for target in self.audience(screen, storage, provider) {
            self.subscriptions.publish(
                &Topic::data_changed(&target, provider),
                &StoreEvent::DataChanged {
                    screen: target.clone(),
                    provider: provider.to_string(),
                    page: page.to_string(),
                    rows: rows.clone(),
                },
            );
        }
    }

    fn notify_selection(&self, screen: &str, storage: &str, provider: &str) {
        let selection = self
            .data_books
            .get(&BookKey::new(storage, provider))
            .map(|book| book.selected_row().clone())
            .unwrap_or_default();
        for target in self.audience(screen, storage, provider) {
            self.subscriptions.publish(
                &Topic::selected_row(&target, provider),
                &StoreEvent::SelectedRow {
                    screen: target.clone(),
                    provider: provider.to_string(),
                    selection: selection.clone(),
                },
            );
        }
    }
}
