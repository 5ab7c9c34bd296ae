//! Synchronized view of one remote collection.
//!
//! A [`SyncedResource`] owns the last confirmed snapshot of a collection and
//! is the only way the rest of the application talks to it. The snapshot is
//! only changed by server-confirmed results; the single exception is the
//! optimistic removal performed by [`PendingRemoval::confirm`], which is
//! rolled back if the server refuses.
//!
//! Reads are idempotent and retried per [`RetryPolicy`]. Writes are never
//! retried, are validated before any request is sent, and at most one write
//! per [`MutationKey`] may be in flight.

mod edit;
mod error;
mod pending;
mod query;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;

pub use error::SyncError;
pub use query::ListQuery;

use crate::api::{ApiClient, ApiError, ApiRequest, Transport};
use crate::events::{AppEvent, ChangeKind, Notice};
use crate::models::{
    FieldPatch, ItemId, Moderated, MutationKey, Resource, StatusTransitions, Validate,
};
use crate::normalize::{normalize_item, normalize_list, Page, Pagination};
use crate::retry::RetryPolicy;
use crate::upload::{validate_file, Attachment, RemoteUrl, UploadCoordinator};
use edit::EditBuffer;
use pending::{LoadingCounter, MutationGuard, PendingMutations, QueryCoalescer};

const CREATED_MESSAGE: &str = "Élément créé avec succès.";
const UPDATED_MESSAGE: &str = "Modifications enregistrées.";
const DELETED_MESSAGE: &str = "Élément supprimé.";
const STATUS_MESSAGE: &str = "Statut mis à jour.";

/// Where the current snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataOrigin {
    Live,
    /// Built-in demonstration data shown after the live read failed.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewStatus {
    Idle,
    Ready(DataOrigin),
    /// The last listing failed; holds the user-facing message.
    Failed(String),
    /// An auth signal pre-empted this view; the login redirect is pending.
    SessionEnded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<R> {
    pub items: Vec<R>,
    pub pagination: Pagination,
    pub origin: DataOrigin,
    pub query: ListQuery,
}

impl<R: Resource> Snapshot<R> {
    pub fn find(&self, id: &ItemId) -> Option<&R> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn position(&self, id: &ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.origin == DataOrigin::Fallback
    }
}

struct ViewState<R> {
    snapshot: Option<Snapshot<R>>,
    cache_valid: bool,
    /// Bumped by every confirmed mutation.
    generation: u64,
    last_query: Option<ListQuery>,
    status: ViewStatus,
}

impl<R> Default for ViewState<R> {
    fn default() -> Self {
        Self {
            snapshot: None,
            cache_valid: false,
            generation: 0,
            last_query: None,
            status: ViewStatus::Idle,
        }
    }
}

/// What the view looked like when a listing was issued.
#[derive(Debug, Clone, Copy)]
struct ListTicket {
    sequence: u64,
    generation: u64,
    epoch: u64,
}

pub struct SyncedResource<R: Resource, T: Transport> {
    api: Arc<ApiClient<T>>,
    uploads: UploadCoordinator<T>,
    retry: RetryPolicy,
    fallback: Option<Vec<R>>,
    state: Mutex<ViewState<R>>,
    edits: Mutex<EditBuffer>,
    mutations: PendingMutations,
    loading: LoadingCounter,
    coalescer: QueryCoalescer,
    list_sequence: AtomicU64,
    mounted: AtomicBool,
}

impl<R: Resource, T: Transport> SyncedResource<R, T> {
    pub fn new(api: Arc<ApiClient<T>>) -> Self {
        Self {
            uploads: UploadCoordinator::new(Arc::clone(&api)),
            api,
            retry: RetryPolicy::default(),
            fallback: None,
            state: Mutex::new(ViewState::default()),
            edits: Mutex::new(EditBuffer::default()),
            mutations: PendingMutations::default(),
            loading: LoadingCounter::default(),
            coalescer: QueryCoalescer::default(),
            list_sequence: AtomicU64::new(0),
            mounted: AtomicBool::new(true),
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Dataset shown when the live listing fails after all retries.
    #[must_use]
    pub fn with_fallback(mut self, items: Vec<R>) -> Self {
        self.fallback = Some(items);
        self
    }

    pub const fn api(&self) -> &Arc<ApiClient<T>> {
        &self.api
    }

    pub const fn uploads(&self) -> &UploadCoordinator<T> {
        &self.uploads
    }

    /// List the collection.
    ///
    /// An identical query with no confirmed mutation since the last live
    /// listing is answered from the snapshot without a request. Concurrent
    /// identical calls share one request.
    pub async fn list(&self, query: ListQuery) -> Result<Snapshot<R>, SyncError> {
        let query = query.normalized();
        if let Some(cached) = self.cached(&query) {
            tracing::debug!(resource = %R::KIND, "Listing served from snapshot");
            return Ok(cached);
        }

        let _turn = self.coalescer.acquire(&query.cache_key()).await;
        if let Some(cached) = self.cached(&query) {
            tracing::debug!(resource = %R::KIND, "Listing shared with concurrent caller");
            return Ok(cached);
        }
        self.load(query).await
    }

    /// Re-run the last query, ignoring the snapshot.
    pub async fn refresh(&self) -> Result<Snapshot<R>, SyncError> {
        let query = self.state().last_query.clone().unwrap_or_default();
        let _turn = self.coalescer.acquire(&query.cache_key()).await;
        self.load(query).await
    }

    /// Read a single item from the server.
    pub async fn fetch(&self, id: &ItemId) -> Result<R, SyncError> {
        let result = self.try_fetch(id).await;
        if let Err(error) = &result {
            self.report(error);
        }
        result
    }

    pub async fn create(&self, draft: &R::Draft) -> Result<R, SyncError> {
        self.create_inner(draft, None).await
    }

    /// Upload `attachment`, then create the item with the uploaded URL in
    /// the attachment's field. A failed upload sends no create request.
    pub async fn create_with_attachment(
        &self,
        draft: &R::Draft,
        attachment: &Attachment,
    ) -> Result<R, SyncError> {
        self.create_inner(draft, Some(attachment)).await
    }

    pub async fn update(&self, id: &ItemId, patch: &FieldPatch) -> Result<R, SyncError> {
        self.update_inner(id, patch, None).await
    }

    pub async fn update_with_attachment(
        &self,
        id: &ItemId,
        patch: &FieldPatch,
        attachment: &Attachment,
    ) -> Result<R, SyncError> {
        self.update_inner(id, patch, Some(attachment)).await
    }

    /// Start a removal. Nothing happens until [`PendingRemoval::confirm`].
    pub fn request_removal(&self, id: &ItemId) -> Result<PendingRemoval<'_, R, T>, SyncError> {
        if let Err(error) = self.ensure_live() {
            self.report(&error);
            return Err(error);
        }
        Ok(PendingRemoval {
            resource: self,
            id: id.clone(),
        })
    }

    pub fn stage_edit(&self, id: &ItemId, patch: FieldPatch) {
        self.edits().stage(id.clone(), patch);
    }

    pub fn staged(&self, id: &ItemId) -> Option<FieldPatch> {
        self.edits().get(id).cloned()
    }

    /// The snapshot item with its staged edits applied.
    pub fn edited_view(&self, id: &ItemId) -> Option<R> {
        let base = self.find(id)?;
        let Some(patch) = self.staged(id) else {
            return Some(base);
        };
        match patch.apply_to(&base) {
            Ok(edited) => Some(edited),
            Err(error) => {
                tracing::warn!(resource = %R::KIND, %id, "Staged edits do not fit the item: {}", error);
                Some(base)
            }
        }
    }

    pub fn discard_edits(&self, id: &ItemId) -> bool {
        self.edits().discard(id).is_some()
    }

    /// Send the staged edits as an update. They are cleared only once the
    /// server confirms; on failure they stay staged.
    pub async fn commit_edits(&self, id: &ItemId) -> Result<R, SyncError> {
        let Some(patch) = self.staged(id) else {
            let error = SyncError::NothingStaged(id.clone());
            self.report(&error);
            return Err(error);
        };
        let item = self.update(id, &patch).await?;

        let mut edits = self.edits();
        if edits.get(id) == Some(&patch) {
            edits.discard(id);
        }
        Ok(item)
    }

    pub fn items(&self) -> Vec<R> {
        self.state()
            .snapshot
            .as_ref()
            .map(|snapshot| snapshot.items.clone())
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> Option<Snapshot<R>> {
        self.state().snapshot.clone()
    }

    pub fn origin(&self) -> Option<DataOrigin> {
        self.state().snapshot.as_ref().map(|snapshot| snapshot.origin)
    }

    pub fn find(&self, id: &ItemId) -> Option<R> {
        self.state()
            .snapshot
            .as_ref()
            .and_then(|snapshot| snapshot.find(id).cloned())
    }

    /// Every view on a gate whose session ended reports it, including
    /// views whose own requests never failed.
    pub fn view_status(&self) -> ViewStatus {
        if self.api.gate().session_ended() {
            return ViewStatus::SessionEnded;
        }
        self.state().status.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_active() && !self.api.gate().session_ended()
    }

    pub fn is_pending(&self, key: &MutationKey) -> bool {
        self.mutations.contains(key)
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    /// Detach the view. Results that arrive later are dropped.
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
        self.edits().clear();
        tracing::debug!(resource = %R::KIND, "View unmounted");
    }

    async fn load(&self, query: ListQuery) -> Result<Snapshot<R>, SyncError> {
        let ticket = ListTicket {
            sequence: self.list_sequence.fetch_add(1, Ordering::SeqCst) + 1,
            generation: {
                let mut state = self.state();
                state.last_query = Some(query.clone());
                state.generation
            },
            epoch: self.api.gate().signal_epoch(),
        };
        let _loading = self.loading.begin();

        let request =
            ApiRequest::get(R::KIND.collection_path()).with_query(query.to_query_pairs());
        let operation = format!("list {}", R::KIND);
        let api = &self.api;
        let request = &request;
        let result = self
            .retry
            .run(&operation, move || api.send(request.clone()))
            .await
            .and_then(normalize_list::<R>);

        match result {
            Ok(page) => Ok(self.apply_page(ticket, query, page, DataOrigin::Live)),
            Err(error) => self.recover_list(ticket, query, error.into()),
        }
    }

    fn recover_list(
        &self,
        ticket: ListTicket,
        query: ListQuery,
        error: SyncError,
    ) -> Result<Snapshot<R>, SyncError> {
        if !self.is_mounted() {
            tracing::debug!(resource = %R::KIND, "Dropping failed listing for unmounted view");
            return Err(error);
        }
        if error.auth_signal().is_some() || self.pre_empted(ticket) {
            self.report(&error);
            return Err(error);
        }

        if let Some(fallback) = &self.fallback {
            tracing::warn!(resource = %R::KIND, "Listing failed, showing fallback data: {}", error);
            let page = Page::from_items(fallback.clone());
            return Ok(self.apply_page(ticket, query, page, DataOrigin::Fallback));
        }

        if self.is_current(ticket.sequence) {
            let message = error.user_message(self.api.generic_error_message());
            self.state().status = ViewStatus::Failed(message);
        }
        self.report(&error);
        Err(error)
    }

    fn apply_page(
        &self,
        ticket: ListTicket,
        query: ListQuery,
        page: Page<R>,
        origin: DataOrigin,
    ) -> Snapshot<R> {
        let snapshot = Snapshot {
            items: page.items,
            pagination: page.pagination,
            origin,
            query,
        };
        if !self.is_mounted() {
            tracing::debug!(resource = %R::KIND, "Dropping listing for unmounted view");
            return snapshot;
        }
        if self.pre_empted(ticket) {
            tracing::debug!(resource = %R::KIND, "Dropping listing issued before the session ended");
            self.state().status = ViewStatus::SessionEnded;
            return snapshot;
        }
        if !self.is_current(ticket.sequence) {
            tracing::debug!(resource = %R::KIND, sequence = ticket.sequence, "Dropping superseded listing");
            return snapshot;
        }

        let mut state = self.state();
        state.cache_valid = origin == DataOrigin::Live && state.generation == ticket.generation;
        state.status = ViewStatus::Ready(origin);
        state.snapshot = Some(snapshot.clone());
        snapshot
    }

    fn cached(&self, query: &ListQuery) -> Option<Snapshot<R>> {
        let state = self.state();
        if !state.cache_valid {
            return None;
        }
        state
            .snapshot
            .as_ref()
            .filter(|snapshot| &snapshot.query == query && snapshot.origin == DataOrigin::Live)
            .cloned()
    }

    fn is_current(&self, sequence: u64) -> bool {
        self.list_sequence.load(Ordering::SeqCst) == sequence
    }

    /// Whether an auth signal was handled after the listing was issued.
    fn pre_empted(&self, ticket: ListTicket) -> bool {
        self.api.gate().signal_epoch() != ticket.epoch
    }

    async fn try_fetch(&self, id: &ItemId) -> Result<R, SyncError> {
        let _loading = self.loading.begin();
        let request = ApiRequest::get(R::KIND.item_path(id));
        let operation = format!("fetch {}", R::KIND);
        let api = &self.api;
        let request = &request;
        self.retry
            .run(&operation, move || api.send(request.clone()))
            .await
            .and_then(normalize_item::<R>)
            .map_err(|error| item_error(id, error))
    }

    async fn create_inner(
        &self,
        draft: &R::Draft,
        attachment: Option<&Attachment>,
    ) -> Result<R, SyncError> {
        let result = self.try_create(draft, attachment).await;
        match &result {
            Ok(item) => self.announce(item.id(), ChangeKind::Created, CREATED_MESSAGE),
            Err(error) => self.report(error),
        }
        result
    }

    async fn try_create(
        &self,
        draft: &R::Draft,
        attachment: Option<&Attachment>,
    ) -> Result<R, SyncError> {
        draft.validate()?;
        if let Some(attachment) = attachment {
            validate_file(&attachment.file, attachment.kind)?;
        }
        let _guard = self.begin_mutation(MutationKey::new_item(R::KIND))?;
        let _loading = self.loading.begin();

        let mut body = serde_json::to_value(draft)?;
        if let Some(attachment) = attachment {
            let url = self.uploads.upload(&attachment.file, attachment.kind).await?;
            set_field(&mut body, &attachment.field, url)?;
        }

        let request = ApiRequest::post(R::KIND.collection_path()).with_json(body);
        let item: R = normalize_item(self.api.send(request).await?)?;
        self.record_change(|snapshot| snapshot.items.insert(0, item.clone()));
        Ok(item)
    }

    async fn update_inner(
        &self,
        id: &ItemId,
        patch: &FieldPatch,
        attachment: Option<&Attachment>,
    ) -> Result<R, SyncError> {
        let result = self.try_update(id, patch, attachment).await;
        match &result {
            Ok(item) => self.announce(item.id(), ChangeKind::Updated, UPDATED_MESSAGE),
            Err(error) => self.report(error),
        }
        result
    }

    async fn try_update(
        &self,
        id: &ItemId,
        patch: &FieldPatch,
        attachment: Option<&Attachment>,
    ) -> Result<R, SyncError> {
        match attachment {
            None => patch.validate()?,
            Some(attachment) => {
                patch.validate_fields()?;
                validate_file(&attachment.file, attachment.kind)?;
            }
        }
        self.ensure_live()?;
        let base = match self.find(id) {
            Some(item) => item,
            None => self.try_fetch(id).await?,
        };
        patch.validate_against(&base)?;
        let _guard = self.begin_mutation(MutationKey::item(R::KIND, id.clone()))?;
        let _loading = self.loading.begin();

        let mut sent = patch.clone();
        if let Some(attachment) = attachment {
            let url = self.uploads.upload(&attachment.file, attachment.kind).await?;
            sent.set(attachment.field.clone(), url.into_string());
        }

        let request = ApiRequest::put(R::KIND.item_path(id)).with_json(sent.clone().into_value());
        let response = self
            .api
            .send(request)
            .await
            .map_err(|error| item_error(id, error))?;
        let item = self.confirmed_item(id, response, &sent)?;
        self.record_change(|snapshot| replace_item(snapshot, item.clone()));
        Ok(item)
    }

    async fn remove(&self, id: &ItemId) -> Result<(), SyncError> {
        let result = self.try_remove(id).await;
        match &result {
            Ok(()) => self.announce(id, ChangeKind::Deleted, DELETED_MESSAGE),
            Err(error) => self.report(error),
        }
        result
    }

    async fn try_remove(&self, id: &ItemId) -> Result<(), SyncError> {
        self.ensure_live()?;
        let _guard = self.begin_mutation(MutationKey::item(R::KIND, id.clone()))?;
        let _loading = self.loading.begin();

        let removed = self.take_item(id);
        match self.api.send(ApiRequest::delete(R::KIND.item_path(id))).await {
            Ok(_) => {
                self.record_change(|_| {});
                Ok(())
            }
            Err(error) => {
                if let Some((index, item)) = removed {
                    self.restore_item(index, item);
                }
                Err(item_error(id, error))
            }
        }
    }

    /// The item the server confirmed. Endpoints that answer without the
    /// item get the sent fields overlaid on the snapshot entry.
    fn confirmed_item(&self, id: &ItemId, response: Value, sent: &FieldPatch) -> Result<R, SyncError> {
        match normalize_item::<R>(response) {
            Ok(item) => Ok(item),
            Err(error) => match self.find(id) {
                Some(base) => Ok(sent.apply_to(&base)?),
                None => Err(error.into()),
            },
        }
    }

    fn begin_mutation(&self, key: MutationKey) -> Result<MutationGuard<'_>, SyncError> {
        self.mutations.try_begin(key.clone()).ok_or_else(|| {
            tracing::debug!(%key, "Mutation rejected, key already in flight");
            SyncError::MutationInFlight(key)
        })
    }

    fn ensure_live(&self) -> Result<(), SyncError> {
        let on_fallback = self
            .state()
            .snapshot
            .as_ref()
            .is_some_and(Snapshot::is_fallback);
        if on_fallback {
            return Err(SyncError::FallbackSnapshot);
        }
        Ok(())
    }

    fn take_item(&self, id: &ItemId) -> Option<(usize, R)> {
        let mut state = self.state();
        let snapshot = state.snapshot.as_mut()?;
        let index = snapshot.position(id)?;
        Some((index, snapshot.items.remove(index)))
    }

    fn restore_item(&self, index: usize, item: R) {
        let mut state = self.state();
        if let Some(snapshot) = state.snapshot.as_mut() {
            if snapshot.position(item.id()).is_none() {
                let index = index.min(snapshot.items.len());
                snapshot.items.insert(index, item);
            }
        }
    }

    /// Apply a confirmed change to the snapshot and invalidate the cache.
    fn record_change(&self, change: impl FnOnce(&mut Snapshot<R>)) {
        let mut state = self.state();
        state.generation += 1;
        state.cache_valid = false;
        if let Some(snapshot) = state.snapshot.as_mut() {
            change(snapshot);
        }
    }

    fn announce(&self, id: &ItemId, change: ChangeKind, message: &str) {
        tracing::info!(resource = %R::KIND, %id, ?change, "Change confirmed by server");
        let bus = self.api.bus();
        bus.publish(AppEvent::ResourceChanged {
            kind: R::KIND,
            id: id.clone(),
            change,
        });
        bus.notify(Notice::success(message));
    }

    /// Surface a failure. Auth failures pre-empt local display: the gate has
    /// already notified the user, so this view only marks its session ended.
    /// Server failures that arrive after the session ended are pre-empted too.
    fn report(&self, error: &SyncError) {
        let signal = error.auth_signal();
        if signal.is_some() || (!error.is_local() && self.api.gate().session_ended()) {
            tracing::debug!(resource = %R::KIND, ?signal, "Operation pre-empted by auth signal");
            self.state().status = ViewStatus::SessionEnded;
            self.loading.clear();
            return;
        }
        tracing::warn!(resource = %R::KIND, "{}", error);
        self.api
            .bus()
            .notify(Notice::error(error.user_message(self.api.generic_error_message())));
    }

    fn state(&self) -> MutexGuard<'_, ViewState<R>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn edits(&self) -> MutexGuard<'_, EditBuffer> {
        self.edits.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R: Moderated, T: Transport> SyncedResource<R, T> {
    /// Move an item to `next`.
    ///
    /// The transition is checked against the item's current status before
    /// any request is sent. Items missing from the snapshot are fetched
    /// first to learn their status.
    pub async fn set_status(&self, id: &ItemId, next: R::Status) -> Result<R, SyncError> {
        let result = self.try_set_status(id, next).await;
        match &result {
            Ok(item) => self.announce(item.id(), ChangeKind::Updated, STATUS_MESSAGE),
            Err(error) => self.report(error),
        }
        result
    }

    async fn try_set_status(&self, id: &ItemId, next: R::Status) -> Result<R, SyncError> {
        self.ensure_live()?;
        let current = match self.find(id) {
            Some(item) => item,
            None => self.try_fetch(id).await?,
        };

        let from = current.status();
        if !from.can_transition_to(next) {
            return Err(SyncError::InvalidTransition {
                from: from.to_string(),
                to: next.to_string(),
            });
        }

        let _guard = self.begin_mutation(MutationKey::item(R::KIND, id.clone()))?;
        let _loading = self.loading.begin();

        let sent = FieldPatch::new().with("status", next.to_string());
        let request =
            ApiRequest::put(R::KIND.action_path(id, "status")).with_json(sent.clone().into_value());
        let response = self
            .api
            .send(request)
            .await
            .map_err(|error| item_error(id, error))?;

        let item = match normalize_item::<R>(response) {
            Ok(item) => item,
            Err(_) => sent.apply_to(&current)?,
        };
        self.record_change(|snapshot| replace_item(snapshot, item.clone()));
        Ok(item)
    }
}

/// A removal awaiting the user's confirmation.
#[must_use = "a removal does nothing until confirmed"]
pub struct PendingRemoval<'a, R: Resource, T: Transport> {
    resource: &'a SyncedResource<R, T>,
    id: ItemId,
}

impl<R: Resource, T: Transport> PendingRemoval<'_, R, T> {
    pub const fn id(&self) -> &ItemId {
        &self.id
    }

    /// The snapshot entry that would be removed.
    pub fn item(&self) -> Option<R> {
        self.resource.find(&self.id)
    }

    /// Remove the item from the view, then delete it on the server. The item
    /// is put back at its original position if the server refuses.
    pub async fn confirm(self) -> Result<(), SyncError> {
        self.resource.remove(&self.id).await
    }

    pub fn cancel(self) {
        tracing::debug!(resource = %R::KIND, id = %self.id, "Removal cancelled");
    }
}

fn item_error(id: &ItemId, error: ApiError) -> SyncError {
    match error {
        ApiError::NotFound(_) => SyncError::NotFound(id.clone()),
        other => SyncError::Api(other),
    }
}

fn set_field(body: &mut Value, field: &str, url: RemoteUrl) -> Result<(), SyncError> {
    let Value::Object(fields) = body else {
        return Err(SyncError::Encoding("payload is not a JSON object".to_string()));
    };
    fields.insert(field.to_string(), Value::String(url.into_string()));
    Ok(())
}

fn replace_item<R: Resource>(snapshot: &mut Snapshot<R>, item: R) {
    if let Some(index) = snapshot.position(item.id()) {
        snapshot.items[index] = item;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::api::RequestBody;
    use crate::events::{EventBus, NoticeLevel};
    use crate::models::{ModerationStatus, News, NewsDraft, Post, ResourceKind, ValidationError};
    use crate::test_support::{ok_json, signed_in_gate_on, status_json, FakeTransport};
    use crate::upload::{LocalFile, IMAGE_MAX_BYTES};

    type NewsView = SyncedResource<News, FakeTransport>;
    type PostView = SyncedResource<Post, FakeTransport>;

    fn news_list() -> Value {
        json!({
            "items": [
                {"id": 1, "title": "Conseil municipal", "content": "Séance publique jeudi à 19h.", "status": "published"},
                {"id": 2, "title": "Travaux rue Pasteur", "content": "Circulation alternée jusqu'au 4 mai.", "status": "draft"},
                {"id": 3, "title": "Marché de Noël", "content": "Chalets sur la place de l'église.", "status": "published"}
            ],
            "pagination": {"page": 1, "limit": 10, "total": 3, "pages": 1}
        })
    }

    fn view<R: Resource>(transport: &FakeTransport, bus: &EventBus) -> SyncedResource<R, FakeTransport> {
        let api = ApiClient::new(transport.clone(), signed_in_gate_on(bus.clone()));
        SyncedResource::new(Arc::new(api))
    }

    fn ids<R: Resource>(items: &[R]) -> Vec<String> {
        items.iter().map(|item| item.id().to_string()).collect()
    }

    async fn loaded_news(transport: &FakeTransport, bus: &EventBus) -> NewsView {
        transport.push(ok_json(news_list()));
        let news: NewsView = view(transport, bus);
        news.list(ListQuery::new()).await.unwrap();
        news
    }

    fn notices(receiver: &mut tokio::sync::broadcast::Receiver<AppEvent>) -> Vec<Notice> {
        let mut notices = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            if let AppEvent::Notice(notice) = event {
                notices.push(notice);
            }
        }
        notices
    }

    #[tokio::test]
    async fn repeated_identical_listing_is_served_from_snapshot() {
        let transport = FakeTransport::new();
        let bus = EventBus::default();
        let news = loaded_news(&transport, &bus).await;

        let second = news.list(ListQuery::new()).await.unwrap();

        assert_eq!(transport.calls().len(), 1);
        assert_eq!(ids(&second.items), vec!["1", "2", "3"]);
        assert_eq!(second.origin, DataOrigin::Live);
        assert_eq!(news.view_status(), ViewStatus::Ready(DataOrigin::Live));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_identical_listings_share_one_request() {
        let transport = FakeTransport::new();
        transport.push_delayed(Duration::from_millis(50), ok_json(news_list()));
        let news: NewsView = view(&transport, &EventBus::default());

        let (first, second) = tokio::join!(news.list(ListQuery::new()), news.list(ListQuery::new()));

        assert_eq!(first.unwrap(), second.unwrap());
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn listing_sends_filters_as_query_parameters() {
        let transport = FakeTransport::new();
        transport.push(ok_json(json!([])));
        let news: NewsView = view(&transport, &EventBus::default());

        news.list(ListQuery::new().search("fête").page(2).limit(5))
            .await
            .unwrap();

        let calls = transport.calls();
        assert_eq!(calls[0].path, "/api/news");
        assert_eq!(
            calls[0].query,
            vec![
                ("search".to_string(), "fête".to_string()),
                ("page".to_string(), "2".to_string()),
                ("limit".to_string(), "5".to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_listing_is_dropped() {
        let transport = FakeTransport::new();
        transport.push_delayed(
            Duration::from_millis(100),
            ok_json(json!([{"id": 1, "title": "Ancienne recherche"}])),
        );
        transport.push_delayed(
            Duration::from_millis(10),
            ok_json(json!([{"id": 2, "title": "Nouvelle recherche"}])),
        );
        let news: NewsView = view(&transport, &EventBus::default());

        let (_, _) = tokio::join!(
            news.list(ListQuery::new().search("ancienne")),
            news.list(ListQuery::new().search("nouvelle"))
        );

        assert_eq!(ids(&news.items()), vec!["2"]);
        assert_eq!(
            news.snapshot().unwrap().query,
            ListQuery::new().search("nouvelle")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unmounted_view_drops_late_listing() {
        let transport = FakeTransport::new();
        transport.push_delayed(Duration::from_millis(100), ok_json(news_list()));
        let news: NewsView = view(&transport, &EventBus::default());

        let (result, ()) = tokio::join!(news.list(ListQuery::new()), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            news.unmount();
        });

        assert!(result.is_ok());
        assert!(news.snapshot().is_none());
        assert_eq!(news.view_status(), ViewStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_listing_without_fallback_reports_error() {
        let transport = FakeTransport::new();
        transport.push(status_json(503, json!({"message": "Maintenance en cours"})));
        transport.push(status_json(503, json!({"message": "Maintenance en cours"})));
        let bus = EventBus::default();
        let mut events = bus.subscribe();
        let news: NewsView = view(&transport, &bus);

        let error = news.list(ListQuery::new()).await.unwrap_err();

        assert!(matches!(error, SyncError::Api(ApiError::Server { status: 503, .. })));
        assert_eq!(
            news.view_status(),
            ViewStatus::Failed("Maintenance en cours".to_string())
        );
        assert_eq!(notices(&mut events), vec![Notice::error("Maintenance en cours")]);
        assert!(!news.is_loading());
    }

    #[tokio::test]
    async fn not_found_listing_is_not_retried() {
        let transport = FakeTransport::new();
        transport.push(status_json(404, json!({})));
        let news: NewsView = view(&transport, &EventBus::default());

        assert!(news.list(ListQuery::new()).await.is_err());
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn confirmed_update_replaces_entry_and_invalidates_snapshot() {
        let transport = FakeTransport::new();
        let bus = EventBus::default();
        let news = loaded_news(&transport, &bus).await;
        transport.push(ok_json(json!({
            "data": {"id": 2, "title": "Travaux terminés", "status": "draft"}
        })));
        transport.push(ok_json(news_list()));

        let updated = news
            .update(&ItemId::from(2), &FieldPatch::new().with("title", "Travaux terminés"))
            .await
            .unwrap();
        assert_eq!(updated.title, "Travaux terminés");
        assert_eq!(news.find(&ItemId::from(2)).unwrap().title, "Travaux terminés");

        news.list(ListQuery::new()).await.unwrap();
        assert_eq!(
            transport.paths(),
            vec!["GET /api/news", "PUT /api/news/2", "GET /api/news"]
        );
    }

    #[tokio::test]
    async fn update_response_without_item_overlays_sent_fields() {
        let transport = FakeTransport::new();
        let news = loaded_news(&transport, &EventBus::default()).await;
        transport.push(ok_json(json!({"message": "ok"})));

        let updated = news
            .update(&ItemId::from(1), &FieldPatch::new().with("category", "vie locale"))
            .await
            .unwrap();

        assert_eq!(updated.category.as_deref(), Some("vie locale"));
        assert_eq!(updated.title, "Conseil municipal");
    }

    #[tokio::test]
    async fn update_of_missing_item_is_not_found() {
        let transport = FakeTransport::new();
        let news = loaded_news(&transport, &EventBus::default()).await;
        transport.push(status_json(404, json!({"message": "Actualité introuvable"})));

        let error = news
            .update(&ItemId::from(99), &FieldPatch::new().with("title", "Inconnue"))
            .await
            .unwrap_err();

        assert_eq!(error, SyncError::NotFound(ItemId::from(99)));
        assert_eq!(transport.paths(), vec!["GET /api/news", "GET /api/news/99"]);
    }

    #[tokio::test(start_paused = true)]
    async fn second_mutation_on_same_item_is_rejected() {
        let transport = FakeTransport::new();
        let news = loaded_news(&transport, &EventBus::default()).await;
        transport.push_delayed(
            Duration::from_millis(50),
            ok_json(json!({"id": 1, "title": "Conseil du 12 mars"})),
        );
        let id = ItemId::from(1);
        let key = MutationKey::item(ResourceKind::News, id.clone());
        let twelfth = FieldPatch::new().with("title", "Conseil du 12 mars");
        let thirteenth = FieldPatch::new().with("title", "Conseil du 13 mars");

        let (first, second) = tokio::join!(news.update(&id, &twelfth), async {
            assert!(news.is_pending(&key));
            news.update(&id, &thirteenth).await
        });

        assert!(first.is_ok());
        assert_eq!(second.unwrap_err(), SyncError::MutationInFlight(key.clone()));
        assert!(!news.is_pending(&key));
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn update_cannot_change_status() {
        let transport = FakeTransport::new();
        transport.push(ok_json(json!({
            "posts": [{"id": 5, "title": "Nid de poule", "content": "Rue des Lilas", "status": "archived"}]
        })));
        let posts: PostView = view(&transport, &EventBus::default());
        posts.list(ListQuery::new()).await.unwrap();

        let error = posts
            .update(&ItemId::from(5), &FieldPatch::new().with("status", "pending"))
            .await
            .unwrap_err();

        assert_eq!(
            error,
            SyncError::Validation(ValidationError::new(
                "status can only be changed through the status action"
            ))
        );
        assert_eq!(posts.find(&ItemId::from(5)).unwrap().status, ModerationStatus::Archived);
        assert_eq!(transport.paths(), vec!["GET /api/posts"]);
    }

    #[tokio::test]
    async fn update_applies_the_create_rules_to_the_edited_item() {
        let transport = FakeTransport::new();
        let bus = EventBus::default();
        let news = loaded_news(&transport, &bus).await;
        let mut events = bus.subscribe();

        let error = news
            .update(&ItemId::from(1), &FieldPatch::new().with("title", "Ab"))
            .await
            .unwrap_err();

        assert_eq!(
            error,
            SyncError::Validation(ValidationError::new("title must be at least 5 characters"))
        );
        assert!(!news.is_pending(&MutationKey::item(ResourceKind::News, ItemId::from(1))));
        assert_eq!(transport.paths(), vec!["GET /api/news"]);
        assert_eq!(
            notices(&mut events),
            vec![Notice::error("title must be at least 5 characters")]
        );
    }

    #[tokio::test]
    async fn update_of_unlisted_item_checks_rules_against_fetched_copy() {
        let transport = FakeTransport::new();
        transport.push(ok_json(json!({
            "data": {"id": 9, "title": "Fête du village", "content": "Court"}
        })));
        let news: NewsView = view(&transport, &EventBus::default());

        let error = news
            .update(&ItemId::from(9), &FieldPatch::new().with("title", "Fête du village 2025"))
            .await
            .unwrap_err();

        assert_eq!(
            error,
            SyncError::Validation(ValidationError::new("content must be at least 10 characters"))
        );
        assert_eq!(transport.paths(), vec!["GET /api/news/9"]);
    }

    #[tokio::test]
    async fn create_rejects_invalid_draft_without_network() {
        let transport = FakeTransport::new();
        let bus = EventBus::default();
        let mut events = bus.subscribe();
        let news: NewsView = view(&transport, &bus);

        let draft = NewsDraft::new("Fête", "Programme complet du week-end");
        let error = news.create(&draft).await.unwrap_err();

        assert_eq!(error.to_string(), "title must be at least 5 characters");
        assert!(transport.calls().is_empty());
        assert_eq!(
            notices(&mut events),
            vec![Notice::error("title must be at least 5 characters")]
        );
    }

    #[tokio::test]
    async fn created_item_is_prepended_and_announced() {
        let transport = FakeTransport::new();
        let bus = EventBus::default();
        let news = loaded_news(&transport, &bus).await;
        let mut events = bus.subscribe();
        transport.push(ok_json(json!({"id": 10, "title": "Fête de la musique"})));

        let draft = NewsDraft::new("Fête de la musique", "Concerts place de la mairie");
        let created = news.create(&draft).await.unwrap();

        assert_eq!(created.id, ItemId::from(10));
        assert_eq!(ids(&news.items()), vec!["10", "1", "2", "3"]);
        assert_eq!(
            events.try_recv().unwrap(),
            AppEvent::ResourceChanged {
                kind: ResourceKind::News,
                id: ItemId::from(10),
                change: ChangeKind::Created,
            }
        );
        let calls = transport.calls();
        let RequestBody::Json(body) = &calls[1].body else {
            panic!("expected a JSON body");
        };
        assert_eq!(body["title"], "Fête de la musique");
    }

    #[tokio::test]
    async fn oversized_attachment_fails_before_any_request() {
        let transport = FakeTransport::new();
        let news: NewsView = view(&transport, &EventBus::default());
        let attachment = Attachment::image(
            LocalFile::new("photo.jpg", None, vec![0; IMAGE_MAX_BYTES + 1]),
            "image_url",
        );

        let error = news
            .create_with_attachment(&NewsDraft::new("Fête locale", "Programme du samedi"), &attachment)
            .await
            .unwrap_err();

        assert!(matches!(error, SyncError::Upload(_)));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn update_with_attachment_uploads_first() {
        let transport = FakeTransport::new();
        let news = loaded_news(&transport, &EventBus::default()).await;
        transport.push(ok_json(json!({"url": "/uploads/affiche.png"})));
        transport.push(ok_json(json!({
            "id": 3, "title": "Marché de Noël", "image_url": "/uploads/affiche.png"
        })));
        let attachment = Attachment::image(LocalFile::new("affiche.png", None, vec![1; 64]), "image_url");

        let updated = news
            .update_with_attachment(&ItemId::from(3), &FieldPatch::new(), &attachment)
            .await
            .unwrap();

        assert_eq!(updated.image_url.as_deref(), Some("/uploads/affiche.png"));
        assert_eq!(
            transport.paths(),
            vec!["GET /api/news", "POST /api/upload/image", "PUT /api/news/3"]
        );
        let calls = transport.calls();
        let RequestBody::Json(body) = &calls[2].body else {
            panic!("expected a JSON body");
        };
        assert_eq!(body, &json!({"image_url": "/uploads/affiche.png"}));
    }

    #[tokio::test]
    async fn cancelled_removal_leaves_list_untouched() {
        let transport = FakeTransport::new();
        let news = loaded_news(&transport, &EventBus::default()).await;

        let removal = news.request_removal(&ItemId::from(2)).unwrap();
        assert_eq!(removal.item().unwrap().title, "Travaux rue Pasteur");
        removal.cancel();

        assert_eq!(ids(&news.items()), vec!["1", "2", "3"]);
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn confirmed_removal_deletes_on_server() {
        let transport = FakeTransport::new();
        let bus = EventBus::default();
        let news = loaded_news(&transport, &bus).await;
        transport.push(Ok(crate::api::RawResponse::new(204, "")));

        news.request_removal(&ItemId::from(2))
            .unwrap()
            .confirm()
            .await
            .unwrap();

        assert_eq!(ids(&news.items()), vec!["1", "3"]);
        assert_eq!(transport.paths()[1], "DELETE /api/news/2");
    }

    #[tokio::test]
    async fn refused_removal_restores_item_in_place() {
        let transport = FakeTransport::new();
        let bus = EventBus::default();
        let news = loaded_news(&transport, &bus).await;
        let mut events = bus.subscribe();
        transport.push(status_json(409, json!({"message": "Actualité liée à un événement"})));

        let error = news
            .request_removal(&ItemId::from(2))
            .unwrap()
            .confirm()
            .await
            .unwrap_err();

        assert!(matches!(error, SyncError::Api(ApiError::Server { status: 409, .. })));
        assert_eq!(ids(&news.items()), vec!["1", "2", "3"]);
        assert_eq!(
            notices(&mut events),
            vec![Notice::error("Actualité liée à un événement")]
        );
    }

    #[tokio::test]
    async fn invalid_status_transition_sends_nothing() {
        let transport = FakeTransport::new();
        transport.push(ok_json(json!({
            "posts": [{"id": 5, "title": "Nid de poule", "status": "archived"}]
        })));
        let posts: PostView = view(&transport, &EventBus::default());
        posts.list(ListQuery::new()).await.unwrap();

        let error = posts
            .set_status(&ItemId::from(5), ModerationStatus::Published)
            .await
            .unwrap_err();

        assert_eq!(
            error,
            SyncError::InvalidTransition {
                from: "archived".to_string(),
                to: "published".to_string(),
            }
        );
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn status_change_fetches_unknown_item_first() {
        let transport = FakeTransport::new();
        transport.push(ok_json(json!({"post": {"id": 8, "title": "Banc cassé", "status": "pending"}})));
        transport.push(ok_json(json!({"success": true})));
        let posts: PostView = view(&transport, &EventBus::default());

        let post = posts
            .set_status(&ItemId::from(8), ModerationStatus::Blocked)
            .await
            .unwrap();

        assert_eq!(post.status, ModerationStatus::Blocked);
        assert_eq!(
            transport.paths(),
            vec!["GET /api/posts/8", "PUT /api/posts/8/status"]
        );
        let calls = transport.calls();
        let RequestBody::Json(body) = &calls[1].body else {
            panic!("expected a JSON body");
        };
        assert_eq!(body, &json!({"status": "blocked"}));
    }

    #[tokio::test]
    async fn staged_edits_only_reach_base_after_commit() {
        let transport = FakeTransport::new();
        let news = loaded_news(&transport, &EventBus::default()).await;
        let id = ItemId::from(1);

        news.stage_edit(&id, FieldPatch::new().with("title", "Conseil extraordinaire"));
        assert_eq!(news.edited_view(&id).unwrap().title, "Conseil extraordinaire");
        assert_eq!(news.find(&id).unwrap().title, "Conseil municipal");

        transport.push(status_json(500, json!({})));
        assert!(news.commit_edits(&id).await.is_err());
        assert!(news.staged(&id).is_some());
        assert_eq!(news.find(&id).unwrap().title, "Conseil municipal");

        transport.push(ok_json(json!({"id": 1, "title": "Conseil extraordinaire"})));
        news.commit_edits(&id).await.unwrap();
        assert!(news.staged(&id).is_none());
        assert_eq!(news.find(&id).unwrap().title, "Conseil extraordinaire");
    }

    #[tokio::test]
    async fn discarded_edits_are_gone() {
        let transport = FakeTransport::new();
        let news = loaded_news(&transport, &EventBus::default()).await;
        let id = ItemId::from(3);

        news.stage_edit(&id, FieldPatch::new().with("title", "Marché annulé"));
        assert!(news.discard_edits(&id));

        assert_eq!(news.edited_view(&id).unwrap().title, "Marché de Noël");
        assert_eq!(
            news.commit_edits(&id).await.unwrap_err(),
            SyncError::NothingStaged(id)
        );
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn auth_failure_ends_session_without_local_error_notice() {
        let transport = FakeTransport::new();
        transport.push(status_json(403, json!({"message": "Forbidden"})));
        let bus = EventBus::default();
        let mut events = bus.subscribe();
        let posts: PostView = view(&transport, &bus);

        let error = posts.list(ListQuery::new()).await.unwrap_err();

        assert_eq!(error.auth_signal(), Some(crate::auth::AuthSignal::Unauthorized));
        assert_eq!(posts.view_status(), ViewStatus::SessionEnded);
        assert!(!posts.is_loading());
        let levels: Vec<NoticeLevel> = notices(&mut events).into_iter().map(|n| n.level).collect();
        assert_eq!(levels, vec![NoticeLevel::Warning]);
    }

    fn views_on_one_gate(transport: &FakeTransport, bus: &EventBus) -> (NewsView, PostView) {
        let gate = signed_in_gate_on(bus.clone());
        let news = ApiClient::new(transport.clone(), Arc::clone(&gate));
        let posts = ApiClient::new(transport.clone(), gate);
        (SyncedResource::new(Arc::new(news)), SyncedResource::new(Arc::new(posts)))
    }

    #[tokio::test(start_paused = true)]
    async fn auth_signal_ends_loading_on_every_view_sharing_the_gate() {
        let transport = FakeTransport::new();
        transport.push_delayed(Duration::from_millis(500), ok_json(news_list()));
        transport.push(status_json(401, json!({"code": "token_expired"})));
        let (news, posts) = views_on_one_gate(&transport, &EventBus::default());

        let (news_result, posts_result, ()) = tokio::join!(
            news.list(ListQuery::new()),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                posts.list(ListQuery::new()).await
            },
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                assert!(!news.is_loading());
                assert_eq!(news.view_status(), ViewStatus::SessionEnded);
            }
        );

        assert_eq!(
            posts_result.unwrap_err().auth_signal(),
            Some(crate::auth::AuthSignal::TokenExpired)
        );
        assert!(news_result.is_ok());
        assert!(news.snapshot().is_none());
        assert!(!news.is_loading());
        assert_eq!(news.view_status(), ViewStatus::SessionEnded);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_arriving_after_session_ended_shows_no_error_notice() {
        let transport = FakeTransport::new();
        transport.push_delayed(
            Duration::from_millis(500),
            status_json(404, json!({"message": "Ressource introuvable"})),
        );
        transport.push(status_json(401, json!({"code": "token_expired"})));
        let bus = EventBus::default();
        let mut events = bus.subscribe();
        let (news, posts) = views_on_one_gate(&transport, &bus);

        let (news_result, _) = tokio::join!(news.list(ListQuery::new()), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            posts.list(ListQuery::new()).await
        });

        assert!(news_result.is_err());
        assert_eq!(news.view_status(), ViewStatus::SessionEnded);
        let levels: Vec<NoticeLevel> = notices(&mut events).into_iter().map(|n| n.level).collect();
        assert_eq!(levels, vec![NoticeLevel::Warning]);
    }
}
