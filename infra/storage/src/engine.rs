//! The [`Collection`] handle and its operations.
//!
//! Every operation follows the same shape: run the pre-write hook on an owned copy, take the
//! lock, apply the change synchronously, release the lock, then run the post-read hook on the
//! copy that is returned. Locks are never held across an `.await`.

use crate::builder::CollectionBuilder;
use crate::error::{StorageError, StorageErrorExt};
use crate::filter;
use crate::options::{FindOneAndUpdateOptions, ReturnDocument, UpdateOptions, UpdateResult};
use crate::update;
use fcrypt_cryptor::{LifecycleHooks, Query, UpdateClause};
use fcrypt_domain::constants::ID_FIELD;
use fcrypt_domain::document::{Document, Value};
use parking_lot::RwLock;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, instrument};

/// The internal shared state of a [`Collection`].
#[derive(Debug)]
pub struct CollectionInner {
    pub(crate) name: String,
    pub(crate) hooks: Arc<dyn LifecycleHooks>,
    /// Stored documents, in insertion order. Sensitive fields are encrypted here.
    pub(crate) documents: RwLock<Vec<Document>>,
    pub(crate) generate_ids: bool,
    pub(crate) id_counter: AtomicU64,
}

/// A thread-safe handle to an in-memory collection.
///
/// Reference-counted, so it can be cheaply cloned across tasks; clones share documents.
#[derive(Debug, Clone)]
pub struct Collection {
    pub(crate) inner: Arc<CollectionInner>,
}

impl Deref for Collection {
    type Target = CollectionInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Collection {
    #[must_use = "The collection is not usable until hooks are set and .build() is called"]
    pub fn builder(name: impl Into<String>) -> CollectionBuilder {
        CollectionBuilder::new(name)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn hooks(&self) -> &Arc<dyn LifecycleHooks> {
        &self.hooks
    }

    /// Inserts one document after running `before_save`.
    ///
    /// # Results
    /// The document's `_id`, generated when missing and generation is enabled.
    ///
    /// # Errors
    /// * [`StorageError::Hook`] if encryption fails; nothing is stored.
    /// * [`StorageError::DuplicateKey`] if the `_id` is taken.
    /// * [`StorageError::InvalidDocument`] if the document has no `_id` and generation is off.
    #[instrument(skip_all, fields(collection = %self.name))]
    pub async fn insert_one(&self, doc: Document) -> Result<Value, StorageError> {
        let mut doc = self.with_id(doc)?;
        let id = doc[ID_FIELD].clone();
        self.hooks.before_save(&mut doc).await.context("before_save")?;

        let mut documents = self.documents.write();
        Self::ensure_unique(&documents, &id)?;
        documents.push(doc);
        debug!(id = %id, "Document inserted");
        Ok(id)
    }

    /// Inserts a batch after running `before_insert_many` on all of it. The batch is stored
    /// entirely or not at all.
    ///
    /// # Errors
    /// Same as [`Collection::insert_one`], for any document of the batch.
    #[instrument(skip_all, fields(collection = %self.name, documents = docs.len()))]
    pub async fn insert_many(&self, docs: Vec<Document>) -> Result<Vec<Value>, StorageError> {
        let mut docs = docs.into_iter().map(|doc| self.with_id(doc)).collect::<Result<Vec<_>, _>>()?;
        let ids: Vec<Value> = docs.iter().map(|doc| doc[ID_FIELD].clone()).collect();
        for (index, id) in ids.iter().enumerate() {
            if ids[..index].contains(id) {
                return Err(StorageError::DuplicateKey { id: id.to_string(), context: None });
            }
        }
        self.hooks.before_insert_many(&mut docs).await.context("before_insert_many")?;

        let mut documents = self.documents.write();
        for id in &ids {
            Self::ensure_unique(&documents, id)?;
        }
        documents.extend(docs);
        debug!(count = ids.len(), "Documents inserted");
        Ok(ids)
    }

    /// First document matching `filter`, decrypted by `after_read`.
    ///
    /// # Errors
    /// * [`StorageError::Hook`] if decryption fails.
    /// * [`StorageError::UnsupportedOperator`] for non-equality filters.
    #[instrument(skip_all, fields(collection = %self.name))]
    pub async fn find_one(&self, filter: &Document) -> Result<Option<Document>, StorageError> {
        let Some(mut doc) = self.raw_find_one(filter)? else {
            return Ok(None);
        };
        self.hooks.after_read(&mut doc).await.context("after_read")?;
        Ok(Some(doc))
    }

    /// Every document matching `filter`, decrypted by `after_read_many`.
    ///
    /// # Errors
    /// Same as [`Collection::find_one`].
    #[instrument(skip_all, fields(collection = %self.name))]
    pub async fn find(&self, filter: &Document) -> Result<Vec<Document>, StorageError> {
        let mut docs = self.raw_find(filter)?;
        if !docs.is_empty() {
            self.hooks.after_read_many(&mut docs).await.context("after_read_many")?;
        }
        Ok(docs)
    }

    /// Updates the first document matching `filter`. Filter and update pass through
    /// `before_update_one` first.
    ///
    /// # Errors
    /// * [`StorageError::Hook`] if encryption fails; nothing is written.
    /// * [`StorageError::InvalidUpdate`] or [`StorageError::UnsupportedOperator`] for updates
    ///   the collection cannot apply.
    #[instrument(skip_all, fields(collection = %self.name, upsert = options.upsert))]
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateClause>,
        options: UpdateOptions,
    ) -> Result<UpdateResult, StorageError> {
        let (filter, update) = self.prepare_update_one(filter, update.into()).await?;

        let mut documents = self.documents.write();
        let outcome = self.modify_one(&mut documents, &filter, &update, options.upsert)?;
        Ok(outcome.result)
    }

    /// Updates every document matching `filter` after `before_update_many` has accepted the
    /// update. All matches are updated or none are.
    ///
    /// # Errors
    /// * [`StorageError::Hook`] wrapping `UnsupportedBulkMutation` if the update writes an
    ///   encrypted field.
    /// * Same as [`Collection::update_one`] otherwise.
    #[instrument(skip_all, fields(collection = %self.name))]
    pub async fn update_many(
        &self,
        filter: &Document,
        update: impl Into<UpdateClause>,
    ) -> Result<UpdateResult, StorageError> {
        let update = update.into();
        self.hooks.before_update_many(&update).await.context("before_update_many")?;

        let mut documents = self.documents.write();
        let mut staged = Vec::new();
        for (index, doc) in documents.iter().enumerate() {
            if filter::matches(doc, filter)? {
                staged.push((index, Self::updated(doc, &update)?));
            }
        }

        let mut result = UpdateResult { matched: staged.len() as u64, ..UpdateResult::default() };
        for (index, next) in staged {
            if documents[index] != next {
                documents[index] = next;
                result.modified += 1;
            }
        }
        debug!(matched = result.matched, modified = result.modified, "Documents updated");
        Ok(result)
    }

    /// Replaces the first document matching `filter`, keeping its `_id`. The replacement
    /// passes through `before_save`.
    ///
    /// # Errors
    /// * [`StorageError::InvalidDocument`] if the replacement contains operators.
    /// * [`StorageError::InvalidUpdate`] if the replacement changes the `_id`.
    /// * [`StorageError::Hook`] if encryption fails; nothing is written.
    #[instrument(skip_all, fields(collection = %self.name))]
    pub async fn replace_one(
        &self,
        filter: &Document,
        replacement: Document,
    ) -> Result<UpdateResult, StorageError> {
        let replacement = self.prepare_replacement(replacement).await?;

        let mut documents = self.documents.write();
        let Some((_, previous)) = Self::replace_at(&mut documents, filter, replacement)? else {
            return Ok(UpdateResult::default());
        };
        let modified = u64::from(previous.is_some());
        Ok(UpdateResult { matched: 1, modified, upserted_id: None })
    }

    /// Atomically updates the first document matching `filter` and returns the version
    /// selected by `options.return_document`, decrypted.
    ///
    /// # Errors
    /// Same as [`Collection::update_one`], plus [`StorageError::Hook`] if decrypting the
    /// returned document fails (the update itself has been applied by then).
    #[instrument(skip_all, fields(collection = %self.name))]
    pub async fn find_one_and_update(
        &self,
        filter: Document,
        update: impl Into<UpdateClause>,
        options: FindOneAndUpdateOptions,
    ) -> Result<Option<Document>, StorageError> {
        let (filter, update) = self.prepare_update_one(filter, update.into()).await?;

        let selected = {
            let mut documents = self.documents.write();
            let outcome = self.modify_one(&mut documents, &filter, &update, options.upsert)?;
            match options.return_document {
                ReturnDocument::Before => outcome.before,
                ReturnDocument::After => outcome.after,
            }
        };
        self.decrypt_one(selected).await
    }

    /// Atomically replaces the first document matching `filter` and returns the version
    /// selected by `return_document`, decrypted.
    ///
    /// # Errors
    /// Same as [`Collection::replace_one`], plus [`StorageError::Hook`] if decrypting the
    /// returned document fails.
    #[instrument(skip_all, fields(collection = %self.name))]
    pub async fn find_one_and_replace(
        &self,
        filter: &Document,
        replacement: Document,
        return_document: ReturnDocument,
    ) -> Result<Option<Document>, StorageError> {
        let replacement = self.prepare_replacement(replacement).await?;

        let selected = {
            let mut documents = self.documents.write();
            match Self::replace_at(&mut documents, filter, replacement)? {
                None => None,
                Some((index, previous)) => match return_document {
                    ReturnDocument::Before => previous.or_else(|| Some(documents[index].clone())),
                    ReturnDocument::After => Some(documents[index].clone()),
                },
            }
        };
        self.decrypt_one(selected).await
    }

    /// Removes the first document matching `filter` and returns it decrypted.
    ///
    /// # Errors
    /// [`StorageError::Hook`] if decrypting the removed document fails; it stays removed.
    #[instrument(skip_all, fields(collection = %self.name))]
    pub async fn find_one_and_delete(
        &self,
        filter: &Document,
    ) -> Result<Option<Document>, StorageError> {
        let removed = {
            let mut documents = self.documents.write();
            Self::position(&documents, filter)?.map(|index| documents.remove(index))
        };
        self.decrypt_one(removed).await
    }

    /// Removes the first document matching `filter`.
    ///
    /// # Errors
    /// [`StorageError::UnsupportedOperator`] for non-equality filters.
    pub fn delete_one(&self, filter: &Document) -> Result<u64, StorageError> {
        let mut documents = self.documents.write();
        let removed = Self::position(&documents, filter)?.map(|index| documents.remove(index));
        Ok(u64::from(removed.is_some()))
    }

    /// Removes every document matching `filter`.
    ///
    /// # Errors
    /// [`StorageError::UnsupportedOperator`] for non-equality filters.
    pub fn delete_many(&self, filter: &Document) -> Result<u64, StorageError> {
        let mut documents = self.documents.write();
        let mut matched = Vec::with_capacity(documents.len());
        for doc in documents.iter() {
            matched.push(filter::matches(doc, filter)?);
        }

        let before = documents.len();
        let mut matched = matched.into_iter();
        documents.retain(|_| !matched.next().unwrap_or(false));
        Ok((before - documents.len()) as u64)
    }

    /// Stores a document exactly as given, with no hooks applied. Used to import documents
    /// that are already in their stored form.
    ///
    /// # Errors
    /// [`StorageError::DuplicateKey`] or [`StorageError::InvalidDocument`] as for
    /// [`Collection::insert_one`].
    pub fn raw_insert_one(&self, doc: Document) -> Result<Value, StorageError> {
        let doc = self.with_id(doc)?;
        let id = doc[ID_FIELD].clone();
        let mut documents = self.documents.write();
        Self::ensure_unique(&documents, &id)?;
        documents.push(doc);
        Ok(id)
    }

    /// Stored form of the first match, with no hooks applied.
    ///
    /// # Errors
    /// [`StorageError::UnsupportedOperator`] for non-equality filters.
    pub fn raw_find_one(&self, filter: &Document) -> Result<Option<Document>, StorageError> {
        let documents = self.documents.read();
        Ok(Self::position(&documents, filter)?.map(|index| documents[index].clone()))
    }

    /// Stored form of every match, with no hooks applied.
    ///
    /// # Errors
    /// [`StorageError::UnsupportedOperator`] for non-equality filters.
    pub fn raw_find(&self, filter: &Document) -> Result<Vec<Document>, StorageError> {
        let documents = self.documents.read();
        let mut found = Vec::new();
        for doc in documents.iter() {
            if filter::matches(doc, filter)? {
                found.push(doc.clone());
            }
        }
        Ok(found)
    }

    /// # Errors
    /// [`StorageError::UnsupportedOperator`] for non-equality filters.
    pub fn count_documents(&self, filter: &Document) -> Result<u64, StorageError> {
        Ok(self.raw_find(filter)?.len() as u64)
    }

    async fn prepare_update_one(
        &self,
        filter: Document,
        update: UpdateClause,
    ) -> Result<(Document, UpdateClause), StorageError> {
        let mut query = Query::new(filter).with_update(update);
        self.hooks.before_update_one(&mut query).await.context("before_update_one")?;
        let Query { filter, update } = query;
        Ok((filter, update.unwrap_or_default()))
    }

    async fn prepare_replacement(&self, mut replacement: Document) -> Result<Document, StorageError> {
        if let Some(operator) = replacement.keys().find(|key| key.starts_with('$')) {
            return Err(StorageError::InvalidDocument {
                message: "replacement documents cannot contain operators".into(),
                context: Some(operator.clone().into()),
            });
        }
        self.hooks.before_save(&mut replacement).await.context("before_save")?;
        Ok(replacement)
    }

    async fn decrypt_one(&self, doc: Option<Document>) -> Result<Option<Document>, StorageError> {
        let Some(mut doc) = doc else {
            return Ok(None);
        };
        self.hooks.after_read(&mut doc).await.context("after_read")?;
        Ok(Some(doc))
    }

    fn modify_one(
        &self,
        documents: &mut Vec<Document>,
        filter: &Document,
        update: &UpdateClause,
        upsert: bool,
    ) -> Result<Modified, StorageError> {
        if let Some(index) = Self::position(documents, filter)? {
            let before = documents[index].clone();
            let after = Self::updated(&before, update)?;
            let modified = u64::from(after != before);
            documents[index] = after.clone();
            return Ok(Modified {
                result: UpdateResult { matched: 1, modified, upserted_id: None },
                before: Some(before),
                after: Some(after),
            });
        }
        if !upsert {
            return Ok(Modified::default());
        }

        let inserted = self.with_id(Self::upserted(filter, update)?)?;
        let id = inserted[ID_FIELD].clone();
        Self::ensure_unique(documents, &id)?;
        documents.push(inserted.clone());
        debug!(id = %id, "Document upserted");
        Ok(Modified {
            result: UpdateResult { matched: 0, modified: 0, upserted_id: Some(id) },
            before: None,
            after: Some(inserted),
        })
    }

    /// Replaces the first match. Returns its index and, when the stored document changed,
    /// the previous version.
    fn replace_at(
        documents: &mut [Document],
        filter: &Document,
        replacement: Document,
    ) -> Result<Option<(usize, Option<Document>)>, StorageError> {
        let Some(index) = Self::position(documents, filter)? else {
            return Ok(None);
        };
        let id = documents[index].get(ID_FIELD).cloned().unwrap_or(Value::Null);
        if replacement.get(ID_FIELD).is_some_and(|new| *new != id) {
            return Err(StorageError::invalid_update("_id is immutable"));
        }

        let mut next = Document::new();
        next.insert(ID_FIELD.to_owned(), id);
        next.extend(replacement.into_iter().filter(|(key, _)| key != ID_FIELD));
        if documents[index] == next {
            return Ok(Some((index, None)));
        }
        let previous = std::mem::replace(&mut documents[index], next);
        Ok(Some((index, Some(previous))))
    }

    fn updated(doc: &Document, update: &UpdateClause) -> Result<Document, StorageError> {
        let mut next = doc.clone();
        update::apply(&mut next, update, false)?;
        if next.get(ID_FIELD) != doc.get(ID_FIELD) {
            return Err(StorageError::invalid_update("_id is immutable"));
        }
        Ok(next)
    }

    /// Document inserted by an upsert: the filter's equality conditions, then the update.
    fn upserted(filter: &Document, update: &UpdateClause) -> Result<Document, StorageError> {
        let mut doc = Document::new();
        for (key, expected) in filter.iter().filter(|(key, _)| !key.starts_with('$')) {
            update::set_path(&mut doc, key, filter::condition(expected)?.clone())?;
        }
        update::apply(&mut doc, update, true)?;
        Ok(doc)
    }

    fn position(documents: &[Document], filter: &Document) -> Result<Option<usize>, StorageError> {
        for (index, doc) in documents.iter().enumerate() {
            if filter::matches(doc, filter)? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    fn ensure_unique(documents: &[Document], id: &Value) -> Result<(), StorageError> {
        if documents.iter().any(|doc| doc.get(ID_FIELD) == Some(id)) {
            return Err(StorageError::DuplicateKey { id: id.to_string(), context: None });
        }
        Ok(())
    }

    /// Puts `_id` first, generating it when missing.
    fn with_id(&self, doc: Document) -> Result<Document, StorageError> {
        if doc.get(ID_FIELD).is_some_and(|id| !id.is_null()) {
            return Ok(doc);
        }
        if !self.generate_ids {
            return Err(StorageError::invalid_document("document has no _id"));
        }
        let id = self.id_counter.fetch_add(1, Ordering::Relaxed);
        let mut with_id = Document::new();
        with_id.insert(ID_FIELD.to_owned(), Value::from(id));
        with_id.extend(doc.into_iter().filter(|(key, _)| key != ID_FIELD));
        Ok(with_id)
    }
}

#[derive(Debug, Default)]
struct Modified {
    result: UpdateResult,
    before: Option<Document>,
    after: Option<Document>,
}
