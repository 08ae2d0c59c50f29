//! # Relation Linker
//!
//! Attach, detach and sync a many-to-many relation of one entity against the
//! list of related ids in a request body.
//!
//! Every operation follows the same steps:
//!
//! 1. validate the body field (`items` unless configured otherwise)
//! 2. read the ids from the body
//! 3. resolve the entity through that operation's [`Finder`]
//! 4. call the relation's attach / detach / sync
//!
//! A malformed body never reaches the finder. Storage failures in step 4
//! are masked behind
//! [`OPERATION_FAILED_MESSAGE`](crate::OPERATION_FAILED_MESSAGE).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crudlink::{EntityFinder, RelationLinker};
//!
//! let linker: RelationLinker<i32, i32> =
//!     RelationLinker::new(EntityFinder::<article::Entity>::new(db.clone()))
//!         // tags are synced through a narrower model
//!         .with_sync_finder(EntityFinder::<published_article::Entity>::new(db));
//!
//! let body = serde_json::json!({ "items": [5, 6] });
//! let attached = linker.attach(&1, "tags", &body).await?;
//! ```

use crate::config::LinkerConfig;
use crate::errors::LinkError;
use crate::traits::{Finder, HasRelations, RelationAccessor, SyncChanges};
use crate::validation::{JsonValidator, Rule, ValidationError, ValidationErrors, Validator};
use sea_orm::DbErr;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

const ITEM_RULES: &[Rule] = &[Rule::Required, Rule::Array];

/// The three relation operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Attach,
    Detach,
    Sync,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Attach => "attach",
            Self::Detach => "detach",
            Self::Sync => "sync",
        })
    }
}

/// Public outcome of a sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult<R> {
    /// Ids newly associated by the call
    pub added: Vec<R>,
    /// Ids no longer associated after the call
    pub removed: Vec<R>,
}

/// Renames storage-native fields to the public ones.
impl<R> From<SyncChanges<R>> for SyncResult<R> {
    fn from(changes: SyncChanges<R>) -> Self {
        Self {
            added: changes.attached,
            removed: changes.detached,
        }
    }
}

/// Attach / detach / sync endpoints for relations of entities keyed by `I`,
/// whose related ids are `R`.
pub struct RelationLinker<I, R>
where
    I: Send + Sync,
    R: Send + Sync,
{
    attach_finder: Arc<dyn Finder<I, R>>,
    detach_finder: Arc<dyn Finder<I, R>>,
    sync_finder: Arc<dyn Finder<I, R>>,
    validator: Arc<dyn Validator>,
    config: LinkerConfig,
}

impl<I, R> Clone for RelationLinker<I, R>
where
    I: Send + Sync,
    R: Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            attach_finder: Arc::clone(&self.attach_finder),
            detach_finder: Arc::clone(&self.detach_finder),
            sync_finder: Arc::clone(&self.sync_finder),
            validator: Arc::clone(&self.validator),
            config: self.config.clone(),
        }
    }
}

impl<I, R> RelationLinker<I, R>
where
    I: fmt::Debug + Send + Sync,
    R: DeserializeOwned + Send + Sync,
{
    /// Create a linker whose three operations all resolve through `finder`
    pub fn new(finder: impl Finder<I, R> + 'static) -> Self {
        let finder: Arc<dyn Finder<I, R>> = Arc::new(finder);
        Self {
            attach_finder: Arc::clone(&finder),
            detach_finder: Arc::clone(&finder),
            sync_finder: finder,
            validator: Arc::new(JsonValidator),
            config: LinkerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_attach_finder(mut self, finder: impl Finder<I, R> + 'static) -> Self {
        self.attach_finder = Arc::new(finder);
        self
    }

    #[must_use]
    pub fn with_detach_finder(mut self, finder: impl Finder<I, R> + 'static) -> Self {
        self.detach_finder = Arc::new(finder);
        self
    }

    #[must_use]
    pub fn with_sync_finder(mut self, finder: impl Finder<I, R> + 'static) -> Self {
        self.sync_finder = Arc::new(finder);
        self
    }

    #[must_use]
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: LinkerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> &LinkerConfig {
        &self.config
    }

    /// Attach the ids under the configured key to `relation` of entity `id`
    ///
    /// # Errors
    /// See [`attach_with_key`](Self::attach_with_key).
    pub async fn attach(
        &self,
        id: &I,
        relation: &str,
        body: &Value,
    ) -> Result<Vec<R>, LinkError> {
        self.attach_with_key(id, relation, body, &self.config.param_key).await
    }

    /// Attach the ids under `param_key`, returning exactly the submitted list
    ///
    /// # Errors
    /// - [`LinkError::Validation`] when `param_key` is missing or not an array
    /// - [`LinkError::NotFound`] when no entity has `id`
    /// - [`LinkError::OperationFailed`] when storage rejects the attach
    /// - [`LinkError::Database`] when the lookup itself fails
    pub async fn attach_with_key(
        &self,
        id: &I,
        relation: &str,
        body: &Value,
        param_key: &str,
    ) -> Result<Vec<R>, LinkError> {
        let (entity, items) = self.prepare(Operation::Attach, id, body, param_key).await?;
        let accessor = relation_accessor(entity.as_ref(), Operation::Attach, relation)?;
        accessor
            .attach(&items)
            .await
            .map_err(|err| LinkError::operation_failed(Operation::Attach, relation, err))?;
        Ok(items)
    }

    /// Detach the ids under the configured key from `relation` of entity `id`
    ///
    /// # Errors
    /// See [`attach_with_key`](Self::attach_with_key).
    pub async fn detach(
        &self,
        id: &I,
        relation: &str,
        body: &Value,
    ) -> Result<Vec<R>, LinkError> {
        self.detach_with_key(id, relation, body, &self.config.param_key).await
    }

    /// Detach the ids under `param_key`, returning exactly the submitted list
    ///
    /// # Errors
    /// See [`attach_with_key`](Self::attach_with_key).
    pub async fn detach_with_key(
        &self,
        id: &I,
        relation: &str,
        body: &Value,
        param_key: &str,
    ) -> Result<Vec<R>, LinkError> {
        let (entity, items) = self.prepare(Operation::Detach, id, body, param_key).await?;
        let accessor = relation_accessor(entity.as_ref(), Operation::Detach, relation)?;
        accessor
            .detach(&items)
            .await
            .map_err(|err| LinkError::operation_failed(Operation::Detach, relation, err))?;
        Ok(items)
    }

    /// Sync `relation` of entity `id` to the ids under the configured key
    ///
    /// # Errors
    /// See [`attach_with_key`](Self::attach_with_key).
    pub async fn sync(
        &self,
        id: &I,
        relation: &str,
        body: &Value,
    ) -> Result<SyncResult<R>, LinkError> {
        self.sync_with_key(id, relation, body, &self.config.param_key).await
    }

    /// Sync to the ids under `param_key`, reporting what was added and removed
    ///
    /// # Errors
    /// See [`attach_with_key`](Self::attach_with_key).
    pub async fn sync_with_key(
        &self,
        id: &I,
        relation: &str,
        body: &Value,
        param_key: &str,
    ) -> Result<SyncResult<R>, LinkError> {
        let (entity, items) = self.prepare(Operation::Sync, id, body, param_key).await?;
        let accessor = relation_accessor(entity.as_ref(), Operation::Sync, relation)?;
        let changes = accessor
            .sync(&items)
            .await
            .map_err(|err| LinkError::operation_failed(Operation::Sync, relation, err))?;
        Ok(SyncResult::from(changes))
    }

    fn finder(&self, operation: Operation) -> &dyn Finder<I, R> {
        match operation {
            Operation::Attach => self.attach_finder.as_ref(),
            Operation::Detach => self.detach_finder.as_ref(),
            Operation::Sync => self.sync_finder.as_ref(),
        }
    }

    /// Validate and read the ids, then resolve the entity
    async fn prepare(
        &self,
        operation: Operation,
        id: &I,
        body: &Value,
        param_key: &str,
    ) -> Result<(Box<dyn HasRelations<R>>, Vec<R>), LinkError> {
        tracing::debug!(%operation, ?id, param_key, "Relation operation requested");

        self.validator.validate(body, &[(param_key, ITEM_RULES)])?;
        let items = read_items(body, param_key)?;

        let entity = self
            .finder(operation)
            .find(id)
            .await
            .map_err(LinkError::database)?
            .ok_or(LinkError::NotFound)?;

        Ok((entity, items))
    }
}

fn relation_accessor<'a, R: Send + Sync>(
    entity: &'a dyn HasRelations<R>,
    operation: Operation,
    relation: &str,
) -> Result<Box<dyn RelationAccessor<R> + 'a>, LinkError> {
    entity.relation(relation).ok_or_else(|| {
        LinkError::operation_failed(
            operation,
            relation,
            DbErr::Custom(format!("Unknown relation `{relation}`")),
        )
    })
}

/// Each element must deserialize into the related id type
fn read_items<R: DeserializeOwned>(
    body: &Value,
    param_key: &str,
) -> Result<Vec<R>, ValidationErrors> {
    let Some(Value::Array(values)) = body.get(param_key) else {
        let message = format!("The {param_key} must be an array.");
        return Err(ValidationError::new(param_key, message).into());
    };

    let mut items = Vec::with_capacity(values.len());
    let mut errors = ValidationErrors::new();
    for (index, value) in values.iter().enumerate() {
        match R::deserialize(value) {
            Ok(item) => items.push(item),
            Err(_) => errors.add(ValidationError::new(
                format!("{param_key}.{index}"),
                format!("The {param_key}.{index} is not a valid identifier."),
            )),
        }
    }

    errors.result().map(|()| items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sync_result_renames_fields() {
        let changes = SyncChanges {
            attached: vec![5],
            detached: vec![9],
        };
        let value = serde_json::to_value(SyncResult::from(changes)).unwrap();
        assert_eq!(value, json!({ "added": [5], "removed": [9] }));
        assert!(value.get("attached").is_none());
        assert!(value.get("detached").is_none());
    }

    #[test]
    fn test_read_items_passes_duplicates_through() {
        let items: Vec<i64> = read_items(&json!({ "items": [3, 3, 4] }), "items").unwrap();
        assert_eq!(items, vec![3, 3, 4]);
    }

    #[test]
    fn test_read_items_reports_bad_elements_by_index() {
        let errors = read_items::<i64>(&json!({ "items": [1, "x", {}] }), "items").unwrap_err();
        let fields = errors.fields();
        assert!(fields.contains_key("items.1"));
        assert!(fields.contains_key("items.2"));
        assert!(!fields.contains_key("items.0"));
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::Attach.to_string(), "attach");
        assert_eq!(Operation::Detach.to_string(), "detach");
        assert_eq!(Operation::Sync.to_string(), "sync");
    }
}
