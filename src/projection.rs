//! # Attribute projection
//!
//! Models declare a fillable allow-list. Only those attributes (plus the
//! primary key) leave the process, along with any relations loaded in
//! memory. The same list drives [`exclude_columns`], which narrows a
//! Sea-ORM select to the known columns minus the ones a caller names.
//!
//! ```rust,ignore
//! impl Fillable for user::Model {
//!     fn fillable() -> &'static [&'static str] {
//!         &["name", "email"]
//!     }
//! }
//!
//! let users = user::Entity::find()
//!     .except("email")
//!     .into_model::<UserSummary>()
//!     .all(&db)
//!     .await?;
//! let body = Loaded::new(user).with("posts", &posts)?;
//! Json(body)
//! ```

use sea_orm::{EntityTrait, IdenStatic, Iterable, QuerySelect, Select};
use serde::{Serialize, Serializer, ser};
use serde_json::{Map, Value};

/// Allow-list of attributes a model exposes
pub trait Fillable {
    /// Primary key attribute, always exposed
    const KEY: &'static str = "id";
    const CREATED_AT: &'static str = "created_at";
    const UPDATED_AT: &'static str = "updated_at";
    /// Soft-delete marker, selected only when listed in [`dates`](Self::dates)
    const DELETED_AT: &'static str = "deleted_at";

    fn fillable() -> &'static [&'static str];

    fn dates() -> &'static [&'static str] {
        &[]
    }

    /// Relations already loaded on this value, in loading order
    fn relations(&self) -> &[(String, Value)] {
        &[]
    }
}

/// External representation of `entity`
///
/// # Errors
/// Fails when the entity does not serialize to a JSON object.
pub fn to_external_form<M>(entity: &M) -> Result<Map<String, Value>, serde_json::Error>
where
    M: Fillable + Serialize,
{
    project(entity, entity.relations())
}

fn project<M>(
    model: &M,
    relations: &[(String, Value)],
) -> Result<Map<String, Value>, serde_json::Error>
where
    M: Fillable + Serialize,
{
    let Value::Object(attributes) = serde_json::to_value(model)? else {
        return Err(ser::Error::custom("model must serialize to a JSON object"));
    };

    let mut external: Map<String, Value> = attributes
        .into_iter()
        .filter(|(key, _)| key == M::KEY || M::fillable().contains(&key.as_str()))
        .collect();

    for (name, value) in relations {
        external.insert(name.clone(), value.clone());
    }

    Ok(external)
}

/// A model together with relations loaded for it
///
/// Serializes as its external form, so it can go straight into `Json(..)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<M> {
    model: M,
    relations: Vec<(String, Value)>,
}

impl<M> Loaded<M> {
    #[must_use]
    pub fn new(model: M) -> Self {
        Self {
            model,
            relations: Vec::new(),
        }
    }

    /// Load `related` under `name`
    ///
    /// # Errors
    /// Fails when `related` cannot be serialized.
    pub fn with<T: Serialize + ?Sized>(
        mut self,
        name: impl Into<String>,
        related: &T,
    ) -> Result<Self, serde_json::Error> {
        self.load(name, serde_json::to_value(related)?);
        Ok(self)
    }

    /// Reloading a name replaces the value and keeps its position
    pub fn load(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.relations.iter_mut().find(|(loaded, _)| *loaded == name) {
            Some((_, existing)) => *existing = value,
            None => self.relations.push((name, value)),
        }
    }

    #[must_use]
    pub fn is_loaded(&self, name: &str) -> bool {
        self.relations.iter().any(|(loaded, _)| loaded == name)
    }

    #[must_use]
    pub fn model(&self) -> &M {
        &self.model
    }

    #[must_use]
    pub fn into_inner(self) -> M {
        self.model
    }
}

impl<M: Fillable + Serialize> Loaded<M> {
    /// # Errors
    /// Fails when the model does not serialize to a JSON object.
    pub fn to_external_form(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let mut relations = self.model.relations().to_vec();
        relations.extend(self.relations.iter().cloned());
        project(&self.model, &relations)
    }
}

impl<M: Fillable + Serialize> Serialize for Loaded<M> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_external_form()
            .map_err(<S::Error as ser::Error>::custom)?
            .serialize(serializer)
    }
}

/// One column name or several
pub trait ColumnNames {
    fn column_names(&self) -> Vec<&str>;
}

impl ColumnNames for str {
    fn column_names(&self) -> Vec<&str> {
        vec![self]
    }
}

impl ColumnNames for String {
    fn column_names(&self) -> Vec<&str> {
        vec![self.as_str()]
    }
}

impl<S: AsRef<str>> ColumnNames for [S] {
    fn column_names(&self) -> Vec<&str> {
        self.iter().map(AsRef::as_ref).collect()
    }
}

impl<S: AsRef<str>, const N: usize> ColumnNames for [S; N] {
    fn column_names(&self) -> Vec<&str> {
        self.iter().map(AsRef::as_ref).collect()
    }
}

impl<S: AsRef<str>> ColumnNames for Vec<S> {
    fn column_names(&self) -> Vec<&str> {
        self.iter().map(AsRef::as_ref).collect()
    }
}

/// Default columns of `M` minus `excluded`
///
/// Defaults are the key, both timestamps, the soft-delete marker when `M`
/// lists it among its dates, then the fillable list. Excluded names that
/// are not defaults are ignored.
#[must_use]
pub fn projected_columns<M, C>(excluded: &C) -> Vec<&'static str>
where
    M: Fillable,
    C: ColumnNames + ?Sized,
{
    let excluded = excluded.column_names();

    let mut defaults = vec![M::KEY, M::CREATED_AT, M::UPDATED_AT];
    if M::dates().contains(&M::DELETED_AT) {
        defaults.push(M::DELETED_AT);
    }

    let mut projected: Vec<&'static str> = Vec::new();
    for name in defaults.into_iter().chain(M::fillable().iter().copied()) {
        if !projected.contains(&name) && !excluded.contains(&name) {
            projected.push(name);
        }
    }
    projected
}

/// Select only the default columns of `E` minus `columns`
///
/// Replaces any earlier projection on `query`. Names with no matching
/// column on `E` are skipped. When no column is left to select, `query` is
/// returned unchanged.
#[must_use]
pub fn exclude_columns<E, C>(query: Select<E>, columns: &C) -> Select<E>
where
    E: EntityTrait,
    E::Model: Fillable,
    C: ColumnNames + ?Sized,
{
    let selected: Vec<E::Column> = projected_columns::<E::Model, C>(columns)
        .into_iter()
        .filter_map(|name| E::Column::iter().find(|column| column.as_str() == name))
        .collect();
    if selected.is_empty() {
        return query;
    }

    selected
        .into_iter()
        .fold(query.select_only(), |query, column| query.column(column))
}

/// `query.except(columns)`, see [`exclude_columns`]
pub trait ExcludeColumns {
    #[must_use]
    fn except<C: ColumnNames + ?Sized>(self, columns: &C) -> Self;
}

impl<E> ExcludeColumns for Select<E>
where
    E: EntityTrait,
    E::Model: Fillable,
{
    fn except<C: ColumnNames + ?Sized>(self, columns: &C) -> Self {
        exclude_columns(self, columns)
    }
}
