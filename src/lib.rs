pub mod config;
pub mod errors;
pub mod linker;
pub mod pivot;
pub mod projection;
pub mod respond;
pub mod traits;
pub mod validation;

pub use config::LinkerConfig;
pub use errors::{LinkError, OPERATION_FAILED_MESSAGE};
pub use linker::{Operation, RelationLinker, SyncResult};
pub use pivot::{EntityFinder, Pivot, PivotKey, PivotRelation, PivotRelations, Stored};
pub use projection::{
    ColumnNames, ExcludeColumns, Fillable, Loaded, exclude_columns, projected_columns,
    to_external_form,
};
pub use respond::{JsonResponder, Respond};
pub use traits::{Finder, HasRelations, RelationAccessor, SyncChanges};
pub use validation::{JsonValidator, Rule, ValidationError, ValidationErrors, Validator};
