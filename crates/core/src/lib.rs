pub mod clock;
pub mod config;
pub mod error;
pub mod field_value;
pub mod ids;
pub mod row;
pub mod schema;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::FormConfig;
pub use error::{CoreError, SchemaError};
pub use field_value::FieldValue;
pub use ids::*;
pub use row::{RawTable, Row, Table};
pub use schema::{AuditColumns, ColumnClass, ColumnSpec, FormSchema};
