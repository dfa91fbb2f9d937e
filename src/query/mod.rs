// Submodules for separation of concerns
mod cursor;
mod eval;
mod exec;
mod parse;
mod types;

pub use cursor::Cursor;
pub use eval::{bson_equals, compare_bson, compare_docs, eval_filter, exclude_fields, project_fields, resolve_path};
pub use exec::{count_docs, find_docs};
pub use parse::{parse_filter_json, parse_filter_value};
pub use types::{CmpOp, Filter, FindOptions, Order, SortSpec};
