//! # astruct
//!
//! Declarative, byte-exact layouts for fixed-size binary records, such as
//! the tables in game save and resource files.
//!
//! Declare a struct as an ordered list of fields, compile it once into a
//! [StructLayout], then read and write records through accessors instead of
//! raw offsets. String fields carry an [EncodingPolicy] that decides how
//! undecodable or unencodable text is handled, up to preserving stray bytes
//! exactly ([ErrorMode::Lossless]).
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use astruct::field::{Field, StrSpec};
//! use astruct::record::Record;
//! use astruct::schema::Schema;
//! use astruct::{Codec, EncodingPolicy, ErrorMode};
//!
//! let ascii = Arc::new(EncodingPolicy::new(Codec::Ascii, ErrorMode::Strict));
//! let layout = Schema::new("Item")
//!     .field(Field::u16("id"))
//!     .field(Field::str_with("name", StrSpec::new(8).with_policy(ascii)))
//!     .compile()
//!     .unwrap();
//! assert_eq!(layout.size(), 10);
//!
//! let mut item = Record::new(Arc::new(layout));
//! item.set("id", 7u16).unwrap();
//! item.set_text("name", "AB").unwrap();
//! assert_eq!(item.as_bytes(), b"\x07\x00AB\0\0\0\0\0\0");
//! assert_eq!(item.get_text("name").unwrap(), "AB");
//! ```

pub mod accessor;
pub mod compiled;
pub mod errors;
pub mod field;
pub mod layout;
pub mod record;
pub mod registry;
pub mod schema;
#[cfg(feature = "serde")]
pub mod serde;
pub mod table;
pub mod validation;
pub mod value;

pub use astruct_codec as codec;
pub use astruct_codec::{Codec, EncodingPolicy, ErrorMode};

pub use errors::{AccessError, CapacityError, CodecError, SchemaError, TableError};
pub use field::{Field, FieldKind, Primitive, StrSpec, Termination, TrailingFill};
pub use layout::{Endian, Packing, StructLayout};
pub use record::{Record, RecordMut, RecordRef};
pub use registry::Registry;
pub use schema::Schema;
pub use table::{CountedTable, CountedTableMut, TableHeader};
pub use value::Value;
