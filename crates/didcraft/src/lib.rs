//! # didcraft
//!
//! Encode and decode vehicle diagnostic identifiers (DIDs) from declarative
//! field layouts.
//!
//! Describe a DID's payload once as a list of [field::Field]s (bit position,
//! byte order, scaling, choices, nested or repeating structures). The layout
//! is compiled into a [plan::Plan] when the [did::Did] is built, then used to
//! encode values into bytes and decode bytes back into named values.
//!
//! ## Example
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! use didcraft::did::Did;
//! use didcraft::field::Field;
//! use didcraft::options::{DecodeOptions, EncodeOptions};
//! use didcraft::value::{DecodedValue, Value};
//!
//! let did = Did::new(
//!     0x0001,
//!     "Foo",
//!     2,
//!     vec![Field::new("Bar", 0, 8), Field::new("Fum", 8, 8)],
//! )
//! .unwrap();
//!
//! let values = BTreeMap::from([
//!     ("Bar".to_string(), Value::Unsigned(1)),
//!     ("Fum".to_string(), Value::Unsigned(69)),
//! ]);
//! let encoded = did.encode(&values, EncodeOptions::default()).unwrap();
//! assert_eq!(encoded, vec![0x01, 0x45]);
//!
//! let decoded = did.decode(&encoded, DecodeOptions::default()).unwrap();
//! assert_eq!(decoded["Fum"], DecodedValue::Scalar(Value::Unsigned(69)));
//! ```

pub mod bits;
pub mod compiled;
pub mod conversion;
pub mod did;
pub mod errors;
pub mod field;
pub mod options;
pub mod plan;
#[cfg(feature = "serde")]
pub mod serde;
pub mod translate;
pub mod value;
