pub mod error;
pub mod names;
pub mod writer;

pub use error::XmlError;
pub use names::EntityNames;
pub use writer::{QuickXmlSerializer, ZoneSerializer};
