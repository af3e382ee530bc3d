pub mod category;
pub mod document;
pub mod normalize;
pub mod schema;

pub use category::{Category, CategoryError, LabelMap};
pub use document::LabeledDocument;
pub use normalize::normalize;
pub use schema::corpus;
