mod category;
mod product;

pub use category::{ProductCategory, UnknownCategory};
pub use product::{ProductPayload, ProductRecord};
