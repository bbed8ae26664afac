mod product;

pub use product::{PendingUpdate, ProductCatalog, ProductRecord};
