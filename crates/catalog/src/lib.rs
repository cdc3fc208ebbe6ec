//! `tradepost-catalog` — product lifecycle/moderation and category rules.

pub mod category;
pub mod product;

pub use category::{Category, CategoryDeletion, CategoryId, plan_deletion};
pub use product::{
    ApproveProduct, CreateProduct, DeleteProduct, PricingMetadata, Product, ProductCommand,
    ProductEvent, ProductId, ProductPatch, ProductStatus, PurgeProduct, RecoverProduct,
    ReinstateProduct, RejectProduct, RestoreProduct, ReviewStamp, SubmitProduct, SuspendProduct,
    UpdateProduct,
};
