pub mod content;
pub mod copurchase;
pub mod factorization;
pub mod projection;

pub use content::ContentSimilarityTrainer;
pub use copurchase::CoPurchaseTrainer;
