pub mod assignment;
pub mod code;
pub mod experiment;
pub mod scan;
pub mod variant;

pub use assignment::Entity as AssignmentEntity;
pub use code::Entity as CodeEntity;
pub use experiment::Entity as ExperimentEntity;
pub use scan::Entity as ScanEntity;
pub use variant::Entity as VariantEntity;
