//! Data model shared by every inspection component.

pub mod abi;
pub mod library;
pub mod package;

pub use abi::Abi;
pub use abi::AbiClassification;
pub use abi::AbiSet;
pub use library::LibraryEntry;
pub use library::StaticLibraryEntry;
pub use package::PackageHandle;
