pub mod catalog;
pub mod ingest;
pub mod normalize;
pub mod ocr;

pub use catalog::{CatalogError, DocumentCatalog, DocumentSummary};
pub use ingest::{IngestError, IngestionPipeline, UploadedDocument};
pub use normalize::normalize;
pub use ocr::{
    DocumentTextExtractor, Extraction, OcrEngine, OcrError, PageFailure, PageRenderer,
    PopplerRenderer, TesseractEngine,
};
