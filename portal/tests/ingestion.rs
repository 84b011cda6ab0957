use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use portal::pipeline::{
    CatalogError, DocumentCatalog, DocumentTextExtractor, IngestError, IngestionPipeline,
    OcrEngine, OcrError, PageRenderer, normalize,
};
use portal::storage::{DocumentStore, IngestStatus, JsonDocumentStore};
use tempfile::TempDir;

const PDF_BYTES: &[u8] = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\ntrailer\n<<>>\n%%EOF";
const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52,
];

const IMAGE_TEXT: &str = "First line\nsecond line\n\n\nNext paragraph\n";

struct FakeRenderer {
    pages: usize,
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn render_pages(
        &self,
        _pdf_path: &Path,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, OcrError> {
        let mut paths = Vec::new();
        for page in 1..=self.pages {
            let path = out_dir.join(format!("page-{page}.png"));
            tokio::fs::write(&path, b"png").await?;
            paths.push(path);
        }
        Ok(paths)
    }
}

struct FakeEngine {
    failing_pages: Vec<usize>,
}

#[async_trait]
impl OcrEngine for FakeEngine {
    async fn recognize(&self, image_path: &Path) -> Result<String, OcrError> {
        let name = image_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        match name.strip_prefix("page-").and_then(|d| d.parse::<usize>().ok()) {
            Some(page) if self.failing_pages.contains(&page) => Err(OcrError::RecognitionFailed(
                format!("simulated failure on page {page}"),
            )),
            Some(page) => Ok(format!("content of page {page}")),
            None => Ok(IMAGE_TEXT.to_string()),
        }
    }
}

struct Harness {
    _workspace: TempDir,
    upload_dir: PathBuf,
    text_dir: PathBuf,
    documents: Arc<JsonDocumentStore>,
    pipeline: IngestionPipeline,
    catalog: DocumentCatalog,
}

async fn harness(pages: usize, failing_pages: Vec<usize>) -> anyhow::Result<Harness> {
    let workspace = TempDir::new()?;
    let upload_dir = workspace.path().join("uploads");
    let text_dir = workspace.path().join("extracted_texts");

    let documents = Arc::new(JsonDocumentStore::new(workspace.path().join("data")));
    documents.initialize().await?;
    let store: Arc<dyn DocumentStore> = documents.clone();

    let extractor = DocumentTextExtractor::new(
        Arc::new(FakeEngine { failing_pages }),
        Arc::new(FakeRenderer { pages }),
    );

    let pipeline = IngestionPipeline::new(
        upload_dir.clone(),
        text_dir.clone(),
        extractor,
        store.clone(),
        2,
    )
    .await?;
    let catalog = DocumentCatalog::new(store);

    Ok(Harness {
        _workspace: workspace,
        upload_dir,
        text_dir,
        documents,
        pipeline,
        catalog,
    })
}

#[tokio::test]
async fn ingest_persists_raw_text_and_metadata() -> anyhow::Result<()> {
    let h = harness(1, vec![]).await?;

    let document = h.pipeline.ingest(PNG_BYTES.to_vec(), "scan.png").await?;

    assert!(document.filename.ends_with("_scan.png"));
    assert_eq!(document.text_filename, format!("{}.txt", stem(&document.filename)));

    let raw_path = h.upload_dir.join(&document.filename);
    assert!(raw_path.exists());
    assert_eq!(tokio::fs::read(&raw_path).await?, PNG_BYTES);

    let text_path = h.text_dir.join(&document.text_filename);
    assert!(text_path.exists());
    let stored_text = tokio::fs::read_to_string(&text_path).await?;
    assert_eq!(stored_text, normalize(IMAGE_TEXT));
    assert_eq!(stored_text, "First line second line\n\nNext paragraph");

    let record = h
        .documents
        .get(&stem(&document.filename))
        .await?
        .expect("metadata record");
    assert_eq!(record.status, IngestStatus::Extracted);
    assert_eq!(record.original_filename, "scan.png");
    assert!(record.text_path.is_some());

    Ok(())
}

#[tokio::test]
async fn unreadable_image_fails_but_retains_the_upload() -> anyhow::Result<()> {
    let h = harness(1, vec![]).await?;

    let err = h
        .pipeline
        .ingest(b"definitely not an image".to_vec(), "garbage.bin")
        .await
        .expect_err("undecodable payload must fail");
    assert!(matches!(
        err,
        IngestError::Ocr(OcrError::UnsupportedFormat(_))
    ));

    // the raw upload survives, no text file is created
    let mut uploads = tokio::fs::read_dir(&h.upload_dir).await?;
    let upload = uploads.next_entry().await?.expect("raw file retained");
    assert!(uploads.next_entry().await?.is_none());

    let mut texts_present = false;
    if let Ok(mut texts) = tokio::fs::read_dir(&h.text_dir).await {
        texts_present = texts.next_entry().await?.is_some();
    }
    assert!(!texts_present);

    // the orphan is exposed as a failed metadata record
    let id = stem(upload.file_name().to_str().unwrap());
    let record = h.documents.get(&id).await?.expect("failure record");
    assert_eq!(record.status, IngestStatus::Failed);
    assert!(record.error_msg.is_some());
    assert!(record.text_path.is_none());

    // and the catalog does not list or serve it
    assert!(h.catalog.list().await?.is_empty());
    assert!(matches!(
        h.catalog.get(&id).await,
        Err(CatalogError::NotFound)
    ));

    Ok(())
}

#[tokio::test]
async fn failing_page_is_skipped_without_aborting_the_document() -> anyhow::Result<()> {
    let h = harness(3, vec![2]).await?;

    let document = h.pipeline.ingest(PDF_BYTES.to_vec(), "report.pdf").await?;

    let content = h.catalog.get(&stem(&document.filename)).await?;
    assert!(content.contains("--- Page 1 ---"));
    assert!(content.contains("content of page 1"));
    assert!(!content.contains("content of page 2"));
    assert!(content.contains("--- Page 3 ---"));
    assert!(content.contains("content of page 3"));

    Ok(())
}

#[tokio::test]
async fn catalog_lists_newest_first_and_combines_in_id_order() -> anyhow::Result<()> {
    let h = harness(1, vec![]).await?;

    // two ingests, then force distinct created_at stamps so the ordering
    // is observable within one second
    let older = h.pipeline.ingest(PNG_BYTES.to_vec(), "alpha.png").await?;
    let newer = h.pipeline.ingest(PNG_BYTES.to_vec(), "beta.png").await?;

    let older_id = stem(&older.filename);
    let newer_id = stem(&newer.filename);

    restamp(&h.documents, &older_id, "2026-01-01T08:00:00Z").await?;
    restamp(&h.documents, &newer_id, "2026-01-02T08:00:00Z").await?;

    let listed = h.catalog.list().await?;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, newer_id);
    assert_eq!(listed[1].id, older_id);
    assert_eq!(listed[0].filename, "beta.png");

    let combined = h.catalog.combine().await?;
    let older_marker = format!("--- Document: {older_id} ---");
    let newer_marker = format!("--- Document: {newer_id} ---");
    assert!(combined.contains(&older_marker));
    assert!(combined.contains(&newer_marker));

    // lexicographic by id: same timestamp prefix, so alpha before beta
    let older_pos = combined.find(&older_marker).unwrap();
    let newer_pos = combined.find(&newer_marker).unwrap();
    assert!(older_pos < newer_pos);

    Ok(())
}

#[tokio::test]
async fn missing_document_is_not_found() -> anyhow::Result<()> {
    let h = harness(1, vec![]).await?;
    assert!(matches!(
        h.catalog.get("20260101_000000_ghost").await,
        Err(CatalogError::NotFound)
    ));
    Ok(())
}

#[tokio::test]
async fn same_second_uploads_get_distinct_names() -> anyhow::Result<()> {
    let h = harness(1, vec![]).await?;

    let first = h.pipeline.ingest(PNG_BYTES.to_vec(), "dup.png").await?;
    let second = h.pipeline.ingest(PNG_BYTES.to_vec(), "dup.png").await?;
    assert_ne!(first.filename, second.filename);
    assert_ne!(first.text_filename, second.text_filename);

    assert_eq!(h.catalog.list().await?.len(), 2);
    Ok(())
}

fn stem(stored_name: &str) -> String {
    Path::new(stored_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(stored_name)
        .to_string()
}

async fn restamp(
    store: &Arc<JsonDocumentStore>,
    id: &str,
    created_at: &str,
) -> anyhow::Result<()> {
    let mut record = store.get(id).await?.expect("record to restamp");
    record.created_at = created_at.to_string();
    store.upsert(record).await?;
    Ok(())
}
