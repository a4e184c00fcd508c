use std::thread;

use crate::document_extractor::DocumentExtractor;
use crate::models::{BatchItem, BatchResult, DocumentInput, ItemError};
use crate::utils::PassportError;

/// Runs the extractor over a batch, one isolated item at a time.
pub struct BatchRunner;

impl BatchRunner {
    pub fn run(
        extractor: &DocumentExtractor,
        documents: &[DocumentInput],
    ) -> Result<BatchResult, PassportError> {
        let cap = extractor.config().max_batch_size;
        if documents.is_empty() {
            return Err(PassportError::InputError("No files in batch".to_string()));
        }
        if documents.len() > cap {
            return Err(PassportError::InputError(format!(
                "Batch of {} documents exceeds the limit of {}",
                documents.len(),
                cap
            )));
        }

        log::info!("Processing batch of {} documents", documents.len());
        let per_item = if extractor.config().parallel_batch {
            Self::run_parallel(extractor, documents)
        } else {
            documents
                .iter()
                .map(|document| Self::run_item(extractor, document))
                .collect()
        };

        let result = BatchResult::from_items(per_item);
        log::info!(
            "Batch finished: {} total, {} successful, {} failed",
            result.total,
            result.successful_count,
            result.failed_count
        );
        Ok(result)
    }

    /// One scoped thread per item; joining in spawn order keeps input order.
    fn run_parallel(extractor: &DocumentExtractor, documents: &[DocumentInput]) -> Vec<BatchItem> {
        thread::scope(|scope| {
            let handles: Vec<_> = documents
                .iter()
                .map(|document| scope.spawn(move || Self::run_item(extractor, document)))
                .collect();

            handles
                .into_iter()
                .zip(documents)
                .map(|(handle, document)| {
                    handle.join().unwrap_or_else(|_| {
                        BatchItem::Failure(ItemError {
                            identifier: document.filename.clone(),
                            kind: "internal_error".to_string(),
                            message: "worker thread panicked".to_string(),
                        })
                    })
                })
                .collect()
        })
    }

    fn run_item(extractor: &DocumentExtractor, document: &DocumentInput) -> BatchItem {
        match extractor.extract_document(&document.bytes, &document.filename) {
            Ok(record) => BatchItem::Success(record),
            Err(e) => {
                log::warn!("Batch item {} failed: {}", document.filename, e);
                BatchItem::Failure(ItemError {
                    identifier: document.filename.clone(),
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                })
            }
        }
    }
}
