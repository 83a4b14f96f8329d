use std::{
    io::Write as _,
    path::{Path, PathBuf},
};

use crate::{error::InvoiceError, invoice::InvoiceDocument};

/// Hands a generated document over to the user.
pub trait Delivery {
    /// Returns where the document ended up.
    fn deliver(&self, document: &InvoiceDocument) -> Result<PathBuf, InvoiceError>;
}

/// Saves documents into a directory under their suggested file name, replacing any previous
/// file with the same name. The bytes are first written to a uniquely named temporary file in
/// the same directory which is then persisted under the final name, so that a partially written
/// document is never visible and concurrent deliveries do not mix their bytes.
#[derive(Debug, Clone)]
pub struct DirectoryDelivery {
    directory: PathBuf,
}

impl DirectoryDelivery {
    pub fn new<P: Into<PathBuf>>(directory: P) -> Self {
        DirectoryDelivery {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl Delivery for DirectoryDelivery {
    fn deliver(&self, document: &InvoiceDocument) -> Result<PathBuf, InvoiceError> {
        std::fs::create_dir_all(&self.directory).map_err(|error| {
            InvoiceError::generation(
                format!("Failed to create the output directory {:?}", self.directory),
                &error,
            )
        })?;

        let document_path = self.directory.join(&document.filename);
        let save_error = |error: &dyn std::error::Error| {
            InvoiceError::generation(
                format!("Failed to save the document to {:?}", document_path),
                error,
            )
        };

        // The temporary file removes itself when dropped, unless it has been persisted
        let mut temporary_file = tempfile::NamedTempFile::new_in(&self.directory)
            .map_err(|error| save_error(&error))?;
        temporary_file
            .write_all(&document.bytes)
            .and_then(|_| temporary_file.as_file().sync_all())
            .map_err(|error| save_error(&error))?;
        temporary_file
            .persist(&document_path)
            .map_err(|error| save_error(&error))?;
        log::info!(
            "Saved the document to {:?} ({} bytes)",
            document_path,
            document.bytes.len()
        );

        Ok(document_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(filename: &str, bytes: &[u8]) -> InvoiceDocument {
        InvoiceDocument {
            bytes: bytes.to_vec(),
            filename: filename.to_string(),
        }
    }

    #[test]
    fn documents_are_saved_under_their_filename() {
        let output_directory = tempfile::tempdir().unwrap();
        let delivery = DirectoryDelivery::new(output_directory.path().join("invoices"));

        let document_path = delivery
            .deliver(&document("invoice-Acme.pdf", b"%PDF-1.5"))
            .unwrap();

        assert_eq!(
            document_path,
            output_directory.path().join("invoices/invoice-Acme.pdf")
        );
        assert_eq!(std::fs::read(&document_path).unwrap(), b"%PDF-1.5");
        let entries = std::fs::read_dir(delivery.directory()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn later_documents_replace_earlier_ones() {
        let output_directory = tempfile::tempdir().unwrap();
        let delivery = DirectoryDelivery::new(output_directory.path());

        delivery.deliver(&document("invoice.pdf", b"first")).unwrap();
        let document_path = delivery.deliver(&document("invoice.pdf", b"second")).unwrap();

        assert_eq!(std::fs::read(document_path).unwrap(), b"second");
    }

    #[test]
    fn concurrent_deliveries_never_mix_their_bytes() {
        let output_directory = tempfile::tempdir().unwrap();
        let delivery = DirectoryDelivery::new(output_directory.path());
        let contents = (0..8u8)
            .map(|index| vec![index; 256 * 1024])
            .collect::<Vec<_>>();

        std::thread::scope(|scope| {
            for bytes in &contents {
                let delivery = &delivery;
                scope.spawn(move || {
                    delivery
                        .deliver(&document("invoice-Acme.pdf", bytes))
                        .unwrap()
                });
            }
        });

        let delivered = std::fs::read(output_directory.path().join("invoice-Acme.pdf")).unwrap();
        assert!(contents.contains(&delivered));
        assert_eq!(std::fs::read_dir(output_directory.path()).unwrap().count(), 1);
    }

    #[test]
    fn failures_leave_nothing_behind() {
        let output_directory = tempfile::tempdir().unwrap();
        // A directory in place of the destination makes the persist fail
        std::fs::create_dir(output_directory.path().join("invoice.pdf")).unwrap();
        std::fs::write(output_directory.path().join("invoice.pdf/keep"), b"").unwrap();
        let delivery = DirectoryDelivery::new(output_directory.path());

        let error = delivery.deliver(&document("invoice.pdf", b"%PDF-1.5")).unwrap_err();

        assert!(matches!(error, InvoiceError::DocumentGeneration(_)), "{}", error);
        let entries = std::fs::read_dir(output_directory.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect::<Vec<_>>();
        assert_eq!(entries, ["invoice.pdf"]);
    }
}
