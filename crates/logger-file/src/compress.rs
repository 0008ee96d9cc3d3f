//! Compression of rotated files.
//!
//! Compressed output is staged in `<name>.<ext>.inprogress` and only renamed
//! into place once the codec has been finished and synced, so a final
//! `.gz`/`.zip` is always complete. After the rename the plain file is
//! removed; if that fails the compressed copy is removed instead, leaving
//! exactly one copy of the rotated file.

use crate::config::CompressionMethod;
use crate::error::{Error, Result};
use crate::naming::with_suffix;

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use tokio::fs;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Suffix of compressed output that is still being written.
pub const INPROGRESS_EXTENSION: &str = "inprogress";

/// Compress `plain` with `method`, replacing it with `<plain>.<ext>`.
///
/// On failure `plain` is left as it was and no staging file remains.
///
/// # Errors
///
/// Returns the first step that failed.
pub async fn compress(plain: &Path, method: CompressionMethod) -> Result<PathBuf> {
    let compressed = with_suffix(plain, method.extension());
    let inprogress = with_suffix(&compressed, INPROGRESS_EXTENSION);

    let encoded = {
        let plain = plain.to_path_buf();
        let inprogress = inprogress.clone();
        tokio::task::spawn_blocking(move || encode(&plain, &inprogress, method)).await
    };

    match encoded {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            discard(&inprogress).await;
            return Err(e);
        }
        Err(e) => {
            discard(&inprogress).await;
            return Err(Error::Join(e));
        }
    }

    if let Err(source) = fs::rename(&inprogress, &compressed).await {
        discard(&inprogress).await;
        return Err(Error::Rename {
            from: inprogress,
            to: compressed,
            source,
        });
    }

    if let Err(e) = fs::remove_file(plain).await {
        return match fs::remove_file(&compressed).await {
            Ok(()) => Err(Error::Io("error removing rotated file after compression", e)),
            Err(rollback) => Err(Error::Compression(format!(
                "couldn't remove {}: {e}; couldn't remove {} either: {rollback}",
                plain.display(),
                compressed.display()
            ))),
        };
    }

    tracing::debug!("compressed {} to {}", plain.display(), compressed.display());

    Ok(compressed)
}

fn encode(plain: &Path, target: &Path, method: CompressionMethod) -> Result<()> {
    let mut input = File::open(plain).map_err(|e| Error::Io("error opening rotated file", e))?;
    let output =
        File::create(target).map_err(|e| Error::Io("error creating compressed file", e))?;

    let output = match method {
        CompressionMethod::Gzip => {
            let mut encoder = GzEncoder::new(output, Compression::default());
            io::copy(&mut input, &mut encoder)
                .map_err(|e| Error::Io("error writing compressed file", e))?;
            encoder
                .finish()
                .map_err(|e| Error::Io("error finishing gzip stream", e))?
        }
        CompressionMethod::Zip => {
            // The single entry is named after the rotated file.
            let entry = plain
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| Error::Compression(format!("{} has no file name", plain.display())))?;

            let size = input
                .metadata()
                .map_err(|e| Error::Io("error reading rotated file metadata", e))?
                .len();

            let mut writer = ZipWriter::new(output);
            writer
                .start_file(
                    entry,
                    SimpleFileOptions::default()
                        .compression_method(zip::CompressionMethod::Deflated)
                        .large_file(needs_zip64(size)),
                )
                .map_err(|e| Error::Compression(e.to_string()))?;
            io::copy(&mut input, &mut writer)
                .map_err(|e| Error::Io("error writing compressed file", e))?;
            writer
                .finish()
                .map_err(|e| Error::Compression(e.to_string()))?
        }
    };

    output
        .sync_all()
        .map_err(|e| Error::Io("error syncing compressed file", e))
}

/// Entries of 4 GiB or more need zip64 headers, which must be requested
/// before the entry is written.
const fn needs_zip64(size: u64) -> bool {
    size >= u32::MAX as u64
}

async fn discard(inprogress: &Path) {
    match fs::remove_file(inprogress).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("couldn't remove {}: {e}", inprogress.display()),
    }
}
