//! Attachment handling: copying local files next to the calendar before
//! saving, and turning them into MIME parts before sending.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use url::Url;

use super::{SaveErrorKind, SaveFailure};
use crate::activity::Activity;
use crate::alert::{Alert, FAILED_SAVE_ATTACHMENTS};
use crate::component::{Attachment, CalendarComponent};
use crate::itip::MimeAttachment;
use crate::store::ComponentStore;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// MIME type for a file, by extension.
fn content_type(path: &Path) -> &'static str {
    let Some(ext) = path.extension().map(|e| e.to_string_lossy().to_ascii_lowercase()) else {
        return DEFAULT_CONTENT_TYPE;
    };
    match ext.as_str() {
        "txt" | "text" => "text/plain",
        "htm" | "html" => "text/html",
        "csv" => "text/csv",
        "ics" => "text/calendar",
        "vcf" => "text/vcard",
        "md" => "text/markdown",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "xml" => "application/xml",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "odt" => "application/vnd.oasis.opendocument.text",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        "odp" => "application/vnd.oasis.opendocument.presentation",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

fn local_path(url: &str) -> Option<PathBuf> {
    let parsed = Url::parse(url).ok()?;
    if !parsed.scheme().eq_ignore_ascii_case("file") {
        return None;
    }
    parsed.to_file_path().ok()
}

fn copy_failure(detail: String) -> SaveFailure {
    SaveFailure::new(
        SaveErrorKind::AttachmentCopyFailed,
        Alert::new(FAILED_SAVE_ATTACHMENTS).with_detail(detail),
    )
}

/// Copy every `file://` attachment that lives outside the calendar's
/// attachment directory into it, as `<dir>/<safe-uid>-<file name>`, and point
/// the attachment at the copy.
pub async fn materialize(
    comp: &mut CalendarComponent,
    store: &dyn ComponentStore,
    activity: &Activity,
) -> Result<(), SaveFailure> {
    if !comp.has_attachments() {
        return Ok(());
    }

    let dir = store.local_attachment_store_path();
    if let Err(e) = tokio::fs::create_dir_all(&dir).await {
        warn!(dir = %dir.display(), error = %e, "Could not create attachment directory");
    }
    let prefix = format!("{}-", comp.safe_uid());
    let prefix_path = dir.join(&prefix);
    let prefix_str = prefix_path.to_string_lossy().into_owned();

    for attachment in comp.attachments.iter_mut() {
        if let Some(source) = attachment.url().and_then(local_path) {
            if !source.to_string_lossy().starts_with(&prefix_str) {
                let dest = copy_into(&source, &dir, &prefix).await?;
                *attachment = Attachment::Url(file_url(&dest)?);
            }
        }

        if activity.is_cancelled() {
            return Err(SaveFailure::cancelled(
                SaveErrorKind::AttachmentCopyFailed,
                Alert::new(FAILED_SAVE_ATTACHMENTS),
            ));
        }
    }

    Ok(())
}

async fn copy_into(source: &Path, dir: &Path, prefix: &str) -> Result<PathBuf, SaveFailure> {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| copy_failure(format!("{} is not a file", source.display())))?;
    let dest = dir.join(format!("{}{}", prefix, name));

    tokio::fs::copy(source, &dest)
        .await
        .map_err(|e| copy_failure(format!("{}: {}", source.display(), e)))?;
    debug!(from = %source.display(), to = %dest.display(), "Copied attachment");
    Ok(dest)
}

fn file_url(path: &Path) -> Result<String, SaveFailure> {
    Url::from_file_path(path)
        .map(String::from)
        .map_err(|_| copy_failure(format!("{} is not an absolute path", path.display())))
}

/// Read local attachments into MIME parts and rewrite the component's
/// references to `cid:` URLs. Unreadable files stay as they are.
pub async fn mime_parts(comp: &mut CalendarComponent) -> Vec<MimeAttachment> {
    let mut parts = Vec::new();

    for attachment in comp.attachments.iter_mut() {
        let Some(path) = attachment.url().and_then(local_path) else {
            continue;
        };
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable attachment");
                continue;
            }
        };

        let content_id = format!("{}@caledit", uuid::Uuid::new_v4().simple());
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());

        *attachment = Attachment::Url(format!("cid:{}", content_id));
        parts.push(MimeAttachment {
            filename,
            content_type: content_type(&path).to_string(),
            content_id,
            data,
        });
    }

    parts
}
