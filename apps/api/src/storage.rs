use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::documents::file_extension;
use crate::errors::AppError;

/// Which record an archived upload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    JobDescription,
    Resume,
}

impl UploadKind {
    fn as_str(self) -> &'static str {
        match self {
            UploadKind::JobDescription => "job-descriptions",
            UploadKind::Resume => "resumes",
        }
    }
}

/// Object key for an archived upload.
pub fn upload_key(user_id: Uuid, kind: UploadKind, record_id: Uuid, file_name: &str) -> String {
    format!(
        "uploads/{}/{}/{}/{}",
        user_id,
        kind.as_str(),
        record_id,
        file_name.replace('/', "_")
    )
}

pub fn content_type_for(file_name: &str) -> &'static str {
    match file_extension(file_name).as_str() {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "doc" => "application/msword",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Archive of original uploaded files in S3 / MinIO.
#[derive(Clone)]
pub struct DocumentStore {
    s3: S3Client,
    bucket: String,
}

impl DocumentStore {
    pub fn new(s3: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            s3,
            bucket: bucket.into(),
        }
    }

    pub async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), AppError> {
        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 upload failed: {e}")))?;

        info!("Archived upload to s3://{}/{}", self.bucket, key);
        Ok(())
    }

    /// Fetches an object. A missing key is `Ok(None)`.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        let output = match self.s3.get_object().bucket(&self.bucket).key(key).send().await {
            Ok(output) => output,
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    return Ok(None);
                }
                return Err(AppError::Storage(format!("S3 download failed: {service_error}")));
            }
        };

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("S3 body read failed: {e}")))?;
        Ok(Some(data.into_bytes().to_vec()))
    }

    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.s3
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 delete failed: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_key_layout() {
        let user = Uuid::nil();
        let record = Uuid::nil();
        let key = upload_key(user, UploadKind::Resume, record, "cv/2024.pdf");
        assert_eq!(
            key,
            format!("uploads/{user}/resumes/{record}/cv_2024.pdf")
        );
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a.PDF"), "application/pdf");
        assert_eq!(content_type_for("notes.txt"), "text/plain; charset=utf-8");
        assert_eq!(content_type_for("blob"), "application/octet-stream");
    }
}
