use axum::{
    body::Bytes,
    extract::{Multipart, State},
    Json,
};
use domain::{
    access::require_login,
    forms::{validate_image_upload, ARTICLE_IMAGE_MAX_BYTES},
    DomainError,
};
use serde_json::{json, Value};
use std::path::Path;

use crate::{
    error::{AppError, AppResult},
    session::Session,
    state::AppState,
};

/// 编辑器上传图片使用的表单字段名
pub const EDITOR_IMAGE_FIELD: &str = "editormd-image-file";

pub(crate) struct UploadedFile {
    pub file_name: String,
    pub bytes: Bytes,
}

/// 读取指定名称的文件字段，其余字段忽略
pub(crate) async fn read_file_field(
    multipart: &mut Multipart,
    name: &str,
) -> AppResult<Option<UploadedFile>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some(name) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        return Ok(Some(UploadedFile { file_name, bytes }));
    }
    Ok(None)
}

/// 以随机文件名写入 `media_root/{subdir}/`，返回相对路径
pub(crate) async fn store_file(
    media_root: &str,
    subdir: &str,
    ext: &str,
    bytes: &[u8],
) -> AppResult<String> {
    let dir = Path::new(media_root).join(subdir);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(anyhow::Error::from)?;

    let name = format!("{:032x}{}", rand::random::<u128>(), ext);
    tokio::fs::write(dir.join(&name), bytes)
        .await
        .map_err(anyhow::Error::from)?;
    Ok(format!("{}/{}", subdir, name))
}

/// 编辑器图片上传，响应沿用编辑器约定的 `{success, message, url}`
pub async fn upload_article_image(
    State(state): State<AppState>,
    session: Session,
    mut multipart: Multipart,
) -> AppResult<Json<Value>> {
    let viewer = session.viewer();
    require_login(&viewer)?;

    let Some(file) = read_file_field(&mut multipart, EDITOR_IMAGE_FIELD).await? else {
        return Ok(Json(json!({ "success": 0, "message": "no image received" })));
    };
    let ext = match validate_image_upload(
        "image",
        &file.file_name,
        file.bytes.len(),
        ARTICLE_IMAGE_MAX_BYTES,
    ) {
        Ok(ext) => ext,
        Err(DomainError::Validation { message, .. }) => {
            return Ok(Json(json!({ "success": 0, "message": message })));
        }
        Err(other) => return Err(other.into()),
    };

    let path = store_file(&state.settings.server.media_root, "article", &ext, &file.bytes).await?;
    Ok(Json(json!({
        "success": 1,
        "message": "uploaded",
        "url": format!("/media/{}", path),
    })))
}
