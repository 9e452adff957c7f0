//! 上传文件与提取结果模型

use serde::{Deserialize, Serialize};

/// 上传的文件（文件名 + 字节流）
///
/// 只携带提取所需的最小信息，不持有文件句柄。
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// 文件扩展名（小写）
    pub fn extension(&self) -> Option<String> {
        self.name.rsplit('.').next().and_then(|ext| {
            if ext.len() < self.name.len() {
                Some(ext.to_lowercase())
            } else {
                None
            }
        })
    }
}

/// 文件上传槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSlot {
    /// 试卷（必传，docx / pdf）
    Exam,
    /// 矩阵（可选，docx / xlsx / xls）
    Matrix,
}

impl FileSlot {
    /// 该槽位允许的扩展名
    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            FileSlot::Exam => &["docx", "pdf"],
            FileSlot::Matrix => &["docx", "xlsx", "xls"],
        }
    }
}

/// 提取结果
///
/// 成功提取的文件有且只有一种形态：纯文本或不透明二进制。
/// 二进制按 base64 编码携带，mime 类型非空。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractedContent {
    Text {
        text: String,
    },
    Binary {
        /// base64 编码的原始字节
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

impl ExtractedContent {
    pub fn text(text: impl Into<String>) -> Self {
        ExtractedContent::Text { text: text.into() }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ExtractedContent::Text { .. })
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, ExtractedContent::Binary { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_lowercased() {
        let file = UploadedFile::new("DeThi.DOCX", vec![]);
        assert_eq!(file.extension().as_deref(), Some("docx"));
    }

    #[test]
    fn test_extension_missing() {
        let file = UploadedFile::new("README", vec![]);
        assert_eq!(file.extension(), None);
    }

    #[test]
    fn test_slot_extensions() {
        assert!(FileSlot::Exam.allowed_extensions().contains(&"pdf"));
        assert!(!FileSlot::Exam.allowed_extensions().contains(&"xlsx"));
        assert!(FileSlot::Matrix.allowed_extensions().contains(&"xls"));
    }
}
